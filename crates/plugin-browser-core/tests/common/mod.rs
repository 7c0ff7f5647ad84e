//! Shared harness for plugin browser integration tests.

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use plugin_browser_core::{BrowserOptions, InMemorySettings, MemoryTransport, PluginBrowser};
use plugin_browser_events::{StatusBus, StatusEvent, StatusLevel, StatusReceiver};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

/// Where the harness serves its manifest.
pub const MANIFEST_URL: &str = "https://plugins.test/manifest.json";

/// Download URL the harness uses for plugin `id`.
pub fn download_url(id: &str) -> String {
    format!("https://plugins.test/{id}.zip")
}

/// A browser over an empty plugin root and an in-memory network.
///
/// The plugin root is `<tmp>/plugins`, so staging directories (created in
/// the root's parent) can be checked for leaks via [`Self::parent_listing`].
#[allow(dead_code)]
pub struct BrowserHarness {
    /// The browser under test.
    pub browser: Arc<PluginBrowser>,
    /// The canned network.
    pub transport: Arc<MemoryTransport>,
    /// Settings shared with the browser.
    pub settings: Arc<InMemorySettings>,
    /// Status events published by the browser.
    pub status: StatusReceiver,
    /// The plugin root.
    pub root: PathBuf,
    _dir: TempDir,
}

#[allow(dead_code)]
impl BrowserHarness {
    /// Build a harness whose manifest lists `ids`, each with a valid zip.
    pub fn with_plugins(ids: &[&str]) -> Self {
        let mut transport = MemoryTransport::new().with_body(MANIFEST_URL, manifest_json(ids));
        for id in ids {
            transport = transport.with_body(
                download_url(id),
                plugin_zip(&format!("{id}-main"), &[("load.py", "def plugin_start3(d): return 'x'")]),
            );
        }
        Self::with_transport(transport)
    }

    /// Build a harness over a caller-configured transport.
    pub fn with_transport(transport: MemoryTransport) -> Self {
        let dir = TempDir::new().expect("failed to create tempdir");
        let root = dir.path().join("plugins");
        std::fs::create_dir(&root).expect("failed to create plugin root");

        let transport = Arc::new(transport);
        let settings = Arc::new(InMemorySettings::new(MANIFEST_URL));
        let bus = StatusBus::new();
        let status = bus.subscribe();

        let browser = PluginBrowser::new(
            BrowserOptions::new(&root),
            transport.clone(),
            settings.clone(),
            Arc::new(bus),
        );

        Self {
            browser: Arc::new(browser),
            transport,
            settings,
            status,
            root,
            _dir: dir,
        }
    }

    /// Sorted names directly under the plugin root.
    pub fn listing(&self) -> Vec<String> {
        names(&self.root)
    }

    /// Sorted names in the plugin root's parent (should only ever be `plugins`).
    pub fn parent_listing(&self) -> Vec<String> {
        names(self.root.parent().expect("plugin root has a parent"))
    }

    /// Every status event published so far.
    pub fn events(&mut self) -> Vec<Arc<StatusEvent>> {
        self.status.drain()
    }

    /// Create a folder by hand, as the user's file manager would.
    pub fn make_folder(&self, name: &str) -> PathBuf {
        let path = self.root.join(name);
        std::fs::create_dir_all(&path).expect("failed to create folder");
        std::fs::write(path.join("load.py"), "# hand made").expect("failed to write load.py");
        path
    }
}

/// Count events at `level`.
#[allow(dead_code)]
pub fn count_level(events: &[Arc<StatusEvent>], level: StatusLevel) -> usize {
    events.iter().filter(|e| e.level == level).count()
}

/// A manifest listing one record per id.
pub fn manifest_json(ids: &[&str]) -> Vec<u8> {
    let records: Vec<serde_json::Value> = ids
        .iter()
        .map(|id| {
            serde_json::json!({
                "id": id,
                "name": format!("Plugin {id}"),
                "version": "1.0.0",
                "author": "tests",
                "description": "integration test plugin",
                "downloadUrl": download_url(id),
            })
        })
        .collect();
    serde_json::to_vec(&records).expect("manifest serializes")
}

/// A zip with every file under `top/`.
pub fn plugin_zip(top: &str, files: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, body) in files {
        writer
            .start_file(format!("{top}/{name}"), options)
            .expect("start zip entry");
        writer.write_all(body.as_bytes()).expect("write zip entry");
    }
    writer.finish().expect("finish zip").into_inner()
}

/// A zip whose second entry is `../escape.txt`, made by patching a
/// same-length placeholder name in the written bytes.
#[allow(dead_code)]
pub fn traversal_zip() -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    writer.start_file("load.py", options).expect("start zip entry");
    writer.write_all(b"x").expect("write zip entry");
    writer.start_file("xx/escape.txt", options).expect("start zip entry");
    writer.write_all(b"pwned").expect("write zip entry");
    let bytes = writer.finish().expect("finish zip").into_inner();
    replace_all(bytes, b"xx/escape.txt", b"../escape.txt")
}

#[allow(clippy::arithmetic_side_effects)]
fn replace_all(mut bytes: Vec<u8>, from: &[u8], to: &[u8]) -> Vec<u8> {
    assert_eq!(from.len(), to.len());
    let mut i = 0;
    while i + from.len() <= bytes.len() {
        if &bytes[i..i + from.len()] == from {
            bytes[i..i + from.len()].copy_from_slice(to);
            i += from.len();
        } else {
            i += 1;
        }
    }
    bytes
}

/// Sorted file names in `dir`.
pub fn names(dir: &Path) -> Vec<String> {
    let mut out: Vec<String> = std::fs::read_dir(dir)
        .expect("read_dir")
        .map(|e| e.expect("dir entry").file_name().to_string_lossy().into_owned())
        .collect();
    out.sort();
    out
}

/// A delay long enough that the test will supersede it first.
#[allow(dead_code)]
pub const SLOW: Duration = Duration::from_secs(30);
