//! Download, validate, stage and commit a plugin install.
//!
//! The sequence is:
//!
//! 1. refuse if `<root>/<id>` or `<root>/<id>.disabled` already exists
//! 2. download the archive into memory (cancellable, size-capped)
//! 3. validate the whole archive before anything touches disk
//! 4. extract into a staging directory beside the plugin root and drop an
//!    install receipt into it
//! 5. `rename` the staged folder to `<root>/<id>`
//!
//! Any failure along the way drops the staging directory, so the plugin root
//! is either unchanged or contains exactly one new, complete folder.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use plugin_browser_events::StatusSink;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::archive::{ArchiveLimits, PluginArchive};
use crate::error::{PluginBrowserError, PluginBrowserResult};
use crate::manifest::AvailablePlugin;
use crate::naming::{folder_name_for, validate_folder_name};
use crate::receipt::InstallReceipt;
use crate::scanner::InstalledPlugin;
use crate::staging::{resolve_root, staging_dir};
use crate::transport::{Transport, fetch_cancellable};

/// Default cap on archive downloads (100 MiB).
pub const DEFAULT_MAX_DOWNLOAD_BYTES: u64 = 100 * 1024 * 1024;

/// Installs catalog entries into a plugin root.
#[derive(Debug, Clone)]
pub struct InstallExecutor {
    transport: Arc<dyn Transport>,
    status: Arc<dyn StatusSink>,
    max_download_bytes: u64,
    archive_limits: ArchiveLimits,
}

impl InstallExecutor {
    /// Create an executor that downloads through `transport` and reports
    /// progress to `status`.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, status: Arc<dyn StatusSink>) -> Self {
        Self {
            transport,
            status,
            max_download_bytes: DEFAULT_MAX_DOWNLOAD_BYTES,
            archive_limits: ArchiveLimits::default(),
        }
    }

    /// Override the download size cap.
    #[must_use]
    pub fn with_max_download_bytes(mut self, max_download_bytes: u64) -> Self {
        self.max_download_bytes = max_download_bytes;
        self
    }

    /// Override the archive entry and size limits.
    #[must_use]
    pub fn with_archive_limits(mut self, archive_limits: ArchiveLimits) -> Self {
        self.archive_limits = archive_limits;
        self
    }

    /// Install `plugin` under `plugin_root` as `<root>/<id>`, enabled.
    ///
    /// If `cancel` fires before the final move, the install stops with
    /// [`PluginBrowserError::Cancelled`] and leaves nothing behind.
    ///
    /// # Errors
    ///
    /// Each step fails distinctly: [`PluginBrowserError::AlreadyInstalled`],
    /// [`PluginBrowserError::Network`], [`PluginBrowserError::DownloadTooLarge`],
    /// [`PluginBrowserError::CorruptArchive`],
    /// [`PluginBrowserError::UnsafeArchive`],
    /// [`PluginBrowserError::DirectoryAccess`] or
    /// [`PluginBrowserError::Cancelled`].
    pub async fn install(
        &self,
        plugin: &AvailablePlugin,
        plugin_root: &Path,
        cancel: &CancellationToken,
    ) -> PluginBrowserResult<InstalledPlugin> {
        validate_folder_name(&plugin.id)?;
        let root = resolve_root(plugin_root)?;
        ensure_not_installed(&plugin.id, &root)?;

        self.status
            .info(&format!("Downloading {} {}...", plugin.name, plugin.version));
        let bytes = fetch_cancellable(
            self.transport.as_ref(),
            &plugin.download_url,
            self.max_download_bytes,
            cancel,
            "plugin download",
        )
        .await?;
        debug!(plugin_id = %plugin.id, bytes = bytes.len(), "Downloaded plugin archive");

        self.status.info(&format!("Installing {}...", plugin.name));
        let plugin = plugin.clone();
        let limits = self.archive_limits;
        let cancel = cancel.clone();
        tokio::task::spawn_blocking(move || stage_and_commit(&bytes, &plugin, &root, &limits, &cancel))
            .await?
    }
}

/// Fail if any folder for `id`, enabled or disabled, is present.
fn ensure_not_installed(id: &str, root: &Path) -> PluginBrowserResult<()> {
    for enabled in [true, false] {
        let path = root.join(folder_name_for(id, enabled));
        if path.symlink_metadata().is_ok() {
            return Err(PluginBrowserError::AlreadyInstalled {
                id: id.to_string(),
                path,
            });
        }
    }
    Ok(())
}

fn stage_and_commit(
    bytes: &[u8],
    plugin: &AvailablePlugin,
    root: &Path,
    limits: &ArchiveLimits,
    cancel: &CancellationToken,
) -> PluginBrowserResult<InstalledPlugin> {
    let archive = PluginArchive::open(bytes, limits)?;

    let staging = staging_dir(root, "install")?;
    let staged = staging.path().join(&plugin.id);
    std::fs::create_dir(&staged).map_err(|e| PluginBrowserError::directory(&staged, e))?;

    archive.extract_to(&staged)?;
    InstallReceipt::for_plugin(plugin)
        .write(&staged)
        .map_err(|e| PluginBrowserError::directory(&staged, e))?;

    if cancel.is_cancelled() {
        return Err(PluginBrowserError::Cancelled("plugin download".into()));
    }

    let dest = root.join(&plugin.id);
    commit(&plugin.id, &staged, &dest, root)?;
    info!(plugin_id = %plugin.id, path = %dest.display(), "Installed plugin");

    InstalledPlugin::from_dir(&dest)
        .ok_or_else(|| PluginBrowserError::Internal(format!("installed folder {} is unreadable", dest.display())))
}

/// Move the staged folder into place without clobbering anything.
///
/// `rename` would silently replace an empty directory, so the destination is
/// re-checked first; the remaining window between check and rename is only
/// reachable by a concurrent external actor creating an empty folder.
fn commit(id: &str, staged: &Path, dest: &Path, root: &Path) -> PluginBrowserResult<()> {
    ensure_not_installed(id, root)?;

    std::fs::rename(staged, dest).map_err(|e| match e.kind() {
        io::ErrorKind::AlreadyExists | io::ErrorKind::DirectoryNotEmpty => {
            PluginBrowserError::AlreadyInstalled {
                id: id.to_string(),
                path: PathBuf::from(dest),
            }
        },
        _ => PluginBrowserError::directory(dest, format!("failed to move staged plugin into place: {e}")),
    })
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Write};

    use plugin_browser_events::NullSink;
    use zip::write::SimpleFileOptions;

    use super::*;
    use crate::transport::MemoryTransport;

    const URL: &str = "https://example.com/foo.zip";

    fn zip_bytes() -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer.start_file("foo/load.py", SimpleFileOptions::default()).unwrap();
        writer.write_all(b"def plugin_start3(d): return 'Foo'").unwrap();
        writer.finish().unwrap().into_inner()
    }

    fn plugin() -> AvailablePlugin {
        AvailablePlugin {
            id: "foo".into(),
            name: "Foo".into(),
            author: "a".into(),
            version: "1.0.0".into(),
            description: "d".into(),
            download_url: URL.into(),
            compatibility: None,
            repository_url: None,
        }
    }

    fn setup(transport: MemoryTransport) -> (tempfile::TempDir, PathBuf, InstallExecutor) {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("plugins");
        std::fs::create_dir(&root).unwrap();
        let executor = InstallExecutor::new(Arc::new(transport), Arc::new(NullSink));
        (tmp, root, executor)
    }

    fn names(dir: &Path) -> Vec<String> {
        let mut out: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        out.sort();
        out
    }

    #[tokio::test]
    async fn installs_and_flattens() {
        let (tmp, root, executor) = setup(MemoryTransport::new().with_body(URL, zip_bytes()));

        let installed = executor
            .install(&plugin(), &root, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(installed.folder_name, "foo");
        assert!(installed.enabled);
        assert!(installed.has_entry_point);
        assert_eq!(installed.installed_version.as_deref(), Some("1.0.0"));
        assert!(root.join("foo").join("load.py").is_file());
        assert_eq!(names(&root), vec!["foo"]);
        assert_eq!(names(tmp.path()), vec!["plugins"]);
    }

    #[tokio::test]
    async fn refuses_when_disabled_variant_exists() {
        let (_tmp, root, executor) = setup(MemoryTransport::new().with_body(URL, zip_bytes()));
        std::fs::create_dir(root.join("foo.disabled")).unwrap();
        std::fs::write(root.join("foo.disabled").join("keep.txt"), "mine").unwrap();

        let err = executor
            .install(&plugin(), &root, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, PluginBrowserError::AlreadyInstalled { .. }));
        assert_eq!(names(&root.join("foo.disabled")), vec!["keep.txt"]);
    }

    #[tokio::test]
    async fn network_failure_creates_nothing() {
        let (tmp, root, executor) = setup(MemoryTransport::new().with_status(URL, 500));

        let err = executor
            .install(&plugin(), &root, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, PluginBrowserError::Network { .. }));
        assert!(names(&root).is_empty());
        assert_eq!(names(tmp.path()), vec!["plugins"]);
    }

    #[tokio::test]
    async fn oversized_download_is_rejected() {
        let (_tmp, root, executor) = setup(MemoryTransport::new().with_body(URL, zip_bytes()));
        let executor = executor.with_max_download_bytes(8);

        let err = executor
            .install(&plugin(), &root, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PluginBrowserError::DownloadTooLarge { .. }));
    }

    #[tokio::test]
    async fn cancelled_before_download_leaves_nothing() {
        let (tmp, root, executor) = setup(MemoryTransport::new().with_body(URL, zip_bytes()));
        let token = CancellationToken::new();
        token.cancel();

        let err = executor.install(&plugin(), &root, &token).await.unwrap_err();
        assert!(err.is_cancelled());
        assert!(names(&root).is_empty());
        assert_eq!(names(tmp.path()), vec!["plugins"]);
    }

    #[tokio::test]
    async fn missing_root_is_directory_error() {
        let (tmp, _root, executor) = setup(MemoryTransport::new().with_body(URL, zip_bytes()));

        let err = executor
            .install(&plugin(), &tmp.path().join("absent"), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PluginBrowserError::DirectoryAccess { .. }));
    }

    #[test]
    fn commit_never_replaces_existing_destination() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("plugins");
        std::fs::create_dir_all(root.join("foo")).unwrap();
        let staged = tmp.path().join("staged");
        std::fs::create_dir(&staged).unwrap();
        std::fs::write(staged.join("load.py"), "new").unwrap();

        let err = commit("foo", &staged, &root.join("foo"), &root).unwrap_err();
        assert!(matches!(err, PluginBrowserError::AlreadyInstalled { .. }));
        assert!(names(&root.join("foo")).is_empty());
    }
}
