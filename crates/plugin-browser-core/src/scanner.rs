//! Installed-plugin discovery.
//!
//! Installed state is derived purely from the directory listing at scan
//! time: one [`InstalledPlugin`] per child directory of the plugin root.
//! Nothing here is cached; callers rescan before every use.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{PluginBrowserError, PluginBrowserResult};
use crate::naming::split_folder_name;
use crate::receipt::InstallReceipt;

/// File the host application loads as a plugin's entry point.
pub const ENTRY_POINT_FILE: &str = "load.py";

/// A plugin folder found under the plugin root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstalledPlugin {
    /// The directory name on disk. Mutations key on this, never on an id.
    pub folder_name: String,
    /// Best-effort guess at the manifest id this folder came from.
    pub inferred_id: Option<String>,
    /// `false` when the folder carries the disabled suffix.
    pub enabled: bool,
    /// Absolute location of the folder.
    pub path: PathBuf,
    /// Whether the folder contains the host's entry-point file.
    pub has_entry_point: bool,
    /// Version recorded by the install receipt, if any.
    pub installed_version: Option<String>,
}

impl InstalledPlugin {
    /// Describe the directory at `path` from its current on-disk state.
    ///
    /// Returns `None` if the final path component is not valid UTF-8.
    #[must_use]
    pub fn from_dir(path: &Path) -> Option<Self> {
        let folder_name = path.file_name()?.to_str()?.to_string();
        let (base, enabled) = split_folder_name(&folder_name);
        let receipt = InstallReceipt::read(path);

        let inferred_id = match &receipt {
            Some(r) if !r.id.trim().is_empty() => Some(r.id.clone()),
            _ => Some(base.to_string()),
        };

        Some(Self {
            inferred_id,
            enabled,
            path: path.to_path_buf(),
            has_entry_point: path.join(ENTRY_POINT_FILE).is_file(),
            installed_version: receipt.map(|r| r.version),
            folder_name,
        })
    }

    /// Folder name with the disabled suffix stripped.
    #[must_use]
    pub fn base_name(&self) -> &str {
        split_folder_name(&self.folder_name).0
    }
}

/// Scan `plugin_root` for plugin folders.
///
/// Returns one entry per immediate child directory, sorted by folder name.
/// Files are ignored. Children whose names are not valid UTF-8, or that
/// cannot be inspected, are skipped with a warning.
///
/// # Errors
///
/// Returns [`PluginBrowserError::DirectoryAccess`] if `plugin_root` itself
/// cannot be listed.
pub fn scan(plugin_root: &Path) -> PluginBrowserResult<Vec<InstalledPlugin>> {
    let root = std::path::absolute(plugin_root)
        .map_err(|e| PluginBrowserError::directory(plugin_root, e))?;
    let entries = std::fs::read_dir(&root).map_err(|e| PluginBrowserError::directory(&root, e))?;

    let mut plugins = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(root = %root.display(), error = %e, "Skipping unreadable plugin directory entry");
                continue;
            },
        };
        let path = entry.path();

        // Follows symlinks: a linked plugin folder is still a plugin folder.
        if !path.is_dir() {
            continue;
        }

        match InstalledPlugin::from_dir(&path) {
            Some(plugin) => plugins.push(plugin),
            None => warn!(path = %path.display(), "Skipping plugin folder with non UTF-8 name"),
        }
    }

    plugins.sort_by(|a, b| a.folder_name.cmp(&b.folder_name));
    debug!(root = %root.display(), count = plugins.len(), "Scanned plugin directory");
    Ok(plugins)
}
