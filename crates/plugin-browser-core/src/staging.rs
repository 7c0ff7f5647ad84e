//! Temporary directories next to the plugin root.
//!
//! Staging directories live in the plugin root's parent, never inside the
//! root itself, so a half-built tree is never visible to a scan or to the
//! host application. Being on the same filesystem keeps the final move a
//! single `rename`.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::error::{PluginBrowserError, PluginBrowserResult};

/// Prefix shared by every staging directory this crate creates.
pub const STAGING_PREFIX: &str = ".plugin-browser-";

/// Resolve `plugin_root` to the real directory behind it.
///
/// Symlinks are followed so staging lands beside the directory the plugin
/// folders actually live in, not beside a link that may point at another
/// filesystem.
pub(crate) fn resolve_root(plugin_root: &Path) -> PluginBrowserResult<PathBuf> {
    let root = plugin_root
        .canonicalize()
        .map_err(|e| PluginBrowserError::directory(plugin_root, format!("plugin directory is not accessible: {e}")))?;
    if !root.is_dir() {
        return Err(PluginBrowserError::directory(&root, "plugin directory is not a directory"));
    }
    Ok(root)
}

/// Create a staging directory beside `plugin_root`.
///
/// The directory is deleted when the returned [`TempDir`] is dropped.
pub(crate) fn staging_dir(plugin_root: &Path, purpose: &str) -> PluginBrowserResult<TempDir> {
    let parent = plugin_root
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .ok_or_else(|| {
            PluginBrowserError::directory(plugin_root, "plugin directory has no parent for staging")
        })?;

    tempfile::Builder::new()
        .prefix(&format!("{STAGING_PREFIX}{purpose}-"))
        .tempdir_in(parent)
        .map_err(|e| PluginBrowserError::directory(parent, format!("failed to create staging directory: {e}")))
}
