//! Folder naming convention for plugin state.
//!
//! A plugin is disabled exactly when its folder name ends in
//! [`DISABLED_SUFFIX`]. There is no other record of enabled state, so the
//! flag can never disagree with the directory listing.

use std::path::{Component, Path};

use crate::error::{PluginBrowserError, PluginBrowserResult};

/// Suffix appended to a plugin folder to disable it.
pub const DISABLED_SUFFIX: &str = ".disabled";

/// Split a folder name into its base name and enabled state.
///
/// `"foo.disabled"` → `("foo", false)`, `"foo"` → `("foo", true)`.
/// A folder named exactly `.disabled` has no base name and counts as enabled.
#[must_use]
pub fn split_folder_name(folder_name: &str) -> (&str, bool) {
    match folder_name.strip_suffix(DISABLED_SUFFIX) {
        Some(base) if !base.is_empty() => (base, false),
        _ => (folder_name, true),
    }
}

/// The folder name for `base` in the requested state.
#[must_use]
pub fn folder_name_for(base: &str, enabled: bool) -> String {
    if enabled {
        base.to_string()
    } else {
        format!("{base}{DISABLED_SUFFIX}")
    }
}

/// The same plugin in the opposite state (`foo` ↔ `foo.disabled`).
#[must_use]
pub fn toggled_folder_name(folder_name: &str) -> String {
    let (base, enabled) = split_folder_name(folder_name);
    folder_name_for(base, !enabled)
}

/// Validate that `name` is a single plain path component.
///
/// Rejects empty names, separators, `.`/`..`, and control characters so a
/// name can never address anything outside the plugin root.
///
/// # Errors
///
/// Returns [`PluginBrowserError::InvalidFolderName`] describing the problem.
pub fn validate_folder_name(name: &str) -> PluginBrowserResult<()> {
    let reject = |reason: &str| {
        Err(PluginBrowserError::InvalidFolderName {
            name: name.to_string(),
            reason: reason.to_string(),
        })
    };

    if name.trim().is_empty() {
        return reject("name must not be empty");
    }
    if name.contains(['/', '\\']) {
        return reject("name must not contain path separators");
    }
    if name.chars().any(char::is_control) {
        return reject("name must not contain control characters");
    }
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => reject("name must be a plain directory name"),
    }
}
