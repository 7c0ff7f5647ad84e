//! Enable, disable and remove installed plugin folders.
//!
//! Every call resolves the folder against the live directory at call time
//! and acts on the literal folder name. Manifest ids play no part here, so
//! two folders that happen to map to the same id can never be confused.

use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::error::{PluginBrowserError, PluginBrowserResult};
use crate::naming::{folder_name_for, split_folder_name, toggled_folder_name, validate_folder_name};
use crate::scanner::InstalledPlugin;
use crate::staging::{resolve_root, staging_dir};

/// Result of [`set_enabled`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnabledChange {
    /// The folder after the call.
    pub plugin: InstalledPlugin,
    /// `false` when the folder was already in the requested state.
    pub changed: bool,
}

/// Find the current folder for `name` under `root`.
///
/// The literal name wins when it exists; otherwise its enabled/disabled
/// counterpart is tried (`foo` ↔ `foo.disabled`).
///
/// # Errors
///
/// [`PluginBrowserError::InvalidFolderName`] for names that are not a plain
/// directory name, [`PluginBrowserError::NotFound`] if neither variant is a
/// directory.
pub fn resolve_folder(root: &Path, name: &str) -> PluginBrowserResult<String> {
    validate_folder_name(name)?;
    if root.join(name).is_dir() {
        return Ok(name.to_string());
    }
    let toggled = toggled_folder_name(name);
    if root.join(&toggled).is_dir() {
        return Ok(toggled);
    }
    Err(PluginBrowserError::NotFound {
        folder: name.to_string(),
    })
}

/// Enable or disable the plugin folder `name` by renaming it.
///
/// Already being in the requested state is a successful no-op.
///
/// # Errors
///
/// [`PluginBrowserError::DirectoryAccess`] if the plugin root is missing,
/// [`PluginBrowserError::NotFound`] if the folder is gone,
/// [`PluginBrowserError::Conflict`] if the target name is taken,
/// [`PluginBrowserError::DirectoryAccess`] if the rename fails otherwise.
pub fn set_enabled(plugin_root: &Path, name: &str, enabled: bool) -> PluginBrowserResult<EnabledChange> {
    let root = resolve_root(plugin_root)?;
    let current = resolve_folder(&root, name)?;
    let (base, currently_enabled) = split_folder_name(&current);

    if currently_enabled == enabled {
        let plugin = describe(&root.join(&current))?;
        return Ok(EnabledChange {
            plugin,
            changed: false,
        });
    }

    let target = folder_name_for(base, enabled);
    let from = root.join(&current);
    let to = root.join(&target);

    if to.symlink_metadata().is_ok() {
        return Err(PluginBrowserError::Conflict {
            folder: target,
            message: "a folder with that name already exists".into(),
        });
    }

    std::fs::rename(&from, &to).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => PluginBrowserError::NotFound {
            folder: current.clone(),
        },
        io::ErrorKind::AlreadyExists | io::ErrorKind::DirectoryNotEmpty => PluginBrowserError::Conflict {
            folder: target.clone(),
            message: "a folder with that name already exists".into(),
        },
        _ => PluginBrowserError::directory(&from, e),
    })?;

    info!(from = %current, to = %target, enabled, "Renamed plugin folder");
    Ok(EnabledChange {
        plugin: describe(&to)?,
        changed: true,
    })
}

/// Delete the plugin folder `name` and everything in it.
///
/// The folder is first moved into a staging directory beside the plugin
/// root, so it disappears from the root in one step. If any part of the
/// detached tree cannot be deleted, whatever is left is moved back under
/// its original name and the error lists the paths that survived.
///
/// Returns the folder name that was removed.
///
/// # Errors
///
/// [`PluginBrowserError::NotFound`] if the folder is gone,
/// [`PluginBrowserError::DirectoryAccess`] if it cannot be detached or fully
/// deleted.
pub fn remove(plugin_root: &Path, name: &str) -> PluginBrowserResult<String> {
    let root = resolve_root(plugin_root)?;
    let current = resolve_folder(&root, name)?;
    let original = root.join(&current);

    let trash = staging_dir(&root, "remove")?;
    let detached = trash.path().join(&current);
    std::fs::rename(&original, &detached).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => PluginBrowserError::NotFound {
            folder: current.clone(),
        },
        _ => PluginBrowserError::directory(&original, e),
    })?;

    let failed = remove_tree(&detached);
    if failed.is_empty() {
        info!(folder = %current, "Removed plugin folder");
        return Ok(current);
    }

    Err(restore_remainder(&detached, &original, &failed))
}

/// Move a partially deleted tree back to `original` and describe what is
/// left, with `failed` rewritten to point under `original`.
fn restore_remainder(detached: &Path, original: &Path, failed: &[PathBuf]) -> PluginBrowserError {
    let failed: Vec<PathBuf> = failed
        .iter()
        .map(|p| p.strip_prefix(detached).map_or_else(|_| p.clone(), |rel| original.join(rel)))
        .collect();

    let message = match std::fs::rename(detached, original) {
        Ok(()) => "folder was only partially removed".to_string(),
        Err(e) => {
            warn!(path = %original.display(), error = %e, "Could not restore partially removed plugin folder");
            format!(
                "folder was only partially removed and the remainder could not be restored from {}",
                detached.display()
            )
        },
    };

    PluginBrowserError::DirectoryAccess {
        path: original.to_path_buf(),
        message,
        failed,
    }
}

/// Recursively delete `path`, continuing past failures.
///
/// Returns every path that could not be removed. A directory is only
/// reported itself when all of its children were removed.
fn remove_tree(path: &Path) -> Vec<PathBuf> {
    let mut failed = Vec::new();

    let is_real_dir = path
        .symlink_metadata()
        .map(|m| m.file_type().is_dir())
        .unwrap_or(false);

    if !is_real_dir {
        if let Err(e) = std::fs::remove_file(path) {
            warn!(path = %path.display(), error = %e, "Failed to remove file");
            failed.push(path.to_path_buf());
        }
        return failed;
    }

    match std::fs::read_dir(path) {
        Ok(entries) => {
            for entry in entries {
                match entry {
                    Ok(entry) => failed.extend(remove_tree(&entry.path())),
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "Failed to read directory entry");
                        failed.push(path.to_path_buf());
                    },
                }
            }
        },
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to list directory");
            failed.push(path.to_path_buf());
            return failed;
        },
    }

    if failed.is_empty()
        && let Err(e) = std::fs::remove_dir(path)
    {
        warn!(path = %path.display(), error = %e, "Failed to remove directory");
        failed.push(path.to_path_buf());
    }
    failed
}

fn describe(path: &Path) -> PluginBrowserResult<InstalledPlugin> {
    InstalledPlugin::from_dir(path)
        .ok_or_else(|| PluginBrowserError::directory(path, "folder name is not valid UTF-8"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root_with(folders: &[&str]) -> (tempfile::TempDir, PathBuf) {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("plugins");
        std::fs::create_dir(&root).unwrap();
        for folder in folders {
            std::fs::create_dir(root.join(folder)).unwrap();
            std::fs::write(root.join(folder).join("load.py"), "x").unwrap();
        }
        (tmp, root)
    }

    fn names(dir: &Path) -> Vec<String> {
        let mut out: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        out.sort();
        out
    }

    #[test]
    fn disable_then_enable() {
        let (_tmp, root) = root_with(&["foo"]);

        let change = set_enabled(&root, "foo", false).unwrap();
        assert!(change.changed);
        assert_eq!(change.plugin.folder_name, "foo.disabled");
        assert!(!change.plugin.enabled);
        assert_eq!(names(&root), vec!["foo.disabled"]);

        let change = set_enabled(&root, "foo.disabled", true).unwrap();
        assert!(change.changed);
        assert_eq!(names(&root), vec!["foo"]);
        assert!(root.join("foo").join("load.py").is_file());
    }

    #[test]
    fn enabling_twice_is_a_no_op() {
        let (_tmp, root) = root_with(&["foo"]);

        let first = set_enabled(&root, "foo", true).unwrap();
        let second = set_enabled(&root, "foo", true).unwrap();
        assert!(!first.changed);
        assert!(!second.changed);
        assert_eq!(second.plugin.folder_name, "foo");
        assert_eq!(names(&root), vec!["foo"]);
    }

    #[test]
    fn base_name_resolves_to_disabled_folder() {
        let (_tmp, root) = root_with(&["foo.disabled"]);
        let change = set_enabled(&root, "foo", true).unwrap();
        assert!(change.changed);
        assert_eq!(names(&root), vec!["foo"]);
    }

    #[test]
    fn literal_name_wins_over_variant() {
        let (_tmp, root) = root_with(&["foo", "foo.disabled"]);
        assert_eq!(resolve_folder(&root, "foo").unwrap(), "foo");
        assert_eq!(resolve_folder(&root, "foo.disabled").unwrap(), "foo.disabled");
    }

    #[test]
    fn conflicting_target_is_rejected() {
        let (_tmp, root) = root_with(&["foo", "foo.disabled"]);
        let err = set_enabled(&root, "foo", false).unwrap_err();
        assert!(matches!(err, PluginBrowserError::Conflict { .. }));
        assert_eq!(names(&root), vec!["foo", "foo.disabled"]);
    }

    #[test]
    fn missing_folder_is_not_found() {
        let (_tmp, root) = root_with(&["other"]);
        let err = set_enabled(&root, "foo", false).unwrap_err();
        assert!(matches!(err, PluginBrowserError::NotFound { .. }));
    }

    #[test]
    fn traversal_names_are_rejected() {
        let (_tmp, root) = root_with(&[]);
        let err = remove(&root, "../plugins").unwrap_err();
        assert!(matches!(err, PluginBrowserError::InvalidFolderName { .. }));
    }

    #[test]
    fn remove_deletes_tree_and_leaves_no_staging() {
        let (tmp, root) = root_with(&["foo", "bar"]);
        std::fs::create_dir_all(root.join("foo").join("nested").join("deeper")).unwrap();
        std::fs::write(root.join("foo").join("nested").join("deeper").join("x.txt"), "x").unwrap();

        let removed = remove(&root, "foo").unwrap();
        assert_eq!(removed, "foo");
        assert_eq!(names(&root), vec!["bar"]);
        assert_eq!(names(tmp.path()), vec!["plugins"]);
    }

    #[test]
    fn remove_by_base_name_finds_disabled_folder() {
        let (_tmp, root) = root_with(&["foo.disabled"]);
        assert_eq!(remove(&root, "foo").unwrap(), "foo.disabled");
        assert!(names(&root).is_empty());
    }

    #[test]
    fn remove_missing_is_not_found_and_touches_nothing() {
        let (_tmp, root) = root_with(&["bar"]);
        let err = remove(&root, "foo").unwrap_err();
        assert!(matches!(err, PluginBrowserError::NotFound { .. }));
        assert_eq!(names(&root), vec!["bar"]);
    }

    #[cfg(unix)]
    #[test]
    fn remove_does_not_follow_symlinks() {
        let (tmp, root) = root_with(&["foo"]);
        let outside = tmp.path().join("outside");
        std::fs::create_dir(&outside).unwrap();
        std::fs::write(outside.join("precious.txt"), "keep").unwrap();
        std::os::unix::fs::symlink(&outside, root.join("foo").join("link")).unwrap();

        remove(&root, "foo").unwrap();
        assert!(outside.join("precious.txt").is_file());
    }

    #[test]
    fn missing_root_is_directory_error() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("plugins");

        let err = set_enabled(&root, "foo", false).unwrap_err();
        assert!(matches!(err, PluginBrowserError::DirectoryAccess { .. }));
        let err = remove(&root, "foo").unwrap_err();
        assert!(matches!(err, PluginBrowserError::DirectoryAccess { .. }));
    }

    #[test]
    fn partial_remove_restores_remainder_under_original_name() {
        let (tmp, root) = root_with(&[]);
        let trash = staging_dir(&root, "remove").unwrap();
        let detached = trash.path().join("foo");
        std::fs::create_dir_all(detached.join("locked")).unwrap();
        std::fs::write(detached.join("locked").join("keep.txt"), "x").unwrap();

        let err = restore_remainder(
            &detached,
            &root.join("foo"),
            &[detached.join("locked").join("keep.txt")],
        );
        drop(trash);

        match err {
            PluginBrowserError::DirectoryAccess { path, failed, .. } => {
                assert_eq!(path, root.join("foo"));
                assert_eq!(failed, vec![root.join("foo").join("locked").join("keep.txt")]);
            },
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(names(&root), vec!["foo"]);
        assert!(root.join("foo").join("locked").join("keep.txt").is_file());
        assert_eq!(names(tmp.path()), vec!["plugins"]);
    }

    #[cfg(unix)]
    #[test]
    fn undeletable_subtree_is_reported_and_put_back() {
        use std::os::unix::fs::PermissionsExt;

        let (tmp, root) = root_with(&["foo"]);
        let root = root.canonicalize().unwrap();
        let locked = root.join("foo").join("locked");
        std::fs::create_dir(&locked).unwrap();
        std::fs::write(locked.join("keep.txt"), "x").unwrap();
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o555)).unwrap();

        // Privileged users ignore directory permissions; nothing to observe then.
        if std::fs::write(locked.join("canary"), "x").is_ok() {
            std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let err = remove(&root, "foo").unwrap_err();
        std::fs::set_permissions(
            root.join("foo").join("locked"),
            std::fs::Permissions::from_mode(0o755),
        )
        .unwrap();

        match err {
            PluginBrowserError::DirectoryAccess { failed, .. } => {
                assert_eq!(failed, vec![root.join("foo").join("locked").join("keep.txt")]);
            },
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(names(&root), vec!["foo"]);
        assert!(root.join("foo").join("locked").join("keep.txt").is_file());
        assert_eq!(names(tmp.path()), vec!["plugins"]);
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_root_is_managed_in_place() {
        let (tmp, real) = root_with(&["foo"]);
        let link = tmp.path().join("plugins-link");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        set_enabled(&link, "foo", false).unwrap();
        assert_eq!(names(&real), vec!["foo.disabled"]);
        remove(&link, "foo").unwrap();
        assert!(names(&real).is_empty());
        assert_eq!(names(tmp.path()), vec!["plugins", "plugins-link"]);
    }
}
