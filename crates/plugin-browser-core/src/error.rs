//! Plugin browser error types.

use std::path::{Path, PathBuf};

/// Errors from manifest, scan, install and lifecycle operations.
///
/// Every variant renders as a single human-readable status line.
#[derive(Debug, thiserror::Error)]
pub enum PluginBrowserError {
    /// Transport failure or non-success HTTP status.
    #[error("network error fetching {url}: {message}")]
    Network {
        /// The URL that was requested.
        url: String,
        /// Failure reason.
        message: String,
    },

    /// The manifest is not a list of well-formed plugin records.
    #[error("invalid plugin manifest: {message}")]
    ManifestFormat {
        /// What was wrong with the manifest.
        message: String,
    },

    /// A directory could not be listed, created, renamed or removed.
    #[error("cannot access {}: {message}{}", .path.display(), format_failed(.failed))]
    DirectoryAccess {
        /// The directory the operation was acting on.
        path: PathBuf,
        /// Failure reason.
        message: String,
        /// Files or directories that could not be removed, if any.
        failed: Vec<PathBuf>,
    },

    /// A folder for this plugin already exists under the plugin root.
    #[error("plugin '{id}' is already installed at {}; remove it first", .path.display())]
    AlreadyInstalled {
        /// The manifest id of the plugin.
        id: String,
        /// The existing folder.
        path: PathBuf,
    },

    /// The downloaded file is not a well-formed zip archive.
    #[error("downloaded file is not a valid zip archive: {message}")]
    CorruptArchive {
        /// Why the archive was rejected.
        message: String,
    },

    /// An archive entry would escape the staging directory or is otherwise unsafe.
    #[error("unsafe archive entry '{entry}': {reason}")]
    UnsafeArchive {
        /// The offending entry name (or `<archive>` for whole-archive limits).
        entry: String,
        /// Why the entry was rejected.
        reason: String,
    },

    /// The target name already exists, or another operation holds this folder.
    #[error("conflict on plugin folder '{folder}': {message}")]
    Conflict {
        /// The folder involved.
        folder: String,
        /// Failure reason.
        message: String,
    },

    /// The named plugin folder does not exist.
    #[error("plugin folder '{folder}' not found")]
    NotFound {
        /// The folder name that was looked up.
        folder: String,
    },

    /// An in-flight fetch or download was superseded by a newer request.
    #[error("{0} was superseded by a newer request")]
    Cancelled(String),

    /// A response body exceeded its byte limit.
    #[error("download too large: {size} bytes (limit: {limit} bytes)")]
    DownloadTooLarge {
        /// Bytes received (or announced) so far.
        size: u64,
        /// Maximum allowed size in bytes.
        limit: u64,
    },

    /// A folder name or plugin id is not a single plain path component.
    #[error("invalid plugin folder name '{name}': {reason}")]
    InvalidFolderName {
        /// The rejected name.
        name: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The settings store rejected or failed to persist a value.
    #[error("settings error: {message}")]
    Settings {
        /// Failure reason.
        message: String,
    },

    /// A background task panicked or was aborted.
    #[error("internal error: {0}")]
    Internal(String),
}

impl PluginBrowserError {
    /// Stable snake_case label for structured logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Network { .. } => "network",
            Self::ManifestFormat { .. } => "manifest_format",
            Self::DirectoryAccess { .. } => "directory_access",
            Self::AlreadyInstalled { .. } => "already_installed",
            Self::CorruptArchive { .. } => "corrupt_archive",
            Self::UnsafeArchive { .. } => "unsafe_archive",
            Self::Conflict { .. } => "conflict",
            Self::NotFound { .. } => "not_found",
            Self::Cancelled(_) => "cancelled",
            Self::DownloadTooLarge { .. } => "download_too_large",
            Self::InvalidFolderName { .. } => "invalid_folder_name",
            Self::Settings { .. } => "settings",
            Self::Internal(_) => "internal",
        }
    }

    /// Whether the error means the request was superseded rather than failed.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }

    pub(crate) fn manifest(message: impl Into<String>) -> Self {
        Self::ManifestFormat {
            message: message.into(),
        }
    }

    pub(crate) fn corrupt(message: impl Into<String>) -> Self {
        Self::CorruptArchive {
            message: message.into(),
        }
    }

    pub(crate) fn unsafe_entry(entry: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnsafeArchive {
            entry: entry.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn directory(path: &Path, err: impl std::fmt::Display) -> Self {
        Self::DirectoryAccess {
            path: path.to_path_buf(),
            message: err.to_string(),
            failed: Vec::new(),
        }
    }
}

impl From<tokio::task::JoinError> for PluginBrowserError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Internal(format!("background task failed: {e}"))
    }
}

fn format_failed(failed: &[PathBuf]) -> String {
    if failed.is_empty() {
        return String::new();
    }
    let list: Vec<String> = failed.iter().map(|p| p.display().to_string()).collect();
    format!(" (could not remove: {})", list.join(", "))
}

/// Result type for plugin browser operations.
pub type PluginBrowserResult<T> = Result<T, PluginBrowserError>;
