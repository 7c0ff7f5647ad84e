//! Configuration struct definitions.
//!
//! Every section is `#[serde(default)]`, so a user file only needs the keys
//! it wants to change.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Default manifest location.
pub const DEFAULT_MANIFEST_URL: &str =
    "https://raw.githubusercontent.com/ZaviiNet/edmc_plugins/main/plugin_manifest.json";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where the catalog comes from and how it is fetched.
    pub manifest: ManifestSection,
    /// The plugin directory and install limits.
    pub plugins: PluginsSection,
    /// Logging and tracing.
    pub logging: LoggingSection,
}

// ---------------------------------------------------------------------------
// ManifestSection
// ---------------------------------------------------------------------------

/// Remote catalog settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestSection {
    /// Manifest URL (`http`/`https`).
    pub url: String,
    /// Per-request timeout in seconds, used for manifest and archive
    /// downloads alike.
    pub timeout_secs: u64,
    /// Maximum manifest response size in bytes.
    pub max_manifest_bytes: u64,
}

impl Default for ManifestSection {
    fn default() -> Self {
        Self {
            url: DEFAULT_MANIFEST_URL.to_owned(),
            timeout_secs: 15,
            max_manifest_bytes: 5 * 1024 * 1024,
        }
    }
}

// ---------------------------------------------------------------------------
// PluginsSection
// ---------------------------------------------------------------------------

/// Plugin directory and install limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginsSection {
    /// The host application's plugin directory. When unset, the host's
    /// standard per-user location is used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
    /// Maximum archive download size in bytes.
    pub max_download_bytes: u64,
    /// Maximum number of entries in a plugin archive.
    pub max_archive_entries: usize,
    /// Maximum total uncompressed size of a plugin archive.
    pub max_extracted_bytes: u64,
}

impl Default for PluginsSection {
    fn default() -> Self {
        Self {
            root: None,
            max_download_bytes: 100 * 1024 * 1024,
            max_archive_entries: 10_000,
            max_extracted_bytes: 500_000_000,
        }
    }
}

impl PluginsSection {
    /// The configured plugin directory, or the host's default one.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoHomeDir`] if no root is configured and the
    /// platform data directory cannot be determined.
    pub fn resolved_root(&self) -> ConfigResult<PathBuf> {
        if let Some(root) = &self.root {
            return Ok(root.clone());
        }
        default_plugin_root().ok_or(ConfigError::NoHomeDir)
    }
}

/// The host application's standard plugin directory for this user.
///
/// `~/.local/share/EDMarketConnector/plugins` on Linux,
/// `%LOCALAPPDATA%\EDMarketConnector\plugins` on Windows and
/// `~/Library/Application Support/EDMarketConnector/plugins` on macOS.
#[must_use]
pub fn default_plugin_root() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.data_local_dir().join("EDMarketConnector").join("plugins"))
}

// ---------------------------------------------------------------------------
// LoggingSection
// ---------------------------------------------------------------------------

/// Logging and tracing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Global log level filter (`"trace"`, `"debug"`, `"info"`, `"warn"`,
    /// `"error"`).
    pub level: String,
    /// Output format: `"pretty"`, `"compact"` or `"json"`.
    pub format: String,
    /// Per-crate tracing directives (e.g. `["plugin_browser_core=debug"]`).
    pub directives: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
        }
    }
}
