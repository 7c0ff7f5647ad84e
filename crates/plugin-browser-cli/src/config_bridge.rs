//! Bridge from `plugin_browser_config` types to the core and telemetry crates.

use std::path::PathBuf;

use plugin_browser_config::{Config, SettingsFile};
use plugin_browser_core::{
    ArchiveLimits, BrowserOptions, PluginBrowserError, PluginBrowserResult, SettingsStore,
};
use plugin_browser_telemetry::{LogConfig, LogFormat};

/// [`SettingsStore`] backed by the user config file.
#[derive(Debug)]
pub(crate) struct FileSettings(SettingsFile);

impl FileSettings {
    pub(crate) fn new(file: SettingsFile) -> Self {
        Self(file)
    }
}

impl SettingsStore for FileSettings {
    fn manifest_url(&self) -> String {
        self.0.manifest_url()
    }

    fn set_manifest_url(&self, url: &str) -> PluginBrowserResult<()> {
        self.0
            .set_manifest_url(url)
            .map_err(|e| PluginBrowserError::Settings {
                message: e.to_string(),
            })
    }
}

/// Core options for `plugin_root` with the configured limits.
pub(crate) fn to_browser_options(config: &Config, plugin_root: PathBuf) -> BrowserOptions {
    let mut options = BrowserOptions::new(plugin_root);
    options.max_manifest_bytes = config.manifest.max_manifest_bytes;
    options.max_download_bytes = config.plugins.max_download_bytes;
    options.archive_limits = ArchiveLimits {
        max_entries: config.plugins.max_archive_entries,
        max_extracted_bytes: config.plugins.max_extracted_bytes,
    };
    options
}

/// Logging setup for the `[logging]` section; `verbose` forces `debug`.
pub(crate) fn to_log_config(config: Option<&Config>, verbose: bool) -> LogConfig {
    let mut log_config = config
        .and_then(|c| LogConfig::from_section(&c.logging).ok())
        .unwrap_or_else(|| LogConfig::new("info").with_format(LogFormat::Compact));
    if verbose {
        "debug".clone_into(&mut log_config.level);
    }
    log_config
}
