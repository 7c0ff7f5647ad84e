//! One CLI invocation's browser plus the task that prints its status events.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use plugin_browser_config::{ResolvedConfig, SettingsFile};
use plugin_browser_core::{
    HttpTransport, InMemorySettings, PluginBrowser, SettingsStore, validate_manifest_url,
};
use plugin_browser_events::{StatusBus, StatusReceiver};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::config_bridge::{FileSettings, to_browser_options};
use crate::theme::Theme;

/// Per-run overrides from global flags.
#[derive(Debug, Clone, Default)]
pub(crate) struct Overrides {
    /// Replaces the configured plugin directory.
    pub(crate) plugin_dir: Option<PathBuf>,
    /// Replaces the stored manifest URL for this run only.
    pub(crate) manifest_url: Option<String>,
}

/// A [`PluginBrowser`] whose status events are printed to stderr.
pub(crate) struct Session {
    browser: PluginBrowser,
    bus: StatusBus,
    printer: JoinHandle<()>,
}

impl Session {
    /// Build the browser for `resolved`, applying `overrides`.
    pub(crate) fn open(resolved: &ResolvedConfig, overrides: &Overrides) -> Result<Self> {
        let config = &resolved.config;

        let plugin_root = match &overrides.plugin_dir {
            Some(dir) => dir.clone(),
            None => config
                .plugins
                .resolved_root()
                .context("cannot determine the plugin directory; pass --plugin-dir")?,
        };

        let settings: Arc<dyn SettingsStore> = match &overrides.manifest_url {
            Some(url) => {
                validate_manifest_url(url)?;
                Arc::new(InMemorySettings::new(url.trim()))
            },
            None => Arc::new(FileSettings::new(SettingsFile::from_resolved(resolved))),
        };

        let transport = HttpTransport::new(Duration::from_secs(config.manifest.timeout_secs))
            .context("failed to create HTTP client")?;

        debug!(plugin_root = %plugin_root.display(), "opening plugin browser");

        let bus = StatusBus::new();
        let printer = tokio::spawn(print_status(bus.subscribe()));
        let browser = PluginBrowser::new(
            to_browser_options(config, plugin_root),
            Arc::new(transport),
            settings,
            Arc::new(bus.clone()),
        );

        Ok(Self { browser, bus, printer })
    }

    pub(crate) fn browser(&self) -> &PluginBrowser {
        &self.browser
    }

    /// Drop the browser and wait until every status event has been printed.
    pub(crate) async fn close(self) {
        let Self { browser, bus, printer } = self;
        drop(browser);
        drop(bus);
        if let Err(e) = printer.await {
            debug!(error = %e, "status printer ended abnormally");
        }
    }
}

async fn print_status(mut receiver: StatusReceiver) {
    while let Some(event) = receiver.recv().await {
        eprintln!("{}", Theme::status(&event));
    }
}
