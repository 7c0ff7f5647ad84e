//! The single entry point a presentation layer talks to.
//!
//! [`PluginBrowser`] wires the fetcher, scanner, reconciler, installer and
//! lifecycle functions together and owns the cross-cutting rules:
//!
//! - manifest refreshes and install downloads supersede any in-flight one
//! - two mutations on the same folder never interleave ([`OperationGuard`])
//! - blocking filesystem work runs on the blocking pool
//! - every operation ends with exactly one final status: success (plus the
//!   restart advisory when something changed), a superseded warning, or one
//!   error

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use plugin_browser_events::StatusSink;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::archive::ArchiveLimits;
use crate::error::{PluginBrowserError, PluginBrowserResult};
use crate::guard::OperationGuard;
use crate::install::{DEFAULT_MAX_DOWNLOAD_BYTES, InstallExecutor};
use crate::lifecycle;
use crate::manifest::{AvailablePlugin, DEFAULT_MAX_MANIFEST_BYTES, ManifestFetcher};
use crate::naming::validate_folder_name;
use crate::operation::{Operation, OperationOutcome};
use crate::reconcile::{ReconciledEntry, reconcile};
use crate::scanner::{InstalledPlugin, scan};
use crate::transport::Transport;

/// Default manifest location.
pub const DEFAULT_MANIFEST_URL: &str =
    "https://raw.githubusercontent.com/ZaviiNet/edmc_plugins/main/plugin_manifest.json";

/// Host-owned storage for the manifest URL setting.
pub trait SettingsStore: Send + Sync + fmt::Debug {
    /// The currently configured manifest URL.
    fn manifest_url(&self) -> String;

    /// Persist a new manifest URL.
    ///
    /// # Errors
    ///
    /// Returns [`PluginBrowserError::Settings`] if the value cannot be saved.
    fn set_manifest_url(&self, url: &str) -> PluginBrowserResult<()>;
}

/// A [`SettingsStore`] that lives only as long as the process.
#[derive(Debug)]
pub struct InMemorySettings {
    url: RwLock<String>,
}

impl InMemorySettings {
    /// Start with `url` as the manifest URL.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: RwLock::new(url.into()),
        }
    }
}

impl Default for InMemorySettings {
    fn default() -> Self {
        Self::new(DEFAULT_MANIFEST_URL)
    }
}

impl SettingsStore for InMemorySettings {
    fn manifest_url(&self) -> String {
        self.url.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn set_manifest_url(&self, url: &str) -> PluginBrowserResult<()> {
        *self.url.write().unwrap_or_else(PoisonError::into_inner) = url.to_string();
        Ok(())
    }
}

/// Check that `url` is an absolute `http`/`https` URL.
///
/// # Errors
///
/// Returns [`PluginBrowserError::Settings`] describing the problem.
pub fn validate_manifest_url(url: &str) -> PluginBrowserResult<()> {
    let parsed = url::Url::parse(url.trim()).map_err(|e| PluginBrowserError::Settings {
        message: format!("invalid manifest URL '{url}': {e}"),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(PluginBrowserError::Settings {
            message: format!("manifest URL must use http or https, not '{other}'"),
        }),
    }
}

/// Paths and limits for a [`PluginBrowser`].
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    /// Directory holding one subdirectory per plugin.
    pub plugin_root: PathBuf,
    /// Cap on manifest response size.
    pub max_manifest_bytes: u64,
    /// Cap on archive download size.
    pub max_download_bytes: u64,
    /// Entry and size limits for archive validation.
    pub archive_limits: ArchiveLimits,
}

impl BrowserOptions {
    /// Options with default limits for `plugin_root`.
    #[must_use]
    pub fn new(plugin_root: impl Into<PathBuf>) -> Self {
        Self {
            plugin_root: plugin_root.into(),
            max_manifest_bytes: DEFAULT_MAX_MANIFEST_BYTES,
            max_download_bytes: DEFAULT_MAX_DOWNLOAD_BYTES,
            archive_limits: ArchiveLimits::default(),
        }
    }
}

/// Available and installed plugins joined for display.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogView {
    /// Reconciled rows, sorted for display.
    pub entries: Vec<ReconciledEntry>,
    /// Why the manifest could not be loaded, if it couldn't. Installed
    /// folders are still listed in that case.
    pub manifest_error: Option<String>,
}

/// Orchestrates catalog refreshes and plugin mutations.
#[derive(Debug)]
pub struct PluginBrowser {
    options: BrowserOptions,
    settings: Arc<dyn SettingsStore>,
    status: Arc<dyn StatusSink>,
    fetcher: ManifestFetcher,
    installer: InstallExecutor,
    guard: OperationGuard,
    refresh_slot: Mutex<Option<CancellationToken>>,
    install_slot: Mutex<Option<CancellationToken>>,
}

impl PluginBrowser {
    /// Build a browser over `transport`, reading the manifest URL from
    /// `settings` and reporting to `status`.
    #[must_use]
    pub fn new(
        options: BrowserOptions,
        transport: Arc<dyn Transport>,
        settings: Arc<dyn SettingsStore>,
        status: Arc<dyn StatusSink>,
    ) -> Self {
        let fetcher =
            ManifestFetcher::new(Arc::clone(&transport)).with_max_bytes(options.max_manifest_bytes);
        let installer = InstallExecutor::new(transport, Arc::clone(&status))
            .with_max_download_bytes(options.max_download_bytes)
            .with_archive_limits(options.archive_limits);

        Self {
            options,
            settings,
            status,
            fetcher,
            installer,
            guard: OperationGuard::new(),
            refresh_slot: Mutex::new(None),
            install_slot: Mutex::new(None),
        }
    }

    /// The plugin root this browser manages.
    #[must_use]
    pub fn plugin_root(&self) -> &Path {
        &self.options.plugin_root
    }

    /// The currently configured manifest URL.
    #[must_use]
    pub fn manifest_url(&self) -> String {
        self.settings.manifest_url()
    }

    /// Validate and persist a new manifest URL.
    ///
    /// # Errors
    ///
    /// Returns [`PluginBrowserError::Settings`] if the URL is invalid or
    /// cannot be saved.
    pub fn set_manifest_url(&self, url: &str) -> PluginBrowserResult<()> {
        let result = validate_manifest_url(url).and_then(|()| self.settings.set_manifest_url(url.trim()));
        match &result {
            Ok(()) => self.status.info("Manifest URL updated. Refresh to load the new catalog."),
            Err(e) => self.status.error(&e.to_string()),
        }
        result
    }

    /// Fetch the catalog from the configured URL.
    ///
    /// Cancels any refresh still in flight; that one resolves to
    /// [`PluginBrowserError::Cancelled`].
    ///
    /// # Errors
    ///
    /// See [`ManifestFetcher::fetch`].
    pub async fn refresh_available(&self) -> PluginBrowserResult<Vec<AvailablePlugin>> {
        let cancel = supersede(&self.refresh_slot);
        let url = self.settings.manifest_url();

        self.status.info("Fetching plugin manifest...");
        let result = self.fetcher.fetch_cancellable(&url, &cancel).await;
        match &result {
            Ok(plugins) => self
                .status
                .info(&format!("Loaded {} plugins from manifest", plugins.len())),
            Err(e) => self.report_failure(e),
        }
        result
    }

    /// Scan the plugin root.
    ///
    /// # Errors
    ///
    /// Returns [`PluginBrowserError::DirectoryAccess`] if the root cannot be
    /// listed.
    pub async fn scan_installed(&self) -> PluginBrowserResult<Vec<InstalledPlugin>> {
        let result = self.scan_quietly().await;
        if let Err(e) = &result {
            self.report_failure(e);
        }
        result
    }

    /// Fetch and scan concurrently, then reconcile.
    ///
    /// A manifest failure still yields the installed folders (as
    /// installed-only rows) with the failure recorded in
    /// [`CatalogView::manifest_error`].
    ///
    /// # Errors
    ///
    /// Fails only if the plugin root cannot be scanned.
    pub async fn refresh(&self) -> PluginBrowserResult<CatalogView> {
        let (available, installed) = tokio::join!(self.refresh_available(), self.scan_installed());
        let installed = installed?;

        let (available, manifest_error) = match available {
            Ok(available) => (available, None),
            Err(e) => (Vec::new(), Some(e.to_string())),
        };

        Ok(CatalogView {
            entries: reconcile(&available, &installed),
            manifest_error,
        })
    }

    /// Run one mutation and report its outcome.
    ///
    /// # Errors
    ///
    /// Returns whatever the underlying step failed with; the same error has
    /// already been published to the status sink.
    pub async fn execute(&self, operation: Operation) -> PluginBrowserResult<OperationOutcome> {
        info!(operation = %operation, "Executing plugin operation");
        let result = self.dispatch(operation).await;
        match &result {
            Ok(outcome) => {
                self.status.info(&outcome.summary());
                if outcome.changed() {
                    self.status.restart_required();
                }
            },
            Err(e) => self.report_failure(e),
        }
        result
    }

    async fn dispatch(&self, operation: Operation) -> PluginBrowserResult<OperationOutcome> {
        validate_folder_name(operation.target())?;
        let _token = self.guard.try_acquire(operation.target(), operation.verb())?;
        let root = self.options.plugin_root.clone();
        let enabled = matches!(operation, Operation::Enable(_));

        match operation {
            Operation::Install(plugin) => {
                let installed = self.scan_quietly().await?;
                if let Some(existing) = installed
                    .iter()
                    .find(|p| p.inferred_id.as_deref() == Some(plugin.id.as_str()))
                {
                    return Err(PluginBrowserError::AlreadyInstalled {
                        id: plugin.id.clone(),
                        path: existing.path.clone(),
                    });
                }

                let cancel = supersede(&self.install_slot);
                let plugin = self.installer.install(&plugin, &root, &cancel).await?;
                Ok(OperationOutcome::Installed { plugin })
            },
            Operation::Enable(folder) | Operation::Disable(folder) => {
                let change =
                    tokio::task::spawn_blocking(move || lifecycle::set_enabled(&root, &folder, enabled))
                        .await??;
                Ok(OperationOutcome::Toggled {
                    plugin: change.plugin,
                    changed: change.changed,
                })
            },
            Operation::Remove(folder) => {
                let folder_name = tokio::task::spawn_blocking(move || lifecycle::remove(&root, &folder)).await??;
                Ok(OperationOutcome::Removed { folder_name })
            },
        }
    }

    async fn scan_quietly(&self) -> PluginBrowserResult<Vec<InstalledPlugin>> {
        let root = self.options.plugin_root.clone();
        tokio::task::spawn_blocking(move || scan(&root)).await?
    }

    fn report_failure(&self, error: &PluginBrowserError) {
        if error.is_cancelled() {
            self.status.warning(&error.to_string());
        } else {
            warn!(kind = error.kind(), error = %error, "Plugin operation failed");
            self.status.error(&error.to_string());
        }
    }
}

/// Cancel whatever token `slot` holds and install a fresh one.
fn supersede(slot: &Mutex<Option<CancellationToken>>) -> CancellationToken {
    let mut slot = slot.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(previous) = slot.take() {
        previous.cancel();
    }
    let token = CancellationToken::new();
    *slot = Some(token.clone());
    token
}
