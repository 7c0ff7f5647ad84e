//! Plugin catalog browsing and lifecycle management.
//!
//! Manages a directory of host-application plugins against a remote JSON
//! catalog:
//!
//! - [`ManifestFetcher`]: downloads and validates the catalog into [`AvailablePlugin`]s
//! - [`scan`]: lists plugin folders under the plugin root as [`InstalledPlugin`]s
//! - [`reconcile`]: joins the two into display rows ([`ReconciledEntry`])
//! - [`InstallExecutor`]: downloads, validates, stages and atomically commits a zip
//! - [`lifecycle`]: enables, disables and removes folders by literal name
//! - [`PluginBrowser`]: the orchestrator a UI talks to
//!
//! # State Model
//!
//! The directory listing is the only source of truth. A plugin is disabled
//! when its folder ends in `.disabled`; nothing else records that. Every
//! operation rescans or re-resolves at call time, so edits made by the
//! host or the user's file manager between a scan and a click are always
//! noticed.
//!
//! # Atomicity
//!
//! Installs extract into a staging directory beside the plugin root and
//! appear with a single `rename`. Removes detach the folder with a single
//! `rename` before deleting it. Either way, a failed operation leaves the
//! plugin root as it found it.
//!
//! Changes only take effect after the host application restarts; the crate
//! reports that as a status advisory and never tries to reload anything.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod archive;
pub mod browser;
pub mod error;
pub mod guard;
pub mod install;
pub mod lifecycle;
pub mod manifest;
pub mod naming;
pub mod operation;
pub mod receipt;
pub mod reconcile;
pub mod scanner;
mod staging;
pub mod transport;

pub use archive::{ArchiveLimits, PluginArchive};
pub use browser::{
    BrowserOptions, CatalogView, DEFAULT_MANIFEST_URL, InMemorySettings, PluginBrowser, SettingsStore,
    validate_manifest_url,
};
pub use error::{PluginBrowserError, PluginBrowserResult};
pub use guard::{GuardToken, OperationGuard};
pub use install::{DEFAULT_MAX_DOWNLOAD_BYTES, InstallExecutor};
pub use lifecycle::{EnabledChange, remove, resolve_folder, set_enabled};
pub use manifest::{AvailablePlugin, DEFAULT_MAX_MANIFEST_BYTES, ManifestFetcher, parse_manifest};
pub use naming::DISABLED_SUFFIX;
pub use operation::{Operation, OperationOutcome};
pub use receipt::{InstallReceipt, RECEIPT_FILE_NAME};
pub use reconcile::{ReconciledEntry, compare_versions, reconcile};
pub use scanner::{InstalledPlugin, scan};
pub use staging::STAGING_PREFIX;
#[cfg(feature = "http")]
pub use transport::HttpTransport;
pub use transport::{DEFAULT_TIMEOUT_SECS, MemoryTransport, Transport};
