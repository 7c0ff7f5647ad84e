//! Install receipt written into every folder this engine installs.
//!
//! The receipt lets a later scan tell which manifest entry (and version)
//! produced a folder even if the user renamed it. It is advisory: a missing
//! or unreadable receipt only means the scanner falls back to the folder
//! name.

use std::io::{Read, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::manifest::AvailablePlugin;

/// File name of the receipt inside a plugin folder.
pub const RECEIPT_FILE_NAME: &str = ".plugin-browser.json";

/// Receipts larger than this are ignored.
const MAX_RECEIPT_SIZE: u64 = 64 * 1024;

/// Record of which catalog entry produced an installed folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallReceipt {
    /// Manifest id at install time.
    pub id: String,
    /// Manifest version at install time.
    pub version: String,
    /// Where the archive came from.
    pub download_url: String,
    /// When the install completed staging.
    pub installed_at: DateTime<Utc>,
}

impl InstallReceipt {
    /// Build a receipt for `plugin`, stamped now.
    #[must_use]
    pub fn for_plugin(plugin: &AvailablePlugin) -> Self {
        Self {
            id: plugin.id.clone(),
            version: plugin.version.clone(),
            download_url: plugin.download_url.clone(),
            installed_at: Utc::now(),
        }
    }

    /// Read the receipt from `plugin_dir`, if there is a valid one.
    #[must_use]
    pub fn read(plugin_dir: &Path) -> Option<Self> {
        let path = plugin_dir.join(RECEIPT_FILE_NAME);
        let file = std::fs::File::open(&path).ok()?;
        let mut content = String::new();
        file.take(MAX_RECEIPT_SIZE.saturating_add(1))
            .read_to_string(&mut content)
            .ok()?;
        if u64::try_from(content.len()).unwrap_or(u64::MAX) > MAX_RECEIPT_SIZE {
            debug!(path = %path.display(), "Ignoring oversized install receipt");
            return None;
        }
        match serde_json::from_str(&content) {
            Ok(receipt) => Some(receipt),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Ignoring malformed install receipt");
                None
            },
        }
    }

    /// Write the receipt into `plugin_dir`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be created or written.
    pub fn write(&self, plugin_dir: &Path) -> std::io::Result<()> {
        let body = serde_json::to_vec_pretty(self).map_err(std::io::Error::other)?;
        let mut file = std::fs::File::create(plugin_dir.join(RECEIPT_FILE_NAME))?;
        file.write_all(&body)?;
        file.sync_all()
    }
}
