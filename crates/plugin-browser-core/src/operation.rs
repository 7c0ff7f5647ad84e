//! User-selected actions and their results.

use std::fmt;

use serde::Serialize;

use crate::manifest::AvailablePlugin;
use crate::scanner::InstalledPlugin;

/// One mutation requested by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Install a catalog entry.
    Install(AvailablePlugin),
    /// Enable the named folder.
    Enable(String),
    /// Disable the named folder.
    Disable(String),
    /// Delete the named folder.
    Remove(String),
}

impl Operation {
    /// Short verb used in logs and conflict messages.
    #[must_use]
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Install(_) => "install",
            Self::Enable(_) => "enable",
            Self::Disable(_) => "disable",
            Self::Remove(_) => "remove",
        }
    }

    /// The folder name (or plugin id, for installs) the operation targets.
    #[must_use]
    pub fn target(&self) -> &str {
        match self {
            Self::Install(plugin) => &plugin.id,
            Self::Enable(folder) | Self::Disable(folder) | Self::Remove(folder) => folder,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.verb(), self.target())
    }
}

/// What a successful [`Operation`] did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum OperationOutcome {
    /// A new folder was installed.
    Installed {
        /// The new folder.
        plugin: InstalledPlugin,
    },
    /// A folder was enabled or disabled.
    Toggled {
        /// The folder after the call.
        plugin: InstalledPlugin,
        /// `false` when it was already in the requested state.
        changed: bool,
    },
    /// A folder was deleted.
    Removed {
        /// The folder name that was deleted.
        folder_name: String,
    },
}

impl OperationOutcome {
    /// Whether anything on disk changed (and so a restart is needed).
    #[must_use]
    pub fn changed(&self) -> bool {
        match self {
            Self::Installed { .. } | Self::Removed { .. } => true,
            Self::Toggled { changed, .. } => *changed,
        }
    }

    /// One-line success message for the status channel.
    #[must_use]
    pub fn summary(&self) -> String {
        match self {
            Self::Installed { plugin } => format!("Installed {}", plugin.folder_name),
            Self::Toggled { plugin, changed: true } if plugin.enabled => {
                format!("Enabled {}", plugin.base_name())
            },
            Self::Toggled { plugin, changed: true } => format!("Disabled {}", plugin.base_name()),
            Self::Toggled { plugin, changed: false } => format!(
                "{} is already {}",
                plugin.base_name(),
                if plugin.enabled { "enabled" } else { "disabled" }
            ),
            Self::Removed { folder_name } => format!("Removed {folder_name}"),
        }
    }
}
