//! CLI theme and styling.

use colored::Colorize;
use plugin_browser_core::ReconciledEntry;
use plugin_browser_events::{StatusEvent, StatusLevel};

/// Width of the state column in `list` output.
const BADGE_WIDTH: usize = 9;

/// CLI theme configuration.
pub(crate) struct Theme;

impl Theme {
    /// Format a header.
    pub(crate) fn header(text: &str) -> String {
        format!("{}", text.bold().cyan())
    }

    /// Format a success message.
    pub(crate) fn success(text: &str) -> String {
        format!("{} {}", "✓".green(), text)
    }

    /// Format an error message.
    pub(crate) fn error(text: &str) -> String {
        format!("{} {}", "✗".red(), text.red())
    }

    /// Format a warning message.
    pub(crate) fn warning(text: &str) -> String {
        format!("{} {}", "!".yellow(), text.yellow())
    }

    /// Format an info message.
    pub(crate) fn info(text: &str) -> String {
        format!("{} {}", "i".blue(), text)
    }

    /// Format a dimmed message.
    pub(crate) fn dimmed(text: &str) -> String {
        format!("{}", text.dimmed())
    }

    /// Format a separator line.
    pub(crate) fn separator() -> String {
        "━".repeat(50).dimmed().to_string()
    }

    /// Format a key-value pair.
    pub(crate) fn kv(key: &str, value: &str) -> String {
        format!("{}: {}", key.bold(), value)
    }

    /// Render one status event at its level.
    pub(crate) fn status(event: &StatusEvent) -> String {
        match event.level {
            StatusLevel::Info => Self::info(&event.message),
            StatusLevel::Warning => Self::warning(&event.message),
            StatusLevel::Error => Self::error(&event.message),
        }
    }

    /// Short state badge for a catalog row, right-aligned to a fixed width.
    pub(crate) fn state_badge(entry: &ReconciledEntry) -> String {
        let (label, disabled) = match entry {
            ReconciledEntry::AvailableOnly { .. } => ("available", false),
            ReconciledEntry::InstalledOnly { installed } => ("local", !installed.enabled),
            ReconciledEntry::InstalledAndAvailable {
                installed,
                upgrade_available,
                ..
            } => (
                if *upgrade_available { "upgrade" } else { "installed" },
                !installed.enabled,
            ),
        };
        let padded = format!("{:>BADGE_WIDTH$}", if disabled { "disabled" } else { label });
        match (disabled, label) {
            (true, _) => padded.yellow().to_string(),
            (false, "available") => padded.dimmed().to_string(),
            (false, "local") => padded.magenta().to_string(),
            (false, "upgrade") => padded.cyan().bold().to_string(),
            (false, _) => padded.green().to_string(),
        }
    }

    /// Blank space the width of a state badge.
    pub(crate) fn badge_gap() -> String {
        " ".repeat(BADGE_WIDTH)
    }
}
