//! Status event types.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Text of the advisory emitted after every successful mutation.
pub const RESTART_REQUIRED_MESSAGE: &str =
    "Restart the host application for plugin changes to take effect.";

/// Severity of a status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusLevel {
    /// Progress or success.
    Info,
    /// Something the user should notice but that did not fail.
    Warning,
    /// An operation failed.
    Error,
}

impl fmt::Display for StatusLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => f.write_str("info"),
            Self::Warning => f.write_str("warning"),
            Self::Error => f.write_str("error"),
        }
    }
}

/// A single status message published on the bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    /// Unique event identifier.
    pub id: Uuid,
    /// Severity.
    pub level: StatusLevel,
    /// Human-readable message.
    pub message: String,
    /// When the event was created.
    pub timestamp: DateTime<Utc>,
    /// Set on the advisory that follows a successful mutation.
    #[serde(default)]
    pub restart_required: bool,
}

impl StatusEvent {
    /// Create a new event stamped with the current time.
    #[must_use]
    pub fn new(level: StatusLevel, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            level,
            message: message.into(),
            timestamp: Utc::now(),
            restart_required: false,
        }
    }

    /// The advisory published after a successful install, remove, enable or disable.
    #[must_use]
    pub fn restart_required() -> Self {
        Self {
            restart_required: true,
            ..Self::new(StatusLevel::Warning, RESTART_REQUIRED_MESSAGE)
        }
    }

    /// Whether this event reports a failure.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.level == StatusLevel::Error
    }
}

impl fmt::Display for StatusEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.level, self.message)
    }
}
