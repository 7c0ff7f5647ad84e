//! Logging configuration and setup.

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing_subscriber::{
    EnvFilter, Layer, Registry, fmt, fmt::MakeWriter, layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::error::{TelemetryError, TelemetryResult};

/// File name prefix for rolling log files (`plugin-browser.log.2026-10-18`).
const LOG_FILE_PREFIX: &str = "plugin-browser.log";

/// Env var that, when set, replaces the configured level and directives.
const RUST_LOG: &str = "RUST_LOG";

/// Helper to convert init errors to our error type.
fn init_err<E: std::fmt::Display>(e: E) -> TelemetryError {
    TelemetryError::InitError(e.to_string())
}

/// Log format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line, human-readable format.
    Pretty,
    /// Compact single-line format (default).
    #[default]
    Compact,
    /// JSON format for structured logging.
    Json,
}

impl FromStr for LogFormat {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(TelemetryError::ConfigError(format!(
                "unknown log format '{other}'"
            ))),
        }
    }
}

/// Log output target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogTarget {
    /// Log to stderr, keeping stdout free for command output.
    #[default]
    Stderr,
    /// Log to a daily rolling file in this directory.
    File(PathBuf),
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level filter (e.g., "info", "debug", "trace").
    #[serde(default = "default_level")]
    pub level: String,
    /// Log format.
    #[serde(default)]
    pub format: LogFormat,
    /// Log target.
    #[serde(default)]
    pub target: LogTarget,
    /// Whether to include timestamps.
    #[serde(default = "default_true")]
    pub timestamps: bool,
    /// Whether to include file/line info.
    #[serde(default)]
    pub file_info: bool,
    /// Whether to use ANSI colors.
    #[serde(default = "default_true")]
    pub ansi: bool,
    /// Directive overrides (e.g., `plugin_browser_core=debug`).
    #[serde(default)]
    pub directives: Vec<String>,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
            target: LogTarget::default(),
            timestamps: true,
            file_info: false,
            ansi: true,
            directives: Vec::new(),
        }
    }
}

impl LogConfig {
    /// Create a new log config with the specified level.
    #[must_use]
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            ..Default::default()
        }
    }

    /// Build a log config from the `[logging]` section of the user config.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::ConfigError`] if the format is unknown.
    #[cfg(feature = "config")]
    pub fn from_section(section: &plugin_browser_config::LoggingSection) -> TelemetryResult<Self> {
        let mut config = Self::new(section.level.to_ascii_lowercase()).with_format(section.format.parse()?);
        config.directives.clone_from(&section.directives);
        Ok(config)
    }

    /// Set the log format.
    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the log target. File output never uses ANSI colors.
    #[must_use]
    pub fn with_target(mut self, target: LogTarget) -> Self {
        if matches!(target, LogTarget::File(_)) {
            self.ansi = false;
        }
        self.target = target;
        self
    }

    /// Add a directive override.
    #[must_use]
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    /// Disable timestamps.
    #[must_use]
    pub fn without_timestamps(mut self) -> Self {
        self.timestamps = false;
        self
    }

    /// Enable file/line info.
    #[must_use]
    pub fn with_file_info(mut self) -> Self {
        self.file_info = true;
        self
    }

    /// Disable ANSI colors.
    #[must_use]
    pub fn without_ansi(mut self) -> Self {
        self.ansi = false;
        self
    }

    /// Build the env filter from config. A non-empty `RUST_LOG` wins.
    fn build_filter(&self) -> TelemetryResult<EnvFilter> {
        if std::env::var(RUST_LOG).is_ok_and(|v| !v.trim().is_empty()) {
            return EnvFilter::try_from_default_env()
                .map_err(|e| TelemetryError::ConfigError(format!("invalid {RUST_LOG}: {e}")));
        }

        let mut filter = EnvFilter::try_new(&self.level)
            .map_err(|e| TelemetryError::ConfigError(e.to_string()))?;

        for directive in &self.directives {
            filter = filter.add_directive(directive.parse().map_err(
                |e: tracing_subscriber::filter::ParseError| {
                    TelemetryError::ConfigError(e.to_string())
                },
            )?);
        }

        Ok(filter)
    }

    /// Build the formatting layer for `writer`, filtered by this config.
    fn build_layer<W>(&self, writer: W) -> TelemetryResult<Box<dyn Layer<Registry> + Send + Sync>>
    where
        W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
    {
        let filter = self.build_filter()?;
        let base = fmt::layer()
            .with_writer(writer)
            .with_ansi(self.ansi)
            .with_file(self.file_info)
            .with_line_number(self.file_info);

        let layer = match (self.format, self.timestamps) {
            (LogFormat::Json, true) => base.json().with_filter(filter).boxed(),
            (LogFormat::Json, false) => base.json().without_time().with_filter(filter).boxed(),
            (LogFormat::Pretty, true) => base.pretty().with_filter(filter).boxed(),
            (LogFormat::Pretty, false) => base.pretty().without_time().with_filter(filter).boxed(),
            (LogFormat::Compact, true) => base.compact().with_filter(filter).boxed(),
            (LogFormat::Compact, false) => base.compact().without_time().with_filter(filter).boxed(),
        };
        Ok(layer)
    }
}

/// Set up logging with the given configuration.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, the log directory cannot
/// be created, or a global subscriber is already installed.
pub fn setup_logging(config: &LogConfig) -> TelemetryResult<()> {
    let layer = match &config.target {
        LogTarget::Stderr => config.build_layer(std::io::stderr)?,
        LogTarget::File(dir) => {
            std::fs::create_dir_all(dir).map_err(|e| {
                TelemetryError::ConfigError(format!(
                    "failed to create log directory {}: {e}",
                    dir.display()
                ))
            })?;
            config.build_layer(tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX))?
        },
    };

    tracing_subscriber::registry()
        .with(layer)
        .try_init()
        .map_err(init_err)
}

/// Set up default logging (info level, stderr, compact format).
///
/// # Errors
///
/// Returns an error if logging cannot be initialized.
pub fn setup_default_logging() -> TelemetryResult<()> {
    setup_logging(&LogConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_config_default() {
        let config = LogConfig::default();
        assert_eq!(config.level, "info");
        assert_eq!(config.format, LogFormat::Compact);
        assert_eq!(config.target, LogTarget::Stderr);
        assert!(config.timestamps);
        assert!(config.ansi);
    }

    #[test]
    fn test_log_config_builder() {
        let config = LogConfig::new("debug")
            .with_format(LogFormat::Json)
            .without_timestamps()
            .with_file_info()
            .with_directive("plugin_browser_core=trace");

        assert_eq!(config.level, "debug");
        assert_eq!(config.format, LogFormat::Json);
        assert!(!config.timestamps);
        assert!(config.file_info);
        assert_eq!(config.directives, vec!["plugin_browser_core=trace"]);
    }

    #[test]
    fn test_file_target_disables_ansi() {
        let config = LogConfig::new("info").with_target(LogTarget::File(PathBuf::from("logs")));
        assert!(!config.ansi);
    }

    #[test]
    fn test_log_format_from_str() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_log_config_serialization() {
        let config = LogConfig::new("warn").with_format(LogFormat::Json);

        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"level\":\"warn\""));
        assert!(json.contains("\"format\":\"json\""));

        let parsed: LogConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.format, LogFormat::Json);
    }

    #[test]
    fn test_build_filter_invalid() {
        if std::env::var(RUST_LOG).is_ok() {
            return;
        }
        let config = LogConfig::new("debug").with_directive("[invalid=syntax");
        assert!(config.build_filter().is_err());
    }

    #[test]
    fn test_setup_logging_creates_log_directory() {
        let dir = tempfile::tempdir().unwrap();
        let log_dir = dir.path().join("logs");
        let config = LogConfig::new("debug").with_target(LogTarget::File(log_dir.clone()));

        setup_logging(&config).unwrap();
        tracing::info!("written to the rolling file");

        assert!(log_dir.is_dir());
    }
}
