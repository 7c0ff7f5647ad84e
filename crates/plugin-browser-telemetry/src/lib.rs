//! Plugin Browser Telemetry - Logging setup for the plugin browser.
//!
//! Library crates only emit `tracing` events; the binary installs a
//! subscriber once at startup with [`setup_logging`].
//!
//! # Example
//!
//! ```rust,no_run
//! use plugin_browser_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), plugin_browser_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Compact)
//!     .with_directive("plugin_browser_core=debug");
//!
//! setup_logging(&config)?;
//! tracing::info!("logging ready");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{LogConfig, LogFormat, LogTarget, setup_default_logging, setup_logging};
