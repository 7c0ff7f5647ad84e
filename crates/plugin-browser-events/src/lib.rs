//! Plugin Browser Events - status reporting for the plugin lifecycle engine.
//!
//! This crate provides:
//! - [`StatusEvent`] and [`StatusLevel`], the unit of progress/status reporting
//! - [`StatusSink`], the trait every core component reports through
//! - [`StatusBus`], a broadcast-based sink with any number of readers
//!
//! # Architecture
//!
//! The core publishes to a `StatusBus`; whatever presentation layer is in use
//! (settings tab, CLI, test harness) calls `bus.subscribe()` and renders the
//! events it receives. Publishing never blocks and never fails: a slow or
//! vanished reader only loses its own events.
//!
//! # Example
//!
//! ```rust
//! use plugin_browser_events::{StatusBus, StatusLevel, StatusSink};
//!
//! # async fn example() {
//! let bus = StatusBus::new();
//! let mut receiver = bus.subscribe();
//!
//! bus.info("Fetching plugin manifest...");
//!
//! let event = receiver.recv().await.unwrap();
//! assert_eq!(event.level, StatusLevel::Info);
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod bus;
mod event;
mod sink;

pub use bus::{DEFAULT_CHANNEL_CAPACITY, StatusBus, StatusReceiver};
pub use event::{RESTART_REQUIRED_MESSAGE, StatusEvent, StatusLevel};
pub use sink::{NullSink, StatusSink};
