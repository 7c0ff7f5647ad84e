//! Prelude module - commonly used types for convenient import.
//!
//! Use `use plugin_browser_events::prelude::*;` to import all essential types.

// Status bus
pub use crate::{DEFAULT_CHANNEL_CAPACITY, StatusBus, StatusReceiver};

// Events
pub use crate::{RESTART_REQUIRED_MESSAGE, StatusEvent, StatusLevel};

// Sinks
pub use crate::{NullSink, StatusSink};
