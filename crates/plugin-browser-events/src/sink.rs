//! The reporting seam between core components and the presentation layer.

use std::fmt;

use crate::event::{StatusEvent, StatusLevel};

/// Destination for status messages.
///
/// Implementations must not block and must not fail: a broken presentation
/// layer can never be allowed to abort an in-progress operation.
pub trait StatusSink: Send + Sync + fmt::Debug {
    /// Publish a fully-formed event.
    fn publish(&self, event: StatusEvent);

    /// Report a message at the given level.
    fn report(&self, level: StatusLevel, message: &str) {
        self.publish(StatusEvent::new(level, message));
    }

    /// Report progress or success.
    fn info(&self, message: &str) {
        self.report(StatusLevel::Info, message);
    }

    /// Report a non-fatal condition.
    fn warning(&self, message: &str) {
        self.report(StatusLevel::Warning, message);
    }

    /// Report a failure.
    fn error(&self, message: &str) {
        self.report(StatusLevel::Error, message);
    }

    /// Emit the restart-required advisory.
    fn restart_required(&self) {
        self.publish(StatusEvent::restart_required());
    }
}

/// A sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl StatusSink for NullSink {
    fn publish(&self, _event: StatusEvent) {}
}
