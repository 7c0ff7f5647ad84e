//! Status bus for broadcasting status events to readers.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{error, info, trace, warn};

use crate::event::{StatusEvent, StatusLevel};
use crate::sink::StatusSink;

/// Default channel capacity for the status bus.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Broadcast channel carrying [`StatusEvent`]s from the core to any number
/// of readers.
///
/// Events are delivered to each receiver in publish order. A receiver that
/// falls more than `capacity` events behind loses the oldest ones; the
/// publisher is never slowed down by it.
///
/// Every published event is also mirrored to `tracing` at the matching level.
#[derive(Debug)]
pub struct StatusBus {
    /// Sender for broadcasting events.
    sender: broadcast::Sender<Arc<StatusEvent>>,
    /// Channel capacity.
    capacity: usize,
}

impl StatusBus {
    /// Create a new status bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new status bus with specified capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender, capacity }
    }

    /// Publish an event to all receivers.
    ///
    /// Returns the number of receivers that got the event.
    pub fn send(&self, event: StatusEvent) -> usize {
        match event.level {
            StatusLevel::Info => info!(target: "plugin_browser::status", "{}", event.message),
            StatusLevel::Warning => warn!(target: "plugin_browser::status", "{}", event.message),
            StatusLevel::Error => error!(target: "plugin_browser::status", "{}", event.message),
        }

        if let Ok(count) = self.sender.send(Arc::new(event)) {
            count
        } else {
            // No receivers - this is fine
            trace!("No receivers for status event");
            0
        }
    }

    /// Subscribe to status events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> StatusReceiver {
        StatusReceiver {
            receiver: self.sender.subscribe(),
        }
    }

    /// Get the current number of receivers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Get the channel capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for StatusBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for StatusBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            capacity: self.capacity,
        }
    }
}

impl StatusSink for StatusBus {
    fn publish(&self, event: StatusEvent) {
        self.send(event);
    }
}

/// Receiver for events from the status bus.
#[derive(Debug)]
pub struct StatusReceiver {
    receiver: broadcast::Receiver<Arc<StatusEvent>>,
}

impl StatusReceiver {
    /// Receive the next event.
    ///
    /// Returns `None` once every [`StatusBus`] handle has been dropped and
    /// all buffered events were consumed.
    pub async fn recv(&mut self) -> Option<Arc<StatusEvent>> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    warn!(skipped = count, "Status receiver lagged, events dropped");
                },
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Try to receive the next event without waiting.
    ///
    /// Returns `None` if no event is buffered or the channel is closed.
    pub fn try_recv(&mut self) -> Option<Arc<StatusEvent>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(count)) => {
                    warn!(skipped = count, "Status receiver lagged, events dropped");
                },
                Err(
                    broadcast::error::TryRecvError::Empty | broadcast::error::TryRecvError::Closed,
                ) => return None,
            }
        }
    }

    /// Drain every event currently buffered.
    pub fn drain(&mut self) -> Vec<Arc<StatusEvent>> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}
