//! Per-folder mutual exclusion for mutations.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::debug;

use crate::error::{PluginBrowserError, PluginBrowserResult};
use crate::naming::split_folder_name;

/// Tracks which plugin folders have a mutation in flight.
///
/// Keys are the folder's base name (disabled suffix stripped, ASCII
/// lowercased), so `foo`, `foo.disabled` and `Foo` all contend for the same
/// slot. A second mutation on a busy key is rejected, never queued.
#[derive(Debug, Clone, Default)]
pub struct OperationGuard {
    active: Arc<DashMap<String, &'static str>>,
}

/// Held for the lifetime of one mutation; releases the folder on drop.
#[derive(Debug)]
pub struct GuardToken {
    active: Arc<DashMap<String, &'static str>>,
    key: String,
}

impl OperationGuard {
    /// Create an empty guard.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `folder` for `operation`.
    ///
    /// # Errors
    ///
    /// Returns [`PluginBrowserError::Conflict`] if another operation holds
    /// the same folder.
    pub fn try_acquire(&self, folder: &str, operation: &'static str) -> PluginBrowserResult<GuardToken> {
        let key = guard_key(folder);
        match self.active.entry(key.clone()) {
            Entry::Occupied(existing) => Err(PluginBrowserError::Conflict {
                folder: folder.to_string(),
                message: format!("{} is already in progress for this plugin", existing.get()),
            }),
            Entry::Vacant(slot) => {
                slot.insert(operation);
                debug!(folder, operation, "Acquired plugin folder");
                Ok(GuardToken {
                    active: Arc::clone(&self.active),
                    key,
                })
            },
        }
    }

    /// Whether any mutation currently holds `folder`.
    #[must_use]
    pub fn is_busy(&self, folder: &str) -> bool {
        self.active.contains_key(&guard_key(folder))
    }
}

impl Drop for GuardToken {
    fn drop(&mut self) {
        self.active.remove(&self.key);
    }
}

fn guard_key(folder: &str) -> String {
    split_folder_name(folder).0.to_ascii_lowercase()
}
