//! Callback registry keyed by correlation id.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::trace;

use crate::identifiers::CallbackId;
use crate::protocol::Envelope;

// ============================================================================
// Types
// ============================================================================

/// A registered response callback.
///
/// Invoked with the full inbound envelope.
pub type Callback = Arc<dyn Fn(Envelope) + Send + Sync>;

/// One live registration.
struct Entry {
    callback: Callback,
    persistent: bool,
}

// ============================================================================
// CallbackRegistry
// ============================================================================

/// Maps correlation ids to callbacks.
///
/// Ids are generated here and are unique among live entries. Entries are
/// removed on first delivery unless persistent; removed ids are never
/// handed out again.
#[derive(Default)]
pub struct CallbackRegistry {
    entries: Mutex<FxHashMap<CallbackId, Entry>>,
}

impl fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("len", &self.len())
            .finish()
    }
}

impl CallbackRegistry {
    /// Creates an empty registry.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback` under a fresh id.
    pub fn register(&self, callback: Callback, persistent: bool) -> CallbackId {
        let mut entries = self.entries.lock();

        let id = loop {
            let candidate = CallbackId::generate();
            if !entries.contains_key(&candidate) {
                break candidate;
            }
        };

        entries.insert(
            id.clone(),
            Entry {
                callback,
                persistent,
            },
        );
        trace!(cb = %id, persistent, live = entries.len(), "Callback registered");
        id
    }

    /// Looks up `id` for delivery.
    ///
    /// Returns the callback and its persistence flag; non-persistent entries
    /// are removed. The caller invokes the callback after the lock is
    /// released.
    pub fn take(&self, id: &str) -> Option<(Callback, bool)> {
        let mut entries = self.entries.lock();
        let persistent = entries.get(id)?.persistent;

        if persistent {
            entries
                .get(id)
                .map(|entry| (Arc::clone(&entry.callback), true))
        } else {
            entries.remove(id).map(|entry| (entry.callback, false))
        }
    }

    /// Unregisters `id`. Returns `true` if it was live.
    pub fn remove(&self, id: &str) -> bool {
        let removed = self.entries.lock().remove(id).is_some();
        if removed {
            trace!(cb = id, "Callback removed");
        }
        removed
    }

    /// Returns `true` if `id` is live.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.entries.lock().contains_key(id)
    }

    /// Returns `Some(persistent)` for a live id.
    #[must_use]
    pub fn is_persistent(&self, id: &str) -> Option<bool> {
        self.entries.lock().get(id).map(|entry| entry.persistent)
    }

    /// Number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================
