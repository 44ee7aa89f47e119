//! Listener types for the reactive system.
//!
//! A listener is any callback that wants to hear about a value change. This
//! includes re-render triggers on a local state cell and change handlers
//! registered on a replicant handle.

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Unique identifier for a listener.
///
/// Each registration gets a unique ID when created. The ID is what gets passed
/// back to remove exactly that registration later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Generate a new unique listener ID.
    ///
    /// Uses an atomic counter to ensure uniqueness across threads.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ListenerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ListenerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "listener#{}", self.0)
    }
}

/// A change callback receiving the new value.
///
/// Stored behind an `Arc` so a dispatcher can snapshot the registered
/// callbacks and release its lock before invoking any of them.
pub struct Listener<V> {
    id: ListenerId,
    notify: Arc<dyn Fn(V) + Send + Sync>,
}

impl<V> Listener<V> {
    /// Create a new listener with the given callback.
    pub fn new<F>(notify: F) -> Self
    where
        F: Fn(V) + Send + Sync + 'static,
    {
        Self {
            id: ListenerId::new(),
            notify: Arc::new(notify),
        }
    }

    /// Get the listener's unique ID.
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Deliver a value to the callback.
    pub fn notify(&self, value: V) {
        (self.notify)(value);
    }
}

impl<V> Clone for Listener<V> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            notify: Arc::clone(&self.notify),
        }
    }
}

impl<V> Debug for Listener<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listener").field("id", &self.id).finish()
    }
}
