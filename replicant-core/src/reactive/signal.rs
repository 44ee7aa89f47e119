//! Signal Implementation
//!
//! A Signal is the local state cell of a component. It holds a value and
//! tells its subscribers (usually the component's re-render trigger) when
//! that value is replaced.
//!
//! # How Signals Work
//!
//! 1. A component subscribes once with a notification callback.
//!
//! 2. Every `set` or `update` replaces the value and notifies all
//!    subscribers, in registration order.
//!
//! 3. The signal never compares old and new values. Deciding whether a new
//!    value is "different" is the writer's job.
//!
//! # Thread Safety
//!
//! Signals are thread-safe. The value is protected by a `parking_lot` RwLock.
//! Notifiers are snapshotted before they run, so a notifier may read or write
//! the signal again without deadlocking.

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use smallvec::SmallVec;

use super::subscriber::ListenerId;

/// Counter for generating unique signal IDs.
static SIGNAL_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a new unique signal ID.
fn next_signal_id() -> u64 {
    SIGNAL_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

type Notifier = Arc<dyn Fn() + Send + Sync>;

/// A reactive cell holding a value of type T.
///
/// # Example
///
/// ```rust
/// use replicant_core::reactive::Signal;
///
/// let count = Signal::new(0);
/// count.set(5);
/// assert_eq!(count.get(), 5);
/// ```
pub struct Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Unique identifier for this signal.
    id: u64,

    /// The current value.
    value: Arc<RwLock<T>>,

    /// Notification callbacks keyed by listener ID, in registration order.
    notifiers: Arc<RwLock<Vec<(ListenerId, Notifier)>>>,

    /// Number of times the value has been replaced.
    version: Arc<AtomicU64>,
}

impl<T> Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a new signal with the given initial value.
    pub fn new(value: T) -> Self {
        Self {
            id: next_signal_id(),
            value: Arc::new(RwLock::new(value)),
            notifiers: Arc::new(RwLock::new(Vec::new())),
            version: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Get the signal's unique ID.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Get a clone of the current value.
    pub fn get(&self) -> T {
        self.value.read().clone()
    }

    /// Set the initial value in place.
    ///
    /// Subscribers are not notified and the version does not move, so the
    /// cell looks as if it had been created holding `value`.
    pub fn seed(&self, value: T) {
        *self.value.write() = value;
    }

    /// Replace the value and notify subscribers.
    pub fn set(&self, value: T) {
        *self.value.write() = value;
        self.version.fetch_add(1, Ordering::SeqCst);
        self.notify_subscribers();
    }

    /// Replace the value with one computed from the current value.
    ///
    /// The read and the write happen under a single write lock, so two
    /// concurrent updates cannot both observe the same previous value.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        {
            let mut guard = self.value.write();
            let next = f(&*guard);
            *guard = next;
        }
        self.version.fetch_add(1, Ordering::SeqCst);
        self.notify_subscribers();
    }

    /// Register a notification callback.
    ///
    /// The callback will be invoked after every value replacement.
    pub fn subscribe<F>(&self, listener_id: ListenerId, notify: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.notifiers.write().push((listener_id, Arc::new(notify)));
    }

    /// Remove a subscriber.
    pub fn unsubscribe(&self, listener_id: ListenerId) {
        self.notifiers.write().retain(|(id, _)| *id != listener_id);
    }

    fn notify_subscribers(&self) {
        let snapshot: SmallVec<[Notifier; 4]> = self
            .notifiers
            .read()
            .iter()
            .map(|(_, notify)| Arc::clone(notify))
            .collect();

        for notify in snapshot {
            notify();
        }
    }

    /// Get the number of subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.notifiers.read().len()
    }

    /// Number of times the value has been replaced since creation.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }
}

impl<T> Clone for Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            value: Arc::clone(&self.value),
            notifiers: Arc::clone(&self.notifiers),
            version: Arc::clone(&self.version),
        }
    }
}

impl<T> Debug for Signal<T>
where
    T: Clone + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.id)
            .field("value", &*self.value.read())
            .field("version", &self.version())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
