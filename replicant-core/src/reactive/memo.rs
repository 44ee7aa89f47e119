//! Memo Implementation
//!
//! A Memo caches a constructed value together with the key it was built
//! from, and rebuilds only when a key with a different identity arrives.
//!
//! # How Memos Work
//!
//! 1. On first access, the memo runs its constructor and caches the result
//!    alongside the key.
//!
//! 2. When accessed again with a key of the same identity, the cached value is
//!    returned and the constructor does not run.
//!
//! 3. When the key's identity changes (or after `invalidate`), the memo is
//!    dirty and the next access reconstructs.
//!
//! # Identity
//!
//! Keys compare through [`SameIdentity`], not `PartialEq`. This is a shallow
//! comparison: shared values compare by pointer, plain data by value. Two
//! keys holding structurally equal but separately allocated values are
//! different keys.
//!
//! A failed construction leaves the memo dirty with no cached value, so the
//! next access tries again.

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counter for generating unique memo IDs.
static MEMO_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a new unique memo ID.
fn next_memo_id() -> u64 {
    MEMO_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Shallow identity comparison used for memo keys.
pub trait SameIdentity {
    /// Whether `self` and `other` denote the same identity.
    fn same_identity(&self, other: &Self) -> bool;
}

impl<T: ?Sized> SameIdentity for Arc<T> {
    fn same_identity(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other)
    }
}

impl<T: SameIdentity> SameIdentity for Option<T> {
    fn same_identity(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.same_identity(b),
            (None, None) => true,
            _ => false,
        }
    }
}

macro_rules! same_identity_by_value {
    ($($ty:ty),*) => {
        $(
            impl SameIdentity for $ty {
                fn same_identity(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

same_identity_by_value!(bool, i32, i64, u32, u64, usize, String, &str);

/// Dirty state for a memo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoState {
    /// The cached value matches the last key.
    Clean,

    /// The memo must reconstruct on next access.
    Dirty,
}

/// A cached value that reconstructs only when its key changes identity.
pub struct Memo<K, V>
where
    K: SameIdentity,
{
    /// Unique identifier for this memo.
    id: u64,

    /// The key and the value constructed from it.
    entry: Option<(K, V)>,

    /// Current dirty state.
    state: MemoState,

    /// Number of constructor invocations, successful or not.
    compute_count: usize,
}

impl<K, V> Memo<K, V>
where
    K: SameIdentity,
{
    /// Create an empty memo. Nothing is constructed until first access.
    pub fn new() -> Self {
        Self {
            id: next_memo_id(),
            entry: None,
            state: MemoState::Dirty,
            compute_count: 0,
        }
    }

    /// Get the memo's unique ID.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Whether the cached value was built from a key with the same identity
    /// as `key` and is still clean.
    pub fn is_current(&self, key: &K) -> bool {
        self.state == MemoState::Clean
            && self
                .entry
                .as_ref()
                .is_some_and(|(cached, _)| cached.same_identity(key))
    }

    /// Return the cached value for `key`, constructing it if the key changed.
    ///
    /// The previous value is dropped before `construct` runs.
    pub fn get_or_try_compute<E, F>(&mut self, key: K, construct: F) -> Result<&V, E>
    where
        F: FnOnce(&K) -> Result<V, E>,
    {
        let entry = match self.entry.take() {
            Some((cached, value))
                if self.state == MemoState::Clean && cached.same_identity(&key) =>
            {
                (cached, value)
            }
            stale => {
                drop(stale);
                self.state = MemoState::Dirty;
                self.compute_count += 1;

                let value = construct(&key)?;
                (key, value)
            }
        };

        self.state = MemoState::Clean;
        let (_, value) = self.entry.insert(entry);
        Ok(&*value)
    }

    /// The cached value, if one exists.
    pub fn get(&self) -> Option<&V> {
        self.entry.as_ref().map(|(_, value)| value)
    }

    /// The key the cached value was built from.
    pub fn key(&self) -> Option<&K> {
        self.entry.as_ref().map(|(key, _)| key)
    }

    /// Mark the memo as needing reconstruction on next access.
    pub fn invalidate(&mut self) {
        self.state = MemoState::Dirty;
    }

    /// Drop the cached value and key.
    pub fn clear(&mut self) -> Option<(K, V)> {
        self.state = MemoState::Dirty;
        self.entry.take()
    }

    /// Get the current dirty state.
    pub fn state(&self) -> MemoState {
        self.state
    }

    /// Number of times the constructor has run.
    pub fn compute_count(&self) -> usize {
        self.compute_count
    }

    /// Check if the memo has a cached value.
    pub fn has_value(&self) -> bool {
        self.entry.is_some()
    }
}

impl<K, V> Default for Memo<K, V>
where
    K: SameIdentity,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Debug for Memo<K, V>
where
    K: SameIdentity,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memo")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("has_value", &self.has_value())
            .field("compute_count", &self.compute_count)
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
