//! In-process replicant runtime.
//!
//! `MemoryReplicants` implements the replicant contract without any store
//! behind it. Every replicant lives in a map for as long as the runtime does.
//! Nothing is persisted and nothing crosses a process boundary. It exists so
//! that bindings can be hosted and tested without a remote runtime.
//!
//! # Semantics
//!
//! - A runtime belongs to one bundle. The two-argument request form
//!   addresses that bundle; the three-argument form addresses any bundle.
//! - The first request for an address declares the replicant. The
//!   declaration seeds the value from `default_value` and fixes the
//!   `persistent` flag, which defaults to `true`. Later requests return the
//!   same handle and ignore their config.
//! - Listeners run synchronously on the writing thread, in registration
//!   order. The listener list is snapshotted before dispatch, so a listener
//!   may write the replicant again or remove itself.

use std::fmt::{self, Debug, Display};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use indexmap::IndexMap;
use parking_lot::RwLock;
use smallvec::SmallVec;
use tracing::{debug, trace};

use super::handle::{ChangeListener, Json, ReplicantConfig, ReplicantHandle, ReplicantRuntime};
use crate::error::{ReplicantError, Result};
use crate::reactive::ListenerId;

/// Where a replicant lives: its bundle and its name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReplicantAddress {
    pub bundle: String,
    pub name: String,
}

impl ReplicantAddress {
    pub fn new(bundle: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            bundle: bundle.into(),
            name: name.into(),
        }
    }
}

impl Display for ReplicantAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bundle, self.name)
    }
}

/// A replicant runtime backed by process memory.
pub struct MemoryReplicants<T: Json> {
    /// Bundle used by the two-argument request form.
    bundle: String,

    replicants: DashMap<ReplicantAddress, Arc<MemoryReplicant<T>>>,

    /// Handle requests served or rejected.
    requests: AtomicUsize,
}

impl<T: Json> MemoryReplicants<T> {
    /// Create a runtime owned by `bundle`.
    pub fn new(bundle: impl Into<String>) -> Self {
        Self {
            bundle: bundle.into(),
            replicants: DashMap::new(),
            requests: AtomicUsize::new(0),
        }
    }

    /// Look up a declared replicant without declaring it.
    pub fn get(&self, bundle: &str, name: &str) -> Option<Arc<MemoryReplicant<T>>> {
        self.replicants
            .get(&ReplicantAddress::new(bundle, name))
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Number of handle requests received, including rejected ones.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Number of declared replicants.
    pub fn len(&self) -> usize {
        self.replicants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.replicants.is_empty()
    }

    fn declare(
        &self,
        name: &str,
        bundle: &str,
        config: ReplicantConfig<T>,
    ) -> Result<Arc<MemoryReplicant<T>>> {
        self.requests.fetch_add(1, Ordering::SeqCst);

        if bundle.is_empty() {
            return Err(ReplicantError::InvalidBundle {
                name: name.to_owned(),
                bundle: bundle.to_owned(),
            });
        }
        if name.is_empty() {
            return Err(ReplicantError::InvalidName {
                name: name.to_owned(),
                bundle: bundle.to_owned(),
            });
        }

        let replicant = match self.replicants.entry(ReplicantAddress::new(bundle, name)) {
            Entry::Occupied(entry) => {
                trace!(replicant = %entry.key(), "reusing declared replicant");
                Arc::clone(entry.get())
            }
            Entry::Vacant(entry) => {
                let replicant = Arc::new(MemoryReplicant::new(entry.key().clone(), config));
                debug!(
                    replicant = %entry.key(),
                    persistent = replicant.is_persistent(),
                    "declared replicant"
                );
                entry.insert(Arc::clone(&replicant));
                replicant
            }
        };

        Ok(replicant)
    }
}

impl<T: Json> ReplicantRuntime<T> for MemoryReplicants<T> {
    type Handle = MemoryReplicant<T>;

    fn replicant(
        &self,
        name: &str,
        config: ReplicantConfig<T>,
    ) -> Result<Arc<MemoryReplicant<T>>> {
        self.declare(name, &self.bundle, config)
    }

    fn bundle_replicant(
        &self,
        name: &str,
        bundle: &str,
        config: ReplicantConfig<T>,
    ) -> Result<Arc<MemoryReplicant<T>>> {
        self.declare(name, bundle, config)
    }
}

impl<T: Json> Debug for MemoryReplicants<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryReplicants")
            .field("bundle", &self.bundle)
            .field("replicants", &self.len())
            .field("requests", &self.request_count())
            .finish()
    }
}

/// One replicant held in memory.
pub struct MemoryReplicant<T: Json> {
    address: ReplicantAddress,
    persistent: bool,
    value: RwLock<Option<Arc<T>>>,
    listeners: RwLock<IndexMap<ListenerId, ChangeListener<T>>>,

    /// Number of change announcements.
    revision: AtomicU64,
}

impl<T: Json> MemoryReplicant<T> {
    fn new(address: ReplicantAddress, config: ReplicantConfig<T>) -> Self {
        Self {
            address,
            persistent: config.persistent.unwrap_or(true),
            value: RwLock::new(config.default_value),
            listeners: RwLock::new(IndexMap::new()),
            revision: AtomicU64::new(0),
        }
    }

    pub fn address(&self) -> &ReplicantAddress {
        &self.address
    }

    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::SeqCst)
    }

    /// Announce the current value again without replacing it.
    ///
    /// Listeners receive the same `Arc` they saw last time, which is what a
    /// store that mutated the value in place would deliver.
    pub fn notify(&self) {
        let value = self.value.read().clone();
        self.announce(value);
    }

    fn announce(&self, value: Option<Arc<T>>) {
        let revision = self.revision.fetch_add(1, Ordering::SeqCst) + 1;
        let snapshot: SmallVec<[ChangeListener<T>; 4]> =
            self.listeners.read().values().cloned().collect();

        trace!(
            replicant = %self.address,
            revision,
            listeners = snapshot.len(),
            "announcing change"
        );

        for listener in snapshot {
            listener.notify(value.clone());
        }
    }
}

impl<T: Json> ReplicantHandle<T> for MemoryReplicant<T> {
    type Error = ReplicantError;

    fn value(&self) -> Result<Option<Arc<T>>> {
        Ok(self.value.read().clone())
    }

    fn set_value(&self, value: Arc<T>) -> Result<()> {
        *self.value.write() = Some(Arc::clone(&value));
        self.announce(Some(value));
        Ok(())
    }

    fn on_change(&self, listener: ChangeListener<T>) -> Result<()> {
        trace!(replicant = %self.address, listener = %listener.id(), "listener added");
        self.listeners.write().insert(listener.id(), listener);
        Ok(())
    }

    fn remove_listener(&self, id: ListenerId) -> Result<()> {
        if self.listeners.write().shift_remove(&id).is_some() {
            trace!(replicant = %self.address, listener = %id, "listener removed");
        }
        Ok(())
    }
}

impl<T: Json + Debug> Debug for MemoryReplicant<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryReplicant")
            .field("address", &self.address)
            .field("persistent", &self.persistent)
            .field("value", &*self.value.read())
            .field("listeners", &self.listener_count())
            .field("revision", &self.revision())
            .finish()
    }
}
