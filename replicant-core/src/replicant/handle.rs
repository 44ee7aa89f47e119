//! The external replicant contract.
//!
//! A replicant runtime hands out shared handles to named values. The binding
//! only ever talks to these two traits; the store behind them, its
//! persistence, and its transport are the runtime's business.

use std::fmt::{self, Debug};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::reactive::{Listener, ListenerId, SameIdentity};

/// Values a replicant can hold: owned, JSON-representable data.
///
/// `Clone` must produce a structurally independent copy, which holds for
/// `serde_json::Value` and for plain serde data types.
pub trait Json: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<T> Json for T where T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {}

/// Callback registered for a replicant's change event.
///
/// `None` means the replicant currently has no value.
pub type ChangeListener<T> = Listener<Option<Arc<T>>>;

/// Error type of a handle.
pub type HandleError<T, H> = <H as ReplicantHandle<T>>::Error;

/// A shared, identity-stable proxy for one replicant.
pub trait ReplicantHandle<T: Json>: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    /// The replicant's current value.
    fn value(&self) -> Result<Option<Arc<T>>, Self::Error>;

    /// Replace the value. The runtime announces the change to listeners.
    fn set_value(&self, value: Arc<T>) -> Result<(), Self::Error>;

    /// Register a change listener under its own [`ListenerId`].
    fn on_change(&self, listener: ChangeListener<T>) -> Result<(), Self::Error>;

    /// Remove the listener registered under `id`.
    fn remove_listener(&self, id: ListenerId) -> Result<(), Self::Error>;
}

/// Acquires replicant handles.
///
/// Requests for the same identity are expected to be idempotent; the runtime
/// decides whether a request creates a replicant or returns an existing one.
pub trait ReplicantRuntime<T: Json> {
    type Handle: ReplicantHandle<T>;

    /// Request a replicant in the caller's own bundle.
    fn replicant(
        &self,
        name: &str,
        config: ReplicantConfig<T>,
    ) -> Result<Arc<Self::Handle>, HandleError<T, Self::Handle>>;

    /// Request a replicant that lives in `bundle`.
    fn bundle_replicant(
        &self,
        name: &str,
        bundle: &str,
        config: ReplicantConfig<T>,
    ) -> Result<Arc<Self::Handle>, HandleError<T, Self::Handle>>;
}

impl<T, R> ReplicantRuntime<T> for Arc<R>
where
    T: Json,
    R: ReplicantRuntime<T> + ?Sized,
{
    type Handle = R::Handle;

    fn replicant(
        &self,
        name: &str,
        config: ReplicantConfig<T>,
    ) -> Result<Arc<Self::Handle>, HandleError<T, Self::Handle>> {
        (**self).replicant(name, config)
    }

    fn bundle_replicant(
        &self,
        name: &str,
        bundle: &str,
        config: ReplicantConfig<T>,
    ) -> Result<Arc<Self::Handle>, HandleError<T, Self::Handle>> {
        (**self).bundle_replicant(name, bundle, config)
    }
}

/// Creation config passed through to the runtime unmodified.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplicantConfig<T> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Arc<T>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persistent: Option<bool>,
}

impl<T> Default for ReplicantConfig<T> {
    fn default() -> Self {
        Self {
            default_value: None,
            persistent: None,
        }
    }
}

impl<T: Debug> Debug for ReplicantConfig<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplicantConfig")
            .field("default_value", &self.default_value)
            .field("persistent", &self.persistent)
            .finish()
    }
}

/// Options a component passes when binding to a replicant.
///
/// The default value takes part in the binding's identity by pointer, so
/// build options once and reuse them across renders. Calling
/// [`default_value`](Self::default_value) on every render allocates a new
/// identity each time and re-acquires the handle every render.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplicantOptions<T> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundle: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Arc<T>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persistent: Option<bool>,
}

impl<T> ReplicantOptions<T> {
    pub fn new() -> Self {
        Self {
            bundle: None,
            default_value: None,
            persistent: None,
        }
    }

    /// Scope the replicant to another bundle.
    pub fn bundle(mut self, bundle: impl Into<String>) -> Self {
        self.bundle = Some(bundle.into());
        self
    }

    pub fn default_value(self, value: T) -> Self {
        self.shared_default_value(Arc::new(value))
    }

    /// Use an already shared default, keeping its identity.
    pub fn shared_default_value(mut self, value: Arc<T>) -> Self {
        self.default_value = Some(value);
        self
    }

    pub fn persistent(mut self, persistent: bool) -> Self {
        self.persistent = Some(persistent);
        self
    }

    /// The part of the options the runtime receives.
    pub fn config(&self) -> ReplicantConfig<T> {
        ReplicantConfig {
            default_value: self.default_value.clone(),
            persistent: self.persistent,
        }
    }
}

impl<T> Default for ReplicantOptions<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Debug> Debug for ReplicantOptions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplicantOptions")
            .field("bundle", &self.bundle)
            .field("default_value", &self.default_value)
            .field("persistent", &self.persistent)
            .finish()
    }
}

/// Everything a bound handle's identity depends on.
pub(crate) struct ReplicantKey<T> {
    pub(crate) name: String,
    pub(crate) bundle: Option<String>,
    pub(crate) default_value: Option<Arc<T>>,
    pub(crate) persistent: Option<bool>,
}

impl<T> ReplicantKey<T> {
    pub(crate) fn new(name: &str, options: &ReplicantOptions<T>) -> Self {
        Self {
            name: name.to_owned(),
            bundle: options.bundle.clone(),
            default_value: options.default_value.clone(),
            persistent: options.persistent,
        }
    }

    pub(crate) fn config(&self) -> ReplicantConfig<T> {
        ReplicantConfig {
            default_value: self.default_value.clone(),
            persistent: self.persistent,
        }
    }

    /// `bundle/name`, or just `name` for the caller's own bundle.
    pub(crate) fn label(&self) -> String {
        match &self.bundle {
            Some(bundle) => format!("{bundle}/{}", self.name),
            None => self.name.clone(),
        }
    }
}

impl<T> SameIdentity for ReplicantKey<T> {
    fn same_identity(&self, other: &Self) -> bool {
        self.name.same_identity(&other.name)
            && self.bundle.same_identity(&other.bundle)
            && self.default_value.same_identity(&other.default_value)
            && self.persistent.same_identity(&other.persistent)
    }
}
