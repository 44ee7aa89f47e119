//! Replicant Binding
//!
//! A `ReplicantBinding` lives inside one component instance and ties a
//! replicant to that component's local state.
//!
//! # How a Binding Works
//!
//! 1. Each render calls [`ReplicantBinding::render`] with the replicant name
//!    and options. The handle is memoized on `(name, bundle, default_value,
//!    persistent)` and re-acquired only when one of them changes identity.
//!
//! 2. The first render seeds the local state cell from the handle's value.
//!
//! 3. While a handle is held, exactly one change listener is registered on it.
//!    The listener copies incoming values into the local cell. If a value
//!    arrives as the very `Arc` the cell already holds, the cell gets a deep
//!    copy instead, so the component still sees a new reference and anything
//!    memoized on the old one invalidates. This covers stores that mutate in
//!    place and re-announce.
//!
//! 4. On identity change the old listener is removed before the new handle is
//!    requested. On unmount the listener is removed and the binding is gone.
//!
//! Errors from the runtime are never caught here. They come back from
//! `render`, the setter, or `unmount` exactly as the runtime produced them.

use std::fmt::{self, Debug};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, trace};

use super::handle::{
    HandleError, Json, ReplicantHandle, ReplicantKey, ReplicantOptions, ReplicantRuntime,
};
use crate::reactive::{Cleanup, Effect, Listener, ListenerId, Memo, Signal};

/// Binds one replicant to component-local state.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use replicant_core::replicant::{MemoryReplicants, ReplicantBinding, ReplicantOptions};
/// use serde_json::{json, Value};
///
/// let runtime = Arc::new(MemoryReplicants::<Value>::new("hud"));
/// let options = ReplicantOptions::new().default_value(json!(0));
/// let mut score = ReplicantBinding::new(runtime);
///
/// let (value, set_score) = score.render("score", &options).unwrap();
/// assert_eq!(value.as_deref(), Some(&json!(0)));
///
/// set_score.set(json!(3)).unwrap();
/// let (value, _) = score.render("score", &options).unwrap();
/// assert_eq!(value.as_deref(), Some(&json!(3)));
/// ```
pub struct ReplicantBinding<R, T = serde_json::Value>
where
    R: ReplicantRuntime<T>,
    T: Json,
{
    runtime: R,

    /// Handle memoized on the identity tuple.
    handle: Memo<ReplicantKey<T>, Arc<R::Handle>>,

    /// The component's mirror of the replicant value.
    state: Signal<Option<Arc<T>>>,

    /// Whether `state` has been seeded from a handle.
    seeded: bool,

    /// Change listener on the current handle.
    subscription: Effect<HandleError<T, R::Handle>>,
}

impl<R, T> ReplicantBinding<R, T>
where
    R: ReplicantRuntime<T>,
    T: Json,
{
    /// Create an unmounted binding. Nothing is requested until `render`.
    pub fn new(runtime: R) -> Self {
        Self {
            runtime,
            handle: Memo::new(),
            state: Signal::new(None),
            seeded: false,
            subscription: Effect::new(),
        }
    }

    /// Run the binding for one render pass.
    ///
    /// Returns the current local value and a setter for the bound handle.
    pub fn render(
        &mut self,
        name: &str,
        options: &ReplicantOptions<T>,
    ) -> Result<(Option<Arc<T>>, ReplicantSetter<T, R::Handle>), HandleError<T, R::Handle>> {
        let key = ReplicantKey::new(name, options);

        let cached = if self.handle.is_current(&key) {
            self.handle.get().cloned()
        } else {
            None
        };
        let handle = match cached {
            Some(handle) => handle,
            None => self.reacquire(key)?,
        };

        Ok((self.state.get(), ReplicantSetter::new(handle)))
    }

    /// Release the current handle's listener, acquire the handle for `key`,
    /// and subscribe to it.
    fn reacquire(
        &mut self,
        key: ReplicantKey<T>,
    ) -> Result<Arc<R::Handle>, HandleError<T, R::Handle>> {
        if let Err(error) = self.subscription.cleanup() {
            // The old listener is gone either way; any next render starts over.
            self.handle.invalidate();
            return Err(error);
        }

        let label = key.label();
        let runtime = &self.runtime;
        let handle = self.handle.get_or_try_compute(key, |key| {
            debug!(replicant = %label, "acquiring replicant handle");
            let config = key.config();
            match &key.bundle {
                Some(bundle) => runtime.bundle_replicant(&key.name, bundle, config),
                None => runtime.replicant(&key.name, config),
            }
        })?;
        let handle = Arc::clone(handle);

        if let Err(error) = self.attach(&handle, label) {
            // A handle nobody listens to must not be served from the cache.
            self.handle.invalidate();
            return Err(error);
        }

        Ok(handle)
    }

    /// Seed the local cell on first acquisition, then listen for changes.
    fn attach(
        &mut self,
        handle: &Arc<R::Handle>,
        label: String,
    ) -> Result<(), HandleError<T, R::Handle>> {
        if !self.seeded {
            let initial = handle.value()?;
            trace!(replicant = %label, seeded = initial.is_some(), "seeding local state");
            self.state.seed(initial);
            self.seeded = true;
        }

        self.subscribe(Arc::clone(handle), label)
    }

    fn subscribe(
        &mut self,
        handle: Arc<R::Handle>,
        label: String,
    ) -> Result<(), HandleError<T, R::Handle>> {
        let state = self.state.clone();

        self.subscription.run(move || {
            let active = Arc::new(AtomicBool::new(true));

            let listener = {
                let active = Arc::clone(&active);
                let label = label.clone();
                Listener::new(move |incoming: Option<Arc<T>>| {
                    if !active.load(Ordering::SeqCst) {
                        trace!(replicant = %label, "ignoring change after release");
                        return;
                    }
                    state.update(|current| reconcile(&label, current, incoming));
                })
            };
            let listener_id = listener.id();

            handle.on_change(listener)?;
            debug!(replicant = %label, listener = %listener_id, "subscribed");

            let release: Cleanup<_> =
                Box::new(move || -> Result<(), HandleError<T, R::Handle>> {
                    active.store(false, Ordering::SeqCst);
                    handle.remove_listener(listener_id)?;
                    debug!(replicant = %label, listener = %listener_id, "unsubscribed");
                    Ok(())
                });
            Ok(release)
        })
    }

    /// Tear the binding down, removing its change listener.
    ///
    /// Dropping a binding does the same, but a failed removal can only be
    /// logged there.
    pub fn unmount(mut self) -> Result<(), HandleError<T, R::Handle>> {
        self.subscription.dispose()?;
        self.handle.clear();
        Ok(())
    }

    /// The current local value.
    pub fn value(&self) -> Option<Arc<T>> {
        self.state.get()
    }

    /// The local state cell.
    pub fn state(&self) -> &Signal<Option<Arc<T>>> {
        &self.state
    }

    /// Register the component's re-render trigger. It fires every time a
    /// change event replaces the local value.
    pub fn subscribe_render<F>(&self, rerender: F) -> ListenerId
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = ListenerId::new();
        self.state.subscribe(id, rerender);
        id
    }

    /// Remove a trigger registered with [`subscribe_render`](Self::subscribe_render).
    pub fn unsubscribe_render(&self, id: ListenerId) {
        self.state.unsubscribe(id);
    }

    /// The handle currently held, if any.
    pub fn handle(&self) -> Option<&Arc<R::Handle>> {
        self.handle.get()
    }

    /// Number of handle acquisitions attempted so far.
    pub fn acquisition_count(&self) -> usize {
        self.handle.compute_count()
    }

    /// Whether a change listener is currently registered.
    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_active()
    }
}

impl<R, T> Debug for ReplicantBinding<R, T>
where
    R: ReplicantRuntime<T>,
    T: Json + Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplicantBinding")
            .field("replicant", &self.handle.key().map(ReplicantKey::label))
            .field("state", &self.state)
            .field("subscription", &self.subscription)
            .finish()
    }
}

/// Decide what the local cell holds after a change event.
///
/// A different reference is taken as is. The same reference (or `None` twice)
/// is replaced by a deep copy so the cell still changes identity.
pub(crate) fn reconcile<T: Json>(
    label: &str,
    current: &Option<Arc<T>>,
    incoming: Option<Arc<T>>,
) -> Option<Arc<T>> {
    let same_reference = match (current, &incoming) {
        (Some(current), Some(incoming)) => Arc::ptr_eq(current, incoming),
        (None, None) => true,
        _ => false,
    };

    if same_reference {
        trace!(replicant = %label, "change carried the held reference, copying");
        incoming.map(|value| Arc::new(T::clone(&value)))
    } else {
        trace!(replicant = %label, "change carried a new value");
        incoming
    }
}

/// A value or an updater for [`ReplicantSetter::apply`].
pub enum SetValue<T> {
    /// Written to the handle directly.
    Value(T),

    /// Called with the handle's current value. Nothing is written; the
    /// updater must write through the handle itself if it wants a change.
    Update(Box<dyn FnOnce(Option<Arc<T>>) + Send>),
}

impl<T> SetValue<T> {
    pub fn update<F>(updater: F) -> Self
    where
        F: FnOnce(Option<Arc<T>>) + Send + 'static,
    {
        Self::Update(Box::new(updater))
    }
}

impl<T> From<T> for SetValue<T> {
    fn from(value: T) -> Self {
        Self::Value(value)
    }
}

impl<T: Debug> Debug for SetValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Update(_) => f.write_str("Update(..)"),
        }
    }
}

/// Writes to a bound replicant.
///
/// The setter talks to the handle, never to the local mirror. Writes come
/// back into the mirror through the change listener like any other change.
pub struct ReplicantSetter<T, H>
where
    T: Json,
    H: ReplicantHandle<T>,
{
    handle: Arc<H>,
    _value: PhantomData<fn() -> T>,
}

impl<T, H> ReplicantSetter<T, H>
where
    T: Json,
    H: ReplicantHandle<T>,
{
    pub fn new(handle: Arc<H>) -> Self {
        Self {
            handle,
            _value: PhantomData,
        }
    }

    /// Write `value` to the handle.
    pub fn set(&self, value: T) -> Result<(), H::Error> {
        self.set_shared(Arc::new(value))
    }

    /// Write an already shared value to the handle, keeping its identity.
    pub fn set_shared(&self, value: Arc<T>) -> Result<(), H::Error> {
        trace!("writing replicant value");
        self.handle.set_value(value)
    }

    /// Call `updater` once, right now, with the handle's current value.
    ///
    /// Whatever `updater` returns is dropped. This is not a reducer: to change
    /// the replicant, the updater has to write to it itself.
    pub fn update<F, Ret>(&self, updater: F) -> Result<(), H::Error>
    where
        F: FnOnce(Option<Arc<T>>) -> Ret,
    {
        let current = self.handle.value()?;
        let _ = updater(current);
        Ok(())
    }

    pub fn apply(&self, next: SetValue<T>) -> Result<(), H::Error> {
        match next {
            SetValue::Value(value) => self.set(value),
            SetValue::Update(updater) => self.update(updater),
        }
    }

    pub fn handle(&self) -> &Arc<H> {
        &self.handle
    }
}

impl<T, H> Clone for ReplicantSetter<T, H>
where
    T: Json,
    H: ReplicantHandle<T>,
{
    fn clone(&self) -> Self {
        Self::new(Arc::clone(&self.handle))
    }
}

impl<T, H> Debug for ReplicantSetter<T, H>
where
    T: Json,
    H: ReplicantHandle<T>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplicantSetter").finish_non_exhaustive()
    }
}
