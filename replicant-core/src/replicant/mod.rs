//! Replicant Bindings
//!
//! A replicant is a named value owned by an external runtime and shared by
//! every component that asks for it. This module defines the contract such a
//! runtime must satisfy, a binding that mirrors one replicant into a
//! component's local state, and an in-process runtime.
//!
//! # Flow
//!
//! ```text
//! render ──► Memo<key, handle> ──► runtime.replicant(..)
//!              │
//!              ▼
//!         Effect: handle.on_change(listener) ──► Signal (local mirror) ──► re-render
//!              │
//!   identity change / unmount: handle.remove_listener(id)
//! ```
//!
//! Writes go through `ReplicantSetter` straight to the handle and come back
//! through the listener. The binding never writes its local mirror itself.

mod binding;
mod handle;
mod memory;

pub use binding::{ReplicantBinding, ReplicantSetter, SetValue};
pub use handle::{
    ChangeListener, HandleError, Json, ReplicantConfig, ReplicantHandle, ReplicantOptions,
    ReplicantRuntime,
};
pub use memory::{MemoryReplicant, MemoryReplicants, ReplicantAddress};
