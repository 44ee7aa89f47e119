//! Reactive Primitives
//!
//! This module implements the local building blocks a component uses to stay
//! in sync with state it does not own: signals, memos, and effects.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A Signal is a container for mutable component-local state. Replacing its
//! value notifies every subscriber, which is how a component learns that it
//! must re-render.
//!
//! ## Memos
//!
//! A Memo caches something expensive or identity-bearing (such as a handle
//! to an external resource) under a key. It is rebuilt only when the key's
//! identity changes.
//!
//! ## Effects
//!
//! An Effect attaches the component to something external and holds the
//! matching cleanup. Re-running an effect always cleans up the previous run
//! first, so at most one attachment is live at a time.
//!
//! # Implementation Notes
//!
//! There is no automatic dependency tracking. The caller decides when a memo
//! key changed and when an effect re-runs, which keeps every primitive usable
//! from plain synchronous code.

mod effect;
mod memo;
mod signal;
mod subscriber;

pub use effect::{Cleanup, Effect};
pub use memo::{Memo, MemoState, SameIdentity};
pub use signal::Signal;
pub use subscriber::{Listener, ListenerId};
