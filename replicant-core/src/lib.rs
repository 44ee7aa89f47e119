//! Replicant Core
//!
//! This crate binds replicants, named values owned by an external runtime,
//! to component-local reactive state. It provides:
//!
//! - Reactive primitives (signals, memos, effects) for component-local state
//! - The replicant runtime contract, as traits
//! - `ReplicantBinding`, which keeps a component's state in sync with one
//!   replicant and writes back to it
//! - An in-memory runtime for hosting and testing
//!
//! The store behind a runtime, its persistence, and its transport are out of
//! scope. The crate only adapts a runtime's subscribe/mutate API.
//!
//! # Architecture
//!
//! - `reactive`: local state cell, keyed memo, setup/cleanup effect
//! - `replicant`: contract, binding, in-memory runtime
//! - `error`: errors raised by the in-memory runtime
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use replicant_core::replicant::{MemoryReplicants, ReplicantBinding, ReplicantOptions};
//! use serde_json::{json, Value};
//!
//! let runtime = Arc::new(MemoryReplicants::<Value>::new("scoreboard"));
//! let options = ReplicantOptions::new().default_value(json!(0));
//!
//! // One binding per component instance, `render` on every render pass.
//! let mut score = ReplicantBinding::new(runtime.clone());
//! let (value, set_score) = score.render("score", &options).unwrap();
//! assert_eq!(value.as_deref(), Some(&json!(0)));
//!
//! set_score.set(json!(1)).unwrap();
//! assert_eq!(score.value().as_deref(), Some(&json!(1)));
//!
//! score.unmount().unwrap();
//! ```

pub mod error;
pub mod reactive;
pub mod replicant;

pub use error::{ReplicantError, Result};
pub use replicant::{ReplicantBinding, ReplicantOptions, ReplicantSetter};
