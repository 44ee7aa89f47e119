//! Errors raised by the in-memory replicant runtime.
//!
//! The binding itself defines no errors. It hands back whatever error type the
//! runtime behind it uses.

use thiserror::Error;

/// Errors raised by [`MemoryReplicants`](crate::replicant::MemoryReplicants)
/// and its handles.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplicantError {
    /// Replicant names must be non-empty.
    #[error("invalid replicant name {name:?} in bundle {bundle:?}")]
    InvalidName { name: String, bundle: String },

    /// Bundle names must be non-empty.
    #[error("invalid bundle name {bundle:?} for replicant {name:?}")]
    InvalidBundle { name: String, bundle: String },
}

pub type Result<T, E = ReplicantError> = std::result::Result<T, E>;
