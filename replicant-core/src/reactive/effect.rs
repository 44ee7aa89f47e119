//! Effect Implementation
//!
//! An Effect is a side-effecting setup that owns a cleanup. It is used to
//! attach a component to something outside it (an event listener on a shared
//! handle, a timer) and to guarantee detachment.
//!
//! # How Effects Work
//!
//! 1. `run` first executes the cleanup left by the previous run, if any.
//!
//! 2. It then runs the setup function. A successful setup returns the cleanup
//!    for this run, which the effect holds until the next `run`, `cleanup`, or
//!    `dispose`.
//!
//! 3. `dispose` executes the pending cleanup and refuses any further runs.
//!    Dropping the effect disposes it.
//!
//! # Errors
//!
//! Both setup and cleanup are fallible with the same error type. Errors are
//! returned to the caller untouched. The one place they cannot be returned is
//! `Drop`; a cleanup failing there is logged and discarded.

use std::fmt::Display;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counter for generating unique effect IDs.
static EFFECT_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a new unique effect ID.
fn next_effect_id() -> u64 {
    EFFECT_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Cleanup returned by an effect's setup.
pub type Cleanup<E> = Box<dyn FnOnce() -> Result<(), E> + Send>;

/// A setup/cleanup pair with at most one cleanup pending at a time.
///
/// # Example
///
/// ```rust
/// use replicant_core::reactive::{Cleanup, Effect};
///
/// let mut effect: Effect<std::convert::Infallible> = Effect::new();
/// effect
///     .run(|| {
///         println!("attached");
///         Ok(Box::new(|| {
///             println!("detached");
///             Ok(())
///         }) as Cleanup<_>)
///     })
///     .unwrap();
/// effect.dispose().unwrap(); // prints "detached"
/// ```
pub struct Effect<E>
where
    E: Display,
{
    /// Unique identifier for this effect.
    id: u64,

    /// Cleanup from the last successful setup.
    cleanup: Option<Cleanup<E>>,

    /// Whether the effect has been disposed.
    disposed: bool,

    /// Number of successful setups.
    run_count: usize,
}

impl<E> Effect<E>
where
    E: Display,
{
    /// Create an effect that has not run yet.
    pub fn new() -> Self {
        Self {
            id: next_effect_id(),
            cleanup: None,
            disposed: false,
            run_count: 0,
        }
    }

    /// Get the effect's unique ID.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Clean up the previous run, then run `setup`.
    ///
    /// If the previous cleanup fails, `setup` does not run. Does nothing once
    /// the effect is disposed.
    pub fn run<F>(&mut self, setup: F) -> Result<(), E>
    where
        F: FnOnce() -> Result<Cleanup<E>, E>,
    {
        if self.disposed {
            return Ok(());
        }

        self.cleanup()?;

        let cleanup = setup()?;
        self.cleanup = Some(cleanup);
        self.run_count += 1;
        Ok(())
    }

    /// Execute the pending cleanup, if any, without disposing.
    pub fn cleanup(&mut self) -> Result<(), E> {
        match self.cleanup.take() {
            Some(cleanup) => cleanup(),
            None => Ok(()),
        }
    }

    /// Execute the pending cleanup and stop the effect from running again.
    pub fn dispose(&mut self) -> Result<(), E> {
        self.disposed = true;
        self.cleanup()
    }

    /// Check if the effect has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Whether a cleanup is waiting to run.
    pub fn is_active(&self) -> bool {
        self.cleanup.is_some()
    }

    /// Get the number of successful setups.
    pub fn run_count(&self) -> usize {
        self.run_count
    }
}

impl<E> Default for Effect<E>
where
    E: Display,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Drop for Effect<E>
where
    E: Display,
{
    fn drop(&mut self) {
        if let Err(error) = self.dispose() {
            tracing::warn!(effect = self.id, %error, "effect cleanup failed during drop");
        }
    }
}

impl<E> std::fmt::Debug for Effect<E>
where
    E: Display,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.id)
            .field("run_count", &self.run_count)
            .field("active", &self.is_active())
            .field("disposed", &self.disposed)
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicI32;
    use std::sync::Arc;

    fn counting_cleanup(counter: &Arc<AtomicI32>) -> Cleanup<String> {
        let counter = counter.clone();
        Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    #[test]
    fn effect_runs_setup() {
        let setups = Arc::new(AtomicI32::new(0));
        let cleanups = Arc::new(AtomicI32::new(0));
        let mut effect: Effect<String> = Effect::new();

        effect
            .run(|| {
                setups.fetch_add(1, Ordering::SeqCst);
                Ok(counting_cleanup(&cleanups))
            })
            .unwrap();

        assert_eq!(setups.load(Ordering::SeqCst), 1);
        assert_eq!(cleanups.load(Ordering::SeqCst), 0);
        assert_eq!(effect.run_count(), 1);
        assert!(effect.is_active());
    }

    #[test]
    fn rerun_cleans_up_previous_run_first() {
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let mut effect: Effect<String> = Effect::new();

        for round in 0..2 {
            let setup_log = order.clone();
            let cleanup_log = order.clone();
            effect
                .run(move || {
                    setup_log.lock().push(format!("setup {round}"));
                    Ok(Box::new(move || {
                        cleanup_log.lock().push(format!("cleanup {round}"));
                        Ok(())
                    }) as Cleanup<String>)
                })
                .unwrap();
        }

        assert_eq!(*order.lock(), vec!["setup 0", "cleanup 0", "setup 1"]);
    }

    #[test]
    fn effect_does_not_run_after_disposal() {
        let setups = Arc::new(AtomicI32::new(0));
        let cleanups = Arc::new(AtomicI32::new(0));
        let mut effect: Effect<String> = Effect::new();

        effect
            .run(|| {
                setups.fetch_add(1, Ordering::SeqCst);
                Ok(counting_cleanup(&cleanups))
            })
            .unwrap();

        effect.dispose().unwrap();
        assert!(effect.is_disposed());
        assert_eq!(cleanups.load(Ordering::SeqCst), 1);

        effect
            .run(|| {
                setups.fetch_add(1, Ordering::SeqCst);
                Ok(counting_cleanup(&cleanups))
            })
            .unwrap();
        assert_eq!(setups.load(Ordering::SeqCst), 1);

        // Cleanup already ran; disposing again is a no-op.
        effect.dispose().unwrap();
        assert_eq!(cleanups.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drop_runs_pending_cleanup() {
        let cleanups = Arc::new(AtomicI32::new(0));
        {
            let mut effect: Effect<String> = Effect::new();
            effect.run(|| Ok(counting_cleanup(&cleanups))).unwrap();
        }
        assert_eq!(cleanups.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failed_setup_leaves_no_cleanup() {
        let mut effect: Effect<String> = Effect::new();

        let err = effect.run(|| Err("nope".to_string())).unwrap_err();
        assert_eq!(err, "nope");
        assert!(!effect.is_active());
        assert_eq!(effect.run_count(), 0);
    }

    #[test]
    fn failed_cleanup_is_returned_and_skips_setup() {
        let setups = Arc::new(AtomicI32::new(0));
        let mut effect: Effect<String> = Effect::new();

        effect
            .run(|| Ok(Box::new(|| Err("stuck".to_string())) as Cleanup<String>))
            .unwrap();

        let err = effect
            .run(|| {
                setups.fetch_add(1, Ordering::SeqCst);
                Ok(Box::new(|| Ok(())) as Cleanup<String>)
            })
            .unwrap_err();

        assert_eq!(err, "stuck");
        assert_eq!(setups.load(Ordering::SeqCst), 0);
        assert!(!effect.is_active());
    }
}
