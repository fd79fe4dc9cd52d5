//! Execution capabilities consumed by the combinators.
//!
//! Futures never own threads. Two narrow capabilities are borrowed from the
//! application instead:
//!
//! - [`Executor`]: run a task later, possibly on another thread
//! - [`Scheduler`]: run a task after a delay, with a cancellable handle
//!
//! # Provided implementations
//!
//! - [`InlineExecutor`]: runs every task on the submitting thread
//! - [`crate::lab`]: deterministic doubles for tests
//!
//! Thread pools and message loops belong to the application; wrapping one is
//! a matter of implementing [`Executor`] (and [`Scheduler`] for timeouts).
//!
//! # Affinity
//!
//! One executor may be designated as the process-wide affinity context (for
//! example a UI loop), see [`set_affinity_executor`] and
//! [`FutureSupplier::on_affinity`](crate::FutureSupplier::on_affinity).

use parking_lot::{const_rwlock, RwLock};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// A unit of work handed to an executor or scheduler.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// A task an executor refused, typically because it shut down.
pub struct RejectedTask(Task);

impl RejectedTask {
    /// Wraps a refused task.
    #[must_use]
    pub fn new(task: Task) -> Self {
        Self(task)
    }

    /// Returns the refused task.
    #[must_use]
    pub fn into_task(self) -> Task {
        self.0
    }
}

impl fmt::Debug for RejectedTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RejectedTask")
    }
}

/// Capability to run tasks asynchronously.
///
/// Implementations may run the task inline or defer it arbitrarily.
pub trait Executor: Send + Sync {
    /// Submits a task for execution.
    ///
    /// Returns the task back if the executor can no longer accept work.
    fn execute(&self, task: Task) -> Result<(), RejectedTask>;

    /// Returns true if the calling thread is already running inside this
    /// executor, so a task for it may run inline.
    fn is_current(&self) -> bool {
        false
    }
}

/// Cancellation handle for a scheduled timer.
pub trait TimerHandle: Send + Sync {
    /// Cancels the timer.
    ///
    /// Returns true if the timer had not fired and will now never fire.
    fn cancel(&self) -> bool;

    /// Returns true while the timer has neither fired nor been cancelled.
    fn is_pending(&self) -> bool;
}

/// Capability to run a task after a delay.
pub trait Scheduler: Send + Sync {
    /// Schedules `task` to run once `delay` has elapsed.
    fn schedule_after(&self, delay: Duration, task: Task) -> Box<dyn TimerHandle>;
}

/// Runs every task immediately on the submitting thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineExecutor;

impl Executor for InlineExecutor {
    fn execute(&self, task: Task) -> Result<(), RejectedTask> {
        task();
        Ok(())
    }

    fn is_current(&self) -> bool {
        true
    }
}

static AFFINITY: RwLock<Option<Arc<dyn Executor>>> = const_rwlock(None);

/// Designates the process-wide affinity executor, returning the previous one.
pub fn set_affinity_executor(executor: Arc<dyn Executor>) -> Option<Arc<dyn Executor>> {
    AFFINITY.write().replace(executor)
}

/// Removes the affinity executor, returning it.
pub fn clear_affinity_executor() -> Option<Arc<dyn Executor>> {
    AFFINITY.write().take()
}

/// Returns the affinity executor, if one is installed.
#[must_use]
pub fn affinity_executor() -> Option<Arc<dyn Executor>> {
    AFFINITY.read().clone()
}

/// Returns true if the calling thread runs inside the affinity executor.
#[must_use]
pub fn on_affinity_thread() -> bool {
    AFFINITY.read().as_ref().is_some_and(|e| e.is_current())
}
