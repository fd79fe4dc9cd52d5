//! An executor that only runs tasks when told to.

use crate::exec::{Executor, RejectedTask, Task};
use crate::sync::LockFreeQueue;
use parking_lot::Mutex;
use std::fmt;
use std::thread::{self, ThreadId};

/// Queues submitted tasks until the test drains them.
///
/// While [`run_pending`](Self::run_pending) or [`run_one`](Self::run_one) is
/// executing, [`is_current`](Executor::is_current) reports true on the
/// draining thread, so the executor behaves like an event loop being pumped.
#[derive(Default)]
pub struct ManualExecutor {
    tasks: LockFreeQueue<Task>,
    running_on: Mutex<Option<ThreadId>>,
    closed: Mutex<bool>,
}

struct RunningGuard<'a> {
    slot: &'a Mutex<Option<ThreadId>>,
    previous: Option<ThreadId>,
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        *self.slot.lock() = self.previous.take();
    }
}

impl ManualExecutor {
    /// Creates an executor with an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of queued tasks.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    /// Runs the front task, if any. Returns true if a task ran.
    pub fn run_one(&self) -> bool {
        let _guard = self.enter();
        match self.tasks.poll() {
            Some(task) => {
                task();
                true
            }
            None => false,
        }
    }

    /// Runs queued tasks, including ones they submit, until the queue is empty.
    ///
    /// Returns the number of tasks run.
    pub fn run_pending(&self) -> usize {
        let _guard = self.enter();
        let mut ran = 0;
        while let Some(task) = self.tasks.poll() {
            task();
            ran += 1;
        }
        ran
    }

    /// Rejects every later submission, as a stopped executor would.
    pub fn close(&self) {
        *self.closed.lock() = true;
    }

    fn enter(&self) -> RunningGuard<'_> {
        let previous = self.running_on.lock().replace(thread::current().id());
        RunningGuard {
            slot: &self.running_on,
            previous,
        }
    }
}

impl Executor for ManualExecutor {
    fn execute(&self, task: Task) -> Result<(), RejectedTask> {
        if *self.closed.lock() {
            return Err(RejectedTask::new(task));
        }
        self.tasks.offer(task);
        Ok(())
    }

    fn is_current(&self) -> bool {
        *self.running_on.lock() == Some(thread::current().id())
    }
}

impl fmt::Debug for ManualExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualExecutor")
            .field("pending", &self.pending())
            .finish_non_exhaustive()
    }
}
