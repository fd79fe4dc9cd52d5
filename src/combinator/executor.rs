//! Executor affinity.
//!
//! [`with_executor`](FutureSupplier::with_executor) re-dispatches consumer
//! notifications through an [`Executor`] instead of running them on the
//! completing thread. If the executor refuses the delivery task (typically
//! because it shut down) the derived future is cancelled with
//! [`CancelReason::shutdown`].

use crate::exec::{self, Executor, Task};
use crate::future::{FutureSupplier, Promise};
use crate::tracing_compat::{trace, warn};
use crate::types::{CancelReason, Outcome, Value};
use std::sync::Arc;

fn same_executor(a: &Arc<dyn Executor>, b: &Arc<dyn Executor>) -> bool {
    std::ptr::eq(Arc::as_ptr(a).cast::<()>(), Arc::as_ptr(b).cast::<()>())
}

impl<T: Value> FutureSupplier<T> {
    /// Returns a future whose consumers are notified through `executor`.
    ///
    /// With `ignore_if_done`, a settled future is returned unchanged. A future
    /// already delivered through the same executor is also returned
    /// unchanged. Cancelling the result cancels this future.
    pub fn with_executor(
        &self,
        executor: Arc<dyn Executor>,
        ignore_if_done: bool,
    ) -> FutureSupplier<T> {
        if ignore_if_done && self.is_done() {
            return self.clone();
        }
        if self
            .affinity()
            .is_some_and(|current| same_executor(current, &executor))
        {
            return self.clone();
        }

        let promise = Promise::linked_with_affinity(self, Arc::clone(&executor));
        let p = promise.clone();
        self.register(move |outcome| {
            if executor.is_current() {
                p.complete_outcome(outcome.clone());
                return;
            }
            let target = p.clone();
            let outcome = outcome.clone();
            let task: Task = Box::new(move || {
                target.complete_outcome(outcome);
            });
            if executor.execute(task).is_err() {
                warn!(future_id = p.id(), "executor rejected delivery, cancelling future");
                p.complete_outcome(Outcome::Cancelled(CancelReason::shutdown()));
            }
        });
        promise.future()
    }

    /// Detaches the consumer chain from this future.
    ///
    /// A pending future is copied into an independent promise fed by this
    /// one; cancelling the copy leaves this future untouched. A settled
    /// future is returned unchanged.
    pub fn fork(&self) -> FutureSupplier<T> {
        if self.is_done() {
            return self.clone();
        }
        let promise = Promise::new();
        promise.complete_from(self);
        promise.future()
    }

    /// Delivers notifications on the process-wide affinity executor.
    ///
    /// A settled future observed from the affinity thread is returned
    /// unchanged, as is any future when no affinity executor is installed.
    pub fn on_affinity(&self) -> FutureSupplier<T> {
        let Some(executor) = exec::affinity_executor() else {
            trace!(future_id = self.id(), "no affinity executor installed");
            return self.clone();
        };
        if self.is_done() && executor.is_current() {
            return self.clone();
        }
        self.with_executor(executor, false)
    }
}
