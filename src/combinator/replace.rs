//! Forwarding a completion to slots, promises and side effects.

use crate::future::{completed, FutureCell, FutureSupplier, Promise};
use crate::tracing_compat::debug;
use crate::types::outcome::guarded;
use crate::types::{Outcome, Value};

impl<T: Value> FutureSupplier<T> {
    /// Swaps this future in `cell` for a settled copy once it settles.
    ///
    /// The swap only happens while `cell` still holds this very future, so at
    /// most one of several racing replacements wins. A settled future returns
    /// its copy; a pending one returns itself.
    pub fn then_replace(&self, cell: &FutureCell<T>) -> FutureSupplier<T> {
        self.replace_in(cell, completed::settled_copy)
    }

    /// Like [`then_replace`](Self::then_replace), but a failed future clears
    /// the cell instead of caching the failure.
    pub fn then_replace_or_clear(&self, cell: &FutureCell<T>) -> FutureSupplier<T> {
        self.replace_in(cell, completed::settled_or_none)
    }

    fn replace_in(
        &self,
        cell: &FutureCell<T>,
        replacement: fn(&FutureSupplier<T>) -> Option<FutureSupplier<T>>,
    ) -> FutureSupplier<T> {
        if self.is_done() {
            let settled = replacement(self);
            cell.compare_and_set(self, settled.clone());
            return settled.unwrap_or_else(|| self.clone());
        }
        let target = cell.clone();
        let expected = self.clone();
        self.register(move |_| {
            target.compare_and_set(&expected, replacement(&expected));
        });
        self.clone()
    }

    /// Completes `promise` with this future's outcome once settled.
    pub fn then_complete(&self, promise: &Promise<T>) -> &Self {
        self.complete_into(promise)
    }

    /// Runs `f` once this future settles, whatever the outcome.
    ///
    /// A failure of this future is logged and otherwise ignored. The result
    /// succeeds with `()` after `f` returns; cancelling it cancels this
    /// future.
    pub fn then_run(&self, f: impl FnOnce() + Send + 'static) -> FutureSupplier<()> {
        let run = move |outcome: &Outcome<T>| -> Outcome<()> {
            if let Some(error) = outcome.failure() {
                debug!(error = %error, "running continuation after failure");
            }
            Outcome::from_result(guarded(|| {
                f();
                Ok(())
            }))
        };
        if let Some(outcome) = self.resolved() {
            return match run(&outcome) {
                Outcome::Ok(()) => completed::completed_unit(),
                failed => completed::from_outcome(failed),
            };
        }
        let promise = Promise::linked(self);
        let p = promise.clone();
        self.register(move |outcome| {
            p.complete_outcome(run(outcome));
        });
        promise.future()
    }
}
