//! Dependent asynchronous steps.
//!
//! `then` runs a function that itself returns a future and completes the
//! result with whatever that inner future produces. Cancelling the result
//! cancels the source and, once it exists, the inner future.

use crate::error::Result;
use crate::future::promise::CancelHook;
use crate::future::{completed, FutureSupplier, Promise};
use crate::types::outcome::guarded;
use crate::types::{Outcome, Value};
use parking_lot::Mutex;
use std::sync::Arc;

impl<T: Value> FutureSupplier<T> {
    /// Chains a dependent step that produces a future.
    ///
    /// Failure and cancellation pass through without calling `f`.
    pub fn then<R: Value>(
        &self,
        f: impl FnOnce(T) -> FutureSupplier<R> + Send + 'static,
    ) -> FutureSupplier<R> {
        self.try_then(move |value| Ok(f(value)))
    }

    /// Like [`then`](Self::then), for a step that can fail before producing
    /// its future.
    pub fn try_then<R: Value>(
        &self,
        f: impl FnOnce(T) -> Result<FutureSupplier<R>> + Send + 'static,
    ) -> FutureSupplier<R> {
        if let Some(failure) = self.retype_failure::<R>() {
            return failure;
        }
        if self.is_terminal() {
            if let Some(value) = self.peek() {
                return guarded(|| f(value)).unwrap_or_else(completed::failed);
            }
        }

        let inner: Arc<Mutex<Option<CancelHook>>> = Arc::new(Mutex::new(None));
        let parent = self.cancel_hook();
        let slot = Arc::clone(&inner);
        let upstream: CancelHook = Box::new(move || {
            if let Some(hook) = &parent {
                hook();
            }
            let hook = slot.lock().take();
            if let Some(hook) = hook {
                hook();
            }
        });
        let promise = Promise::with_upstream(Some(upstream));

        let p = promise.clone();
        self.register(move |outcome| match outcome {
            Outcome::Ok(value) => {
                let value = value.clone();
                match guarded(move || f(value)) {
                    Ok(next) => follow(&p, &next, &inner),
                    Err(error) => {
                        p.complete_outcome(Outcome::from_error(error));
                    }
                }
            }
            Outcome::Err(error) => {
                p.complete_outcome(Outcome::Err(error.clone()));
            }
            Outcome::Cancelled(reason) => {
                p.complete_outcome(Outcome::Cancelled(reason.clone()));
            }
        });
        promise.future()
    }
}

/// Completes `promise` from `next`, cancelling `next` if the promise was
/// cancelled first.
fn follow<R: Value>(
    promise: &Promise<R>,
    next: &FutureSupplier<R>,
    inner: &Mutex<Option<CancelHook>>,
) {
    *inner.lock() = next.cancel_hook();
    if promise.is_cancelled() {
        let hook = inner.lock().take();
        if let Some(hook) = hook {
            hook();
        }
        return;
    }
    promise.complete_from(next);
}
