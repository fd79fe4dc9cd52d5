//! Value transformations and failure recovery.

use crate::error::{Error, Result};
use crate::future::{completed, FutureSupplier, Promise};
use crate::types::outcome::guarded;
use crate::types::{Outcome, Value};

fn map_outcome<T: Value, R: Value>(
    outcome: &Outcome<T>,
    f: impl FnOnce(T) -> Result<R>,
) -> Outcome<R> {
    match outcome {
        Outcome::Ok(value) => Outcome::from_result(guarded(|| f(value.clone()))),
        Outcome::Err(error) => Outcome::Err(error.clone()),
        Outcome::Cancelled(reason) => Outcome::Cancelled(reason.clone()),
    }
}

fn recover_outcome<T: Value>(
    outcome: &Outcome<T>,
    f: impl FnOnce(Error) -> Result<T>,
) -> Outcome<T> {
    match outcome.failure() {
        Some(error) => Outcome::from_result(guarded(|| f(error))),
        None => outcome.clone(),
    }
}

impl<T: Value> FutureSupplier<T> {
    /// Transforms the success value.
    ///
    /// Failure and cancellation pass through without calling `f`. Cancelling
    /// the result cancels this future.
    pub fn map<R: Value>(&self, f: impl FnOnce(T) -> R + Send + 'static) -> FutureSupplier<R> {
        self.try_map(move |value| Ok(f(value)))
    }

    /// Like [`map`](Self::map), for a fallible transformation.
    pub fn try_map<R: Value>(
        &self,
        f: impl FnOnce(T) -> Result<R> + Send + 'static,
    ) -> FutureSupplier<R> {
        if let Some(failure) = self.retype_failure::<R>() {
            return failure;
        }
        if let Some(outcome) = self.resolved() {
            return completed::from_outcome(map_outcome(&outcome, f));
        }
        let promise = Promise::linked(self);
        let p = promise.clone();
        self.register(move |outcome| {
            p.complete_outcome(map_outcome(outcome, f));
        });
        promise.future()
    }

    /// Recovers from a failure (cancellation included) with `f(cause)`.
    ///
    /// A success passes through unchanged. An error returned by `f` becomes
    /// the new failure.
    pub fn if_fail(&self, f: impl FnOnce(Error) -> Result<T> + Send + 'static) -> FutureSupplier<T> {
        match self.resolved() {
            Some(outcome) if outcome.is_ok() => return self.clone(),
            Some(outcome) => return completed::from_outcome(recover_outcome(&outcome, f)),
            None => {}
        }
        let promise = Promise::linked(self);
        let p = promise.clone();
        self.register(move |outcome| {
            p.complete_outcome(recover_outcome(outcome, f));
        });
        promise.future()
    }
}

impl<U: Value> FutureSupplier<Option<U>> {
    /// Unwraps the optional value, substituting `f()` for `None`.
    pub fn if_none(&self, f: impl FnOnce() -> U + Send + 'static) -> FutureSupplier<U> {
        self.map(move |value| value.unwrap_or_else(f))
    }

    /// Runs `f` on a present success value. The result is unchanged.
    pub fn if_some(&self, f: impl FnOnce(&U) + Send + 'static) -> &Self {
        self.on_success(move |value| {
            if let Some(value) = &value {
                f(value);
            }
        })
    }
}
