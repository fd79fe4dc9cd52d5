//! Sequential chains of dependent futures.
//!
//! An iteration starts from the source future and repeatedly asks a step
//! function for the next future once the current one has settled. The result
//! settles with the outcome of the last future when the step function
//! returns `None`. Settled steps are consumed in a loop, so long chains of
//! already-completed futures do not grow the stack.
//!
//! Cancelling the result cancels the step that is currently pending.

use crate::error::Result;
use crate::future::promise::CancelHook;
use crate::future::{FutureSupplier, Promise};
use crate::types::outcome::guarded;
use crate::types::{Outcome, Value};
use parking_lot::Mutex;
use std::sync::Arc;

type StepFn<T> = Box<dyn FnMut(&FutureSupplier<T>) -> Result<Option<FutureSupplier<T>>> + Send>;

struct Iteration<T> {
    step: Mutex<StepFn<T>>,
    current: Mutex<Option<CancelHook>>,
}

impl<T: Value> Iteration<T> {
    fn start(source: &FutureSupplier<T>, step: StepFn<T>) -> FutureSupplier<T> {
        let iteration = Arc::new(Self {
            step: Mutex::new(step),
            current: Mutex::new(None),
        });
        let it = Arc::clone(&iteration);
        let upstream: CancelHook = Box::new(move || {
            let hook = it.current.lock().take();
            if let Some(hook) = hook {
                hook();
            }
        });
        let promise = Promise::with_upstream(Some(upstream));
        let result = promise.future();
        drive(iteration, source.clone(), promise);
        result
    }
}

fn drive<T: Value>(iteration: Arc<Iteration<T>>, mut current: FutureSupplier<T>, promise: Promise<T>) {
    loop {
        if promise.is_done() {
            current.cancel();
            return;
        }
        if !current.is_done() {
            *iteration.current.lock() = current.cancel_hook();
            if promise.is_cancelled() {
                current.cancel();
                return;
            }
            let c = current.clone();
            current.register(move |_| drive(iteration, c, promise));
            return;
        }

        let next = {
            let mut guard = iteration.step.lock();
            let step = &mut *guard;
            guarded(|| step(&current))
        };
        match next {
            Ok(Some(next)) => current = next,
            Ok(None) => {
                if let Some(outcome) = current.outcome() {
                    promise.complete_outcome(outcome);
                }
                return;
            }
            Err(error) => {
                promise.complete_outcome(Outcome::from_error(error));
                return;
            }
        }
    }
}

impl<T: Value> FutureSupplier<T> {
    /// Iterates with a function that sees every settled step, failed ones
    /// included, and returns the next step or `None` to stop.
    ///
    /// Seeing failures lets the function express bounded retries.
    pub fn then_iterate(
        &self,
        mut next: impl FnMut(&FutureSupplier<T>) -> Option<FutureSupplier<T>> + Send + 'static,
    ) -> FutureSupplier<T> {
        Iteration::start(self, Box::new(move |done| Ok(next(done))))
    }

    /// Waits for each future of `steps` in turn, stopping at the first
    /// failure. The result settles with the last step's outcome.
    pub fn then_iterate_all<I>(&self, steps: I) -> FutureSupplier<T>
    where
        I: IntoIterator<Item = FutureSupplier<T>>,
        I::IntoIter: Send + 'static,
    {
        let mut steps = steps.into_iter();
        Iteration::start(
            self,
            Box::new(move |done| Ok(if done.is_failed() { None } else { steps.next() })),
        )
    }

    /// Asks `supplier` for the next step until it returns `None`, stopping at
    /// the first failure.
    pub fn then_iterate_with(
        &self,
        mut supplier: impl FnMut() -> Result<Option<FutureSupplier<T>>> + Send + 'static,
    ) -> FutureSupplier<T> {
        Iteration::start(
            self,
            Box::new(move |done| {
                if done.is_failed() {
                    Ok(None)
                } else {
                    supplier()
                }
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use crate::error::{Error, ErrorKind};
    use crate::future::{completed, FutureSupplier, Promise};
    use crate::{assert_outcome_cancelled, assert_outcome_err, assert_outcome_ok};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn retries_until_success() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let a = Arc::clone(&attempts);
        let first: FutureSupplier<u32> = completed::failed(Error::failed("attempt 0"));
        let result = first.then_iterate(move |done| {
            if !done.is_failed() {
                return None;
            }
            let n = a.fetch_add(1, Ordering::SeqCst) + 1;
            Some(if n < 3 {
                completed::failed(Error::failed(format!("attempt {n}")))
            } else {
                completed::completed(42)
            })
        });
        assert_outcome_ok!(result.outcome(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn gives_up_with_last_failure() {
        let result = completed::failed::<u32>(Error::failed("only"))
            .then_iterate(|_| None);
        assert_outcome_err!(result.outcome());
    }

    #[test]
    fn pending_steps_run_in_order() {
        let steps: Vec<Promise<u32>> = (0..3).map(|_| Promise::new()).collect();
        let futures: Vec<_> = steps.iter().map(Promise::future).collect();
        let source: Promise<u32> = Promise::new();
        let result = source.future().then_iterate_all(futures);

        source.complete(0);
        for (i, step) in (1_u32..).zip(&steps) {
            assert!(!result.is_done());
            step.complete(i);
        }
        assert_outcome_ok!(result.outcome(), 3);
    }

    #[test]
    fn iterator_stops_at_first_failure() {
        let reached = Arc::new(AtomicUsize::new(0));
        let r = Arc::clone(&reached);
        let steps = vec![
            completed::completed(1),
            completed::failed(Error::failed("step 2")),
            completed::completed(3),
        ]
        .into_iter()
        .inspect(move |_| {
            r.fetch_add(1, Ordering::SeqCst);
        });
        let result = completed::completed(0).then_iterate_all(steps);
        assert_eq!(result.failure().map(|e| e.kind()), Some(ErrorKind::Failed));
        assert_eq!(reached.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn supplier_runs_until_exhausted() {
        let produced = Arc::new(Mutex::new(Vec::new()));
        let p = Arc::clone(&produced);
        let mut n = 0;
        let result = completed::completed(0).then_iterate_with(move || {
            n += 1;
            if n > 4 {
                return Ok(None);
            }
            p.lock().push(n);
            Ok(Some(completed::completed(n)))
        });
        assert_outcome_ok!(result.outcome(), 4);
        assert_eq!(*produced.lock(), vec![1, 2, 3, 4]);

        let failing = completed::completed(0)
            .then_iterate_with(|| Err(Error::failed("no more input")));
        assert_outcome_err!(failing.outcome());
    }

    #[test]
    fn long_settled_chain_does_not_overflow() {
        let mut remaining = 100_000_u32;
        let result = completed::completed(0_u32).then_iterate(move |done| {
            if remaining == 0 {
                return None;
            }
            remaining -= 1;
            Some(completed::completed(done.peek_or(0) + 1))
        });
        assert_outcome_ok!(result.outcome(), 100_000);
    }

    #[test]
    fn cancelling_result_cancels_current_step() {
        let step: Promise<u32> = Promise::new();
        let step_future = step.future();
        let result = completed::completed(0).then_iterate_all(vec![step_future]);
        assert!(!result.is_done());
        assert!(result.cancel());
        assert!(step.is_cancelled());
        assert_outcome_cancelled!(result.outcome());
    }
}
