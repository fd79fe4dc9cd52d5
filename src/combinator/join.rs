//! Joining two futures.
//!
//! The joined future succeeds with both values once both inputs succeed, and
//! settles with the first failure or cancellation as soon as either input
//! reports one. Cancelling the joined future cancels both inputs.

use crate::future::promise::CancelHook;
use crate::future::{completed, FutureSupplier, Promise};
use crate::types::{Outcome, Value};
use parking_lot::Mutex;
use std::sync::Arc;

struct Pair<A, B> {
    left: Option<A>,
    right: Option<B>,
}

impl<A: Value, B: Value> Pair<A, B> {
    fn take_both(&mut self) -> Option<(A, B)> {
        if self.left.is_some() && self.right.is_some() {
            self.left.take().zip(self.right.take())
        } else {
            None
        }
    }
}

impl<T: Value> FutureSupplier<T> {
    /// Joins this future with `other`.
    pub fn and<U: Value>(&self, other: &FutureSupplier<U>) -> FutureSupplier<(T, U)> {
        if let Some(failure) = self.retype_failure::<(T, U)>() {
            return failure;
        }
        if let Some(failure) = other.retype_failure::<(T, U)>() {
            return failure;
        }
        if self.is_terminal() && other.is_terminal() {
            if let (Some(left), Some(right)) = (self.peek(), other.peek()) {
                return completed::completed((left, right));
            }
        }

        let hooks: Vec<CancelHook> = [self.cancel_hook(), other.cancel_hook()]
            .into_iter()
            .flatten()
            .collect();
        let upstream: CancelHook = Box::new(move || {
            for hook in &hooks {
                hook();
            }
        });
        let promise = Promise::with_upstream(Some(upstream));
        let pair = Arc::new(Mutex::new(Pair {
            left: None,
            right: None,
        }));

        let (p, slot) = (promise.clone(), Arc::clone(&pair));
        self.register(move |outcome| match outcome {
            Outcome::Ok(value) => {
                let both = {
                    let mut pair = slot.lock();
                    pair.left = Some(value.clone());
                    pair.take_both()
                };
                if let Some(both) = both {
                    p.complete(both);
                }
            }
            failed => {
                if let Some(outcome) = failed.propagate::<(T, U)>() {
                    p.complete_outcome(outcome);
                }
            }
        });

        let (p, slot) = (promise.clone(), pair);
        other.register(move |outcome| match outcome {
            Outcome::Ok(value) => {
                let both = {
                    let mut pair = slot.lock();
                    pair.right = Some(value.clone());
                    pair.take_both()
                };
                if let Some(both) = both {
                    p.complete(both);
                }
            }
            failed => {
                if let Some(outcome) = failed.propagate::<(T, U)>() {
                    p.complete_outcome(outcome);
                }
            }
        });
        promise.future()
    }

    /// Joins with `other` and runs `f` on both values.
    ///
    /// The result succeeds with `()` once `f` has run.
    pub fn and_consume<U: Value>(
        &self,
        other: &FutureSupplier<U>,
        f: impl FnOnce(T, U) + Send + 'static,
    ) -> FutureSupplier<()> {
        self.and(other).map(move |(left, right)| f(left, right))
    }
}

#[cfg(test)]
mod tests {
    use crate::error::{Error, ErrorKind};
    use crate::future::{completed, Promise};
    use crate::{assert_outcome_cancelled, assert_outcome_ok};
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn settled_inputs_join_synchronously() {
        let joined = completed::completed(1).and(&completed::completed("one"));
        assert!(joined.is_terminal());
        assert_eq!(joined.get().unwrap(), (1, "one"));
    }

    #[test]
    fn waits_for_both() {
        let (a, b) = (Promise::new(), Promise::new());
        let joined = a.future().and(&b.future());
        b.complete(String::from("b"));
        assert!(!joined.is_done());
        a.complete(2_u8);
        assert_outcome_ok!(joined.outcome(), (2, String::from("b")));
    }

    #[test]
    fn first_failure_wins() {
        let (a, b) = (Promise::<u8>::new(), Promise::<u8>::new());
        let joined = a.future().and(&b.future());
        b.complete_exceptionally(Error::failed("right side"));
        assert_eq!(joined.failure().map(|e| e.kind()), Some(ErrorKind::Failed));
        a.complete(1);
        assert!(joined.is_failed());

        let settled = completed::completed(1).and(&completed::cancelled::<u8>());
        assert!(settled.is_cancelled_singleton());
    }

    #[test]
    fn cancelling_join_cancels_both_inputs() {
        let (a, b) = (Promise::<u8>::new(), Promise::<u8>::new());
        let joined = a.future().and(&b.future());
        assert!(joined.cancel());
        assert!(a.is_cancelled());
        assert!(b.is_cancelled());
        assert_outcome_cancelled!(joined.outcome());
    }

    #[test]
    fn and_consume_sees_both_values() {
        let seen = Arc::new(Mutex::new(None));
        let s = Arc::clone(&seen);
        let a = Promise::new();
        let done = a
            .future()
            .and_consume(&completed::completed(10), move |x: i32, y| {
                *s.lock() = Some(x + y);
            });
        a.complete(5);
        assert_eq!(*seen.lock(), Some(15));
        assert_outcome_ok!(done.outcome(), ());
    }
}
