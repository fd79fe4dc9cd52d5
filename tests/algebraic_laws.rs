//! Algebraic law property tests for futures and the queue.
//!
//! # Laws Tested
//!
//! ## Functor Laws
//! - map(identity) preserves the value
//! - map(f).map(g) equals map(g . f)
//! - map over a failure keeps the failure
//!
//! ## Monad Laws
//! - completed(a).then(f) equals f(a)
//! - m.then(completed) equals m
//! - then is associative
//!
//! ## Completion Laws
//! - the first transition wins, whatever follows
//! - settled and pending sources give the same combinator results
//!
//! ## Queue Laws
//! - offer/poll sequences behave like a `VecDeque`

mod common;

use common::test_proptest_config;
use promissory::future::completed;
use promissory::{Error, ErrorKind, FutureSupplier, LockFreeQueue, Promise};
use proptest::prelude::*;
use std::collections::VecDeque;

// ============================================================================
// Strategies
// ============================================================================

#[derive(Debug, Clone)]
enum Transition {
    Complete(i32),
    Fail,
    Cancel,
}

fn arb_transition() -> impl Strategy<Value = Transition> {
    prop_oneof![
        any::<i32>().prop_map(Transition::Complete),
        Just(Transition::Fail),
        Just(Transition::Cancel),
    ]
}

#[derive(Debug, Clone)]
enum QueueOp {
    Offer(u16),
    Poll,
    Peek,
}

fn arb_queue_op() -> impl Strategy<Value = QueueOp> {
    prop_oneof![
        3 => any::<u16>().prop_map(QueueOp::Offer),
        2 => Just(QueueOp::Poll),
        1 => Just(QueueOp::Peek),
    ]
}

/// Builds a future holding `value`, either settled up front or completed
/// after the combinators have been attached.
fn source(value: i32, settled: bool) -> (FutureSupplier<i32>, Option<Promise<i32>>) {
    if settled {
        (completed::completed(value), None)
    } else {
        let promise = Promise::new();
        (promise.future(), Some(promise))
    }
}

fn finish(pending: Option<Promise<i32>>, value: i32) {
    if let Some(promise) = pending {
        promise.complete(value);
    }
}

fn apply(promise: &Promise<i32>, transition: &Transition) -> bool {
    match transition {
        Transition::Complete(v) => promise.complete(*v),
        Transition::Fail => promise.complete_exceptionally(Error::failed("law")),
        Transition::Cancel => promise.cancel(),
    }
}

fn f(x: i32) -> i32 {
    x.wrapping_mul(3)
}

fn g(x: i32) -> i32 {
    x.wrapping_sub(11)
}

// ============================================================================
// Functor laws
// ============================================================================

proptest! {
    #![proptest_config(test_proptest_config(256))]

    #[test]
    fn functor_identity(value in any::<i32>(), settled in any::<bool>()) {
        let (future, pending) = source(value, settled);
        let mapped = future.map(|x| x);
        finish(pending, value);
        prop_assert_eq!(mapped.get().unwrap(), value);
    }

    #[test]
    fn functor_composition(value in any::<i32>(), settled in any::<bool>()) {
        let (future, pending) = source(value, settled);
        let chained = future.map(f).map(g);
        let composed = future.map(|x| g(f(x)));
        finish(pending, value);
        prop_assert_eq!(chained.get().unwrap(), composed.get().unwrap());
    }

    #[test]
    fn map_preserves_failure(message in "[a-z]{1,12}") {
        let failed: FutureSupplier<i32> = completed::failed(Error::failed(message.clone()));
        let mapped = failed.map(f).map(g);
        let cause = mapped.failure().expect("failure kept");
        prop_assert_eq!(cause.kind(), ErrorKind::Failed);
        prop_assert_eq!(cause.message(), Some(message.as_str()));
    }
}

// ============================================================================
// Monad laws
// ============================================================================

proptest! {
    #![proptest_config(test_proptest_config(256))]

    #[test]
    fn monad_left_identity(value in any::<i32>()) {
        let k = |x: i32| completed::completed(f(x));
        let bound = completed::completed(value).then(k);
        prop_assert_eq!(bound.get().unwrap(), k(value).get().unwrap());
    }

    #[test]
    fn monad_right_identity(value in any::<i32>(), settled in any::<bool>()) {
        let (future, pending) = source(value, settled);
        let bound = future.then(completed::completed);
        finish(pending, value);
        prop_assert_eq!(bound.get().unwrap(), value);
    }

    #[test]
    fn monad_associativity(value in any::<i32>(), settled in any::<bool>()) {
        let k = |x: i32| completed::completed(f(x));
        let h = |x: i32| completed::completed(g(x));
        let (future, pending) = source(value, settled);
        let left = future.then(k).then(h);
        let right = future.then(move |x| k(x).then(h));
        finish(pending, value);
        prop_assert_eq!(left.get().unwrap(), right.get().unwrap());
    }
}

// ============================================================================
// Completion laws
// ============================================================================

proptest! {
    #![proptest_config(test_proptest_config(256))]

    #[test]
    fn first_transition_wins(
        transitions in proptest::collection::vec(arb_transition(), 1..8)
    ) {
        let promise = Promise::new();
        let results: Vec<bool> = transitions.iter().map(|t| apply(&promise, t)).collect();
        prop_assert!(results[0]);
        prop_assert!(results[1..].iter().all(|won| !won));

        let future = promise.future();
        match &transitions[0] {
            Transition::Complete(v) => prop_assert_eq!(future.get().unwrap(), *v),
            Transition::Fail => {
                prop_assert!(future.is_failed());
                prop_assert!(!future.is_cancelled());
            }
            Transition::Cancel => prop_assert!(future.is_cancelled()),
        }
    }

    #[test]
    fn recovery_only_sees_failures(transition in arb_transition()) {
        let promise = Promise::new();
        let recovered = promise.future().if_fail(|_| Ok(-1));
        apply(&promise, &transition);
        let expected = match transition {
            Transition::Complete(v) => v,
            Transition::Fail | Transition::Cancel => -1,
        };
        prop_assert_eq!(recovered.get().unwrap(), expected);
    }
}

// ============================================================================
// Queue laws
// ============================================================================

proptest! {
    #![proptest_config(test_proptest_config(256))]

    #[test]
    fn queue_matches_vecdeque_model(
        ops in proptest::collection::vec(arb_queue_op(), 0..64)
    ) {
        let queue = LockFreeQueue::new();
        let mut model = VecDeque::new();
        for op in ops {
            match op {
                QueueOp::Offer(v) => {
                    queue.offer(v);
                    model.push_back(v);
                }
                QueueOp::Poll => prop_assert_eq!(queue.poll(), model.pop_front()),
                QueueOp::Peek => prop_assert_eq!(queue.peek(), model.front().copied()),
            }
            prop_assert_eq!(queue.len(), model.len());
            prop_assert_eq!(queue.is_empty(), model.is_empty());
        }
        let remaining: Vec<u16> = queue.iter().collect();
        prop_assert_eq!(remaining, model.into_iter().collect::<Vec<_>>());
    }
}
