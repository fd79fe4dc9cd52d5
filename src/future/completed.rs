//! Settled futures.
//!
//! Factories here build the smallest terminal representation for an outcome.
//! Values with a canonical representation (`None`, `()`, zero, `true`,
//! `false`, empty vector, empty map) map onto shared singletons, and every
//! cancellation maps onto the one shared cancelled future.
//!
//! When [`FutureConfig::log_failures`](crate::config::FutureConfig) is set, a
//! failed future logs its cause at construction time, where the producer's
//! context is still on the stack.

use super::{Canonical, FutureSupplier};
use crate::config;
use crate::error::{Error, Result};
use crate::tracing_compat::debug;
use crate::types::{CancelReason, Outcome, Value};
use std::collections::HashMap;
use std::hash::Hash;

/// A future that succeeded with `value`.
#[must_use]
pub fn completed<T: Value>(value: T) -> FutureSupplier<T> {
    FutureSupplier::settled(Outcome::Ok(value))
}

/// A future that failed with `error`.
///
/// A cancellation error yields the shared cancelled future.
#[must_use]
pub fn failed<T: Value>(error: Error) -> FutureSupplier<T> {
    if error.is_cancelled() {
        return cancelled();
    }
    if config::global().log_failures {
        debug!(kind = ?error.kind(), error = %error, "failed future constructed");
    }
    FutureSupplier::settled(Outcome::Err(error))
}

/// The shared cancelled future.
#[must_use]
pub const fn cancelled<T: Value>() -> FutureSupplier<T> {
    FutureSupplier::cancelled_singleton()
}

/// A future settled from a value-or-cause pair; the cause wins.
#[must_use]
pub fn from_result<T: Value>(result: Result<T>) -> FutureSupplier<T> {
    match result {
        Ok(value) => completed(value),
        Err(error) => failed(error),
    }
}

/// A future settled with `outcome`.
#[must_use]
pub fn from_outcome<T: Value>(outcome: Outcome<T>) -> FutureSupplier<T> {
    match outcome {
        Outcome::Ok(value) => completed(value),
        Outcome::Err(error) => failed(error),
        Outcome::Cancelled(_) => cancelled(),
    }
}

/// Settles an outcome handed along a chain of futures.
///
/// Unlike [`from_outcome`] this skips failure diagnostics, since the failure
/// was already reported where it was first constructed.
pub(crate) fn forwarded<T: Value>(outcome: Outcome<T>) -> FutureSupplier<T> {
    match outcome {
        Outcome::Cancelled(reason) if reason == CancelReason::default() => cancelled(),
        outcome => FutureSupplier::settled(outcome),
    }
}

/// The shared `Ok(None)` future.
#[must_use]
pub const fn completed_none<U: Value>() -> FutureSupplier<Option<U>> {
    FutureSupplier::canonical_value(Canonical::None, none::<U>)
}

/// Returns true if `future` is the shared `Ok(None)` future.
#[must_use]
pub fn is_completed_none<U: Value>(future: &FutureSupplier<Option<U>>) -> bool {
    future.canonical() == Some(Canonical::None)
}

/// The shared `Ok(())` future.
#[must_use]
pub const fn completed_unit() -> FutureSupplier<()> {
    FutureSupplier::canonical_value(Canonical::Unit, unit)
}

/// A boolean future; both values are shared singletons.
#[must_use]
pub const fn completed_bool(value: bool) -> FutureSupplier<bool> {
    if value {
        FutureSupplier::canonical_value(Canonical::True, yes)
    } else {
        FutureSupplier::canonical_value(Canonical::False, no)
    }
}

/// An `i32` future; zero is a shared singleton.
#[must_use]
pub fn completed_i32(value: i32) -> FutureSupplier<i32> {
    if value == 0 {
        FutureSupplier::canonical_value(Canonical::ZeroI32, i32::default)
    } else {
        completed(value)
    }
}

/// An `i64` future; zero is a shared singleton.
#[must_use]
pub fn completed_i64(value: i64) -> FutureSupplier<i64> {
    if value == 0 {
        FutureSupplier::canonical_value(Canonical::ZeroI64, i64::default)
    } else {
        completed(value)
    }
}

/// A vector future; the empty vector is a shared singleton.
#[must_use]
pub fn completed_vec<U: Value>(value: Vec<U>) -> FutureSupplier<Vec<U>> {
    if value.is_empty() {
        FutureSupplier::canonical_value(Canonical::EmptyVec, Vec::new)
    } else {
        completed(value)
    }
}

/// A map future; the empty map is a shared singleton.
#[must_use]
pub fn completed_map<K, V>(value: HashMap<K, V>) -> FutureSupplier<HashMap<K, V>>
where
    K: Value + Eq + Hash,
    V: Value,
{
    if value.is_empty() {
        FutureSupplier::canonical_value(Canonical::EmptyMap, HashMap::new)
    } else {
        completed(value)
    }
}

/// An optional future; `None` is the shared `Ok(None)` singleton.
#[must_use]
pub fn completed_option<U: Value>(value: Option<U>) -> FutureSupplier<Option<U>> {
    match value {
        Some(value) => completed(Some(value)),
        None => completed_none(),
    }
}

/// A settled copy of a settled future, detached from its promise.
///
/// Returns `None` while `done` is pending.
#[must_use]
pub fn settled_copy<T: Value>(done: &FutureSupplier<T>) -> Option<FutureSupplier<T>> {
    if done.is_terminal() {
        return Some(done.clone());
    }
    done.outcome().map(from_outcome)
}

/// Like [`settled_copy`], but a failed or cancelled future yields `None`.
#[must_use]
pub fn settled_or_none<T: Value>(done: &FutureSupplier<T>) -> Option<FutureSupplier<T>> {
    if done.is_failed() {
        return None;
    }
    settled_copy(done)
}

fn none<U>() -> Option<U> {
    None
}

fn unit() {}

fn yes() -> bool {
    true
}

fn no() -> bool {
    false
}
