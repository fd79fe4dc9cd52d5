//! Futures: read-only handles to a result that settles exactly once.
//!
//! A [`FutureSupplier`] is pending until its producer sets one terminal
//! [`Outcome`]: success, failure or cancellation. Any number of consumers can
//! register before or after that; each is notified exactly once, and a
//! consumer registered on a settled future runs before registration returns.
//!
//! # Representations
//!
//! - **Pending**: backed by a [`Promise`] core (the core may settle later)
//! - **Settled**: an immutable terminal outcome, see [`completed`]
//! - **Canonical**: process-wide singletons for common empty values and the
//!   shared cancelled future, comparable by identity via [`FutureSupplier::ptr_eq`]
//!
//! Combinators on a settled future compute their result synchronously and
//! never allocate a pending future.

pub mod cell;
pub mod completed;
pub mod promise;
pub mod settle;

pub use cell::FutureCell;
pub use promise::Promise;
pub use settle::Settle;

use crate::error::{Error, Result};
use crate::tracing_compat::error;
use crate::types::{CancelReason, Outcome, Value};
use promise::{CancelHook, Core, Waiters};
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;

/// Identity tags of the canonical settled futures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Canonical {
    /// `Ok(None)`.
    None,
    /// `Ok(())`.
    Unit,
    /// `Ok(0_i32)`.
    ZeroI32,
    /// `Ok(0_i64)`.
    ZeroI64,
    /// `Ok(true)`.
    True,
    /// `Ok(false)`.
    False,
    /// `Ok(vec![])`.
    EmptyVec,
    /// `Ok(HashMap::new())`.
    EmptyMap,
}

/// A progress report from a producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    done: u64,
    total: u64,
}

impl Progress {
    /// Creates a report of `done` units out of `total`.
    #[must_use]
    pub const fn new(done: u64, total: u64) -> Self {
        Self { done, total }
    }

    /// Units completed.
    #[must_use]
    pub const fn done(&self) -> u64 {
        self.done
    }

    /// Units expected in total.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.total
    }

    /// Completed fraction in `[0, 1]`, or `None` when the total is unknown.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn fraction(&self) -> Option<f64> {
        (self.total > 0).then(|| (self.done.min(self.total) as f64) / (self.total as f64))
    }
}

enum Repr<T> {
    Pending(Arc<Core<T>>),
    Done(Arc<Outcome<T>>),
    Canonical(Canonical, fn() -> T),
    Cancelled,
}

impl<T> Clone for Repr<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Pending(core) => Self::Pending(Arc::clone(core)),
            Self::Done(outcome) => Self::Done(Arc::clone(outcome)),
            Self::Canonical(tag, make) => Self::Canonical(*tag, *make),
            Self::Cancelled => Self::Cancelled,
        }
    }
}

/// A terminal outcome borrowed from shared storage or built on demand.
pub(crate) enum Resolved<T> {
    Shared(Arc<Outcome<T>>),
    Owned(Outcome<T>),
}

impl<T> Deref for Resolved<T> {
    type Target = Outcome<T>;

    fn deref(&self) -> &Outcome<T> {
        match self {
            Self::Shared(outcome) => outcome,
            Self::Owned(outcome) => outcome,
        }
    }
}

impl<T: Clone> Resolved<T> {
    fn into_outcome(self) -> Outcome<T> {
        match self {
            Self::Shared(outcome) => Arc::try_unwrap(outcome).unwrap_or_else(|o| (*o).clone()),
            Self::Owned(outcome) => outcome,
        }
    }
}

/// A read-only handle to a result that settles exactly once.
///
/// Cloning is cheap and every clone observes the same outcome.
pub struct FutureSupplier<T> {
    repr: Repr<T>,
}

impl<T> Clone for FutureSupplier<T> {
    fn clone(&self) -> Self {
        Self {
            repr: self.repr.clone(),
        }
    }
}

impl<T: Value> FutureSupplier<T> {
    pub(crate) fn pending(core: Arc<Core<T>>) -> Self {
        Self {
            repr: Repr::Pending(core),
        }
    }

    pub(crate) fn settled(outcome: Outcome<T>) -> Self {
        Self {
            repr: Repr::Done(Arc::new(outcome)),
        }
    }

    pub(crate) const fn canonical_value(tag: Canonical, make: fn() -> T) -> Self {
        Self {
            repr: Repr::Canonical(tag, make),
        }
    }

    pub(crate) const fn cancelled_singleton() -> Self {
        Self {
            repr: Repr::Cancelled,
        }
    }

    /// Returns the outcome if settled.
    pub(crate) fn resolved(&self) -> Option<Resolved<T>> {
        match &self.repr {
            Repr::Pending(core) => core.outcome().map(Resolved::Shared),
            Repr::Done(outcome) => Some(Resolved::Shared(Arc::clone(outcome))),
            Repr::Canonical(_, make) => Some(Resolved::Owned(Outcome::Ok(make()))),
            Repr::Cancelled => Some(Resolved::Owned(Outcome::Cancelled(CancelReason::default()))),
        }
    }

    /// Registers a consumer of the terminal outcome.
    pub(crate) fn register(&self, consumer: impl FnOnce(&Outcome<T>) + Send + 'static) {
        match &self.repr {
            Repr::Pending(core) => core.register(Box::new(consumer)),
            _ => {
                if let Some(outcome) = self.resolved() {
                    promise::notify(0, Box::new(consumer), &outcome);
                }
            }
        }
    }

    /// A hook that cancels this future without keeping it alive.
    pub(crate) fn cancel_hook(&self) -> Option<CancelHook> {
        match &self.repr {
            Repr::Pending(core) => {
                let weak = Arc::downgrade(core);
                Some(Box::new(move || {
                    if let Some(core) = weak.upgrade() {
                        core.cancel(CancelReason::propagated());
                    }
                }))
            }
            _ => None,
        }
    }

    /// Re-types a settled failure, reusing the cancelled singleton.
    ///
    /// Returns `None` for pending and successful futures.
    pub(crate) fn retype_failure<R: Value>(&self) -> Option<FutureSupplier<R>> {
        match &self.repr {
            Repr::Cancelled => Some(FutureSupplier::cancelled_singleton()),
            _ => self
                .resolved()
                .and_then(|outcome| outcome.propagate::<R>())
                .map(completed::forwarded),
        }
    }

    /// The shared waiters of a pending core; `None` once nothing can block.
    pub(crate) fn waiters(&self) -> Option<&Arc<Waiters>> {
        match &self.repr {
            Repr::Pending(core) => Some(core.waiters()),
            _ => None,
        }
    }

    pub(crate) fn affinity(&self) -> Option<&Arc<dyn crate::exec::Executor>> {
        match &self.repr {
            Repr::Pending(core) => core.affinity(),
            _ => None,
        }
    }

    pub(crate) fn id(&self) -> u64 {
        match &self.repr {
            Repr::Pending(core) => core.id(),
            _ => 0,
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Returns true once the future has settled.
    #[must_use]
    pub fn is_done(&self) -> bool {
        match &self.repr {
            Repr::Pending(core) => core.is_done(),
            _ => true,
        }
    }

    /// Returns true if the future failed or was cancelled.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.resolved().is_some_and(|o| o.is_failed())
    }

    /// Returns true if the future was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.resolved().is_some_and(|o| o.is_cancelled())
    }

    /// Returns the failure cause, cancellation included.
    #[must_use]
    pub fn failure(&self) -> Option<Error> {
        self.resolved().and_then(|o| o.failure())
    }

    /// Returns a copy of the terminal outcome, if settled.
    #[must_use]
    pub fn outcome(&self) -> Option<Outcome<T>> {
        self.resolved().map(Resolved::into_outcome)
    }

    /// Returns true if both handles are the same future.
    ///
    /// Canonical futures compare equal to the same canonical future, so a
    /// caller can test for "the shared empty result" without looking at values.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (&self.repr, &other.repr) {
            (Repr::Pending(a), Repr::Pending(b)) => Arc::ptr_eq(a, b),
            (Repr::Done(a), Repr::Done(b)) => Arc::ptr_eq(a, b),
            (Repr::Canonical(a, _), Repr::Canonical(b, _)) => a == b,
            (Repr::Cancelled, Repr::Cancelled) => true,
            _ => false,
        }
    }

    /// Returns the canonical tag if this is one of the shared singletons.
    #[must_use]
    pub fn canonical(&self) -> Option<Canonical> {
        match &self.repr {
            Repr::Canonical(tag, _) => Some(*tag),
            _ => None,
        }
    }

    /// Returns true if this is the shared cancelled future.
    #[must_use]
    pub fn is_cancelled_singleton(&self) -> bool {
        matches!(self.repr, Repr::Cancelled)
    }

    /// Returns true if this handle is an immutable settled future rather than
    /// a view of a promise.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self.repr, Repr::Pending(_))
    }

    // ------------------------------------------------------------------
    // Getters
    // ------------------------------------------------------------------

    /// Blocks until the future settles and returns its result.
    pub fn get(&self) -> Result<T> {
        if let Some(outcome) = self.resolved() {
            return outcome.into_outcome().into_result();
        }
        if let Some(waiters) = self.waiters() {
            waiters.latch().wait();
        }
        self.try_now()
    }

    /// Blocks for at most `timeout`; fails with a timeout error if still pending.
    pub fn get_timeout(&self, timeout: Duration) -> Result<T> {
        if let Some(outcome) = self.resolved() {
            return outcome.into_outcome().into_result();
        }
        let settled = self
            .waiters()
            .map_or(true, |waiters| waiters.latch().wait_timeout(timeout));
        if settled {
            self.try_now()
        } else {
            Err(Error::timeout().with_message(format!(
                "future did not settle within {}ms",
                timeout.as_millis()
            )))
        }
    }

    /// Blocks until settled; on any failure logs it and returns `fallback(error)`.
    pub fn get_or_else(&self, fallback: impl FnOnce(Error) -> T) -> T {
        self.get().unwrap_or_else(|e| {
            error!(future_id = self.id(), error = %e, "future failed, using fallback");
            fallback(e)
        })
    }

    /// Like [`get_or_else`](Self::get_or_else), waiting at most `timeout`.
    pub fn get_or_else_timeout(&self, fallback: impl FnOnce(Error) -> T, timeout: Duration) -> T {
        self.get_timeout(timeout).unwrap_or_else(|e| {
            error!(future_id = self.id(), error = %e, "future failed, using fallback");
            fallback(e)
        })
    }

    /// Returns the success value if the future succeeded.
    #[must_use]
    pub fn peek(&self) -> Option<T> {
        match self.resolved()?.into_outcome() {
            Outcome::Ok(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the success value, or `default` if pending or failed.
    #[must_use]
    pub fn peek_or(&self, default: T) -> T {
        self.peek().unwrap_or(default)
    }

    /// Returns the result without waiting; [`ErrorKind::NotDone`] while pending.
    ///
    /// [`ErrorKind::NotDone`]: crate::error::ErrorKind::NotDone
    pub fn try_now(&self) -> Result<T> {
        match self.resolved() {
            Some(outcome) => outcome.into_outcome().into_result(),
            None => Err(Error::not_done()),
        }
    }

    // ------------------------------------------------------------------
    // Consumer registration
    // ------------------------------------------------------------------

    /// Runs `consumer` with the result once settled.
    pub fn on_completion(&self, consumer: impl FnOnce(Result<T>) + Send + 'static) -> &Self {
        self.register(move |outcome| consumer(outcome.clone().into_result()));
        self
    }

    /// Runs `consumer` with the terminal outcome once settled.
    pub fn on_outcome(&self, consumer: impl FnOnce(&Outcome<T>) + Send + 'static) -> &Self {
        self.register(consumer);
        self
    }

    /// Runs `consumer` with the value if the future succeeds.
    pub fn on_success(&self, consumer: impl FnOnce(T) + Send + 'static) -> &Self {
        self.register(move |outcome| {
            if let Outcome::Ok(value) = outcome {
                consumer(value.clone());
            }
        });
        self
    }

    /// Runs `consumer` with the cause if the future fails or is cancelled.
    pub fn on_failure(&self, consumer: impl FnOnce(Error) + Send + 'static) -> &Self {
        self.register(move |outcome| {
            if let Some(error) = outcome.failure() {
                consumer(error);
            }
        });
        self
    }

    /// Runs `consumer` with the reason if the future is cancelled.
    pub fn on_cancel(&self, consumer: impl FnOnce(CancelReason) + Send + 'static) -> &Self {
        self.register(move |outcome| {
            if let Outcome::Cancelled(reason) = outcome {
                consumer(reason.clone());
            }
        });
        self
    }

    /// Runs `consumer` on each progress report while the future is pending.
    ///
    /// Progress consumers are dropped when the future settles and never run
    /// on a settled future.
    pub fn on_progress(&self, consumer: impl Fn(Progress) + Send + Sync + 'static) -> &Self {
        if let Repr::Pending(core) = &self.repr {
            core.register_progress(Arc::new(consumer));
        }
        self
    }

    /// Completes `promise` with this future's outcome once settled.
    pub fn complete_into(&self, promise: &Promise<T>) -> &Self {
        promise.complete_from(self);
        self
    }

    // ------------------------------------------------------------------
    // Cancellation
    // ------------------------------------------------------------------

    /// Cancels the future and the work feeding it.
    ///
    /// Returns true if this call settled the future.
    pub fn cancel(&self) -> bool {
        self.cancel_with(CancelReason::default())
    }

    /// Cancels with an explicit reason.
    pub fn cancel_with(&self, reason: CancelReason) -> bool {
        match &self.repr {
            Repr::Pending(core) => core.cancel(reason),
            _ => false,
        }
    }
}

impl<T: Value> fmt::Debug for FutureSupplier<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("FutureSupplier");
        match &self.repr {
            Repr::Pending(core) => {
                let state = core.outcome();
                s.field("id", &core.id());
                s.field(
                    "state",
                    &state.as_deref().map_or("pending", promise::outcome_name),
                );
            }
            Repr::Done(outcome) => {
                s.field("state", &promise::outcome_name(outcome));
            }
            Repr::Canonical(tag, _) => {
                s.field("canonical", tag);
            }
            Repr::Cancelled => {
                s.field("state", &"cancelled");
            }
        }
        s.finish()
    }
}
