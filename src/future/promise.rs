//! The completable side of a future.
//!
//! A [`Promise`] owns a shared completion core: an atomic state cell that is
//! empty while pending and holds the terminal [`Outcome`] once set, plus a
//! [`LockFreeQueue`] of registered consumers.
//!
//! # Completion protocol
//!
//! - **Complete**: compare-and-swap the cell from empty to the outcome. The
//!   winner drains the queue and notifies each consumer; losers are no-ops.
//! - **Register**: if the cell is set, notify inline. Otherwise enqueue, then
//!   re-read the cell and drain if it was set meanwhile.
//!
//! Every consumer is dequeued exactly once, by whichever thread polls it, so a
//! consumer runs exactly once no matter how registration and completion
//! interleave.
//!
//! Blocking getters and `.await` share one lazily registered consumer per
//! core (see `Waiters`), so repeated or abandoned waits do not grow the
//! consumer queue.

use super::{FutureSupplier, Progress};
use crate::error::{Error, Result};
use crate::exec::Executor;
use crate::sync::{Latch, LockFreeQueue};
use crate::tracing_compat::{error, trace};
use crate::types::{CancelReason, Outcome, PanicPayload, Value};
use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::task::Waker;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

pub(crate) type Consumer<T> = Box<dyn FnOnce(&Outcome<T>) + Send + 'static>;
pub(crate) type ProgressConsumer = Arc<dyn Fn(Progress) + Send + Sync + 'static>;

/// Forwards a cancellation to the future(s) feeding a derived future.
pub(crate) type CancelHook = Box<dyn Fn() + Send + Sync + 'static>;

/// Everyone blocked on, or awaiting, one core.
///
/// The latch backs the blocking getters; the waker table backs `.await`.
/// Both are released by a single consumer registered on first use.
#[derive(Default)]
pub(crate) struct Waiters {
    latch: Latch,
    wakers: Mutex<HashMap<u64, Waker>>,
    next_key: AtomicU64,
}

impl Waiters {
    pub(crate) fn latch(&self) -> &Latch {
        &self.latch
    }

    /// Stores `waker` under `key`, allocating a key on first use.
    pub(crate) fn park(&self, key: Option<u64>, waker: &Waker) -> u64 {
        let key = key.unwrap_or_else(|| self.next_key.fetch_add(1, Ordering::Relaxed));
        let mut wakers = self.wakers.lock();
        match wakers.get_mut(&key) {
            Some(current) if current.will_wake(waker) => {}
            Some(current) => current.clone_from(waker),
            None => {
                wakers.insert(key, waker.clone());
            }
        }
        key
    }

    pub(crate) fn unpark(&self, key: u64) {
        self.wakers.lock().remove(&key);
    }

    #[cfg(test)]
    pub(crate) fn parked(&self) -> usize {
        self.wakers.lock().len()
    }

    fn release(&self) {
        self.latch.open();
        let wakers = std::mem::take(&mut *self.wakers.lock());
        for waker in wakers.into_values() {
            waker.wake();
        }
    }
}

pub(crate) struct Core<T> {
    id: u64,
    state: ArcSwapOption<Outcome<T>>,
    listeners: LockFreeQueue<Consumer<T>>,
    progress: LockFreeQueue<ProgressConsumer>,
    waiters: OnceLock<Arc<Waiters>>,
    upstream: OnceLock<CancelHook>,
    affinity: Option<Arc<dyn Executor>>,
}

impl<T: Value> Core<T> {
    fn new(affinity: Option<Arc<dyn Executor>>) -> Self {
        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            state: ArcSwapOption::empty(),
            listeners: LockFreeQueue::new(),
            progress: LockFreeQueue::new(),
            waiters: OnceLock::new(),
            upstream: OnceLock::new(),
            affinity,
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn affinity(&self) -> Option<&Arc<dyn Executor>> {
        self.affinity.as_ref()
    }

    pub(crate) fn outcome(&self) -> Option<Arc<Outcome<T>>> {
        self.state.load_full()
    }

    pub(crate) fn is_done(&self) -> bool {
        self.state.load().is_some()
    }

    /// Installs the terminal outcome if none is set yet.
    pub(crate) fn try_complete(&self, outcome: Outcome<T>) -> bool {
        let outcome = Arc::new(outcome);
        let prev = self
            .state
            .compare_and_swap(&None::<Arc<Outcome<T>>>, Some(Arc::clone(&outcome)));
        if prev.is_some() {
            return false;
        }
        drop(prev);
        trace!(
            future_id = self.id,
            state = outcome_name(&outcome),
            "future completed"
        );
        self.drain(&outcome);
        true
    }

    /// Completes with a cancellation and forwards it upstream.
    pub(crate) fn cancel(&self, reason: CancelReason) -> bool {
        let won = self.try_complete(Outcome::Cancelled(reason));
        if let Some(hook) = self.upstream.get() {
            hook();
        }
        won
    }

    pub(crate) fn register(&self, consumer: Consumer<T>) {
        if let Some(outcome) = self.outcome() {
            notify(self.id, consumer, &outcome);
            return;
        }
        self.listeners.offer(consumer);
        if let Some(outcome) = self.outcome() {
            self.drain(&outcome);
        }
    }

    pub(crate) fn register_progress(&self, consumer: ProgressConsumer) {
        if self.is_done() {
            return;
        }
        self.progress.offer(consumer);
        if self.is_done() {
            while self.progress.poll().is_some() {}
        }
    }

    /// Returns the shared waiters, registering their consumer on first use.
    pub(crate) fn waiters(&self) -> &Arc<Waiters> {
        self.waiters.get_or_init(|| {
            let waiters = Arc::new(Waiters::default());
            let w = Arc::clone(&waiters);
            self.register(Box::new(move |_| w.release()));
            waiters
        })
    }

    #[cfg(test)]
    pub(crate) fn pending_consumers(&self) -> usize {
        self.listeners.len()
    }

    fn set_progress(&self, progress: Progress) {
        if self.is_done() {
            return;
        }
        let targets: Vec<ProgressConsumer> = self.progress.iter().collect();
        for consumer in targets {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| consumer(progress))) {
                let payload = PanicPayload::from_panic(payload.as_ref());
                error!(future_id = self.id, panic = %payload, "progress consumer panicked");
            }
        }
    }

    fn drain(&self, outcome: &Outcome<T>) {
        while let Some(consumer) = self.listeners.poll() {
            notify(self.id, consumer, outcome);
        }
        while self.progress.poll().is_some() {}
    }
}

/// Runs one consumer, isolating a panic so the remaining consumers still run.
pub(crate) fn notify<T>(future_id: u64, consumer: Consumer<T>, outcome: &Outcome<T>) {
    if let Err(payload) = catch_unwind(AssertUnwindSafe(|| consumer(outcome))) {
        let payload = PanicPayload::from_panic(payload.as_ref());
        error!(future_id, panic = %payload, "future consumer panicked");
    }
}

pub(crate) fn outcome_name<T>(outcome: &Outcome<T>) -> &'static str {
    match outcome {
        Outcome::Ok(_) => "succeeded",
        Outcome::Err(_) => "failed",
        Outcome::Cancelled(_) => "cancelled",
    }
}

/// The producer's handle to a pending future.
///
/// The first of [`complete`](Self::complete),
/// [`complete_exceptionally`](Self::complete_exceptionally),
/// [`complete_result`](Self::complete_result) or [`cancel`](Self::cancel)
/// decides the outcome; every later call returns `false` and changes nothing.
pub struct Promise<T> {
    core: Arc<Core<T>>,
}

impl<T: Value> Promise<T> {
    /// Creates a pending promise.
    #[must_use]
    pub fn new() -> Self {
        Self {
            core: Arc::new(Core::new(None)),
        }
    }

    /// Creates a promise whose cancellation runs `hook`.
    pub(crate) fn with_upstream(hook: Option<CancelHook>) -> Self {
        let promise = Self::new();
        if let Some(hook) = hook {
            promise.set_upstream(hook);
        }
        promise
    }

    /// Creates a promise whose cancellation is forwarded to `parent`.
    pub(crate) fn linked<P: Value>(parent: &FutureSupplier<P>) -> Self {
        Self::with_upstream(parent.cancel_hook())
    }

    /// Like [`linked`](Self::linked), for a future delivered through `executor`.
    pub(crate) fn linked_with_affinity<P: Value>(
        parent: &FutureSupplier<P>,
        executor: Arc<dyn Executor>,
    ) -> Self {
        let promise = Self {
            core: Arc::new(Core::new(Some(executor))),
        };
        if let Some(hook) = parent.cancel_hook() {
            promise.set_upstream(hook);
        }
        promise
    }

    pub(crate) fn set_upstream(&self, hook: CancelHook) {
        // Only set while the promise is still private to its constructor.
        let _ = self.core.upstream.set(hook);
    }

    pub(crate) fn downgrade(&self) -> WeakPromise<T> {
        WeakPromise(Arc::downgrade(&self.core))
    }

    /// Returns the read-only future view.
    #[must_use]
    pub fn future(&self) -> FutureSupplier<T> {
        FutureSupplier::pending(Arc::clone(&self.core))
    }

    /// Returns the identifier used in log lines about this promise.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.core.id()
    }

    /// Completes with a value.
    pub fn complete(&self, value: T) -> bool {
        self.core.try_complete(Outcome::Ok(value))
    }

    /// Completes with a failure. A cancellation error cancels the promise.
    pub fn complete_exceptionally(&self, error: Error) -> bool {
        match error.cancel_reason() {
            Some(reason) => self.cancel_with(reason),
            None => self.core.try_complete(Outcome::Err(error)),
        }
    }

    /// Completes with a value or a cause; an `Err` cause wins.
    pub fn complete_result(&self, result: Result<T>) -> bool {
        match result {
            Ok(value) => self.complete(value),
            Err(error) => self.complete_exceptionally(error),
        }
    }

    /// Completes with an outcome without forwarding cancellation upstream.
    pub fn complete_outcome(&self, outcome: Outcome<T>) -> bool {
        self.core.try_complete(outcome)
    }

    /// Completes with whatever `source` eventually produces.
    pub fn complete_from(&self, source: &FutureSupplier<T>) {
        let promise = self.clone();
        source.register(move |outcome| {
            promise.complete_outcome(outcome.clone());
        });
    }

    /// Cancels with the default reason.
    pub fn cancel(&self) -> bool {
        self.cancel_with(CancelReason::default())
    }

    /// Cancels with an explicit reason, forwarding the cancellation upstream.
    pub fn cancel_with(&self, reason: CancelReason) -> bool {
        self.core.cancel(reason)
    }

    /// Notifies progress consumers. Ignored once the promise is complete.
    pub fn set_progress(&self, done: u64, total: u64) {
        self.core.set_progress(Progress::new(done, total));
    }

    /// Returns true once an outcome is set.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.core.is_done()
    }

    /// Returns true if the outcome is a failure or a cancellation.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.core.outcome().is_some_and(|o| o.is_failed())
    }

    /// Returns true if the outcome is a cancellation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.core.outcome().is_some_and(|o| o.is_cancelled())
    }

    /// Returns the failure cause, cancellation included.
    #[must_use]
    pub fn failure(&self) -> Option<Error> {
        self.core.outcome().and_then(|o| o.failure())
    }

    /// Returns a copy of the outcome, if set.
    #[must_use]
    pub fn outcome(&self) -> Option<Outcome<T>> {
        self.core.outcome().map(|o| (*o).clone())
    }
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<T: Value> Default for Promise<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.core.state.load();
        f.debug_struct("Promise")
            .field("id", &self.core.id)
            .field("state", &state.as_deref().map_or("pending", outcome_name))
            .finish()
    }
}

/// A promise reference that does not keep the promise alive.
pub(crate) struct WeakPromise<T>(Weak<Core<T>>);

impl<T> WeakPromise<T> {
    pub(crate) fn upgrade(&self) -> Option<Promise<T>> {
        self.0.upgrade().map(|core| Promise { core })
    }
}
