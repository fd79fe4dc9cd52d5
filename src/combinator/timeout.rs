//! Timeout combinator: race a future against a scheduler timer.
//!
//! Whichever settles the derived future first decides its outcome: the
//! source completing, or the timer firing and running the fallback. The
//! loser is a no-op. The timer is cancelled as soon as the derived future
//! settles, and the timer task holds only a weak reference to the derived
//! future, so an abandoned timeout does not keep the chain alive.
//!
//! With [`FutureConfig::trace_timeouts`](crate::config::FutureConfig) set,
//! the call site of `timeout` is captured when the timeout is armed and
//! logged when the timer fires.

use crate::config;
use crate::error::{Error, Result};
use crate::exec::{Scheduler, TimerHandle};
use crate::future::{FutureSupplier, Promise};
use crate::tracing_compat::debug;
use crate::types::outcome::guarded;
use crate::types::Value;
use std::panic::Location;
use std::sync::Arc;
use std::time::Duration;

impl<T: Value> FutureSupplier<T> {
    /// Fails with [`ErrorKind::Timeout`](crate::error::ErrorKind::Timeout)
    /// unless this future settles within `delay`.
    ///
    /// A settled future is returned unchanged. Cancelling the result cancels
    /// this future.
    #[track_caller]
    pub fn timeout<S: Scheduler + ?Sized>(&self, scheduler: &S, delay: Duration) -> FutureSupplier<T> {
        let caller = Location::caller();
        self.race_timer(scheduler, delay, caller, move || {
            Err(Error::timeout().with_message(format!(
                "future timed out after {}ms",
                delay.as_millis()
            )))
        })
    }

    /// Like [`timeout`](Self::timeout), settling with `on_timeout()` when the
    /// timer wins.
    #[track_caller]
    pub fn timeout_with<S: Scheduler + ?Sized>(
        &self,
        scheduler: &S,
        delay: Duration,
        on_timeout: impl FnOnce() -> Result<T> + Send + 'static,
    ) -> FutureSupplier<T> {
        let caller = Location::caller();
        self.race_timer(scheduler, delay, caller, on_timeout)
    }

    fn race_timer<S: Scheduler + ?Sized>(
        &self,
        scheduler: &S,
        delay: Duration,
        caller: &'static Location<'static>,
        on_timeout: impl FnOnce() -> Result<T> + Send + 'static,
    ) -> FutureSupplier<T> {
        if self.is_done() {
            return self.clone();
        }

        let promise = Promise::linked(self);
        let future_id = promise.id();
        let weak = promise.downgrade();
        let trace_call_site = config::global().trace_timeouts;
        let timer: Arc<dyn TimerHandle> = Arc::from(scheduler.schedule_after(
            delay,
            Box::new(move || {
                let Some(promise) = weak.upgrade() else {
                    return;
                };
                if promise.is_done() {
                    return;
                }
                if trace_call_site {
                    debug!(
                        future_id,
                        delay_ms = delay.as_millis() as u64,
                        call_site = %caller,
                        "timeout fired"
                    );
                } else {
                    debug!(future_id, delay_ms = delay.as_millis() as u64, "timeout fired");
                }
                promise.complete_result(guarded(on_timeout));
            }),
        ));

        promise.future().register(move |_| {
            timer.cancel();
        });
        let p = promise.clone();
        self.register(move |outcome| {
            p.complete_outcome(outcome.clone());
        });
        promise.future()
    }
}
