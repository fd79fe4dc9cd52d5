//! `async` adapter for [`FutureSupplier`].
//!
//! `.await` on a supplier (or on [`FutureSupplier::settle`]) resolves to the
//! settled result without blocking the polling thread. Every adapter on a core
//! parks its latest waker in the core's shared waker table and takes it out
//! again when dropped, so abandoned awaits leave nothing behind.

use super::promise::Waiters;
use super::FutureSupplier;
use crate::error::Result;
use crate::types::Value;
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// Future returned by [`FutureSupplier::settle`].
#[must_use = "futures do nothing unless polled"]
pub struct Settle<T> {
    future: FutureSupplier<T>,
    parked: Option<(Arc<Waiters>, u64)>,
}

impl<T: Value> FutureSupplier<T> {
    /// Returns a [`std::future::Future`] resolving to this future's result.
    pub fn settle(&self) -> Settle<T> {
        self.clone().into_future()
    }
}

impl<T> Settle<T> {
    fn unpark(&mut self) {
        if let Some((waiters, key)) = self.parked.take() {
            waiters.unpark(key);
        }
    }
}

impl<T: Value> Settle<T> {
    fn ready(&mut self) -> Option<Result<T>> {
        let outcome = self.future.resolved()?;
        self.unpark();
        Some(outcome.into_outcome().into_result())
    }
}

impl<T: Value> Future for Settle<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        if let Some(result) = this.ready() {
            return Poll::Ready(result);
        }
        match &this.parked {
            Some((waiters, key)) => {
                waiters.park(Some(*key), cx.waker());
            }
            None => {
                if let Some(waiters) = this.future.waiters() {
                    let key = waiters.park(None, cx.waker());
                    this.parked = Some((Arc::clone(waiters), key));
                }
            }
        }
        match this.ready() {
            Some(result) => Poll::Ready(result),
            None => Poll::Pending,
        }
    }
}

impl<T> Drop for Settle<T> {
    fn drop(&mut self) {
        self.unpark();
    }
}

impl<T: Value> IntoFuture for FutureSupplier<T> {
    type Output = Result<T>;
    type IntoFuture = Settle<T>;

    fn into_future(self) -> Settle<T> {
        Settle {
            future: self,
            parked: None,
        }
    }
}
