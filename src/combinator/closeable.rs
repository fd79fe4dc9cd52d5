//! Scoped resources.
//!
//! `closeable_map` and `closeable_then` treat the success value as a resource
//! owned by the step: it is closed right after the step function returns,
//! whether the function succeeded, failed or panicked.

use crate::error::Result;
use crate::future::FutureSupplier;
use crate::tracing_compat::debug;
use crate::types::outcome::guarded;
use crate::types::Value;

/// A resource with an explicit release step.
pub trait Closeable {
    /// Releases the resource.
    fn close(&self) -> Result<()>;
}

/// Runs `f` on `resource`, then closes it.
///
/// A close failure is reported only if `f` itself succeeded.
fn with_resource<T: Closeable, R>(resource: &T, f: impl FnOnce(&T) -> Result<R>) -> Result<R> {
    let result = guarded(|| f(resource));
    let closed = guarded(|| resource.close());
    match (result, closed) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(error)) => Err(error),
        (Err(error), Ok(())) => Err(error),
        (Err(error), Err(close_error)) => {
            debug!(error = %close_error, "close failed after step failure");
            Err(error)
        }
    }
}

impl<T: Value + Closeable> FutureSupplier<T> {
    /// Maps the resource and closes it.
    pub fn closeable_map<R: Value>(
        &self,
        f: impl FnOnce(&T) -> Result<R> + Send + 'static,
    ) -> FutureSupplier<R> {
        self.try_map(move |resource| with_resource(&resource, f))
    }

    /// Chains a step on the resource and closes it as soon as the step has
    /// produced its future.
    pub fn closeable_then<R: Value>(
        &self,
        f: impl FnOnce(&T) -> Result<FutureSupplier<R>> + Send + 'static,
    ) -> FutureSupplier<R> {
        self.try_then(move |resource| with_resource(&resource, f))
    }
}
