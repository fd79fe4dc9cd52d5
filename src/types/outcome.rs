//! Terminal outcome of a future.
//!
//! A future starts pending and reaches exactly one terminal outcome:
//!
//! - `Ok(T)`: success with a value
//! - `Err(Error)`: computation failure
//! - `Cancelled(CancelReason)`: the future was cancelled
//!
//! Pending is never represented by this type, so "done with an empty value"
//! (`Outcome::Ok(None)` for an `Option` future) cannot be confused with
//! "not done yet".

use super::cancel::CancelReason;
use crate::error::{Error, Result};
use core::fmt;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Payload from a caught panic.
///
/// This wraps the panic value for safe transport to the consumers of a future.
#[derive(Debug, Clone)]
pub struct PanicPayload {
    message: String,
}

impl PanicPayload {
    /// Creates a new panic payload with the given message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Extracts a printable message from a value caught by `catch_unwind`.
    #[must_use]
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        if let Some(s) = payload.downcast_ref::<&'static str>() {
            Self::new(*s)
        } else if let Some(s) = payload.downcast_ref::<String>() {
            Self::new(s.clone())
        } else {
            Self::new("opaque panic payload")
        }
    }

    /// Returns the panic message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for PanicPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "panic: {}", self.message)
    }
}

/// Runs a user-supplied function, converting a panic into [`ErrorKind::Panicked`].
///
/// [`ErrorKind::Panicked`]: crate::error::ErrorKind::Panicked
pub(crate) fn guarded<R>(f: impl FnOnce() -> Result<R>) -> Result<R> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(Error::panicked(&PanicPayload::from_panic(payload.as_ref()))),
    }
}

/// The terminal outcome of a future.
#[derive(Debug, Clone)]
pub enum Outcome<T> {
    /// Success with a value.
    Ok(T),
    /// Computation failure.
    Err(Error),
    /// The future was cancelled.
    Cancelled(CancelReason),
}

impl<T> Outcome<T> {
    /// Returns true if this outcome is `Ok`.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    /// Returns true if this outcome is `Err`.
    #[must_use]
    pub const fn is_err(&self) -> bool {
        matches!(self, Self::Err(_))
    }

    /// Returns true if this outcome is `Cancelled`.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }

    /// Returns true for both failure and cancellation.
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        !self.is_ok()
    }

    /// Builds an outcome from a result, recognising cancellation errors.
    pub fn from_result(result: Result<T>) -> Self {
        match result {
            Ok(v) => Self::Ok(v),
            Err(e) => Self::from_error(e),
        }
    }

    /// Builds a failed outcome, mapping cancellation errors to `Cancelled`.
    pub fn from_error(error: Error) -> Self {
        match error.cancel_reason() {
            Some(reason) => Self::Cancelled(reason),
            None => Self::Err(error),
        }
    }

    /// Converts this outcome to a standard Result, with cancellation as an error.
    pub fn into_result(self) -> Result<T> {
        match self {
            Self::Ok(v) => Ok(v),
            Self::Err(e) => Err(e),
            Self::Cancelled(r) => Err(Error::cancelled(&r)),
        }
    }

    /// Returns the failure cause, cancellation included.
    #[must_use]
    pub fn failure(&self) -> Option<Error> {
        match self {
            Self::Ok(_) => None,
            Self::Err(e) => Some(e.clone()),
            Self::Cancelled(r) => Some(Error::cancelled(r)),
        }
    }

    /// Maps the success value using the provided function.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U> {
        match self {
            Self::Ok(v) => Outcome::Ok(f(v)),
            Self::Err(e) => Outcome::Err(e),
            Self::Cancelled(r) => Outcome::Cancelled(r),
        }
    }

    /// Re-types a failed outcome, returning `None` for success.
    pub(crate) fn propagate<U>(&self) -> Option<Outcome<U>> {
        match self {
            Self::Ok(_) => None,
            Self::Err(e) => Some(Outcome::Err(e.clone())),
            Self::Cancelled(r) => Some(Outcome::Cancelled(r.clone())),
        }
    }

    /// Returns the success value or a default.
    pub fn unwrap_or(self, default: T) -> T {
        match self {
            Self::Ok(v) => v,
            _ => default,
        }
    }
}

impl<T> From<Result<T>> for Outcome<T> {
    fn from(result: Result<T>) -> Self {
        Self::from_result(result)
    }
}
