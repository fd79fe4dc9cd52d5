//! Error types and error handling strategy for promissory.
//!
//! Error handling follows these principles:
//!
//! - Failures never escape a non-blocking call; they become failed futures
//! - Cancellation is a distinguished kind and never wraps another cause
//! - Panics raised by user-supplied functions are isolated and converted to
//!   [`ErrorKind::Panicked`]
//! - Errors are cheap to clone, since one failure is delivered to every consumer
//!
//! # Error Taxonomy
//!
//! - **Cancellation**: the future was cancelled ([`ErrorKind::Cancelled`])
//! - **Computation failure**: a producer or combinator function failed
//!   ([`ErrorKind::Failed`], [`ErrorKind::Panicked`])
//! - **Timeout**: a race against a timer was lost, or a bounded wait expired
//!   ([`ErrorKind::Timeout`])
//! - **Usage**: a non-blocking getter was called on a pending future
//!   ([`ErrorKind::NotDone`])

use core::fmt;
use std::sync::Arc;

use crate::types::{CancelReason, PanicPayload};

/// The kind of error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The future was cancelled.
    Cancelled,
    /// A timer won the race against the computation, or a bounded wait expired.
    Timeout,
    /// A producer or user-supplied function reported a failure.
    Failed,
    /// A user-supplied function panicked.
    Panicked,
    /// The result was requested from a future that is still pending.
    NotDone,
    /// Internal invariant violation (bug).
    Internal,
}

impl ErrorKind {
    /// Returns true if this kind describes a failed computation rather than
    /// cancellation or misuse.
    #[must_use]
    pub const fn is_computation_failure(&self) -> bool {
        matches!(self, Self::Failed | Self::Panicked | Self::Timeout)
    }
}

/// The main error type carried by failed futures.
#[derive(Debug, Clone)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    source: Option<Arc<dyn std::error::Error + Send + Sync>>,
    reason: Option<CancelReason>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub const fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            source: None,
            reason: None,
        }
    }

    /// Returns the error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns true if this error represents cancellation.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self.kind, ErrorKind::Cancelled)
    }

    /// Returns true if this error is a timeout.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self.kind, ErrorKind::Timeout)
    }

    /// Adds a message description to the error.
    #[must_use]
    pub fn with_message(mut self, msg: impl Into<String>) -> Self {
        self.message = Some(msg.into());
        self
    }

    /// Adds a source error to the chain.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    /// Creates a cancellation error from a structured reason.
    #[must_use]
    pub fn cancelled(reason: &CancelReason) -> Self {
        Self {
            kind: ErrorKind::Cancelled,
            message: Some(reason.to_string()),
            source: None,
            reason: Some(reason.clone()),
        }
    }

    /// Creates a timeout error.
    #[must_use]
    pub fn timeout() -> Self {
        Self::new(ErrorKind::Timeout).with_message("future timed out")
    }

    /// Creates a computation failure with a message.
    #[must_use]
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Failed).with_message(msg)
    }

    /// Wraps an arbitrary error as a computation failure.
    #[must_use]
    pub fn from_source(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        let message = source.to_string();
        Self::new(ErrorKind::Failed)
            .with_message(message)
            .with_source(source)
    }

    /// Creates an error describing a panic raised by a user-supplied function.
    #[must_use]
    pub fn panicked(payload: &PanicPayload) -> Self {
        Self::new(ErrorKind::Panicked).with_message(payload.message())
    }

    /// Creates the error returned when a pending future is read without waiting.
    #[must_use]
    pub fn not_done() -> Self {
        Self::new(ErrorKind::NotDone).with_message("future is not done")
    }

    /// Creates an internal error (bug).
    #[must_use]
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal).with_message(detail)
    }

    /// Returns the cancellation reason for cancellation errors.
    ///
    /// A cancellation error built with [`Error::new`] reports the default
    /// (user) reason.
    #[must_use]
    pub fn cancel_reason(&self) -> Option<CancelReason> {
        if self.is_cancelled() {
            Some(self.reason.clone().unwrap_or_default())
        } else {
            None
        }
    }

    /// Returns the error message, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(msg) = &self.message {
            write!(f, ": {msg}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as _)
    }
}

impl From<CancelReason> for Error {
    fn from(reason: CancelReason) -> Self {
        Self::cancelled(&reason)
    }
}

impl From<PanicPayload> for Error {
    fn from(payload: PanicPayload) -> Self {
        Self::panicked(&payload)
    }
}

/// Extension trait for adding context to Results.
#[allow(clippy::result_large_err)]
pub trait ResultExt<T> {
    /// Attach a context message on error.
    fn context(self, msg: impl Into<String>) -> Result<T>;
    /// Attach context message computed lazily on error.
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for core::result::Result<T, E> {
    fn context(self, msg: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_message(msg))
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| e.into().with_message(f()))
    }
}

/// A specialized Result type for promissory operations.
#[allow(clippy::result_large_err)]
pub type Result<T> = core::result::Result<T, Error>;
