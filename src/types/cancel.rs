//! Cancellation reason and kind types.
//!
//! Cancellation is a one-way terminal transition. These types describe why it
//! happened so that consumers can tell a user request from a cancellation that
//! travelled along a chain of derived futures.

use core::fmt;

/// The kind of cancellation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CancelKind {
    /// Explicit cancellation requested by user code.
    User,
    /// Cancellation forwarded from a derived future to the future feeding it.
    Propagated,
    /// The executor or scheduler that should have delivered the result shut down.
    Shutdown,
}

impl fmt::Display for CancelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Propagated => write!(f, "propagated"),
            Self::Shutdown => write!(f, "shutdown"),
        }
    }
}

/// The reason for a cancellation, including kind and optional context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelReason {
    /// The kind of cancellation.
    pub kind: CancelKind,
    /// Optional human-readable message.
    pub message: Option<&'static str>,
}

impl CancelReason {
    /// Creates a new cancellation reason with the given kind.
    #[must_use]
    pub const fn new(kind: CancelKind) -> Self {
        Self {
            kind,
            message: None,
        }
    }

    /// Creates a user cancellation reason with a message.
    #[must_use]
    pub const fn user(message: &'static str) -> Self {
        Self {
            kind: CancelKind::User,
            message: Some(message),
        }
    }

    /// Creates the reason used when a derived future forwards its cancellation upstream.
    #[must_use]
    pub const fn propagated() -> Self {
        Self::new(CancelKind::Propagated)
    }

    /// Creates a shutdown cancellation reason.
    #[must_use]
    pub const fn shutdown() -> Self {
        Self::new(CancelKind::Shutdown)
    }

    /// Returns true if this reason indicates shutdown.
    #[must_use]
    pub const fn is_shutdown(&self) -> bool {
        matches!(self.kind, CancelKind::Shutdown)
    }

    /// Returns the kind of this cancellation reason.
    #[must_use]
    pub const fn kind(&self) -> CancelKind {
        self.kind
    }
}

impl Default for CancelReason {
    fn default() -> Self {
        Self::new(CancelKind::User)
    }
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(msg) = self.message {
            write!(f, ": {msg}")?;
        }
        Ok(())
    }
}
