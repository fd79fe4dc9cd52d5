//! Core types shared by futures and promises.
//!
//! - [`outcome`]: Terminal outcome of a future and panic payloads
//! - [`cancel`]: Cancellation reason and kind types

pub mod cancel;
pub mod outcome;

pub use cancel::{CancelKind, CancelReason};
pub use outcome::{Outcome, PanicPayload};

/// Bound for values carried by futures.
///
/// A terminal value is handed to every registered consumer, so it must be
/// clonable and shareable across the threads that complete and observe it.
pub trait Value: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> Value for T {}
