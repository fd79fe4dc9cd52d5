//! Promissory: non-blocking composable futures and promises.
//!
//! # Overview
//!
//! A producer creates a [`Promise`], hands out its read-only
//! [`FutureSupplier`] view, and completes the promise once with a value, a
//! failure or a cancellation. Consumers register callbacks or compose the
//! future with combinators; nothing in the crate blocks except the explicit
//! blocking getters.
//!
//! # Core Guarantees
//!
//! - **Exactly one outcome**: the first of complete / fail / cancel wins, later calls are no-ops
//! - **Exactly-once notification**: every consumer runs once, in registration order, whether it
//!   registered before or after completion
//! - **Lock-free registration**: consumers are queued on a Michael–Scott queue and drained by the
//!   completing thread
//! - **Cancellation flows upstream**: cancelling a derived future cancels the future feeding it
//! - **No allocation for settled results**: combinators on settled futures compute synchronously,
//!   and common values map onto shared singletons
//!
//! # Module Structure
//!
//! - [`future`]: [`FutureSupplier`], [`Promise`], settled futures and the `async` bridge
//! - [`combinator`]: map, then, recovery, timeout, executor affinity, iteration, join
//! - [`sync`]: the lock-free queue and the blocking latch
//! - [`exec`]: executor and scheduler capabilities, plus reference implementations
//! - [`lab`]: deterministic executor and virtual-time scheduler for tests
//! - [`types`]: terminal outcomes and cancellation reasons
//! - [`error`]: Error types
//! - [`config`]: process-wide configuration
//!
//! # Example
//!
//! ```
//! use promissory::Promise;
//!
//! let promise = Promise::new();
//! let length = promise.future().map(|s: String| s.len());
//! promise.complete(String::from("hello"));
//! assert_eq!(length.get().unwrap(), 5);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_inception)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::return_self_not_must_use)]

pub mod combinator;
pub mod config;
pub mod error;
pub mod exec;
pub mod future;
pub mod lab;
pub mod sync;
pub mod tracing_compat;
pub mod types;

#[cfg(test)]
pub(crate) mod test_utils;

// Re-exports for convenient access to core types
pub use combinator::Closeable;
pub use config::{ConfigError, FutureConfig};
pub use error::{Error, ErrorKind, Result, ResultExt};
pub use exec::{Executor, InlineExecutor, Scheduler, Task, TimerHandle};
pub use future::{Canonical, FutureCell, FutureSupplier, Progress, Promise};
pub use sync::LockFreeQueue;
pub use types::{CancelKind, CancelReason, Outcome, PanicPayload, Value};
