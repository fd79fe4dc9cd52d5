//! The combinator algebra over [`FutureSupplier`].
//!
//! Every combinator is written in terms of consumer registration and has two
//! paths:
//!
//! - **Settled**: the result is computed synchronously and returned as a
//!   settled future; no promise is allocated
//! - **Pending**: a linked promise is returned and completed from a consumer
//!   registered on the source
//!
//! # Modules
//!
//! - [`map`]: `map`, `try_map`, `if_fail`, `if_none`, `if_some`
//! - [`then`]: `then`, `try_then`
//! - [`closeable`]: scoped resources released right after use
//! - [`executor`]: `with_executor`, `fork`, `on_affinity`
//! - [`timeout`]: race against a scheduler timer
//! - [`iterate`]: sequential chains of dependent futures
//! - [`join`]: `and`, `and_consume`
//! - [`replace`]: `then_replace`, `then_complete`, `then_run`
//!
//! # Cancellation
//!
//! A derived future forwards `cancel` to the future(s) feeding it, so
//! cancelling the end of a chain cancels the work at its start. The link is
//! weak: a derived future never keeps its source alive.
//!
//! # Panics
//!
//! A panic in a user-supplied function is caught and becomes a failed future
//! with [`ErrorKind::Panicked`](crate::error::ErrorKind::Panicked).

pub mod closeable;
pub mod executor;
pub mod iterate;
pub mod join;
pub mod map;
pub mod replace;
pub mod then;
pub mod timeout;

pub use closeable::Closeable;
