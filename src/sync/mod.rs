//! Synchronization building blocks for futures.
//!
//! # Primitives
//!
//! - [`LockFreeQueue`]: Unbounded Michael–Scott MPMC queue, used for consumer
//!   registration and for task queues
//! - [`Latch`]: One-shot gate backing the blocking getters

mod latch;
pub mod queue;

pub use latch::Latch;
pub use queue::LockFreeQueue;
