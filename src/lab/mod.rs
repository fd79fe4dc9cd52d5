//! Deterministic doubles for testing code built on futures.
//!
//! The lab doubles provide:
//!
//! - A manually driven executor (no background threads)
//! - Virtual time for timers (no wall-clock dependencies)
//!
//! Together they make executor hops and timeouts reproducible: a test decides
//! exactly when queued tasks run and when time moves.

pub mod manual_executor;
pub(crate) mod timer;
pub mod virtual_scheduler;

pub use manual_executor::ManualExecutor;
pub use timer::TimerToken;
pub use virtual_scheduler::VirtualScheduler;
