//! Test utilities for promissory.
//!
//! This module provides shared helpers for unit tests:
//! - Consistent tracing-based logging initialization
//! - Phase/section macros for readable test output
//! - Outcome assertion macros
//! - A consumer recorder for registration-order tests

use parking_lot::Mutex;
use std::sync::{Arc, Once};
use tracing_subscriber::fmt::format::FmtSpan;

use crate::error::Result;

static INIT_LOGGING: Once = Once::new();
static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

/// Initialize test logging with trace-level output.
///
/// Safe to call multiple times; only initializes once.
pub fn init_test_logging() {
    init_test_logging_with_level(tracing::Level::TRACE);
}

/// Initialize test logging with a custom level.
///
/// The first call wins; later calls are no-ops.
pub fn init_test_logging_with_level(level: tracing::Level) {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_test_writer()
            .with_file(true)
            .with_line_number(true)
            .with_target(true)
            .with_thread_ids(true)
            .with_span_events(FmtSpan::CLOSE)
            .with_ansi(false)
            .try_init();
    });
}

/// Acquire the global environment lock for tests that mutate env vars.
pub(crate) fn env_lock() -> std::sync::MutexGuard<'static, ()> {
    ENV_LOCK
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Records the results delivered to consumers, in delivery order.
#[derive(Debug, Clone)]
pub struct Recorder<T> {
    seen: Arc<Mutex<Vec<(usize, Result<T>)>>>,
}

impl<T: Clone + Send + 'static> Recorder<T> {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Returns a consumer that tags each delivery with `tag`.
    pub fn consumer(&self, tag: usize) -> impl FnOnce(Result<T>) + Send + 'static {
        let seen = Arc::clone(&self.seen);
        move |result| seen.lock().push((tag, result))
    }

    /// Returns the tags in delivery order.
    #[must_use]
    pub fn tags(&self) -> Vec<usize> {
        self.seen.lock().iter().map(|(tag, _)| *tag).collect()
    }

    /// Returns every delivery.
    #[must_use]
    pub fn deliveries(&self) -> Vec<(usize, Result<T>)> {
        self.seen.lock().clone()
    }
}

impl<T: Clone + Send + 'static> Default for Recorder<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Log a test phase transition with a visual separator.
#[macro_export]
macro_rules! test_phase {
    ($name:expr) => {
        tracing::info!(phase = %$name, "========================================");
        tracing::info!(phase = %$name, "TEST PHASE: {}", $name);
        tracing::info!(phase = %$name, "========================================");
    };
}

/// Log a section within a test phase.
#[macro_export]
macro_rules! test_section {
    ($name:expr) => {
        tracing::debug!(section = %$name, "--- {} ---", $name);
    };
}

/// Log test completion with summary.
#[macro_export]
macro_rules! test_complete {
    ($name:expr) => {
        tracing::info!(test = %$name, "test completed successfully: {}", $name);
    };
    ($name:expr, $($key:ident = $value:expr),* $(,)?) => {
        tracing::info!(
            test = %$name,
            $($key = %$value,)*
            "test completed successfully: {}",
            $name
        );
    };
}

/// Log before assertions for context.
#[macro_export]
macro_rules! assert_with_log {
    ($cond:expr, $msg:expr, $expected:expr, $actual:expr) => {
        tracing::debug!(
            expected = ?$expected,
            actual = ?$actual,
            "Asserting: {}",
            $msg
        );
        assert!($cond, "{}: expected {:?}, got {:?}", $msg, $expected, $actual);
    };
}

/// Assert that an outcome is Ok with a specific value.
#[macro_export]
macro_rules! assert_outcome_ok {
    ($outcome:expr, $expected:expr) => {
        match $outcome {
            Some($crate::types::Outcome::Ok(v)) => assert_eq!(v, $expected),
            other => unreachable!("expected Outcome::Ok({:?}), got {:?}", $expected, other),
        }
    };
}

/// Assert that an outcome is Cancelled.
#[macro_export]
macro_rules! assert_outcome_cancelled {
    ($outcome:expr) => {
        match $outcome {
            Some($crate::types::Outcome::Cancelled(_)) => {}
            other => unreachable!("expected Outcome::Cancelled, got {:?}", other),
        }
    };
}

/// Assert that an outcome is Err.
#[macro_export]
macro_rules! assert_outcome_err {
    ($outcome:expr) => {
        match $outcome {
            Some($crate::types::Outcome::Err(_)) => {}
            other => unreachable!("expected Outcome::Err, got {:?}", other),
        }
    };
}

/// Mock scoped resource for the closeable combinators.
#[derive(Debug, Clone)]
pub struct MockResource {
    id: usize,
    closes: Arc<std::sync::atomic::AtomicUsize>,
    fail_close: bool,
}

impl MockResource {
    /// Create a resource with a stable ID.
    #[must_use]
    pub fn new(id: usize) -> Self {
        Self {
            id,
            closes: Arc::new(std::sync::atomic::AtomicUsize::new(0)),
            fail_close: false,
        }
    }

    /// Create a resource whose `close` reports a failure.
    #[must_use]
    pub fn failing(id: usize) -> Self {
        Self {
            fail_close: true,
            ..Self::new(id)
        }
    }

    /// Returns the resource ID.
    #[must_use]
    pub const fn id(&self) -> usize {
        self.id
    }

    /// Returns how many times the resource was closed.
    #[must_use]
    pub fn close_count(&self) -> usize {
        self.closes.load(std::sync::atomic::Ordering::SeqCst)
    }
}

impl crate::combinator::Closeable for MockResource {
    fn close(&self) -> Result<()> {
        self.closes
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if self.fail_close {
            Err(crate::error::Error::failed(format!(
                "resource {} failed to close",
                self.id
            )))
        } else {
            Ok(())
        }
    }
}
