#![allow(dead_code)]
#![allow(unused_imports)]
//! Shared integration test utilities.
//!
//! Import with:
//! ```
//! mod common;
//! use common::*;
//! ```

use parking_lot::Mutex;
use promissory::exec::{Executor, RejectedTask, Task};
use promissory::{FutureSupplier, Result, Value};
use proptest::prelude::ProptestConfig;
use proptest::test_runner::RngSeed;
use std::sync::mpsc;
use std::sync::{Arc, Once};
use std::thread;
use tracing_subscriber::fmt::format::FmtSpan;

static INIT_LOGGING: Once = Once::new();

/// Default seed for property tests when running under CI.
pub const DEFAULT_PROPTEST_SEED: u64 = 0x5EED_5EED;

const PROPTEST_SEED_ENV: &str = "PROMISSORY_PROPTEST_SEED";

/// Build a ProptestConfig with deterministic seed support for CI.
#[must_use]
pub fn test_proptest_config(cases: u32) -> ProptestConfig {
    let mut config = ProptestConfig::with_cases(cases);
    // Honor existing PROPTEST_RNG_SEED, otherwise apply our own.
    if matches!(config.rng_seed, RngSeed::Random) {
        if let Some(seed) = read_proptest_seed() {
            config.rng_seed = RngSeed::Fixed(seed);
        }
    }
    config
}

fn read_proptest_seed() -> Option<u64> {
    if let Ok(value) = std::env::var(PROPTEST_SEED_ENV) {
        return value.parse::<u64>().ok();
    }
    // If CI is set and no explicit seed is provided, use a fixed seed.
    if std::env::var("CI").is_ok() {
        return Some(DEFAULT_PROPTEST_SEED);
    }
    None
}

/// Initialize test logging with trace-level output.
pub fn init_test_logging() {
    init_test_logging_with_level(tracing::Level::TRACE);
}

/// Initialize test logging with a custom level.
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

/// Collects every result delivered to the consumers it hands out.
#[derive(Clone)]
pub struct Deliveries<T> {
    seen: Arc<Mutex<Vec<(usize, Result<T>)>>>,
}

impl<T: Value> Deliveries<T> {
    /// Creates an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self {
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Registers a consumer tagged `tag` on `future`.
    pub fn watch(&self, future: &FutureSupplier<T>, tag: usize) {
        let seen = Arc::clone(&self.seen);
        future.on_completion(move |result| seen.lock().push((tag, result)));
    }

    /// Tags in delivery order.
    #[must_use]
    pub fn tags(&self) -> Vec<usize> {
        self.seen.lock().iter().map(|(tag, _)| *tag).collect()
    }

    /// Number of deliveries so far.
    #[must_use]
    pub fn count(&self) -> usize {
        self.seen.lock().len()
    }

    /// Every delivery so far.
    #[must_use]
    pub fn all(&self) -> Vec<(usize, Result<T>)> {
        self.seen.lock().clone()
    }
}

/// A named thread running submitted tasks in order, standing in for an
/// application's event loop.
pub struct WorkerThread {
    sender: Mutex<Option<mpsc::Sender<Task>>>,
    handle: Mutex<Option<thread::JoinHandle<()>>>,
    thread_id: thread::ThreadId,
}

impl WorkerThread {
    /// Starts a worker named `name`.
    pub fn spawn(name: &str) -> Arc<Self> {
        let (sender, tasks) = mpsc::channel::<Task>();
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                for task in tasks {
                    task();
                }
            })
            .expect("spawn worker thread");
        Arc::new(Self {
            sender: Mutex::new(Some(sender)),
            thread_id: handle.thread().id(),
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Stops accepting tasks, runs the ones already queued, and joins.
    pub fn shutdown(&self) {
        self.sender.lock().take();
        if let Some(handle) = self.handle.lock().take() {
            handle.join().expect("worker thread panicked");
        }
    }
}

impl Executor for WorkerThread {
    fn execute(&self, task: Task) -> std::result::Result<(), RejectedTask> {
        match self.sender.lock().as_ref() {
            Some(sender) => sender
                .send(task)
                .map_err(|mpsc::SendError(task)| RejectedTask::new(task)),
            None => Err(RejectedTask::new(task)),
        }
    }

    fn is_current(&self) -> bool {
        thread::current().id() == self.thread_id
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

/// Assert that a settled future holds `Outcome::Ok` with a specific value.
#[macro_export]
macro_rules! assert_outcome_ok {
    ($outcome:expr, $expected:expr) => {
        match $outcome {
            Some(::promissory::types::Outcome::Ok(v)) => assert_eq!(v, $expected),
            other => unreachable!("expected Outcome::Ok({:?}), got {:?}", $expected, other),
        }
    };
}

/// Assert that a settled future holds `Outcome::Cancelled`.
#[macro_export]
macro_rules! assert_outcome_cancelled {
    ($outcome:expr) => {
        match $outcome {
            Some(::promissory::types::Outcome::Cancelled(_)) => {}
            other => unreachable!("expected Outcome::Cancelled, got {:?}", other),
        }
    };
}

/// Assert that a settled future holds `Outcome::Err`.
#[macro_export]
macro_rules! assert_outcome_err {
    ($outcome:expr) => {
        match $outcome {
            Some(::promissory::types::Outcome::Err(_)) => {}
            other => unreachable!("expected Outcome::Err, got {:?}", other),
        }
    };
}
