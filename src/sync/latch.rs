//! One-shot latch for the blocking getters.

use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// A gate that starts closed and opens exactly once.
///
/// Threads calling [`wait`](Latch::wait) block until [`open`](Latch::open) is
/// called; waits after that return immediately.
#[derive(Debug, Default)]
pub struct Latch {
    open: Mutex<bool>,
    cvar: Condvar,
}

impl Latch {
    /// Creates a closed latch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens the latch and wakes every waiter.
    pub fn open(&self) {
        let mut open = self.open.lock();
        *open = true;
        self.cvar.notify_all();
    }

    /// Returns true once the latch has been opened.
    #[must_use]
    pub fn is_open(&self) -> bool {
        *self.open.lock()
    }

    /// Blocks until the latch opens.
    pub fn wait(&self) {
        let mut open = self.open.lock();
        while !*open {
            self.cvar.wait(&mut open);
        }
    }

    /// Blocks until the latch opens or `timeout` elapses.
    ///
    /// Returns true if the latch is open.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            self.wait();
            return true;
        };
        let mut open = self.open.lock();
        while !*open {
            if self.cvar.wait_until(&mut open, deadline).timed_out() {
                return *open;
            }
        }
        true
    }
}
