//! Timer scheduler driven by a virtual clock.
//!
//! Time only moves when the test calls [`VirtualScheduler::advance`]. Due
//! timers fire in deadline order (insertion order among equal deadlines), on
//! the advancing thread, with the clock set to each timer's deadline while it
//! runs.
//!
//! # Example
//!
//! ```ignore
//! use promissory::lab::VirtualScheduler;
//! use std::time::Duration;
//!
//! let sched = VirtualScheduler::new();
//! let timed = future.timeout(&sched, Duration::from_millis(50));
//! sched.advance(Duration::from_millis(50)); // timer fires here
//! ```

use super::timer::{TimerHeap, TimerTask};
use crate::exec::{Scheduler, Task, TimerHandle};
use parking_lot::Mutex;
use std::fmt;
use std::time::Duration;

struct ClockState {
    now: Duration,
    timers: TimerHeap<Duration, TimerTask>,
}

/// A [`Scheduler`] over virtual time.
pub struct VirtualScheduler {
    state: Mutex<ClockState>,
}

impl VirtualScheduler {
    /// Creates a scheduler at virtual time zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ClockState {
                now: Duration::ZERO,
                timers: TimerHeap::new(),
            }),
        }
    }

    /// Returns the current virtual time.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.state.lock().now
    }

    /// Returns the number of timers that can still fire.
    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.state
            .lock()
            .timers
            .iter()
            .filter(|(_, t)| t.is_pending())
            .count()
    }

    /// Moves the clock forward by `by`, firing every timer that falls due.
    ///
    /// Timers scheduled by a firing timer are honoured if they fall due within
    /// the same advance. Returns the number of timers fired.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.now().saturating_add(by);
        let mut fired = 0;
        loop {
            let due = {
                let mut state = self.state.lock();
                match state.timers.pop_due(target) {
                    Some((deadline, timer)) => {
                        state.now = state.now.max(deadline);
                        timer
                    }
                    None => {
                        state.now = state.now.max(target);
                        break;
                    }
                }
            };
            if due.fire() {
                fired += 1;
            }
        }
        fired
    }

    /// Moves the clock to the next live deadline and fires what is due there.
    ///
    /// Returns the number of timers fired, zero if none were pending.
    pub fn advance_to_next(&self) -> usize {
        let next = {
            let state = self.state.lock();
            state
                .timers
                .iter()
                .filter(|(_, t)| t.is_pending())
                .map(|(deadline, _)| deadline)
                .min()
        };
        match next {
            Some(deadline) => self.advance(deadline.saturating_sub(self.now())),
            None => 0,
        }
    }
}

impl Default for VirtualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for VirtualScheduler {
    fn schedule_after(&self, delay: Duration, task: Task) -> Box<dyn TimerHandle> {
        let (timer, token) = TimerTask::new(task);
        let mut state = self.state.lock();
        let deadline = state.now.saturating_add(delay);
        state.timers.insert(timer, deadline);
        Box::new(token)
    }
}

impl fmt::Debug for VirtualScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("VirtualScheduler")
            .field("now", &state.now)
            .field("timers", &state.timers.len())
            .finish()
    }
}
