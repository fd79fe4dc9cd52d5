//! Timer heap and cancellable timer entries behind [`VirtualScheduler`].
//!
//! [`VirtualScheduler`]: super::VirtualScheduler
//!
//! The heap is a min-heap ordered by deadline, ties broken by insertion
//! order. Cancellation never removes an entry; a cancelled entry stays in the
//! heap until its deadline and is skipped when popped.

use crate::exec::{Task, TimerHandle};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering as AtomicOrdering};
use std::sync::Arc;

const PENDING: u8 = 0;
const FIRED: u8 = 1;
const CANCELLED: u8 = 2;

struct TimerEntry<D, P> {
    deadline: D,
    /// Insertion order, for FIFO among equal deadlines.
    generation: u64,
    payload: P,
}

impl<D: Ord, P> Ord for TimerEntry<D, P> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap (earliest deadline first)
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.generation.cmp(&self.generation))
    }
}

impl<D: Ord, P> PartialOrd for TimerEntry<D, P> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<D: Ord, P> PartialEq for TimerEntry<D, P> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<D: Ord, P> Eq for TimerEntry<D, P> {}

/// A min-heap of payloads ordered by deadline.
pub(crate) struct TimerHeap<D, P> {
    heap: BinaryHeap<TimerEntry<D, P>>,
    next_generation: u64,
}

impl<D: Ord + Copy, P> TimerHeap<D, P> {
    pub(crate) fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_generation: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.heap.len()
    }

    pub(crate) fn insert(&mut self, payload: P, deadline: D) {
        let generation = self.next_generation;
        self.next_generation += 1;
        self.heap.push(TimerEntry {
            deadline,
            generation,
            payload,
        });
    }

    /// Pops the earliest entry if its deadline is at or before `now`.
    pub(crate) fn pop_due(&mut self, now: D) -> Option<(D, P)> {
        if self.heap.peek()?.deadline <= now {
            self.heap.pop().map(|e| (e.deadline, e.payload))
        } else {
            None
        }
    }

    /// Entries in no particular order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (D, &P)> {
        self.heap.iter().map(|e| (e.deadline, &e.payload))
    }
}

/// Shared fire-or-cancel state of one timer.
///
/// Exactly one of [`try_fire`](Self::try_fire) and
/// [`try_cancel`](Self::try_cancel) succeeds.
#[derive(Debug, Default)]
pub(crate) struct TimerState(AtomicU8);

impl TimerState {
    pub(crate) fn try_fire(&self) -> bool {
        self.0
            .compare_exchange(PENDING, FIRED, AtomicOrdering::AcqRel, AtomicOrdering::Acquire)
            .is_ok()
    }

    pub(crate) fn try_cancel(&self) -> bool {
        self.0
            .compare_exchange(
                PENDING,
                CANCELLED,
                AtomicOrdering::AcqRel,
                AtomicOrdering::Acquire,
            )
            .is_ok()
    }

    pub(crate) fn is_pending(&self) -> bool {
        self.0.load(AtomicOrdering::Acquire) == PENDING
    }
}

/// Handle returned by [`VirtualScheduler`](super::VirtualScheduler).
#[derive(Debug, Clone)]
pub struct TimerToken {
    state: Arc<TimerState>,
}

impl TimerHandle for TimerToken {
    fn cancel(&self) -> bool {
        self.state.try_cancel()
    }

    fn is_pending(&self) -> bool {
        self.state.is_pending()
    }
}

/// A scheduled task paired with its fire-or-cancel state.
pub(crate) struct TimerTask {
    state: Arc<TimerState>,
    task: Task,
}

impl TimerTask {
    pub(crate) fn new(task: Task) -> (Self, TimerToken) {
        let state = Arc::new(TimerState::default());
        let token = TimerToken {
            state: Arc::clone(&state),
        };
        (Self { state, task }, token)
    }

    pub(crate) fn is_pending(&self) -> bool {
        self.state.is_pending()
    }

    /// Runs the task unless the timer was cancelled first.
    pub(crate) fn fire(self) -> bool {
        if self.state.try_fire() {
            (self.task)();
            true
        } else {
            false
        }
    }
}

impl fmt::Debug for TimerTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerTask")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
