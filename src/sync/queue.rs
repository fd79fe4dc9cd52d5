//! Unbounded lock-free MPMC queue.
//!
//! A Michael–Scott queue: `head` points at a sentinel whose successor is the
//! front element, `tail` points at (or lags one step behind) the last node.
//! Both pointers move only by compare-and-swap, and any operation that sees a
//! lagging `tail` helps advance it before retrying.
//!
//! Nodes are reference counted through [`arc_swap`], so a node reached by a
//! traversal stays valid even after a concurrent `poll` unlinks it; it is just
//! logically stale. Each node keeps its element in a small slot that is
//! emptied when the node is dequeued, so consumers are not retained by the
//! sentinel left behind. The slot lock only ever covers a move or a clone of
//! the element; caller code never runs under it.

use arc_swap::{ArcSwap, ArcSwapOption};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

struct Node<T> {
    value: Mutex<Option<T>>,
    next: ArcSwapOption<Node<T>>,
}

impl<T> Node<T> {
    fn sentinel() -> Arc<Self> {
        Arc::new(Self {
            value: Mutex::new(None),
            next: ArcSwapOption::empty(),
        })
    }

    fn with_value(value: T) -> Arc<Self> {
        Arc::new(Self {
            value: Mutex::new(Some(value)),
            next: ArcSwapOption::empty(),
        })
    }
}

impl<T> Drop for Node<T> {
    fn drop(&mut self) {
        // Unlink iteratively; a recursive drop of a long chain overflows the stack.
        let mut next = self.next.swap(None);
        while let Some(node) = next {
            match Arc::try_unwrap(node) {
                Ok(node) => next = node.next.swap(None),
                Err(_) => break,
            }
        }
    }
}

/// An unbounded, lock-free, multi-producer multi-consumer FIFO queue.
///
/// `offer` never blocks and always succeeds. `poll` and `peek` never block
/// either; under contention they retry until they observe a consistent
/// snapshot.
pub struct LockFreeQueue<T> {
    head: ArcSwap<Node<T>>,
    tail: ArcSwap<Node<T>>,
}

impl<T> LockFreeQueue<T> {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        let sentinel = Node::sentinel();
        Self {
            head: ArcSwap::new(Arc::clone(&sentinel)),
            tail: ArcSwap::new(sentinel),
        }
    }

    /// Appends an element at the back of the queue.
    pub fn offer(&self, value: T) {
        let node = Node::with_value(value);
        loop {
            let tail = self.tail.load_full();
            match tail.next.load_full() {
                None => {
                    let prev = tail
                        .next
                        .compare_and_swap(&None::<Arc<Node<T>>>, Some(Arc::clone(&node)));
                    if prev.is_none() {
                        // Best effort; a loser is helped along by the next operation.
                        self.tail.compare_and_swap(&tail, node);
                        return;
                    }
                }
                Some(next) => {
                    self.tail.compare_and_swap(&tail, next);
                }
            }
        }
    }

    /// Removes and returns the front element, or `None` if the queue is empty.
    pub fn poll(&self) -> Option<T> {
        loop {
            let head = self.head.load_full();
            let tail = self.tail.load_full();
            let next = head.next.load_full();

            if Arc::ptr_eq(&head, &tail) {
                match next {
                    None => return None,
                    Some(next) => {
                        // An enqueue linked a node but has not advanced tail yet.
                        self.tail.compare_and_swap(&tail, next);
                        continue;
                    }
                }
            }

            let Some(next) = next else {
                continue;
            };
            let prev = self.head.compare_and_swap(&head, Arc::clone(&next));
            if Arc::ptr_eq(&prev, &head) {
                // `next` is the new sentinel; its slot belongs to us alone.
                if let Some(value) = next.value.lock().take() {
                    return Some(value);
                }
            }
        }
    }

    /// Returns true if the queue holds no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.head.load().next.load().is_none()
    }

    /// Counts the elements currently linked.
    ///
    /// This walks the queue and is only a snapshot under concurrent use.
    #[must_use]
    pub fn len(&self) -> usize {
        let mut count = 0;
        let mut cursor = self.head.load().next.load_full();
        while let Some(node) = cursor {
            if node.value.lock().is_some() {
                count += 1;
            }
            cursor = node.next.load_full();
        }
        count
    }

    /// Drains every element, in FIFO order, into `f`.
    pub fn drain(&self, mut f: impl FnMut(T)) {
        while let Some(value) = self.poll() {
            f(value);
        }
    }

    /// Resets the queue to a single fresh sentinel.
    ///
    /// Not atomic with respect to concurrent `offer`/`poll`: an element offered
    /// while the reset is in progress may be lost. Use only when the caller
    /// knows no other thread is touching the queue.
    pub fn clear(&self) {
        let sentinel = Node::sentinel();
        self.head.store(Arc::clone(&sentinel));
        self.tail.store(sentinel);
    }
}

impl<T: Clone> LockFreeQueue<T> {
    /// Returns a clone of the front element without removing it.
    #[must_use]
    pub fn peek(&self) -> Option<T> {
        loop {
            let head = self.head.load_full();
            let tail = self.tail.load_full();
            let next = head.next.load_full()?;
            if Arc::ptr_eq(&head, &tail) {
                self.tail.compare_and_swap(&tail, Arc::clone(&next));
            }

            let value = next.value.lock().clone();
            if value.is_some() {
                return value;
            }
            // Dequeued between our loads; head has moved on.
        }
    }

    /// Runs `f` on a clone of the front element without removing it.
    pub fn peek_with<R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        self.peek().map(|value| f(&value))
    }

    /// Visits a clone of every element from front to back.
    ///
    /// The traversal is snapshot-weak: elements offered or polled concurrently
    /// may or may not be seen, but each visited element was live when reached.
    /// `f` runs on its own copy, so it may take as long as it likes and may
    /// touch this queue.
    pub fn for_each(&self, mut f: impl FnMut(&T)) {
        for value in self.iter() {
            f(&value);
        }
    }

    /// Returns a snapshot-weak iterator yielding clones of the elements.
    #[must_use]
    pub fn iter(&self) -> Iter<T> {
        Iter {
            cursor: self.head.load().next.load_full(),
        }
    }
}

impl<T> Default for LockFreeQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for LockFreeQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockFreeQueue")
            .field("len", &self.len())
            .finish()
    }
}

/// Iterator over clones of a queue's elements, see [`LockFreeQueue::iter`].
pub struct Iter<T> {
    cursor: Option<Arc<Node<T>>>,
}

impl<T: Clone> Iterator for Iter<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        while let Some(node) = self.cursor.take() {
            self.cursor = node.next.load_full();
            let value = node.value.lock().clone();
            if value.is_some() {
                return value;
            }
        }
        None
    }
}
