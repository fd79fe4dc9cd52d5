//! An atomic slot holding a future.
//!
//! [`FutureCell`] lets independent parties publish and replace the future
//! that stands for some shared result. Replacement is by identity: a
//! conditional swap succeeds only while the slot still holds the very handle
//! the caller observed (see [`FutureSupplier::ptr_eq`]).
//!
//! Cloning a cell yields another handle to the same slot.

use super::FutureSupplier;
use crate::types::Value;
use arc_swap::ArcSwapOption;
use std::fmt;
use std::sync::Arc;

/// A lock-free slot for an optional [`FutureSupplier`].
pub struct FutureCell<T> {
    slot: Arc<ArcSwapOption<FutureSupplier<T>>>,
}

impl<T> Clone for FutureCell<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T: Value> FutureCell<T> {
    /// Creates a cell holding `future`.
    #[must_use]
    pub fn new(future: FutureSupplier<T>) -> Self {
        Self {
            slot: Arc::new(ArcSwapOption::from_pointee(future)),
        }
    }

    /// Creates an empty cell.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            slot: Arc::new(ArcSwapOption::empty()),
        }
    }

    /// Returns the current future, if any.
    #[must_use]
    pub fn load(&self) -> Option<FutureSupplier<T>> {
        self.slot.load().as_deref().cloned()
    }

    /// Returns true if the cell holds no future.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slot.load().is_none()
    }

    /// Unconditionally replaces the content.
    pub fn set(&self, future: Option<FutureSupplier<T>>) {
        self.slot.store(future.map(Arc::new));
    }

    /// Replaces the content and returns the previous one.
    pub fn swap(&self, future: Option<FutureSupplier<T>>) -> Option<FutureSupplier<T>> {
        self.slot
            .swap(future.map(Arc::new))
            .map(|prev| Arc::try_unwrap(prev).unwrap_or_else(|shared| (*shared).clone()))
    }

    /// Empties the cell.
    pub fn clear(&self) {
        self.slot.store(None);
    }

    /// Replaces the content with `new` if the cell still holds `expected`.
    ///
    /// Returns true on success. Fails if the cell is empty or holds a
    /// different future.
    pub fn compare_and_set(
        &self,
        expected: &FutureSupplier<T>,
        new: Option<FutureSupplier<T>>,
    ) -> bool {
        let new = new.map(Arc::new);
        loop {
            let current = self.slot.load_full();
            match current.as_deref() {
                Some(held) if held.ptr_eq(expected) => {}
                _ => return false,
            }
            let prev = self.slot.compare_and_swap(&current, new.clone());
            if same_slot(&prev, &current) {
                return true;
            }
        }
    }
}

fn same_slot<X>(a: &Option<Arc<X>>, b: &Option<Arc<X>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

impl<T: Value> Default for FutureCell<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: Value> fmt::Debug for FutureCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FutureCell")
            .field("future", &self.load())
            .finish()
    }
}
