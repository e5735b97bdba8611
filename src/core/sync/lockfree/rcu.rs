/*!
 * Read-Copy-Update (RCU) Cell
 * Zero-contention reads for read-heavy shared values
 *
 * # Reclamation
 *
 * Every published value is an `Arc<T>`. A reader's `Snapshot` owns one
 * strong reference, so a replaced value stays alive for as long as any
 * reader still holds it. Replaced values go onto a retired list; a value is
 * freed once the list holds its last reference (its grace period is over).
 * `reclaim()` runs after every update and can also be called explicitly.
 * While the list is non-empty, `read()` also attempts a non-blocking reclaim,
 * so a cell that stops being updated still frees values its readers released.
 */

use crate::core::atomic::AtomicCell;
use crate::core::atomic::OrderingToken::{Relaxed, Release};
use crate::core::limits::RCU_RETIRED_WARN_THRESHOLD;
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// Immutable view of the value published at read time
///
/// Holding a snapshot keeps that value alive across later updates.
pub struct Snapshot<T> {
    value: Arc<T>,
}

impl<T> Snapshot<T> {
    /// True if both snapshots observe the same published value
    #[inline]
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        Arc::ptr_eq(&this.value, &other.value)
    }

    /// Unwrap into the shared pointer
    #[inline]
    pub fn into_arc(this: Self) -> Arc<T> {
        this.value
    }
}

impl<T> Clone for Snapshot<T> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
        }
    }
}

impl<T> Deref for Snapshot<T> {
    type Target = T;

    #[inline(always)]
    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T: fmt::Debug> fmt::Debug for Snapshot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.value, f)
    }
}

/// RCU-protected value with zero-contention reads
///
/// # Performance
///
/// - **Reads**: one atomic pointer load plus a reference-count bump
/// - **Writes**: one atomic swap (`update`) or clone-modify-swap (`update_with`)
/// - **Best for**: read:write ratio > 100:1
///
/// A replaced value is dropped by the first update, `reclaim()` or `read()`
/// that runs after its last snapshot is gone. Reads skip reclamation when
/// another thread holds the retired list.
///
/// # Example
///
/// ```
/// use concurrency_toolkit::RcuCell;
///
/// let routes = RcuCell::new(vec!["a"]);
///
/// let before = routes.read();
/// routes.update_with(|current| {
///     let mut next = current.clone();
///     next.push("b");
///     next
/// });
///
/// assert_eq!(*before, vec!["a"]);
/// assert_eq!(*routes.read(), vec!["a", "b"]);
/// ```
pub struct RcuCell<T> {
    current: ArcSwap<T>,
    retired: Mutex<Vec<Arc<T>>>,
    /// Mirror of `retired.len()`, written under the list lock
    pending: AtomicCell<usize>,
}

impl<T> RcuCell<T> {
    #[inline]
    pub fn new(value: T) -> Self {
        Self {
            current: ArcSwap::from_pointee(value),
            retired: Mutex::new(Vec::new()),
            pending: AtomicCell::new(0),
        }
    }

    /// Snapshot of the currently published value (never blocks)
    #[inline(always)]
    pub fn read(&self) -> Snapshot<T> {
        if self.pending.load(Relaxed) > 0 {
            self.try_reclaim();
        }
        Snapshot {
            value: self.current.load_full(),
        }
    }

    /// Publish `value`; readers that already hold a snapshot keep the old one
    pub fn update(&self, value: T) {
        let previous = self.current.swap(Arc::new(value));
        self.retire(previous);
    }

    /// Clone-modify-swap
    ///
    /// `f` receives the current value and returns its replacement. Under
    /// contention `f` may run more than once.
    pub fn update_with<F>(&self, mut f: F)
    where
        F: FnMut(&T) -> T,
    {
        let previous = self.current.rcu(|current| Arc::new(f(&**current)));
        self.retire(previous);
    }

    /// Publish `value` only if `current` is still the published snapshot
    ///
    /// Returns `Ok(new)` on success, `Err(actual)` with the value that won
    /// otherwise.
    pub fn compare_and_swap(
        &self,
        current: &Snapshot<T>,
        value: T,
    ) -> Result<Snapshot<T>, Snapshot<T>> {
        let next = Arc::new(value);
        let witnessed = self
            .current
            .compare_and_swap(&current.value, Arc::clone(&next));

        if Arc::ptr_eq(&*witnessed, &current.value) {
            drop(witnessed);
            self.retire(Arc::clone(&current.value));
            Ok(Snapshot { value: next })
        } else {
            Err(Snapshot {
                value: Arc::clone(&*witnessed),
            })
        }
    }

    /// Free retired values no reader still holds; returns how many were freed
    pub fn reclaim(&self) -> usize {
        let freed = {
            let mut retired = self.retired.lock();
            self.collect_free(&mut retired)
        };
        Self::release(freed)
    }

    /// Number of replaced values still awaiting reclamation
    pub fn retired_count(&self) -> usize {
        self.retired.lock().len()
    }

    /// `reclaim` for the read path: gives up if the list is busy
    #[cold]
    fn try_reclaim(&self) {
        let freed = match self.retired.try_lock() {
            Some(mut retired) => self.collect_free(&mut retired),
            None => return,
        };
        Self::release(freed);
    }

    fn collect_free(&self, retired: &mut Vec<Arc<T>>) -> Vec<Arc<T>> {
        let (free, keep): (Vec<_>, Vec<_>) = retired
            .drain(..)
            .partition(|value| Arc::strong_count(value) == 1);
        *retired = keep;
        self.pending.store(retired.len(), Release);
        free
    }

    // Drop outside the list lock: destructors may be arbitrarily slow
    fn release(freed: Vec<Arc<T>>) -> usize {
        let count = freed.len();
        drop(freed);

        if count > 0 {
            tracing::debug!(freed = count, "reclaimed retired snapshots");
        }
        count
    }

    fn retire(&self, previous: Arc<T>) {
        let pending = {
            let mut retired = self.retired.lock();
            retired.push(previous);
            self.pending.store(retired.len(), Release);
            retired.len()
        };

        if pending == RCU_RETIRED_WARN_THRESHOLD {
            tracing::warn!(
                pending,
                "retired snapshots piling up; long-lived readers are delaying reclamation"
            );
        }

        self.reclaim();
    }
}

impl<T: Default> Default for RcuCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for RcuCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RcuCell")
            .field("current", &*self.current.load())
            .field("retired", &self.retired_count())
            .finish()
    }
}
