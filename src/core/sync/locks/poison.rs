/*!
 * Lock Poisoning
 *
 * A lock is poisoned when a guard is dropped while its thread unwinds from
 * a panic that started after the guard was taken. Poison is a signal, not a
 * failure: later acquisitions still succeed and report the flag on their
 * guard so callers can decide to continue, reset or escalate.
 */

use crate::core::atomic::{AtomicCell, OrderingToken};
use std::thread;

/// Per-lock poison flag
pub(crate) struct PoisonFlag {
    poisoned: AtomicCell<bool>,
}

/// Captures whether the holder was already panicking at acquisition
pub(crate) struct PanicSentinel {
    panicking: bool,
}

impl PoisonFlag {
    #[inline]
    pub(crate) fn new() -> Self {
        Self {
            poisoned: AtomicCell::new(false),
        }
    }

    #[inline]
    pub(crate) fn get(&self) -> bool {
        self.poisoned.load(OrderingToken::Acquire)
    }

    #[inline]
    pub(crate) fn clear(&self) {
        self.poisoned.store(false, OrderingToken::Release);
    }

    /// Called right after acquisition
    #[inline]
    pub(crate) fn sentinel(&self) -> PanicSentinel {
        PanicSentinel {
            panicking: thread::panicking(),
        }
    }

    /// Called on guard drop, before the lock is released
    #[inline]
    pub(crate) fn done(&self, sentinel: &PanicSentinel, lock_kind: &'static str) {
        if !sentinel.panicking && thread::panicking() {
            self.poisoned.store(true, OrderingToken::Release);
            tracing::warn!(lock = lock_kind, "lock poisoned by a panicking holder");
        }
    }
}
