/*!
 * Futex-Based Wait Strategy
 *
 * Uses parking_lot_core for futex-like operations on all platforms.
 *
 * # Design
 *
 * Follows Linux futex design: a fixed sharded table of parking slots.
 * - Zero allocations after initialization
 * - Guaranteed stable memory addresses (the slot address is the park key)
 * - Multiple keys can share a slot; each parked thread carries its key's
 *   hash as a park token and wakes filter on it, so a wake for one key never
 *   consumes a waiter of another key
 * - Waiters on one key are woken in FIFO order
 */

use super::traits::{WaitOutcome, WaitStrategy, WakeResult};
use parking_lot_core::{
    park, unpark_filter, FilterOp, ParkResult, ParkToken, DEFAULT_UNPARK_TOKEN,
};
use crate::core::atomic::{AtomicCell, OrderingToken};
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::time::Instant;

/// Default number of parking slots (power of 2 for fast modulo via bitwise AND)
pub const DEFAULT_PARKING_SLOTS: usize = 64;

/// A single parking slot with a waiter counter
#[repr(C, align(64))] // Cache-line aligned to prevent false sharing
struct ParkingSlot {
    waiters: AtomicCell<usize>,
}

impl ParkingSlot {
    const fn new() -> Self {
        Self {
            waiters: AtomicCell::<usize>::const_new(0),
        }
    }
}

/// Futex-based wait strategy using sharded parking slots
pub struct FutexWait<K>
where
    K: Eq + Hash + Copy + Send + Sync + 'static,
{
    /// Fixed array of parking slots (never resizes, stable addresses)
    slots: Box<[ParkingSlot]>,
    mask: usize,
    _phantom: PhantomData<K>,
}

impl<K> FutexWait<K>
where
    K: Eq + Hash + Copy + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::with_slots(DEFAULT_PARKING_SLOTS)
    }

    /// Table with `slots` parking slots, rounded up to a power of two
    ///
    /// Use a small table when only a handful of keys are ever waited on.
    pub fn with_slots(slots: usize) -> Self {
        let count = slots.max(1).next_power_of_two();
        Self {
            slots: (0..count).map(|_| ParkingSlot::new()).collect(),
            mask: count - 1,
            _phantom: PhantomData,
        }
    }

    #[inline]
    fn key_hash(key: K) -> usize {
        let mut hasher = ahash::AHasher::default();
        key.hash(&mut hasher);
        hasher.finish() as usize
    }

    #[inline]
    fn slot(&self, hash: usize) -> &ParkingSlot {
        &self.slots[hash & self.mask]
    }

    #[inline]
    fn park_addr(slot: &ParkingSlot) -> usize {
        slot.waiters.addr()
    }

    fn wake(&self, key: K, limit: usize) -> WakeResult {
        let hash = Self::key_hash(key);
        let addr = Self::park_addr(self.slot(hash));
        let mut remaining = limit;

        // SAFETY: addr is the address of a slot we own; the filter and
        // callback do not call back into parking_lot_core.
        let result = unsafe {
            unpark_filter(
                addr,
                |token: ParkToken| {
                    if remaining == 0 {
                        FilterOp::Stop
                    } else if token.0 == hash {
                        remaining -= 1;
                        FilterOp::Unpark
                    } else {
                        FilterOp::Skip
                    }
                },
                |_| DEFAULT_UNPARK_TOKEN,
            )
        };

        WakeResult::from_count(result.unparked_threads)
    }
}

impl<K> Default for FutexWait<K>
where
    K: Eq + Hash + Copy + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> WaitStrategy<K> for FutexWait<K>
where
    K: Eq + Hash + Copy + Send + Sync + 'static,
{
    fn wait(
        &self,
        key: K,
        validate: &mut dyn FnMut() -> bool,
        deadline: Option<Instant>,
    ) -> WaitOutcome {
        let hash = Self::key_hash(key);
        let slot = self.slot(hash);
        let addr = Self::park_addr(slot);

        slot.waiters.fetch_add(1, OrderingToken::Relaxed);

        // SAFETY: validate only inspects caller state; none of the callbacks
        // park or unpark.
        let result = unsafe {
            park(
                addr,
                || validate(),
                || {},
                |_key, _was_last| {},
                ParkToken(hash),
                deadline,
            )
        };

        slot.waiters.fetch_sub(1, OrderingToken::Relaxed);

        match result {
            ParkResult::Unparked(_) => WaitOutcome::Woken,
            ParkResult::TimedOut => WaitOutcome::TimedOut,
            ParkResult::Invalid => WaitOutcome::Invalid,
        }
    }

    fn wake_one(&self, key: K) -> WakeResult {
        self.wake(key, 1)
    }

    fn wake_all(&self, key: K) -> WakeResult {
        self.wake(key, usize::MAX)
    }

    fn waiter_count(&self, key: K) -> usize {
        self.slot(Self::key_hash(key)).waiters.load(OrderingToken::Relaxed)
    }

    fn name(&self) -> &'static str {
        "futex"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_futex_wake_one() {
        let futex = Arc::new(FutexWait::<u64>::new());
        let futex_clone = futex.clone();

        let handle = thread::spawn(move || {
            futex_clone.wait(42, &mut || true, Some(Instant::now() + Duration::from_secs(5)))
        });

        // Retry until the waiter has actually parked
        while !futex.wake_one(42).is_woken() {
            thread::sleep(Duration::from_millis(5));
        }

        assert_eq!(handle.join().unwrap(), WaitOutcome::Woken);
    }

    #[test]
    fn test_futex_timeout() {
        let futex = FutexWait::<u64>::new();
        let start = Instant::now();
        let result = futex.wait(99, &mut || true, Some(start + Duration::from_millis(50)));

        assert_eq!(result, WaitOutcome::TimedOut);
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn test_futex_invalid_never_sleeps() {
        let futex = FutexWait::<u64>::new();
        let result = futex.wait(7, &mut || false, None);
        assert_eq!(result, WaitOutcome::Invalid);
    }

    #[test]
    fn test_single_slot_keys_do_not_steal_wakes() {
        let futex = Arc::new(FutexWait::<u8>::with_slots(1));
        let futex_clone = futex.clone();

        let handle = thread::spawn(move || {
            futex_clone.wait(1, &mut || true, Some(Instant::now() + Duration::from_millis(200)))
        });
        while futex.waiter_count(1) == 0 {
            thread::sleep(Duration::from_millis(1));
        }
        thread::sleep(Duration::from_millis(5));

        // Same slot, different key: the parked waiter stays parked
        assert_eq!(futex.wake_all(2), WakeResult::NoWaiters);
        assert_eq!(handle.join().unwrap(), WaitOutcome::TimedOut);
    }

    #[test]
    fn test_wake_other_key_is_noop() {
        let futex = FutexWait::<u64>::new();
        assert_eq!(futex.wake_one(1), WakeResult::NoWaiters);
        assert_eq!(futex.wake_all(2), WakeResult::NoWaiters);
    }
}
