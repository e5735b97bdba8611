/*!
 * Exclusive Lock
 *
 * Mutual exclusion built from an `AtomicCell<u8>` state word plus the FIFO
 * wait queue of the process-wide parking table (keyed by the state word's
 * address).
 *
 * # State Word
 *
 * ```text
 * bit 0  LOCKED   a guard is alive
 * bit 1  PARKED   at least one thread may be parked on this lock
 * ```
 *
 * # Fairness
 *
 * Releasing a lock with parked waiters hands ownership straight to the head
 * of the queue: the state never passes through Unlocked, so a thread that
 * arrives later cannot overtake a parked one. Threads spin briefly before
 * parking; once parked they are served strictly first-blocked first-woken.
 */

use super::poison::{PanicSentinel, PoisonFlag};
use crate::core::atomic::AtomicCell;
use crate::core::atomic::OrderingToken::{Acquire, Relaxed, Release};
use crate::core::limits::LOCK_SPIN_LIMIT;
use parking_lot_core::{park, unpark_one, ParkResult, UnparkResult, UnparkToken, DEFAULT_PARK_TOKEN};
use std::cell::UnsafeCell;
use std::fmt;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::time::{Duration, Instant};

const LOCKED: u8 = 0b01;
const PARKED: u8 = 0b10;

/// Unpark token: lock ownership transferred to the woken thread
pub(super) const TOKEN_HANDOFF: UnparkToken = UnparkToken(1);
/// Unpark token: woken thread must compete for the lock
pub(super) const TOKEN_NORMAL: UnparkToken = UnparkToken(0);

/// Blocking mutual-exclusion lock protecting a value of type `T`
///
/// # Example
///
/// ```
/// use concurrency_toolkit::ExclusiveLock;
/// use std::sync::Arc;
/// use std::thread;
///
/// let counter = Arc::new(ExclusiveLock::new(0u32));
/// let handles: Vec<_> = (0..4)
///     .map(|_| {
///         let counter = counter.clone();
///         thread::spawn(move || *counter.acquire() += 1)
///     })
///     .collect();
/// for handle in handles {
///     handle.join().unwrap();
/// }
/// assert_eq!(*counter.acquire(), 4);
/// ```
pub struct ExclusiveLock<T> {
    state: AtomicCell<u8>,
    poison: PoisonFlag,
    data: UnsafeCell<T>,
}

// SAFETY: access to `data` is serialized by the state word
unsafe impl<T: Send> Send for ExclusiveLock<T> {}
unsafe impl<T: Send> Sync for ExclusiveLock<T> {}

impl<T> ExclusiveLock<T> {
    pub fn new(value: T) -> Self {
        Self {
            state: AtomicCell::new(0),
            poison: PoisonFlag::new(),
            data: UnsafeCell::new(value),
        }
    }

    /// Block until the lock is held exclusively
    pub fn acquire(&self) -> LockGuard<'_, T> {
        if !self.try_lock_fast() {
            self.lock_slow(None);
        }
        self.guard()
    }

    /// Take the lock only if it is free right now
    pub fn try_acquire(&self) -> Option<LockGuard<'_, T>> {
        let mut state = self.state.load(Relaxed);
        loop {
            if state & LOCKED != 0 {
                return None;
            }
            match self
                .state
                .compare_exchange_weak(state, state | LOCKED, Acquire, Relaxed)
            {
                Ok(_) => return Some(self.guard()),
                Err(actual) => state = actual,
            }
        }
    }

    /// Block for at most `timeout`
    pub fn acquire_timeout(&self, timeout: Duration) -> Option<LockGuard<'_, T>> {
        self.acquire_until(Instant::now() + timeout)
    }

    /// Block until `deadline` at the latest
    pub fn acquire_until(&self, deadline: Instant) -> Option<LockGuard<'_, T>> {
        if self.try_lock_fast() || self.lock_slow(Some(deadline)) {
            Some(self.guard())
        } else {
            None
        }
    }

    /// Run `f` with the lock held
    pub fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut T) -> R,
    {
        let mut guard = self.acquire();
        f(&mut guard)
    }

    /// Diagnostic: is any guard alive
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.state.load(Relaxed) & LOCKED != 0
    }

    /// Diagnostic: may threads be parked waiting for this lock
    #[inline]
    pub fn has_waiters(&self) -> bool {
        self.state.load(Relaxed) & PARKED != 0
    }

    #[inline]
    pub fn is_poisoned(&self) -> bool {
        self.poison.get()
    }

    /// Reset the poison flag after restoring the protected value
    pub fn clear_poison(&self) {
        self.poison.clear();
    }

    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }

    /// Mutable access without locking (exclusive borrow proves no holders)
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }

    #[inline]
    fn guard(&self) -> LockGuard<'_, T> {
        LockGuard {
            lock: self,
            sentinel: self.poison.sentinel(),
            poisoned: self.poison.get(),
            _not_send: PhantomData,
        }
    }

    #[inline(always)]
    fn try_lock_fast(&self) -> bool {
        self.state
            .compare_exchange_weak(0, LOCKED, Acquire, Relaxed)
            .is_ok()
    }

    #[cold]
    fn lock_slow(&self, deadline: Option<Instant>) -> bool {
        let mut spins = 0u32;
        let mut state = self.state.load(Relaxed);

        loop {
            if state & LOCKED == 0 {
                match self
                    .state
                    .compare_exchange_weak(state, state | LOCKED, Acquire, Relaxed)
                {
                    Ok(_) => return true,
                    Err(actual) => {
                        state = actual;
                        continue;
                    }
                }
            }

            // Nobody queued yet: a short spin often beats a park
            if state & PARKED == 0 && spins < LOCK_SPIN_LIMIT {
                spins += 1;
                if spins <= LOCK_SPIN_LIMIT / 2 {
                    std::hint::spin_loop();
                } else {
                    std::thread::yield_now();
                }
                state = self.state.load(Relaxed);
                continue;
            }

            if state & PARKED == 0 {
                if let Err(actual) =
                    self.state
                        .compare_exchange_weak(state, state | PARKED, Relaxed, Relaxed)
                {
                    state = actual;
                    continue;
                }
            }

            let addr = self.state.addr();
            let validate = || self.state.load(Relaxed) == LOCKED | PARKED;
            let timed_out = |_key: usize, was_last_thread: bool| {
                if was_last_thread {
                    self.state.fetch_and(!PARKED, Relaxed);
                }
            };

            // SAFETY: addr is our state word; callbacks only touch the state
            // word and never park/unpark.
            let result = unsafe {
                park(addr, validate, || {}, timed_out, DEFAULT_PARK_TOKEN, deadline)
            };

            match result {
                ParkResult::Unparked(TOKEN_HANDOFF) => return true,
                ParkResult::TimedOut => return false,
                ParkResult::Unparked(_) | ParkResult::Invalid => {}
            }

            spins = 0;
            state = self.state.load(Relaxed);
        }
    }

    #[inline]
    fn unlock(&self) {
        if self
            .state
            .compare_exchange(LOCKED, 0, Release, Relaxed)
            .is_ok()
        {
            return;
        }
        self.unlock_slow();
    }

    #[cold]
    fn unlock_slow(&self) {
        let addr = self.state.addr();
        let callback = |result: UnparkResult| {
            if result.unparked_threads != 0 {
                // Ownership moves to the woken thread; LOCKED stays set
                if !result.have_more_threads {
                    self.state.store(LOCKED, Relaxed);
                }
                TOKEN_HANDOFF
            } else {
                self.state.store(0, Release);
                TOKEN_NORMAL
            }
        };

        // SAFETY: the callback only touches the state word.
        unsafe {
            unpark_one(addr, callback);
        }
    }
}

impl<T: Default> Default for ExclusiveLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> From<T> for ExclusiveLock<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: fmt::Debug> fmt::Debug for ExclusiveLock<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("ExclusiveLock");
        match self.try_acquire() {
            Some(guard) => d.field("data", &&*guard),
            None => d.field("data", &format_args!("<locked>")),
        };
        d.field("poisoned", &self.is_poisoned());
        d.finish_non_exhaustive()
    }
}

/// Scoped exclusive access to the value inside an `ExclusiveLock`
///
/// Released on drop, on every exit path. Not `Send`: the lock is released on
/// the thread that acquired it.
#[must_use = "if unused the lock is released immediately"]
pub struct LockGuard<'a, T> {
    lock: &'a ExclusiveLock<T>,
    sentinel: PanicSentinel,
    poisoned: bool,
    _not_send: PhantomData<*const ()>,
}

// SAFETY: sharing the guard only shares `&T`
unsafe impl<T: Sync> Sync for LockGuard<'_, T> {}

impl<T> LockGuard<'_, T> {
    /// True if a previous holder panicked while holding the lock
    #[inline]
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }
}

impl<T> Deref for LockGuard<'_, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        // SAFETY: the guard proves exclusive ownership
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> DerefMut for LockGuard<'_, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: the guard proves exclusive ownership
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T> Drop for LockGuard<'_, T> {
    #[inline]
    fn drop(&mut self) {
        self.lock.poison.done(&self.sentinel, "exclusive");
        self.lock.unlock();
    }
}

impl<T: fmt::Debug> fmt::Debug for LockGuard<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}
