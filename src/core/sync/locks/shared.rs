/*!
 * Shared-Exclusive Lock
 *
 * Many concurrent shared holders or one exclusive holder, never both.
 *
 * # State Word
 *
 * ```text
 * bit 0     WRITER          an exclusive guard is alive
 * bit 1     WRITER_PARKED   exclusive requesters are queued
 * bit 2     READERS_PARKED  shared requesters are queued
 * bits 3..  reader count
 * ```
 *
 * Shared and exclusive requesters park on two different keys (the state
 * word's address and that address plus one), so each side has its own FIFO
 * queue.
 *
 * # Writer Preference
 *
 * A queued exclusive requester blocks new shared acquisitions, so a steady
 * stream of readers cannot starve writers. On exclusive release, the next
 * queued writer receives the lock directly; only when no writer is queued
 * are all parked readers admitted together.
 */

use super::exclusive::{TOKEN_HANDOFF, TOKEN_NORMAL};
use super::poison::{PanicSentinel, PoisonFlag};
use crate::core::atomic::AtomicCell;
use crate::core::atomic::OrderingToken::{Acquire, Relaxed, Release};
use crate::core::limits::LOCK_SPIN_LIMIT;
use parking_lot_core::{
    park, unpark_all, unpark_one, ParkResult, UnparkResult, DEFAULT_PARK_TOKEN,
};
use std::cell::{Cell, UnsafeCell};
use std::fmt;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::time::{Duration, Instant};

const WRITER: usize = 0b001;
const WRITER_PARKED: usize = 0b010;
const READERS_PARKED: usize = 0b100;
const ONE_READER: usize = 0b1000;
const READER_MASK: usize = !0b111;

/// Shared-exclusive (reader-writer) lock with writer preference
///
/// # Example
///
/// ```
/// use concurrency_toolkit::SharedExclusiveLock;
///
/// let lock = SharedExclusiveLock::new(vec![1, 2, 3]);
/// {
///     let a = lock.acquire_shared();
///     let b = lock.acquire_shared();
///     assert_eq!(a.len() + b.len(), 6);
///     assert!(lock.try_acquire().is_none());
/// }
/// lock.acquire().push(4);
/// assert_eq!(lock.shared_count(), 0);
/// ```
pub struct SharedExclusiveLock<T> {
    state: AtomicCell<usize>,
    poison: PoisonFlag,
    data: UnsafeCell<T>,
}

// SAFETY: shared holders only get `&T`, the exclusive holder is alone
unsafe impl<T: Send> Send for SharedExclusiveLock<T> {}
unsafe impl<T: Send + Sync> Sync for SharedExclusiveLock<T> {}

impl<T> SharedExclusiveLock<T> {
    pub fn new(value: T) -> Self {
        Self {
            state: AtomicCell::new(0),
            poison: PoisonFlag::new(),
            data: UnsafeCell::new(value),
        }
    }

    // =========================================================================
    // Shared side
    // =========================================================================

    /// Block until shared access is granted
    pub fn acquire_shared(&self) -> ReadGuard<'_, T> {
        if !self.try_lock_shared_fast() {
            self.lock_shared_slow(None);
        }
        self.read_guard()
    }

    /// Take shared access only if no writer holds or waits for the lock
    pub fn try_acquire_shared(&self) -> Option<ReadGuard<'_, T>> {
        let mut state = self.state.load(Relaxed);
        loop {
            if state & (WRITER | WRITER_PARKED) != 0 {
                return None;
            }
            let next = state.checked_add(ONE_READER)?;
            match self
                .state
                .compare_exchange_weak(state, next, Acquire, Relaxed)
            {
                Ok(_) => return Some(self.read_guard()),
                Err(actual) => state = actual,
            }
        }
    }

    pub fn acquire_shared_timeout(&self, timeout: Duration) -> Option<ReadGuard<'_, T>> {
        let deadline = Instant::now() + timeout;
        if self.try_lock_shared_fast() || self.lock_shared_slow(Some(deadline)) {
            Some(self.read_guard())
        } else {
            None
        }
    }

    // =========================================================================
    // Exclusive side
    // =========================================================================

    /// Block until exclusive access is granted
    pub fn acquire(&self) -> WriteGuard<'_, T> {
        if !self.try_lock_exclusive_fast() {
            self.lock_exclusive_slow(None);
        }
        self.write_guard()
    }

    /// Take exclusive access only if there are no holders right now
    pub fn try_acquire(&self) -> Option<WriteGuard<'_, T>> {
        let mut state = self.state.load(Relaxed);
        loop {
            if state & (WRITER | READER_MASK) != 0 {
                return None;
            }
            match self
                .state
                .compare_exchange_weak(state, state | WRITER, Acquire, Relaxed)
            {
                Ok(_) => return Some(self.write_guard()),
                Err(actual) => state = actual,
            }
        }
    }

    pub fn acquire_timeout(&self, timeout: Duration) -> Option<WriteGuard<'_, T>> {
        let deadline = Instant::now() + timeout;
        if self.try_lock_exclusive_fast() || self.lock_exclusive_slow(Some(deadline)) {
            Some(self.write_guard())
        } else {
            None
        }
    }

    // =========================================================================
    // Diagnostics
    // =========================================================================

    /// Number of live shared guards
    #[inline]
    pub fn shared_count(&self) -> usize {
        (self.state.load(Relaxed) & READER_MASK) / ONE_READER
    }

    #[inline]
    pub fn is_exclusively_held(&self) -> bool {
        self.state.load(Relaxed) & WRITER != 0
    }

    /// True while exclusive requesters are queued (new readers are held back)
    #[inline]
    pub fn has_queued_exclusive(&self) -> bool {
        self.state.load(Relaxed) & WRITER_PARKED != 0
    }

    #[inline]
    pub fn is_poisoned(&self) -> bool {
        self.poison.get()
    }

    pub fn clear_poison(&self) {
        self.poison.clear();
    }

    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }

    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }

    // =========================================================================
    // Internals
    // =========================================================================

    #[inline(always)]
    fn reader_key(&self) -> usize {
        self.state.addr()
    }

    #[inline(always)]
    fn writer_key(&self) -> usize {
        self.state.addr() + 1
    }

    fn read_guard(&self) -> ReadGuard<'_, T> {
        ReadGuard {
            lock: self,
            poisoned: self.poison.get(),
            _not_send: PhantomData,
        }
    }

    fn write_guard(&self) -> WriteGuard<'_, T> {
        WriteGuard {
            lock: self,
            sentinel: self.poison.sentinel(),
            poisoned: self.poison.get(),
            _not_send: PhantomData,
        }
    }

    #[inline(always)]
    fn try_lock_shared_fast(&self) -> bool {
        let state = self.state.load(Relaxed);
        if state & (WRITER | WRITER_PARKED) != 0 {
            return false;
        }
        match state.checked_add(ONE_READER) {
            Some(next) => self
                .state
                .compare_exchange_weak(state, next, Acquire, Relaxed)
                .is_ok(),
            None => false,
        }
    }

    #[inline(always)]
    fn try_lock_exclusive_fast(&self) -> bool {
        self.state
            .compare_exchange_weak(0, WRITER, Acquire, Relaxed)
            .is_ok()
    }

    #[cold]
    fn lock_shared_slow(&self, deadline: Option<Instant>) -> bool {
        let mut spins = 0u32;
        let mut state = self.state.load(Relaxed);

        loop {
            if state & (WRITER | WRITER_PARKED) == 0 {
                match state.checked_add(ONE_READER) {
                    Some(next) => {
                        match self
                            .state
                            .compare_exchange_weak(state, next, Acquire, Relaxed)
                        {
                            Ok(_) => return true,
                            Err(actual) => state = actual,
                        }
                    }
                    None => {
                        // Reader count saturated: wait for some to leave
                        std::thread::yield_now();
                        state = self.state.load(Relaxed);
                    }
                }
                continue;
            }

            if state & (WRITER_PARKED | READERS_PARKED) == 0 && spins < LOCK_SPIN_LIMIT {
                spins += 1;
                std::hint::spin_loop();
                state = self.state.load(Relaxed);
                continue;
            }

            if state & READERS_PARKED == 0 {
                if let Err(actual) = self.state.compare_exchange_weak(
                    state,
                    state | READERS_PARKED,
                    Relaxed,
                    Relaxed,
                ) {
                    state = actual;
                    continue;
                }
            }

            let validate = || {
                let state = self.state.load(Relaxed);
                state & READERS_PARKED != 0 && state & (WRITER | WRITER_PARKED) != 0
            };
            let timed_out = |_key: usize, was_last_thread: bool| {
                if was_last_thread {
                    self.state.fetch_and(!READERS_PARKED, Relaxed);
                }
            };

            // SAFETY: callbacks only touch the state word
            let result = unsafe {
                park(
                    self.reader_key(),
                    validate,
                    || {},
                    timed_out,
                    DEFAULT_PARK_TOKEN,
                    deadline,
                )
            };

            if let ParkResult::TimedOut = result {
                return false;
            }

            spins = 0;
            state = self.state.load(Relaxed);
        }
    }

    #[cold]
    fn lock_exclusive_slow(&self, deadline: Option<Instant>) -> bool {
        let mut spins = 0u32;
        let mut state = self.state.load(Relaxed);

        loop {
            if state & (WRITER | READER_MASK) == 0 {
                match self
                    .state
                    .compare_exchange_weak(state, state | WRITER, Acquire, Relaxed)
                {
                    Ok(_) => return true,
                    Err(actual) => {
                        state = actual;
                        continue;
                    }
                }
            }

            // Spin only against another writer; readers get held back at once
            if state & (WRITER_PARKED | READER_MASK) == 0 && spins < LOCK_SPIN_LIMIT {
                spins += 1;
                std::hint::spin_loop();
                state = self.state.load(Relaxed);
                continue;
            }

            if state & WRITER_PARKED == 0 {
                if let Err(actual) = self.state.compare_exchange_weak(
                    state,
                    state | WRITER_PARKED,
                    Relaxed,
                    Relaxed,
                ) {
                    state = actual;
                    continue;
                }
            }

            let cleared_from = Cell::new(None);
            let validate = || {
                let state = self.state.load(Relaxed);
                state & WRITER_PARKED != 0 && state & (WRITER | READER_MASK) != 0
            };
            let timed_out = |_key: usize, was_last_thread: bool| {
                if was_last_thread {
                    cleared_from.set(Some(self.state.fetch_and(!WRITER_PARKED, Relaxed)));
                }
            };

            // SAFETY: callbacks only touch the state word and a local cell
            let result = unsafe {
                park(
                    self.writer_key(),
                    validate,
                    || {},
                    timed_out,
                    DEFAULT_PARK_TOKEN,
                    deadline,
                )
            };

            match result {
                ParkResult::Unparked(TOKEN_HANDOFF) => return true,
                ParkResult::TimedOut => {
                    // Readers held back by this writer may proceed now
                    if let Some(previous) = cleared_from.get() {
                        if previous & READERS_PARKED != 0 {
                            self.wake_readers();
                        }
                    }
                    return false;
                }
                ParkResult::Unparked(_) | ParkResult::Invalid => {}
            }

            spins = 0;
            state = self.state.load(Relaxed);
        }
    }

    fn wake_readers(&self) {
        let previous = self.state.fetch_and(!READERS_PARKED, Relaxed);
        if previous & READERS_PARKED != 0 {
            // SAFETY: no callbacks
            unsafe {
                unpark_all(self.reader_key(), TOKEN_NORMAL);
            }
        }
    }

    #[inline]
    fn unlock_shared(&self) {
        let previous = self.state.fetch_sub(ONE_READER, Release);
        let was_last = previous & READER_MASK == ONE_READER;
        if was_last && previous & WRITER_PARKED != 0 {
            // WRITER_PARKED stays set so readers keep yielding to the woken writer
            // SAFETY: trivial callback
            unsafe {
                unpark_one(self.writer_key(), |_| TOKEN_NORMAL);
            }
        }
    }

    #[inline]
    fn unlock_exclusive(&self) {
        if self
            .state
            .compare_exchange(WRITER, 0, Release, Relaxed)
            .is_ok()
        {
            return;
        }
        self.unlock_exclusive_slow();
    }

    #[cold]
    fn unlock_exclusive_slow(&self) {
        let mut state = self.state.load(Relaxed);
        loop {
            if state & WRITER_PARKED != 0 {
                let readers_waiting = Cell::new(false);
                let callback = |result: UnparkResult| {
                    if result.unparked_threads != 0 {
                        // WRITER stays set: ownership moves to the woken writer
                        if !result.have_more_threads {
                            self.state.fetch_and(!WRITER_PARKED, Relaxed);
                        }
                        TOKEN_HANDOFF
                    } else {
                        let previous = self.state.fetch_and(!(WRITER | WRITER_PARKED), Release);
                        readers_waiting.set(previous & READERS_PARKED != 0);
                        TOKEN_NORMAL
                    }
                };

                // SAFETY: the callback only touches the state word and a local cell
                unsafe {
                    unpark_one(self.writer_key(), callback);
                }

                if readers_waiting.get() {
                    self.wake_readers();
                }
                return;
            }

            match self.state.compare_exchange_weak(
                state,
                state & !(WRITER | READERS_PARKED),
                Release,
                Relaxed,
            ) {
                Ok(previous) => {
                    if previous & READERS_PARKED != 0 {
                        // SAFETY: no callbacks
                        unsafe {
                            unpark_all(self.reader_key(), TOKEN_NORMAL);
                        }
                    }
                    return;
                }
                Err(actual) => state = actual,
            }
        }
    }
}

impl<T: Default> Default for SharedExclusiveLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for SharedExclusiveLock<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("SharedExclusiveLock");
        match self.try_acquire_shared() {
            Some(guard) => d.field("data", &&*guard),
            None => d.field("data", &format_args!("<locked>")),
        };
        d.field("shared_count", &self.shared_count());
        d.field("poisoned", &self.is_poisoned());
        d.finish_non_exhaustive()
    }
}

/// Shared access guard; released on drop
#[must_use = "if unused the shared access is released immediately"]
pub struct ReadGuard<'a, T> {
    lock: &'a SharedExclusiveLock<T>,
    poisoned: bool,
    _not_send: PhantomData<*const ()>,
}

unsafe impl<T: Sync> Sync for ReadGuard<'_, T> {}

impl<T> ReadGuard<'_, T> {
    #[inline]
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }
}

impl<T> Deref for ReadGuard<'_, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        // SAFETY: no exclusive holder while a shared guard lives
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> Drop for ReadGuard<'_, T> {
    #[inline]
    fn drop(&mut self) {
        self.lock.unlock_shared();
    }
}

impl<T: fmt::Debug> fmt::Debug for ReadGuard<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

/// Exclusive access guard; released on drop, poisons the lock on panic
#[must_use = "if unused the exclusive access is released immediately"]
pub struct WriteGuard<'a, T> {
    lock: &'a SharedExclusiveLock<T>,
    sentinel: PanicSentinel,
    poisoned: bool,
    _not_send: PhantomData<*const ()>,
}

unsafe impl<T: Sync> Sync for WriteGuard<'_, T> {}

impl<T> WriteGuard<'_, T> {
    #[inline]
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }
}

impl<T> Deref for WriteGuard<'_, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        // SAFETY: sole holder
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> DerefMut for WriteGuard<'_, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: sole holder
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T> Drop for WriteGuard<'_, T> {
    #[inline]
    fn drop(&mut self) {
        self.lock.poison.done(&self.sentinel, "shared_exclusive");
        self.lock.unlock_exclusive();
    }
}

impl<T: fmt::Debug> fmt::Debug for WriteGuard<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}
