/*!
 * Synchronization Traits
 *
 * Core abstractions for wait/notify patterns.
 *
 * # Design: Validated Waits
 *
 * Every wait carries a `validate` callback that is re-checked by the
 * strategy immediately before the thread goes to sleep, under the same
 * internal lock that wakers take. A waker that changes the condition and
 * then notifies can therefore never slip between the check and the sleep.
 */

use std::time::Instant;

/// Result of a wake operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeResult {
    /// Successfully woke N waiters (N >= 1)
    Woken(usize),
    /// No waiters were waiting
    NoWaiters,
}

impl WakeResult {
    /// Check if any waiters were woken
    #[inline(always)]
    pub fn is_woken(&self) -> bool {
        matches!(self, WakeResult::Woken(_))
    }

    /// Get number of woken waiters (0 if none)
    #[inline(always)]
    pub fn count(&self) -> usize {
        match self {
            WakeResult::Woken(n) => *n,
            WakeResult::NoWaiters => 0,
        }
    }

    #[inline]
    pub(super) fn from_count(n: usize) -> Self {
        if n == 0 {
            WakeResult::NoWaiters
        } else {
            WakeResult::Woken(n)
        }
    }
}

/// Outcome of a single wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// Woken by a notify
    Woken,
    /// Deadline passed first
    TimedOut,
    /// `validate` returned false, so the thread never slept
    Invalid,
}

/// Strategy for waiting on a key
///
/// Implementations must be:
/// - **Thread-safe**: Safe to call from multiple threads
/// - **Lossless**: `validate` is evaluated atomically with respect to wakes
///
/// # Type Parameters
///
/// - `K`: Key type for waiting (e.g., u64 for sequence numbers)
pub trait WaitStrategy<K>: Send + Sync
where
    K: Eq + std::hash::Hash + Copy + Send + Sync,
{
    /// Sleep on `key` until woken or `deadline`, unless `validate` says the
    /// condition no longer holds
    ///
    /// `validate` must be cheap and must not wait or wake on any queue.
    fn wait(
        &self,
        key: K,
        validate: &mut dyn FnMut() -> bool,
        deadline: Option<Instant>,
    ) -> WaitOutcome;

    /// Wake one waiter waiting on the specified key
    fn wake_one(&self, key: K) -> WakeResult;

    /// Wake all waiters waiting on the specified key
    fn wake_all(&self, key: K) -> WakeResult;

    /// Get approximate count of waiters for a key (for diagnostics)
    fn waiter_count(&self, key: K) -> usize {
        let _ = key;
        0
    }

    /// Get strategy name for debugging
    fn name(&self) -> &'static str;
}
