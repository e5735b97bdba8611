/*!
 * Wait Queue
 *
 * High-level abstraction for waiting on keys (like worker ids or sequence
 * numbers). Selects a strategy from `SyncConfig`.
 *
 * # Design: Enum Dispatch
 *
 * Instead of `Arc<dyn Trait>`, strategies are held in an enum so the hot
 * path monomorphizes and inlines.
 */

use super::config::{StrategyType, SyncConfig};
use super::futex::{FutexWait, DEFAULT_PARKING_SLOTS};
use super::spinwait::SpinWait;
use super::traits::{WaitOutcome, WaitStrategy, WakeResult};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Result type for wait operations
pub type WaitResult<T> = Result<T, WaitError>;

/// Wait operation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WaitError {
    #[error("Wait operation timed out")]
    Timeout,
}

/// Wait strategy implementation (enum dispatch)
enum WaitStrategyImpl<K>
where
    K: Eq + std::hash::Hash + Copy + Send + Sync + 'static,
{
    Futex(FutexWait<K>),
    SpinWait(SpinWait<K>),
}

impl<K> WaitStrategyImpl<K>
where
    K: Eq + std::hash::Hash + Copy + Send + Sync + 'static,
{
    #[inline(always)]
    fn wait(
        &self,
        key: K,
        validate: &mut dyn FnMut() -> bool,
        deadline: Option<Instant>,
    ) -> WaitOutcome {
        match self {
            Self::Futex(s) => s.wait(key, validate, deadline),
            Self::SpinWait(s) => s.wait(key, validate, deadline),
        }
    }

    #[inline(always)]
    fn wake_one(&self, key: K) -> WakeResult {
        match self {
            Self::Futex(s) => s.wake_one(key),
            Self::SpinWait(s) => s.wake_one(key),
        }
    }

    #[inline(always)]
    fn wake_all(&self, key: K) -> WakeResult {
        match self {
            Self::Futex(s) => s.wake_all(key),
            Self::SpinWait(s) => s.wake_all(key),
        }
    }

    #[inline(always)]
    fn waiter_count(&self, key: K) -> usize {
        match self {
            Self::Futex(s) => s.waiter_count(key),
            Self::SpinWait(s) => s.waiter_count(key),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Futex(s) => s.name(),
            Self::SpinWait(s) => s.name(),
        }
    }
}

/// Generic wait queue for any key type
///
/// # Examples
///
/// ```
/// use concurrency_toolkit::core::sync::{WaitQueue, SyncConfig};
/// use std::time::Duration;
///
/// let queue = WaitQueue::<u64>::new(SyncConfig::default());
///
/// // Nobody wakes us, so this times out
/// assert!(queue.wait(42, Some(Duration::from_millis(1))).is_err());
/// ```
pub struct WaitQueue<K>
where
    K: Eq + std::hash::Hash + Copy + Send + Sync + 'static,
{
    strategy: WaitStrategyImpl<K>,
}

impl<K> WaitQueue<K>
where
    K: Eq + std::hash::Hash + Copy + Send + Sync + 'static,
{
    pub fn new(config: SyncConfig) -> Self {
        Self::with_slots(config, DEFAULT_PARKING_SLOTS)
    }

    /// Queue with a parking table of `slots` entries
    ///
    /// Distinct keys may share a slot without interfering; fewer slots only
    /// trade memory for bucket contention.
    pub fn with_slots(config: SyncConfig, slots: usize) -> Self {
        let table = FutexWait::with_slots(slots);
        let strategy = match config.select_strategy() {
            StrategyType::Spin => WaitStrategyImpl::SpinWait(SpinWait::with_fallback(
                table,
                config.spin_duration,
                config.max_spins,
            )),
            StrategyType::Park | StrategyType::Auto => WaitStrategyImpl::Futex(table),
        };

        Self { strategy }
    }

    /// Create with default configuration (auto-selects strategy)
    pub fn with_defaults() -> Self {
        Self::new(SyncConfig::default())
    }

    pub fn low_latency() -> Self {
        Self::new(SyncConfig::low_latency())
    }

    pub fn long_wait() -> Self {
        Self::new(SyncConfig::long_wait())
    }

    /// Wait for a wake on `key` with optional timeout
    #[inline]
    pub fn wait(&self, key: K, timeout: Option<Duration>) -> WaitResult<()> {
        let deadline = timeout.map(|t| Instant::now() + t);
        match self.strategy.wait(key, &mut || true, deadline) {
            WaitOutcome::Woken | WaitOutcome::Invalid => Ok(()),
            WaitOutcome::TimedOut => Err(WaitError::Timeout),
        }
    }

    /// Wait until `predicate` returns false
    ///
    /// The predicate is checked before waiting, re-validated by the strategy
    /// immediately before sleeping, and again after each wake. Wakers that
    /// update the condition before calling `wake_*` can never be missed.
    ///
    /// The predicate must be fast and must not touch any wait queue.
    pub fn wait_while<F>(&self, key: K, timeout: Option<Duration>, mut predicate: F) -> WaitResult<()>
    where
        F: FnMut() -> bool,
    {
        let deadline = timeout.map(|t| Instant::now() + t);

        loop {
            if !predicate() {
                return Ok(());
            }

            match self.strategy.wait(key, &mut predicate, deadline) {
                WaitOutcome::Woken | WaitOutcome::Invalid => continue,
                WaitOutcome::TimedOut => {
                    return if predicate() {
                        Err(WaitError::Timeout)
                    } else {
                        Ok(())
                    };
                }
            }
        }
    }

    #[inline]
    pub fn wake_one(&self, key: K) -> WakeResult {
        self.strategy.wake_one(key)
    }

    #[inline]
    pub fn wake_all(&self, key: K) -> WakeResult {
        self.strategy.wake_all(key)
    }

    /// Get approximate count of waiters for a key (for diagnostics)
    #[inline]
    pub fn waiter_count(&self, key: K) -> usize {
        self.strategy.waiter_count(key)
    }

    #[inline]
    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }
}

impl<K> Default for WaitQueue<K>
where
    K: Eq + std::hash::Hash + Copy + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::with_defaults()
    }
}

// WaitQueue is not Clone due to owned strategy
// If sharing is needed, wrap in Arc<WaitQueue<K>>
