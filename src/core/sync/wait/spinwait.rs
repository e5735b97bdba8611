/*!
 * Adaptive Spin-Wait Strategy with Exponential Backoff
 *
 * Optimized for low-latency scenarios where waits are typically very short.
 *
 * # Design: Exponential Backoff Over Linear Spinning
 *
 * 1. **Tight spin phase**: just `spin_loop()` hint
 * 2. **Yield phase**: `yield_now()` every iteration
 * 3. **Sleep phase**: exponentially increasing sleep, capped
 *
 * The condition is re-checked between every step. Once the spin budget is
 * spent the waiter parks on the futex fallback, which keeps wakes lossless.
 */

use super::futex::FutexWait;
use super::traits::{WaitOutcome, WaitStrategy, WakeResult};
use crate::core::limits::{MAX_BACKOFF_SLEEP, TIGHT_SPIN_ITERATIONS, YIELD_SPIN_ITERATIONS};
use std::thread;
use std::time::{Duration, Instant};

/// Adaptive spin-wait strategy with exponential backoff
pub struct SpinWait<K>
where
    K: Eq + std::hash::Hash + Copy + Send + Sync + 'static,
{
    /// Fallback for long waits
    fallback: FutexWait<K>,
    /// Spin duration before falling back
    spin_duration: Duration,
    /// Maximum spin iterations
    max_spins: u32,
}

impl<K> SpinWait<K>
where
    K: Eq + std::hash::Hash + Copy + Send + Sync + 'static,
{
    pub fn new(spin_duration: Duration, max_spins: u32) -> Self {
        Self::with_fallback(FutexWait::new(), spin_duration, max_spins)
    }

    /// Spin, then park on `fallback`
    pub fn with_fallback(fallback: FutexWait<K>, spin_duration: Duration, max_spins: u32) -> Self {
        Self {
            fallback,
            spin_duration,
            max_spins,
        }
    }

    /// Create with default parameters (optimized for <100µs waits)
    pub fn with_defaults() -> Self {
        Self::new(Duration::from_micros(50), 500)
    }

    /// Spin while `validate` holds
    ///
    /// Returns `Some(outcome)` if the wait finished during the spin phase,
    /// `None` if the budget ran out and the caller should park.
    fn spin(
        &self,
        validate: &mut dyn FnMut() -> bool,
        deadline: Option<Instant>,
    ) -> Option<WaitOutcome> {
        let start = Instant::now();
        let mut spin_count = 0u32;
        let mut backoff = Duration::from_nanos(1);

        loop {
            if !validate() {
                return Some(WaitOutcome::Invalid);
            }

            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    return Some(WaitOutcome::TimedOut);
                }
            }

            if start.elapsed() >= self.spin_duration || spin_count >= self.max_spins {
                return None;
            }

            if spin_count < TIGHT_SPIN_ITERATIONS {
                std::hint::spin_loop();
            } else if spin_count < YIELD_SPIN_ITERATIONS {
                thread::yield_now();
            } else {
                thread::sleep(backoff);
                backoff = (backoff * 2).min(MAX_BACKOFF_SLEEP);
            }

            spin_count += 1;
        }
    }
}

impl<K> Default for SpinWait<K>
where
    K: Eq + std::hash::Hash + Copy + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl<K> WaitStrategy<K> for SpinWait<K>
where
    K: Eq + std::hash::Hash + Copy + Send + Sync + 'static,
{
    fn wait(
        &self,
        key: K,
        validate: &mut dyn FnMut() -> bool,
        deadline: Option<Instant>,
    ) -> WaitOutcome {
        if let Some(outcome) = self.spin(validate, deadline) {
            return outcome;
        }
        self.fallback.wait(key, validate, deadline)
    }

    fn wake_one(&self, key: K) -> WakeResult {
        self.fallback.wake_one(key)
    }

    fn wake_all(&self, key: K) -> WakeResult {
        self.fallback.wake_all(key)
    }

    fn waiter_count(&self, key: K) -> usize {
        self.fallback.waiter_count(key)
    }

    fn name(&self) -> &'static str {
        "spinwait"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_spinwait_timeout() {
        let sw = SpinWait::<u64>::with_defaults();
        let start = Instant::now();
        let result = sw.wait(99, &mut || true, Some(start + Duration::from_millis(50)));

        assert_eq!(result, WaitOutcome::TimedOut);
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn test_spinwait_sees_condition_during_spin() {
        let sw = Arc::new(SpinWait::<u64>::new(Duration::from_secs(1), u32::MAX));
        let ready = Arc::new(AtomicBool::new(false));

        let ready_clone = ready.clone();
        let sw_clone = sw.clone();
        let handle = thread::spawn(move || {
            sw_clone.wait(
                1,
                &mut || !ready_clone.load(Ordering::Acquire),
                Some(Instant::now() + Duration::from_secs(5)),
            )
        });

        thread::sleep(Duration::from_millis(10));
        ready.store(true, Ordering::Release);
        sw.wake_one(1);

        let outcome = handle.join().unwrap();
        assert!(matches!(outcome, WaitOutcome::Invalid | WaitOutcome::Woken));
    }
}
