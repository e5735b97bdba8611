/*!
 * Limits and Constants
 *
 * Centralized location for tunables and defaults, grouped by primitive.
 * Performance-sensitive constants are marked with [PERF].
 */

use std::time::Duration;

// =============================================================================
// WAIT QUEUE
// =============================================================================

/// Spin phase length before a spin-wait strategy parks
pub const DEFAULT_SPIN_DURATION: Duration = Duration::from_micros(10);

/// Maximum spin iterations before a spin-wait strategy parks
pub const DEFAULT_MAX_SPINS: u32 = 100;

/// Spin iterations using only the CPU hint before yielding
/// [PERF] Best for waits under ~100ns
pub const TIGHT_SPIN_ITERATIONS: u32 = 10;

/// Spin iterations that yield to the OS scheduler before sleeping
pub const YIELD_SPIN_ITERATIONS: u32 = 50;

/// Upper bound for one exponential-backoff sleep
pub const MAX_BACKOFF_SLEEP: Duration = Duration::from_millis(1);

// =============================================================================
// LOCKS
// =============================================================================

/// Spin attempts on a contended lock word before parking
/// [PERF] Short critical sections usually finish within this window
pub const LOCK_SPIN_LIMIT: u32 = 40;

// =============================================================================
// SCHEDULER
// =============================================================================

/// Default per-worker deque length before tasks overflow to the injector
pub const DEFAULT_LOCAL_QUEUE_CAPACITY: usize = 256;

/// Hard ceiling on worker threads
pub const MAX_WORKERS: usize = 1024;

/// Default worker thread name prefix
pub const DEFAULT_WORKER_NAME: &str = "toolkit-worker";

/// Idle worker park timeout, a backstop against missed wakeups
pub const WORKER_PARK_TIMEOUT: Duration = Duration::from_millis(100);

// =============================================================================
// RCU
// =============================================================================

/// Retired snapshots tolerated before an update logs a reclamation warning
pub const RCU_RETIRED_WARN_THRESHOLD: usize = 1024;
