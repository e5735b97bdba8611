/*!
 * Wait/Notify Primitives
 *
 * Keyed wait/notify with multiple strategies:
 * - Futex-based (parking_lot_core, FIFO per key)
 * - Spinwait-based (low-latency, high-CPU, parks when the budget runs out)
 *
 * Used for parking idle scheduler workers and anywhere a thread needs to
 * sleep until a condition on shared atomics changes.
 */

mod config;
mod futex;
mod spinwait;
mod traits;
mod wait;

// Re-export public API
pub use config::{StrategyType, SyncConfig, ENV_MAX_SPINS, ENV_WAIT_STRATEGY};
pub use traits::{WaitOutcome, WaitStrategy, WakeResult};
pub use wait::{WaitError, WaitQueue, WaitResult};

// Re-export specific strategies for advanced users
pub use futex::FutexWait;
pub use spinwait::SpinWait;
