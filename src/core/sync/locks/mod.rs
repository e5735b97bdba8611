/*!
 * Blocking Locks
 *
 * Mutual exclusion and shared/exclusive access built directly on the
 * process-wide parking table:
 * - `ExclusiveLock`: one holder at a time, FIFO handoff to parked waiters
 * - `SharedExclusiveLock`: many readers or one writer, writer preference
 *
 * Guards release on drop and carry the poison flag observed at acquisition.
 */

mod exclusive;
mod poison;
mod shared;

// Re-export public API
pub use exclusive::{ExclusiveLock, LockGuard};
pub use shared::{ReadGuard, SharedExclusiveLock, WriteGuard};
