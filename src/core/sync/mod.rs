/*!
 * Synchronization Primitives
 *
 * Blocking and non-blocking coordination built on `AtomicCell` and the
 * process-wide parking table:
 * - `locks`: exclusive and shared-exclusive locks with poisoning
 * - `borrow_cell`: single-threaded runtime borrow checking
 * - `lockfree`: RCU cell with reference-counted snapshots
 * - `wait`: keyed wait/notify queue (futex-style or spin-then-park)
 *
 * # Architecture
 *
 * Every blocking path parks on an address-derived key with a validation
 * callback that runs under the parking bucket lock, so a waker that flips
 * the state word before notifying can never be missed.
 */

pub mod borrow_cell;
pub mod lockfree;
pub mod locks;
pub mod wait;

pub use borrow_cell::{BorrowState, DynamicBorrowCell, ExclusiveGuard, SharedGuard};
pub use lockfree::{RcuCell, Snapshot};
pub use locks::{ExclusiveLock, LockGuard, ReadGuard, SharedExclusiveLock, WriteGuard};
pub use wait::{
    FutexWait, SpinWait, StrategyType, SyncConfig, WaitError, WaitOutcome, WaitQueue, WaitResult,
    WaitStrategy, WakeResult,
};
