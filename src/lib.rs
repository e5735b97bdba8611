/*!
 * Concurrency Toolkit Library
 * Composable primitives for shared state, message passing and parallel
 * task execution on OS threads
 *
 * # Layers
 *
 * - `core::atomic`: `AtomicCell` with ordering tokens
 * - `core::sync`: locks, borrow cell, RCU cell, keyed wait queue
 * - `channel`: bounded / unbounded / rendezvous MPMC channels
 * - `scheduler`: work-stealing thread pool
 * - `monitoring`: tracing subscriber setup
 *
 * # Example
 *
 * ```
 * use concurrency_toolkit::{channel, SchedulerConfig, SharedExclusiveLock, WorkStealingScheduler};
 * use std::sync::Arc;
 *
 * let totals = Arc::new(SharedExclusiveLock::new(0u64));
 * let (tx, rx) = channel::unbounded();
 * let scheduler = WorkStealingScheduler::new(SchedulerConfig::with_workers(2)).unwrap();
 *
 * for i in 1..=10u64 {
 *     let totals = totals.clone();
 *     let tx = tx.clone();
 *     scheduler
 *         .submit(move || {
 *             *totals.acquire() += i;
 *             tx.send(i).unwrap();
 *         })
 *         .unwrap();
 * }
 * drop(tx);
 * scheduler.shutdown();
 *
 * assert_eq!(rx.iter().count(), 10);
 * assert_eq!(*totals.acquire_shared(), 55);
 * ```
 */

pub mod channel;
pub mod core;
pub mod monitoring;
pub mod scheduler;

// Re-exports
pub use crate::core::atomic::{AtomicCell, OrderingToken};
pub use crate::core::errors::{
    AccessKind, BorrowConflict, ConfigError, SchedulerError, SchedulerResult, TaskError,
};
pub use crate::core::sync::{
    BorrowState, DynamicBorrowCell, ExclusiveGuard, ExclusiveLock, LockGuard, RcuCell, ReadGuard,
    SharedExclusiveLock, SharedGuard, Snapshot, SyncConfig, WaitQueue, WriteGuard,
};
pub use channel::{Receiver, Sender};
pub use monitoring::init_tracing;
pub use scheduler::{
    current_worker_index, SchedulerBuilder, SchedulerConfig, SchedulerStats, TaskHandle,
    VictimPolicy, WorkStealingScheduler,
};
