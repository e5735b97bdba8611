/*!
 * Scheduler Module
 * Work-stealing thread pool: per-worker deques, a global injector and
 * draining shutdown
 */

pub mod config;
mod pool;
mod queue;
mod rng;
mod task;
pub mod traits;
pub mod types;
mod worker;

// Re-export public API
pub use config::{SchedulerConfig, ENV_VICTIM_POLICY, ENV_WORKERS};
pub use pool::{SchedulerBuilder, WorkStealingScheduler};
pub use task::TaskHandle;
pub use traits::{StdThreadSpawner, ThreadSpawner, WorkerBody};
pub use types::{SchedulerStats, VictimPolicy, WorkerState};
pub use worker::current_worker_index;
