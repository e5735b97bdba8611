/*!
 * Work-Stealing Scheduler
 *
 * Fixed pool of worker threads fed by per-worker deques and a global
 * injector. Shutdown drains every reachable task, including tasks that
 * running tasks submit while the pool is stopping, before joining the
 * threads.
 */

use super::config::SchedulerConfig;
use super::task::{self, Task, TaskHandle};
use super::traits::{StdThreadSpawner, ThreadSpawner};
use super::types::{SchedulerStats, VictimPolicy, WorkerState};
use super::worker::{self, Rejected, Shared};
use crate::core::errors::{SchedulerError, SchedulerResult};
use crate::core::sync::StrategyType;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{error, info, warn};

/// Thread pool executing closures with work stealing
///
/// # Example
///
/// ```
/// use concurrency_toolkit::{SchedulerConfig, WorkStealingScheduler};
///
/// let scheduler = WorkStealingScheduler::new(SchedulerConfig::with_workers(2)).unwrap();
/// let handle = scheduler.submit_with_result(|| 6 * 7).unwrap();
/// assert_eq!(handle.join(), Ok(42));
/// scheduler.shutdown();
/// ```
pub struct WorkStealingScheduler {
    shared: Arc<Shared>,
    threads: Mutex<Vec<JoinHandle<()>>>,
    config: SchedulerConfig,
}

impl WorkStealingScheduler {
    /// Start `config.workers` threads with the default spawner
    pub fn new(config: SchedulerConfig) -> SchedulerResult<Self> {
        Self::with_spawner(config, Arc::new(StdThreadSpawner::new()))
    }

    pub fn builder() -> SchedulerBuilder {
        SchedulerBuilder::new()
    }

    /// Start the pool, creating threads through `spawner`
    pub fn with_spawner(
        config: SchedulerConfig,
        spawner: Arc<dyn ThreadSpawner>,
    ) -> SchedulerResult<Self> {
        config.validate()?;

        let shared = Arc::new(Shared::new(&config));
        let mut threads = Vec::with_capacity(config.workers);

        for index in 0..config.workers {
            let worker_shared = Arc::clone(&shared);
            let name = format!("{}-{}", config.thread_name, index);
            match spawner.spawn(name, Box::new(move || worker::run(worker_shared, index))) {
                Ok(handle) => threads.push(handle),
                Err(err) => {
                    error!(worker = index, error = %err, "failed to spawn worker thread");
                    shared.request_stop();
                    for handle in threads {
                        let _ = handle.join();
                    }
                    return Err(SchedulerError::Spawn(err.to_string()));
                }
            }
        }

        info!(
            workers = config.workers,
            victim_policy = %config.victim_policy,
            "work-stealing scheduler started"
        );

        Ok(Self {
            shared,
            threads: Mutex::new(threads),
            config,
        })
    }

    // =========================================================================
    // Submission
    // =========================================================================

    /// Queue a fire-and-forget task
    ///
    /// From inside a running task the child goes to the current worker's
    /// deque (overflowing to the injector); from anywhere else it goes to the
    /// injector.
    pub fn submit<F>(&self, f: F) -> SchedulerResult<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.submit_task(Box::new(f))
    }

    /// Queue a task whose value or isolated failure arrives on the handle
    pub fn submit_with_result<F, R>(&self, f: F) -> SchedulerResult<TaskHandle<R>>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let (task, handle) = task::with_result(f);
        self.submit_task(task)?;
        Ok(handle)
    }

    fn submit_task(&self, task: Task) -> SchedulerResult<()> {
        let local = self.shared.local_worker();
        self.shared.push(task, local).map_err(|rejected| match rejected {
            Rejected::ShutDown(_) => SchedulerError::ShutDown,
            Rejected::Full(_) => {
                SchedulerError::QueueFull(self.shared.injector_capacity().unwrap_or_default())
            }
        })
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Stop accepting external work, drain every queued task, join workers
    ///
    /// Idempotent. Called from inside a task it only requests the stop; the
    /// owner's later `shutdown` (or drop) joins the threads.
    pub fn shutdown(&self) {
        if self.shared.request_stop() {
            info!(queued = self.shared.queued(), "scheduler shutting down; draining queued tasks");
        }

        if self.shared.local_worker().is_some() {
            warn!("shutdown requested from a worker task; threads are joined by the owner");
            return;
        }

        let threads = std::mem::take(&mut *self.threads.lock());
        if threads.is_empty() {
            return;
        }
        for handle in threads {
            if handle.join().is_err() {
                error!("worker thread terminated outside task isolation");
            }
        }

        let stats = self.shared.stats();
        info!(
            completed = stats.completed,
            failed = stats.failed,
            stolen = stats.stolen,
            "scheduler stopped"
        );
    }

    pub fn is_shutdown(&self) -> bool {
        self.shared.is_stopping()
    }

    // =========================================================================
    // Diagnostics
    // =========================================================================

    pub fn stats(&self) -> SchedulerStats {
        self.shared.stats()
    }

    pub fn worker_states(&self) -> Vec<WorkerState> {
        self.shared.worker_states()
    }

    pub fn workers(&self) -> usize {
        self.config.workers
    }

    /// Tasks waiting in any queue
    pub fn queued(&self) -> usize {
        self.shared.queued()
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }
}

impl Drop for WorkStealingScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for WorkStealingScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkStealingScheduler")
            .field("workers", &self.config.workers)
            .field("victim_policy", &self.config.victim_policy)
            .field("stats", &self.stats())
            .field("shutdown", &self.is_shutdown())
            .finish()
    }
}

/// Fluent construction of a `WorkStealingScheduler`
pub struct SchedulerBuilder {
    config: SchedulerConfig,
    spawner: Arc<dyn ThreadSpawner>,
}

impl SchedulerBuilder {
    pub fn new() -> Self {
        Self {
            config: SchedulerConfig::default(),
            spawner: Arc::new(StdThreadSpawner::new()),
        }
    }

    /// Start from an existing configuration
    pub fn config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    pub fn victim_policy(mut self, policy: VictimPolicy) -> Self {
        self.config.victim_policy = policy;
        self
    }

    pub fn local_capacity(mut self, capacity: usize) -> Self {
        self.config.local_capacity = capacity;
        self
    }

    /// `None` for an unbounded injector
    pub fn injector_capacity(mut self, capacity: Option<usize>) -> Self {
        self.config.injector_capacity = capacity;
        self
    }

    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.config.thread_name = name.into();
        self
    }

    pub fn idle_strategy(mut self, strategy: StrategyType) -> Self {
        self.config.idle_strategy = strategy;
        self
    }

    pub fn spawner(mut self, spawner: impl ThreadSpawner + 'static) -> Self {
        self.spawner = Arc::new(spawner);
        self
    }

    pub fn build(self) -> SchedulerResult<WorkStealingScheduler> {
        WorkStealingScheduler::with_spawner(self.config, self.spawner)
    }
}

impl Default for SchedulerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
