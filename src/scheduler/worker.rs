/*!
 * Worker Loop
 *
 * State shared by all workers of one scheduler, and the loop each worker
 * thread runs:
 *
 * ```text
 * own deque tail (LIFO) -> injector head (FIFO) -> steal peer head (FIFO) -> park
 * ```
 *
 * # Queued Counter
 *
 * `queued` counts tasks sitting in any queue. Submitters bump it before the
 * push; workers drop it on every successful pop. Idle workers park while it
 * is zero, and exit once it is zero after shutdown was requested. Both sides
 * use `SeqCst` on `queued`, `stop` and `sleepers` so that a submission racing
 * with shutdown or with a worker going to sleep is always seen by one side.
 */

use super::config::SchedulerConfig;
use super::queue::{Injector, LocalQueue};
use super::rng::XorShift64Star;
use super::task::{self, Task};
use super::types::{SchedulerStats, VictimPolicy, WorkerState};
use crate::core::atomic::AtomicCell;
use crate::core::atomic::OrderingToken::{Relaxed, SeqCst};
use crate::core::errors::TaskError;
use crate::core::limits::WORKER_PARK_TIMEOUT;
use crate::core::sync::{SyncConfig, WaitQueue};
use std::cell::Cell;
use std::sync::Arc;
use tracing::{debug, error, trace};

/// Wait-queue key for idle workers
const IDLE_KEY: u8 = 0;

thread_local! {
    /// (scheduler id, worker index) of the worker running on this thread
    static CURRENT: Cell<Option<(usize, usize)>> = const { Cell::new(None) };
}

/// Index of the calling worker thread, if the caller runs on one
pub fn current_worker_index() -> Option<usize> {
    CURRENT.with(|current| current.get().map(|(_, index)| index))
}

/// Why a submission was not queued; the task is handed back
pub(super) enum Rejected {
    ShutDown(Task),
    Full(Task),
}

pub(super) struct Shared {
    locals: Vec<LocalQueue>,
    injector: Injector,
    states: Vec<AtomicCell<u8>>,
    policy: VictimPolicy,
    queued: AtomicCell<usize>,
    stop: AtomicCell<bool>,
    sleepers: AtomicCell<usize>,
    idle: WaitQueue<u8>,
    submitted: AtomicCell<u64>,
    completed: AtomicCell<u64>,
    failed: AtomicCell<u64>,
    stolen: AtomicCell<u64>,
}

impl Shared {
    pub(super) fn new(config: &SchedulerConfig) -> Self {
        let idle_config = SyncConfig {
            strategy: config.idle_strategy,
            ..SyncConfig::default()
        };

        Self {
            locals: (0..config.workers)
                .map(|_| LocalQueue::new(config.local_capacity))
                .collect(),
            injector: Injector::new(config.injector_capacity),
            states: (0..config.workers)
                .map(|_| AtomicCell::new(WorkerState::Idle as u8))
                .collect(),
            policy: config.victim_policy,
            queued: AtomicCell::new(0),
            stop: AtomicCell::new(false),
            sleepers: AtomicCell::new(0),
            idle: WaitQueue::with_slots(idle_config, 1),
            submitted: AtomicCell::new(0),
            completed: AtomicCell::new(0),
            failed: AtomicCell::new(0),
            stolen: AtomicCell::new(0),
        }
    }

    /// Identity of this scheduler for the thread-local worker context
    #[inline]
    pub(super) fn id(self: &Arc<Self>) -> usize {
        Arc::as_ptr(self) as usize
    }

    /// Worker index if the caller runs on one of this scheduler's workers
    pub(super) fn local_worker(self: &Arc<Self>) -> Option<usize> {
        let id = self.id();
        CURRENT.with(|current| match current.get() {
            Some((owner, index)) if owner == id => Some(index),
            _ => None,
        })
    }

    // =========================================================================
    // Submission
    // =========================================================================

    /// Queue `task`; `local` routes it to that worker's deque first
    ///
    /// External submissions (`local == None`) are refused once shutdown was
    /// requested. Submissions from running tasks are always accepted so the
    /// drain reaches every task.
    pub(super) fn push(&self, task: Task, local: Option<usize>) -> Result<(), Rejected> {
        self.queued.fetch_add(1, SeqCst);

        if local.is_none() && self.stop.load(SeqCst) {
            self.queued.fetch_sub(1, SeqCst);
            return Err(Rejected::ShutDown(task));
        }

        let overflow = match local {
            Some(index) => self.locals[index].push(task).err(),
            None => Some(task),
        };
        if let Some(task) = overflow {
            if let Err(task) = self.injector.push(task) {
                self.queued.fetch_sub(1, SeqCst);
                return Err(Rejected::Full(task));
            }
        }

        self.submitted.fetch_add(1, Relaxed);
        if self.sleepers.load(SeqCst) > 0 {
            self.idle.wake_one(IDLE_KEY);
        }
        Ok(())
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Returns true if this call requested the stop
    pub(super) fn request_stop(&self) -> bool {
        let first = !self.stop.swap(true, SeqCst);
        self.idle.wake_all(IDLE_KEY);
        first
    }

    pub(super) fn is_stopping(&self) -> bool {
        self.stop.load(SeqCst)
    }

    // =========================================================================
    // Diagnostics
    // =========================================================================

    pub(super) fn worker_states(&self) -> Vec<WorkerState> {
        self.states
            .iter()
            .map(|state| WorkerState::from_u8(state.load(Relaxed)))
            .collect()
    }

    pub(super) fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            submitted: self.submitted.load(Relaxed),
            completed: self.completed.load(Relaxed),
            failed: self.failed.load(Relaxed),
            stolen: self.stolen.load(Relaxed),
        }
    }

    pub(super) fn queued(&self) -> usize {
        self.queued.load(Relaxed)
    }

    pub(super) fn injector_capacity(&self) -> Option<usize> {
        self.injector.capacity()
    }

    #[inline]
    fn set_state(&self, index: usize, state: WorkerState) {
        self.states[index].store(state as u8, Relaxed);
    }

    // =========================================================================
    // Worker side
    // =========================================================================

    fn find_task(&self, index: usize, rng: &mut XorShift64Star, cursor: &mut usize) -> Option<Task> {
        if let Some(task) = self.locals[index].pop() {
            self.queued.fetch_sub(1, SeqCst);
            return Some(task);
        }

        if let Some(task) = self.injector.pop() {
            self.queued.fetch_sub(1, SeqCst);
            return Some(task);
        }

        let peers = self.locals.len();
        if peers < 2 {
            return None;
        }

        self.set_state(index, WorkerState::Stealing);
        let start = match self.policy {
            VictimPolicy::Random => rng.next_usize(peers),
            VictimPolicy::RoundRobin => {
                let start = *cursor % peers;
                *cursor = start + 1;
                start
            }
        };

        for offset in 0..peers {
            let victim = (start + offset) % peers;
            if victim == index {
                continue;
            }
            if let Some(task) = self.locals[victim].steal() {
                self.queued.fetch_sub(1, SeqCst);
                self.stolen.fetch_add(1, Relaxed);
                trace!(worker = index, victim, "stole task");
                return Some(task);
            }
        }

        None
    }

    fn execute(&self, index: usize, task: Task) {
        self.set_state(index, WorkerState::Running);
        match task::run_isolated(task) {
            Ok(()) => {
                self.completed.fetch_add(1, Relaxed);
            }
            Err(payload) => {
                self.failed.fetch_add(1, Relaxed);
                let failure = TaskError::from_panic(payload.as_ref());
                error!(worker = index, error = %failure, "task failed; failure isolated");
            }
        }
    }

    fn park_idle(&self, index: usize) {
        self.set_state(index, WorkerState::Idle);
        self.sleepers.fetch_add(1, SeqCst);
        // A timeout only re-runs the search loop
        let _ = self.idle.wait_while(IDLE_KEY, Some(WORKER_PARK_TIMEOUT), || {
            self.queued.load(SeqCst) == 0 && !self.stop.load(SeqCst)
        });
        self.sleepers.fetch_sub(1, SeqCst);
    }
}

/// Body of worker thread `index`
pub(super) fn run(shared: Arc<Shared>, index: usize) {
    CURRENT.with(|current| current.set(Some((shared.id(), index))));
    debug!(worker = index, "worker started");

    let mut rng = XorShift64Star::for_worker(index);
    let mut cursor = index + 1;

    loop {
        if let Some(task) = shared.find_task(index, &mut rng, &mut cursor) {
            shared.execute(index, task);
            continue;
        }

        // `stop` must be read before `queued`: a submitter that saw no stop
        // has already counted its task
        let stopping = shared.stop.load(SeqCst);
        if shared.queued.load(SeqCst) > 0 {
            // A submitter counted its task but has not pushed it yet
            std::thread::yield_now();
            continue;
        }
        if stopping {
            break;
        }

        shared.park_idle(index);
    }

    shared.set_state(index, WorkerState::Idle);
    CURRENT.with(|current| current.set(None));
    debug!(worker = index, "worker stopped");
}
