/*!
 * Scheduler Traits
 * Seams for thread creation
 */

use std::io;
use std::thread::{self, JoinHandle};

/// Body run by a worker thread
pub type WorkerBody = Box<dyn FnOnce() + Send + 'static>;

/// Creates the OS threads that host scheduler workers
///
/// Swap in a custom spawner to control stack sizes, pin threads, or inject
/// spawn failures in tests.
pub trait ThreadSpawner: Send + Sync {
    /// Start `body` on a new thread called `name`
    ///
    /// An `Err` means the host could not provide a thread; the scheduler
    /// reports it as `SchedulerError::Spawn`.
    fn spawn(&self, name: String, body: WorkerBody) -> io::Result<JoinHandle<()>>;
}

/// Default spawner backed by `std::thread::Builder`
#[derive(Debug, Clone, Copy, Default)]
pub struct StdThreadSpawner {
    stack_size: Option<usize>,
}

impl StdThreadSpawner {
    pub const fn new() -> Self {
        Self { stack_size: None }
    }

    pub const fn with_stack_size(stack_size: usize) -> Self {
        Self {
            stack_size: Some(stack_size),
        }
    }
}

impl ThreadSpawner for StdThreadSpawner {
    fn spawn(&self, name: String, body: WorkerBody) -> io::Result<JoinHandle<()>> {
        let mut builder = thread::Builder::new().name(name);
        if let Some(size) = self.stack_size {
            builder = builder.stack_size(size);
        }
        builder.spawn(body)
    }
}
