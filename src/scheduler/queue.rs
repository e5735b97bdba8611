/*!
 * Task Queues
 *
 * - `LocalQueue`: per-worker deque. The owner pushes and pops at the tail
 *   (LIFO, cache-warm); thieves take from the head (FIFO, oldest first, away
 *   from the owner's end).
 * - `Injector`: global FIFO for work submitted from outside the pool, and
 *   for local overflow.
 */

use super::task::Task;
use crossbeam_queue::{ArrayQueue, SegQueue};
use parking_lot::Mutex;
use std::collections::VecDeque;

/// Per-worker deque with a soft length bound
pub(super) struct LocalQueue {
    tasks: Mutex<VecDeque<Task>>,
    capacity: usize,
}

impl LocalQueue {
    pub(super) fn new(capacity: usize) -> Self {
        Self {
            tasks: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Push at the tail; hands the task back when the deque is full
    pub(super) fn push(&self, task: Task) -> Result<(), Task> {
        let mut tasks = self.tasks.lock();
        if tasks.len() >= self.capacity {
            return Err(task);
        }
        tasks.push_back(task);
        Ok(())
    }

    /// Owner side: newest first
    pub(super) fn pop(&self) -> Option<Task> {
        self.tasks.lock().pop_back()
    }

    /// Thief side: oldest first
    pub(super) fn steal(&self) -> Option<Task> {
        self.tasks.lock().pop_front()
    }

    #[cfg(test)]
    pub(super) fn len(&self) -> usize {
        self.tasks.lock().len()
    }
}

/// Global submission queue
pub(super) enum Injector {
    Bounded(ArrayQueue<Task>),
    Unbounded(SegQueue<Task>),
}

impl Injector {
    pub(super) fn new(capacity: Option<usize>) -> Self {
        match capacity {
            Some(n) => Self::Bounded(ArrayQueue::new(n)),
            None => Self::Unbounded(SegQueue::new()),
        }
    }

    /// Hands the task back when a bounded injector is full
    pub(super) fn push(&self, task: Task) -> Result<(), Task> {
        match self {
            Self::Bounded(queue) => queue.push(task),
            Self::Unbounded(queue) => {
                queue.push(task);
                Ok(())
            }
        }
    }

    pub(super) fn pop(&self) -> Option<Task> {
        match self {
            Self::Bounded(queue) => queue.pop(),
            Self::Unbounded(queue) => queue.pop(),
        }
    }

    #[cfg(test)]
    pub(super) fn len(&self) -> usize {
        match self {
            Self::Bounded(queue) => queue.len(),
            Self::Unbounded(queue) => queue.len(),
        }
    }

    pub(super) fn capacity(&self) -> Option<usize> {
        match self {
            Self::Bounded(queue) => Some(queue.capacity()),
            Self::Unbounded(_) => None,
        }
    }
}
