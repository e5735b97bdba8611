/*!
 * Tasks
 *
 * A task is a boxed closure. Tasks submitted with a result get a
 * rendezvous-free bounded(1) channel: the worker sends exactly one outcome,
 * and the `TaskHandle` receives it.
 */

use crate::channel::{self, Receiver, RecvTimeoutError, TryRecvError};
use crate::core::errors::TaskError;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

/// Unit of work executed by a scheduler worker
pub(crate) type Task = Box<dyn FnOnce() + Send + 'static>;

/// Wrap `f` so its outcome (value or isolated failure) reaches a handle
///
/// A failure is reported through the handle first, then re-raised so the
/// worker's own isolation records and logs it.
pub(crate) fn with_result<F, R>(f: F) -> (Task, TaskHandle<R>)
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    let (tx, rx) = channel::bounded(1);
    let task: Task = Box::new(move || {
        match panic::catch_unwind(AssertUnwindSafe(f)) {
            Ok(value) => {
                // The handle may already be gone; nobody wants the value then
                let _ = tx.send(Ok(value));
            }
            Err(payload) => {
                let _ = tx.send(Err(TaskError::from_panic(payload.as_ref())));
                panic::resume_unwind(payload);
            }
        }
    });
    (task, TaskHandle { rx })
}

/// Run `task`, containing any panic
///
/// Returns the failure payload so the caller can record it.
pub(crate) fn run_isolated(task: Task) -> Result<(), Box<dyn Any + Send>> {
    panic::catch_unwind(AssertUnwindSafe(task))
}

/// Receives the outcome of a task submitted with `submit_with_result`
pub struct TaskHandle<R> {
    rx: Receiver<Result<R, TaskError>>,
}

impl<R> TaskHandle<R> {
    /// Block until the task finished
    pub fn join(self) -> Result<R, TaskError> {
        self.rx.recv().map_err(|_| TaskError::Lost)?
    }

    /// Block for at most `timeout`; the handle stays usable after a timeout
    pub fn join_timeout(&self, timeout: Duration) -> Result<R, TaskError> {
        match self.rx.recv_timeout(timeout) {
            Ok(outcome) => outcome,
            Err(RecvTimeoutError::Timeout) => Err(TaskError::Timeout),
            Err(RecvTimeoutError::Closed) => Err(TaskError::Lost),
        }
    }

    /// Outcome if the task already finished
    pub fn try_join(&self) -> Option<Result<R, TaskError>> {
        match self.rx.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Closed) => Some(Err(TaskError::Lost)),
        }
    }

    /// True once an outcome is waiting
    pub fn is_finished(&self) -> bool {
        !self.rx.is_empty()
    }
}

impl<R> fmt::Debug for TaskHandle<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("finished", &self.is_finished())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_reaches_handle() {
        let (task, handle) = with_result(|| 21 * 2);
        assert!(handle.try_join().is_none());
        assert!(run_isolated(task).is_ok());
        assert!(handle.is_finished());
        assert_eq!(handle.join(), Ok(42));
    }

    #[test]
    fn test_failure_reaches_handle_and_worker() {
        let (task, handle) = with_result(|| -> u8 { panic!("bad input") });
        assert!(run_isolated(task).is_err());
        assert_eq!(handle.join(), Err(TaskError::Panicked("bad input".into())));
    }

    #[test]
    fn test_dropped_task_is_lost() {
        let (task, handle) = with_result(|| 1);
        drop(task);
        assert_eq!(handle.try_join(), Some(Err(TaskError::Lost)));
    }

    #[test]
    fn test_join_timeout() {
        let (_task, handle) = with_result(|| 1);
        assert_eq!(
            handle.join_timeout(Duration::from_millis(10)),
            Err(TaskError::Timeout)
        );
    }
}
