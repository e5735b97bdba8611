/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 *
 * Contention outcomes (lock held, channel full/empty, would-block) are NOT
 * errors: they come back as `Option`/`Result` values from the primitives.
 * This module holds the conditions that indicate misuse or failure:
 * borrow conflicts, scheduler failures, isolated task failures and
 * configuration errors. Channel errors live next to the channel because they
 * hand the unsent value back to the caller.
 */

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Kind of access requested from or held on a borrow cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessKind {
    Shared,
    Exclusive,
}

impl fmt::Display for AccessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shared => f.write_str("shared"),
            Self::Exclusive => f.write_str("exclusive"),
        }
    }
}

/// Dynamic borrow violated the shared-or-exclusive rule
///
/// Signals a logic error in single-threaded code, never a race.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Diagnostic)]
#[error("cannot take {requested} borrow: {held} borrow held by {holders} guard(s)")]
#[diagnostic(
    code(borrow::conflict),
    help("Drop the outstanding guard before requesting a conflicting borrow.")
)]
pub struct BorrowConflict {
    pub requested: AccessKind,
    pub held: AccessKind,
    pub holders: usize,
}

/// Configuration validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value}")]
    #[diagnostic(code(config::invalid_value))]
    InvalidValue { field: &'static str, value: String },

    #[error("{field} must be at least {min}, got {value}")]
    #[diagnostic(
        code(config::out_of_range),
        help("Worker counts and capacities must be non-zero.")
    )]
    OutOfRange {
        field: &'static str,
        value: usize,
        min: usize,
    },
}

/// Scheduler-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum SchedulerError {
    #[error("Scheduler is shut down")]
    #[diagnostic(
        code(scheduler::shut_down),
        help("Submit work before calling shutdown(); running tasks may still spawn children.")
    )]
    ShutDown,

    #[error("Injector queue full (capacity {0})")]
    #[diagnostic(
        code(scheduler::queue_full),
        help("Increase injector_capacity or wait for workers to drain the queue.")
    )]
    QueueFull(usize),

    #[error("Failed to spawn worker thread: {0}")]
    #[diagnostic(
        code(scheduler::spawn_failed),
        help("The host could not provide an OS thread. Lower the worker count.")
    )]
    Spawn(String),

    #[error("Invalid scheduler configuration: {0}")]
    #[diagnostic(code(scheduler::invalid_config))]
    InvalidConfig(String),
}

impl From<ConfigError> for SchedulerError {
    fn from(err: ConfigError) -> Self {
        SchedulerError::InvalidConfig(err.to_string())
    }
}

/// Outcome of a task that did not produce a value
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum TaskError {
    #[error("Task panicked: {0}")]
    #[diagnostic(
        code(task::panicked),
        help("The failure was isolated; the worker and sibling tasks kept running.")
    )]
    Panicked(String),

    #[error("Task was dropped before producing a result")]
    #[diagnostic(code(task::lost))]
    Lost,

    #[error("Timed out waiting for task result")]
    #[diagnostic(code(task::timeout))]
    Timeout,
}

impl TaskError {
    /// Build a `Panicked` error from a caught unwind payload
    pub fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        TaskError::Panicked(message)
    }
}

/// Result alias for scheduler operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;
