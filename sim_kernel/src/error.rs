//! Kernel error types

use core_types::TaskState;
use thiserror::Error;

/// Errors reported by task control blocks and the scheduler
///
/// All of these are recovered locally: they are returned as values and
/// logged, never raised across the clock thread.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchedulerError {
    /// Malformed task at registration (empty name, missing callback)
    #[error("Task validation failed: {0}")]
    Validation(String),

    /// A task with this name is already registered
    #[error("Task name is duplicate: {0}")]
    DuplicateName(String),

    /// No task with this name is registered
    #[error("Task not found: {0}")]
    NotFound(String),

    /// State change rejected by the task state machine
    #[error("Invalid transition for {task}: {from} -> {to}")]
    InvalidTransition {
        task: String,
        from: TaskState,
        to: TaskState,
    },

    /// Execution requested for a task that is not RUNNING
    #[error("Task {task} is not running (state: {state})")]
    NotRunning { task: String, state: TaskState },

    /// Execution requested for a task without a callback
    #[error("Task {0} has no callback")]
    MissingCallback(String),

    /// The task's own callback failed or panicked
    #[error("Task {task} execution failed: {reason}")]
    CallbackFailed { task: String, reason: String },

    /// Non-positive (or over-limit) wait period
    #[error("Invalid timer value for {task}: {ticks}")]
    InvalidTimerValue { task: String, ticks: u32 },
}

/// Failure reported by a task callback
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct TaskFailure(pub String);

impl TaskFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

impl From<&str> for TaskFailure {
    fn from(reason: &str) -> Self {
        Self(reason.to_string())
    }
}

impl From<String> for TaskFailure {
    fn from(reason: String) -> Self {
        Self(reason)
    }
}

/// Errors from the clock lifecycle
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClockError {
    /// The tick thread could not be spawned
    #[error("Failed to spawn clock thread: {0}")]
    SpawnFailed(String),
}

/// Errors from the kernel context lifecycle
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KernelError {
    #[error("Clock error: {0}")]
    Clock(#[from] ClockError),
}
