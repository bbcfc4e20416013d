//! Task priority and lifecycle state

use serde::{Deserialize, Serialize};
use std::fmt;

/// Scheduling priority
///
/// Ordered so that `High > Medium > Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

impl TaskPriority {
    /// All priorities, highest first
    pub const DESCENDING: [TaskPriority; 3] =
        [TaskPriority::High, TaskPriority::Medium, TaskPriority::Low];

    /// Upper-case label used in reports
    pub fn label(&self) -> &'static str {
        match self {
            TaskPriority::Low => "LOW",
            TaskPriority::Medium => "MEDIUM",
            TaskPriority::High => "HIGH",
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Task lifecycle state
///
/// There is no terminal state: a task cycles between these three until it
/// is unregistered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskState {
    /// Eligible for selection
    Ready,
    /// Callback is executing
    Running,
    /// Accumulating ticks until the wait period expires
    Waiting,
}

impl TaskState {
    /// All states, in lifecycle order
    pub const ALL: [TaskState; 3] = [TaskState::Ready, TaskState::Running, TaskState::Waiting];

    /// Returns true if moving from `self` to `to` is a legal edge
    ///
    /// Legal edges: READY→RUNNING, RUNNING→WAITING, RUNNING→READY,
    /// WAITING→READY.
    pub fn can_transition_to(&self, to: TaskState) -> bool {
        matches!(
            (self, to),
            (TaskState::Ready, TaskState::Running)
                | (TaskState::Running, TaskState::Waiting)
                | (TaskState::Running, TaskState::Ready)
                | (TaskState::Waiting, TaskState::Ready)
        )
    }

    /// Upper-case label used in reports
    pub fn label(&self) -> &'static str {
        match self {
            TaskState::Ready => "READY",
            TaskState::Running => "RUNNING",
            TaskState::Waiting => "WAITING",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
