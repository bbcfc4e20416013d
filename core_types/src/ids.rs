//! Unique identifiers for schedulable tasks

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for a task
///
/// Assigned once when a task control block is created and never reused
/// for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaskId(u64);

impl TaskId {
    /// Allocates the next identifier from the process-wide generator
    pub fn new() -> Self {
        TaskIdGenerator::next()
    }

    /// Wraps a raw identifier value
    ///
    /// Intended for deserialisation and tests; identifiers built this way
    /// are not checked against the generator.
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw identifier value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Task({})", self.0)
    }
}

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

/// Process-wide source of task identifiers
///
/// Identifiers increase monotonically. There is no teardown: the counter
/// lives as long as the process.
pub struct TaskIdGenerator;

impl TaskIdGenerator {
    /// Issues the next identifier
    pub fn next() -> TaskId {
        TaskId(NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the identifier the next call to `next()` would issue
    pub fn peek() -> TaskId {
        TaskId(NEXT_TASK_ID.load(Ordering::Relaxed))
    }
}
