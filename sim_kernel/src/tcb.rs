//! Task Control Block
//!
//! One TCB per task: identity, priority, the READY/RUNNING/WAITING state
//! machine, the task callback and wait-timer bookkeeping.
//!
//! ## Locking
//!
//! A TCB carries two locks of its own, independent of the scheduler's
//! registry lock:
//! - the state lock guards priority, state and every timer field, and is
//!   only held for the duration of one method call;
//! - the callback lock is held while the callback runs, so state queries
//!   never wait on a slow callback.
//!
//! ## Wait timer
//!
//! A WAITING task accumulates one tick per `advance_wait_timer()` call.
//! When the accumulated ticks reach the wait period the task becomes READY
//! again and its activation statistics are updated. A wait period of zero
//! means "no periodic wait": the first advance after entering WAITING
//! releases the task.

use crate::error::{SchedulerError, TaskFailure};
use core_types::{TaskId, TaskPriority, TaskState};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Zero-argument task action
///
/// Returning `Err` (or panicking) marks the execution as failed; the task
/// still cycles back to WAITING.
pub type TaskCallback = Box<dyn FnMut() -> Result<(), TaskFailure> + Send>;

/// Mutable per-task fields guarded by the state lock
#[derive(Debug)]
struct TcbState {
    priority: TaskPriority,
    state: TaskState,
    wait_period: u32,
    wait_elapsed: u32,
    timer_paused: bool,
    countdown_logging: bool,
    activation_count: u64,
    cumulative_wait_time: Duration,
    last_activation_time: Instant,
}

/// Task Control Block
pub struct TaskControlBlock {
    id: TaskId,
    name: String,
    has_callback: bool,
    callback: Mutex<Option<TaskCallback>>,
    inner: Mutex<TcbState>,
}

impl TaskControlBlock {
    /// Creates a READY task with no callback and no periodic wait
    ///
    /// Inputs are not validated here; the scheduler rejects empty names and
    /// missing callbacks at registration.
    pub fn new(name: impl Into<String>, priority: TaskPriority) -> Self {
        Self {
            id: TaskId::new(),
            name: name.into(),
            has_callback: false,
            callback: Mutex::new(None),
            inner: Mutex::new(TcbState {
                priority,
                state: TaskState::Ready,
                wait_period: 0,
                wait_elapsed: 0,
                timer_paused: false,
                countdown_logging: false,
                activation_count: 0,
                cumulative_wait_time: Duration::ZERO,
                last_activation_time: Instant::now(),
            }),
        }
    }

    /// Attaches the callback run on each execution
    pub fn with_callback<F>(mut self, callback: F) -> Self
    where
        F: FnMut() -> Result<(), TaskFailure> + Send + 'static,
    {
        self.callback = Mutex::new(Some(Box::new(callback)));
        self.has_callback = true;
        self
    }

    /// Sets the wait period used at construction (zero allowed)
    pub fn with_wait_period(self, ticks: u32) -> Self {
        self.lock().wait_period = ticks;
        self
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn priority(&self) -> TaskPriority {
        self.lock().priority
    }

    pub fn set_priority(&self, priority: TaskPriority) {
        self.lock().priority = priority;
    }

    pub fn state(&self) -> TaskState {
        self.lock().state
    }

    pub fn has_callback(&self) -> bool {
        self.has_callback
    }

    /// Moves the task to `to` if the edge is legal
    ///
    /// Entering WAITING restarts the wait timer. A rejected transition
    /// leaves every field untouched.
    pub fn set_state(&self, to: TaskState) -> Result<(), SchedulerError> {
        let mut inner = self.lock();
        let from = inner.state;
        if !from.can_transition_to(to) {
            return Err(SchedulerError::InvalidTransition {
                task: self.name.clone(),
                from,
                to,
            });
        }
        inner.state = to;
        if to == TaskState::Waiting {
            inner.wait_elapsed = 0;
        }
        Ok(())
    }

    /// Runs the callback once
    ///
    /// Only valid while RUNNING. Errors and panics raised by the callback
    /// are contained here and reported as `CallbackFailed`.
    pub fn execute_task(&self) -> Result<(), SchedulerError> {
        let state = self.state();
        if state != TaskState::Running {
            return Err(SchedulerError::NotRunning {
                task: self.name.clone(),
                state,
            });
        }

        let mut slot = self
            .callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let callback = slot
            .as_mut()
            .ok_or_else(|| SchedulerError::MissingCallback(self.name.clone()))?;

        match panic::catch_unwind(AssertUnwindSafe(|| callback())) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(failure)) => Err(SchedulerError::CallbackFailed {
                task: self.name.clone(),
                reason: failure.0,
            }),
            Err(payload) => Err(SchedulerError::CallbackFailed {
                task: self.name.clone(),
                reason: format!("panicked: {}", panic_message(payload.as_ref())),
            }),
        }
    }

    /// Advances the wait timer by one tick
    ///
    /// No-op unless WAITING and not paused. Returns true if the timer
    /// expired on this call, in which case the task is now READY.
    pub fn advance_wait_timer(&self) -> bool {
        let mut inner = self.lock();
        if inner.state != TaskState::Waiting || inner.timer_paused {
            return false;
        }

        inner.wait_elapsed = inner.wait_elapsed.saturating_add(1);
        if inner.wait_elapsed < inner.wait_period {
            return false;
        }

        inner.state = TaskState::Ready;
        inner.wait_elapsed = 0;
        inner.activation_count += 1;
        let now = Instant::now();
        let waited = now.saturating_duration_since(inner.last_activation_time);
        inner.cumulative_wait_time += waited;
        inner.last_activation_time = now;
        true
    }

    /// Replaces the wait period; zero is rejected
    pub fn set_wait_period(&self, ticks: u32) -> Result<(), SchedulerError> {
        if ticks == 0 {
            return Err(SchedulerError::InvalidTimerValue {
                task: self.name.clone(),
                ticks,
            });
        }
        self.lock().wait_period = ticks;
        Ok(())
    }

    pub fn wait_period(&self) -> u32 {
        self.lock().wait_period
    }

    /// Ticks accumulated since the task last entered WAITING
    pub fn current_wait_ticks(&self) -> u32 {
        self.lock().wait_elapsed
    }

    /// Ticks still needed before the timer expires
    pub fn remaining_wait_ticks(&self) -> u32 {
        let inner = self.lock();
        inner.wait_period.saturating_sub(inner.wait_elapsed)
    }

    pub fn reset_wait_timer(&self) {
        self.lock().wait_elapsed = 0;
    }

    pub fn pause_timer(&self) {
        self.lock().timer_paused = true;
    }

    pub fn resume_timer(&self) {
        self.lock().timer_paused = false;
    }

    pub fn is_timer_paused(&self) -> bool {
        self.lock().timer_paused
    }

    pub fn countdown_logging(&self) -> bool {
        self.lock().countdown_logging
    }

    pub fn set_countdown_logging(&self, enabled: bool) {
        self.lock().countdown_logging = enabled;
    }

    /// Number of times the wait timer has expired
    pub fn timer_activations(&self) -> u64 {
        self.lock().activation_count
    }

    /// Wall-clock time accumulated between activations
    pub fn total_wait_time(&self) -> Duration {
        self.lock().cumulative_wait_time
    }

    /// Mean wall-clock time between activations, zero before the first
    pub fn average_wait_time(&self) -> Duration {
        let inner = self.lock();
        average(inner.cumulative_wait_time, inner.activation_count)
    }

    pub fn last_activation_time(&self) -> Instant {
        self.lock().last_activation_time
    }

    /// Captures a consistent copy of the task's observable fields
    pub fn snapshot(&self) -> TaskSummary {
        let inner = self.lock();
        TaskSummary {
            id: self.id,
            name: self.name.clone(),
            priority: inner.priority,
            state: inner.state,
            wait_period: inner.wait_period,
            current_wait_ticks: inner.wait_elapsed,
            timer_paused: inner.timer_paused,
            countdown_logging: inner.countdown_logging,
            timer_activations: inner.activation_count,
            total_wait_ms: duration_millis(inner.cumulative_wait_time),
            average_wait_ms: duration_millis(average(
                inner.cumulative_wait_time,
                inner.activation_count,
            )),
        }
    }

    fn lock(&self) -> MutexGuard<'_, TcbState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for TaskControlBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        f.debug_struct("TaskControlBlock")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("priority", &inner.priority)
            .field("state", &inner.state)
            .field("wait_period", &inner.wait_period)
            .field("wait_elapsed", &inner.wait_elapsed)
            .field("has_callback", &self.has_callback)
            .finish()
    }
}

/// Point-in-time view of one task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSummary {
    pub id: TaskId,
    pub name: String,
    pub priority: TaskPriority,
    pub state: TaskState,
    pub wait_period: u32,
    pub current_wait_ticks: u32,
    pub timer_paused: bool,
    pub countdown_logging: bool,
    pub timer_activations: u64,
    pub total_wait_ms: u64,
    pub average_wait_ms: u64,
}

fn average(total: Duration, count: u64) -> Duration {
    if count == 0 {
        return Duration::ZERO;
    }
    let nanos = total.as_nanos() / u128::from(count);
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}

pub(crate) fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
