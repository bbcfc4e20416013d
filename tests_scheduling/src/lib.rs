//! Scheduling Test Utilities
//!
//! Shared helpers for the cross-crate scheduling tests.
//!
//! ## Test Philosophy
//!
//! - **Deterministic first**: most tests drive ticks by hand with [`drive_ticks`]
//! - **Real clock where it matters**: end-to-end tests boot a kernel and poll
//!   with generous deadlines instead of asserting exact wall-clock timings
//! - **Observable through the log**: every test kernel records into a `MemorySink`

use core_types::{TaskPriority, TaskState};
use services_logger::MemorySink;
use sim_kernel::test_utils::{memory_logger, CallCounter};
use sim_kernel::{Kernel, KernelConfig, Scheduler, SchedulerError, TaskControlBlock};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Bootstrap helper for tests
///
/// Creates an un-booted kernel without heartbeat logging, recording into
/// the returned sink.
pub fn test_kernel() -> (Kernel, Arc<MemorySink>) {
    let (logger, sink) = memory_logger();
    let config = KernelConfig {
        heartbeat_logging: false,
        ..KernelConfig::default()
    };
    (Kernel::new(config, logger), sink)
}

/// Registers a task whose callback bumps the returned counter
pub fn register_counting(
    scheduler: &Scheduler,
    name: &str,
    priority: TaskPriority,
    wait_period: u32,
) -> Result<CallCounter, SchedulerError> {
    let counter = CallCounter::new();
    scheduler.register_task(
        TaskControlBlock::new(name, priority)
            .with_wait_period(wait_period)
            .with_callback(counter.callback()),
    )?;
    Ok(counter)
}

/// Runs `ticks` clock ticks by hand, in the clock's order
///
/// Returns the name executed on each tick (None when idle).
pub fn drive_ticks(scheduler: &Scheduler, ticks: usize) -> Vec<Option<String>> {
    (0..ticks)
        .map(|_| {
            scheduler.update_task_timers();
            scheduler
                .execute_next_ready_task()
                .task()
                .map(str::to_string)
        })
        .collect()
}

/// Moves a task from READY into WAITING through RUNNING
pub fn park(scheduler: &Scheduler, name: &str) -> Result<(), SchedulerError> {
    let task = scheduler
        .find_task_by_name(name)
        .ok_or_else(|| SchedulerError::NotFound(name.to_string()))?;
    task.set_state(TaskState::Running)?;
    task.set_state(TaskState::Waiting)
}

/// Polls `condition` until it holds or `timeout` passes
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    condition()
}
