//! Stock demo workload
//!
//! Three periodic tasks at different priorities and periods:
//!
//! | Task | Priority | Period |
//! |---|---|---|
//! | `SystemMonitor` | HIGH | 3 ticks |
//! | `DataProcessor` | MEDIUM | 4 ticks |
//! | `BackgroundLogger` | LOW | 5 ticks |

use core_types::{TaskPriority, TaskState};
use services_logger::{LogCategory, LogEntry, LogLevel, Logger};
use sim_kernel::{Kernel, Scheduler, SchedulerError, TaskControlBlock, TaskFailure};
use std::sync::{Arc, Weak};

pub const BACKGROUND_LOGGER: &str = "BackgroundLogger";
pub const SYSTEM_MONITOR: &str = "SystemMonitor";
pub const DATA_PROCESSOR: &str = "DataProcessor";

/// Items a single DataProcessor run accounts for
const ITEMS_PER_RUN: u64 = 10;

/// Registers the three stock tasks with the kernel's scheduler
pub fn register(kernel: &Kernel) -> Result<(), SchedulerError> {
    let scheduler = kernel.scheduler();

    for task in [
        background_logger(kernel),
        system_monitor(kernel.logger().clone()),
        data_processor(kernel.logger().clone()),
    ] {
        let name = task.name().to_string();
        scheduler.register_task(task)?;
        kernel
            .logger()
            .info(LogCategory::Registry, format!("{name} registration: SUCCESS"));
    }
    Ok(())
}

/// Reports the scheduler's view of the system every 5 ticks
///
/// Holds the scheduler weakly: the scheduler owns this callback.
fn background_logger(kernel: &Kernel) -> TaskControlBlock {
    let logger = kernel.logger().clone();
    let ticks = kernel.tick_counter();
    let scheduler: Weak<Scheduler> = Arc::downgrade(kernel.scheduler());

    TaskControlBlock::new(BACKGROUND_LOGGER, TaskPriority::Low)
        .with_wait_period(5)
        .with_callback(move || {
            let scheduler = scheduler
                .upgrade()
                .ok_or_else(|| TaskFailure::new("scheduler is gone"))?;

            logger.info(LogCategory::Task, "[Logger] System running smoothly");
            logger.log(
                LogEntry::new(LogLevel::Info, "[Logger] Scheduler operational")
                    .with_category(LogCategory::Task)
                    .with_field("tick", ticks.current_ticks()),
            );
            logger.info(
                LogCategory::Task,
                format!(
                    "[Logger] Tasks: {} ready, {} waiting",
                    scheduler.task_count_by_state(TaskState::Ready),
                    scheduler.task_count_by_state(TaskState::Waiting)
                ),
            );
            Ok(())
        })
}

fn system_monitor(logger: Logger) -> TaskControlBlock {
    TaskControlBlock::new(SYSTEM_MONITOR, TaskPriority::High)
        .with_wait_period(3)
        .with_callback(move || {
            logger.info(LogCategory::Task, "System monitoring task executed");
            logger.info(
                LogCategory::Task,
                "System health: All subsystems operational",
            );
            Ok(())
        })
}

fn data_processor(logger: Logger) -> TaskControlBlock {
    let mut processed: u64 = 0;

    TaskControlBlock::new(DATA_PROCESSOR, TaskPriority::Medium)
        .with_wait_period(4)
        .with_callback(move || {
            processed += ITEMS_PER_RUN;
            logger.info(LogCategory::Task, "Data processing task executed");
            logger.info(
                LogCategory::Task,
                format!("Processed {processed} data items"),
            );
            Ok(())
        })
}

/// Walks a standalone TCB through one READY→RUNNING→WAITING cycle
pub fn demonstrate_tcb(logger: &Logger) -> Result<(), SchedulerError> {
    logger.header("Task Control Block");

    let hello = logger.clone();
    let task = TaskControlBlock::new("TestLogger", TaskPriority::Medium)
        .with_wait_period(50)
        .with_callback(move || {
            hello.info(LogCategory::Task, "Hello from test task!");
            Ok(())
        });

    logger.info(
        LogCategory::Task,
        format!("TCB Created: {} (ID: {})", task.name(), task.id().as_u64()),
    );
    logger.info(LogCategory::Task, format!("Priority: {}", task.priority()));
    logger.info(LogCategory::Task, format!("Initial State: {}", task.state()));

    task.set_state(TaskState::Running)?;
    logger.info(
        LogCategory::Task,
        format!("State transition to RUNNING: {}", task.state()),
    );
    task.execute_task()?;
    task.set_state(TaskState::Waiting)?;
    logger.info(
        LogCategory::Task,
        format!("State transition to WAITING: {}", task.state()),
    );
    Ok(())
}

/// Tries to register a second `BackgroundLogger` and reports the outcome
pub fn demonstrate_duplicate_rejection(scheduler: &Scheduler, logger: &Logger) {
    let duplicate =
        TaskControlBlock::new(BACKGROUND_LOGGER, TaskPriority::Medium).with_callback(|| Ok(()));

    match scheduler.register_task(duplicate) {
        Err(SchedulerError::DuplicateName(_)) => {
            logger.info(LogCategory::Registry, "Duplicate prevention working correctly")
        }
        Err(err) => logger.warn(
            LogCategory::Registry,
            format!("Duplicate registration failed unexpectedly: {err}"),
        ),
        Ok(_) => logger.warn(LogCategory::Registry, "Duplicate task name was accepted"),
    }
}
