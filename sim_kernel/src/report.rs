//! Scheduler reports
//!
//! Renders scheduler snapshots to a [`Logger`] as human-readable blocks.
//! Every function works on an already-taken snapshot, so rendering never
//! holds the scheduler lock.

use crate::scheduler::{RegistrationStats, SchedulerStats, TimerStatus};
use crate::tcb::TaskSummary;
use core_types::TaskPriority;
use services_logger::{LogCategory, Logger};

/// One line per registered task with id, priority and state
pub fn registered_tasks(tasks: &[TaskSummary], logger: &Logger) {
    if tasks.is_empty() {
        logger.info(LogCategory::Registry, "No tasks registered");
        return;
    }

    logger.header("Registered Tasks");
    for task in tasks {
        logger.info(
            LogCategory::Registry,
            format!(
                "Task: {} (ID: {}, Priority: {}, State: {})",
                task.name,
                task.id.as_u64(),
                task.priority,
                task.state
            ),
        );
    }
}

/// Totals by state and by priority
pub fn registration_stats(stats: &RegistrationStats, logger: &Logger) {
    logger.header("Task Registration Statistics");
    logger.status(format!("Total Tasks: {}", stats.total));
    logger.status("State Distribution:");
    logger.status(format!("  - READY: {}", stats.ready));
    logger.status(format!("  - RUNNING: {}", stats.running));
    logger.status(format!("  - WAITING: {}", stats.waiting));
    logger.status("Priority Distribution:");
    logger.status(format!("  - LOW: {}", stats.low));
    logger.status(format!("  - MEDIUM: {}", stats.medium));
    logger.status(format!("  - HIGH: {}", stats.high));
}

/// Tasks grouped HIGH, MEDIUM, LOW with their current state
pub fn task_summary(tasks: &[TaskSummary], logger: &Logger) {
    if tasks.is_empty() {
        logger.info(LogCategory::Registry, "No tasks to summarize");
        return;
    }

    logger.header("Task Summary");
    for priority in TaskPriority::DESCENDING {
        logger.info(
            LogCategory::Registry,
            format!("{} Priority Tasks:", priority.label()),
        );

        let mut found = false;
        for task in tasks.iter().filter(|task| task.priority == priority) {
            logger.info(
                LogCategory::Registry,
                format!("  - {} ({})", task.name, task.state),
            );
            found = true;
        }
        if !found {
            logger.info(LogCategory::Registry, "  (none)");
        }
    }
}

/// Per-task activation counts and wait times
pub fn timer_statistics(stats: &SchedulerStats, logger: &Logger) {
    logger.header("Timer Statistics");
    for task in &stats.tasks {
        logger.status(format!(
            "{}: {} activations, total wait {} ms, average wait {} ms",
            task.name, task.timer_activations, task.total_wait_ms, task.average_wait_ms
        ));
    }
    logger.status(format!(
        "Total Timer Activations: {}",
        stats.total_timer_activations
    ));
}

/// Current progress of every wait timer
pub fn detailed_timer_status(status: &[TimerStatus], logger: &Logger) {
    logger.header("Detailed Timer Status");
    if status.is_empty() {
        logger.info(LogCategory::Timer, "No timers active");
        return;
    }

    for timer in status {
        let paused = if timer.paused { " [PAUSED]" } else { "" };
        logger.info(
            LogCategory::Timer,
            format!(
                "{}: {}/{} ticks{}",
                timer.name, timer.current_wait_ticks, timer.wait_period, paused
            ),
        );
    }
}

/// Aggregate figures: most active task, mean wait, READY share
pub fn timer_efficiency(stats: &SchedulerStats, logger: &Logger) {
    logger.header("Timer Efficiency");
    logger.status(format!(
        "Total Activations: {}",
        stats.total_timer_activations
    ));
    match &stats.most_active_task {
        Some((name, activations)) => {
            logger.status(format!("Most Active Task: {name} ({activations} activations)"))
        }
        None => logger.status("Most Active Task: (none)"),
    }
    logger.status(format!("Average Wait Time: {} ms", stats.average_wait_ms));
    logger.status(format!(
        "Utilization: {:.1}% of tasks READY",
        stats.utilization_percent
    ));
}
