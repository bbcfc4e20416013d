//! Cooperative Priority Round-Robin Scheduler
//!
//! The scheduler owns the registry of task control blocks and decides which
//! READY task runs next.
//!
//! ## Policy
//!
//! - **One task per call**: `execute_next_ready_task()` runs at most one
//!   task. The clock calls it once per tick, so N equal-priority READY tasks
//!   need at least N ticks to each run once.
//! - **Priority first**: the candidate pool is ordered HIGH, MEDIUM, LOW and
//!   by name inside a band.
//! - **Round robin inside a band**: selection continues after the last
//!   executed task when it is still READY, and restarts at the top of the
//!   pool when it is not.
//! - **Failures cycle**: a task whose callback fails still moves
//!   RUNNING→WAITING.
//!
//! ## Locking
//!
//! All registry state lives in one [`TaskRegistry`] behind one mutex. Public
//! methods lock it exactly once and call non-locking helpers on the guard;
//! they never call another public method while holding it. The lock is
//! released while a callback runs, so callbacks may use read-only queries.

use crate::error::SchedulerError;
use crate::tcb::{duration_millis, TaskControlBlock, TaskSummary};
use core_types::{TaskId, TaskPriority, TaskState};
use serde::{Deserialize, Serialize};
use services_logger::{LogCategory, LogEntry, LogLevel, Logger};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Wait-period ceiling applied by [`SchedulerConfig::bounded`]
pub const MAX_TIMER_VALUE: u32 = 1000;

/// Scheduler configuration
#[derive(Debug, Clone, Default)]
pub struct SchedulerConfig {
    /// Largest wait period accepted at registration or adjustment
    pub max_wait_ticks: Option<u32>,
}

impl SchedulerConfig {
    /// Configuration that rejects wait periods above [`MAX_TIMER_VALUE`]
    pub fn bounded() -> Self {
        Self {
            max_wait_ticks: Some(MAX_TIMER_VALUE),
        }
    }
}

/// Result of one `execute_next_ready_task()` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// No task was READY
    Idle,
    /// The selected task's callback completed
    Completed { task: String },
    /// The selected task's callback failed; the task is back in WAITING
    Failed { task: String, error: SchedulerError },
    /// The selected task could not be moved to RUNNING
    Aborted { task: String, error: SchedulerError },
}

impl ExecutionOutcome {
    /// True only when a callback ran and completed
    pub fn succeeded(&self) -> bool {
        matches!(self, ExecutionOutcome::Completed { .. })
    }

    /// Name of the task that was selected, if any
    pub fn task(&self) -> Option<&str> {
        match self {
            ExecutionOutcome::Idle => None,
            ExecutionOutcome::Completed { task }
            | ExecutionOutcome::Failed { task, .. }
            | ExecutionOutcome::Aborted { task, .. } => Some(task),
        }
    }
}

/// Task counts by state and priority
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationStats {
    pub total: usize,
    pub ready: usize,
    pub running: usize,
    pub waiting: usize,
    pub low: usize,
    pub medium: usize,
    pub high: usize,
}

/// Wait-timer progress of one task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerStatus {
    pub name: String,
    pub current_wait_ticks: u32,
    pub wait_period: u32,
    pub paused: bool,
}

/// Serialisable snapshot of everything the reports render
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerStats {
    pub registration: RegistrationStats,
    pub tasks: Vec<TaskSummary>,
    pub last_executed_task: Option<String>,
    pub most_active_task: Option<(String, u64)>,
    pub total_timer_activations: u64,
    pub average_wait_ms: u64,
    pub utilization_percent: f64,
}

/// Registry contents guarded by the scheduler lock
#[derive(Debug, Default)]
struct TaskRegistry {
    tasks: HashMap<String, Arc<TaskControlBlock>>,
    last_executed_task: Option<String>,
}

impl TaskRegistry {
    fn ready_in_order(&self) -> Vec<ReadyEntry> {
        let mut ready: Vec<ReadyEntry> = self
            .tasks
            .values()
            .filter(|task| task.state() == TaskState::Ready)
            .map(|task| (task.priority(), task.name().to_string()))
            .collect();
        ready.sort_by(|(pa, na), (pb, nb)| pb.cmp(pa).then_with(|| na.cmp(nb)));
        ready
    }

    fn count_by_state(&self, state: TaskState) -> usize {
        self.tasks.values().filter(|t| t.state() == state).count()
    }

    fn count_by_priority(&self, priority: TaskPriority) -> usize {
        self.tasks.values().filter(|t| t.priority() == priority).count()
    }

    fn names_by_state(&self, state: TaskState) -> Vec<String> {
        let mut names: Vec<String> = self
            .tasks
            .values()
            .filter(|t| t.state() == state)
            .map(|t| t.name().to_string())
            .collect();
        names.sort();
        names
    }

    fn registration_stats(&self) -> RegistrationStats {
        RegistrationStats {
            total: self.tasks.len(),
            ready: self.count_by_state(TaskState::Ready),
            running: self.count_by_state(TaskState::Running),
            waiting: self.count_by_state(TaskState::Waiting),
            low: self.count_by_priority(TaskPriority::Low),
            medium: self.count_by_priority(TaskPriority::Medium),
            high: self.count_by_priority(TaskPriority::High),
        }
    }

    fn summaries(&self) -> Vec<TaskSummary> {
        let mut summaries: Vec<TaskSummary> =
            self.tasks.values().map(|task| task.snapshot()).collect();
        summaries.sort_by(|a, b| b.priority.cmp(&a.priority).then_with(|| a.name.cmp(&b.name)));
        summaries
    }

    fn most_active(&self) -> Option<(String, u64)> {
        let mut best: Option<(String, u64)> = None;
        for task in self.tasks.values() {
            let activations = task.timer_activations();
            let better = match &best {
                None => true,
                Some((name, count)) => {
                    activations > *count || (activations == *count && task.name() < name.as_str())
                }
            };
            if better {
                best = Some((task.name().to_string(), activations));
            }
        }
        best
    }

    fn total_activations(&self) -> u64 {
        self.tasks.values().map(|t| t.timer_activations()).sum()
    }

    fn average_wait(&self) -> Duration {
        let activations = self.total_activations();
        if activations == 0 {
            return Duration::ZERO;
        }
        let total: Duration = self.tasks.values().map(|t| t.total_wait_time()).sum();
        let nanos = total.as_nanos() / u128::from(activations);
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }

    fn utilization(&self) -> f64 {
        if self.tasks.is_empty() {
            return 0.0;
        }
        self.count_by_state(TaskState::Ready) as f64 * 100.0 / self.tasks.len() as f64
    }

    fn get(&self, name: &str) -> Result<&Arc<TaskControlBlock>, SchedulerError> {
        self.tasks
            .get(name)
            .ok_or_else(|| SchedulerError::NotFound(name.to_string()))
    }
}

/// A READY task as seen by the selection policy
type ReadyEntry = (TaskPriority, String);

/// Picks the next task from a priority-ordered READY pool
///
/// Rotation happens inside the leading (highest) priority band only: the
/// task after `last_executed` is chosen when both sit in that band, and the
/// front of the pool otherwise. A READY task of higher priority is never
/// skipped in favour of continuing a lower band.
fn select_next<'a>(pool: &'a [ReadyEntry], last_executed: Option<&str>) -> Option<&'a str> {
    let (top, first) = pool.first()?;
    let band_len = pool.iter().take_while(|(priority, _)| priority == top).count();
    let band = &pool[..band_len];

    let Some(last) = last_executed else {
        return Some(first);
    };
    match band.iter().position(|(_, name)| name == last) {
        Some(index) => band
            .get(index + 1)
            .map(|(_, name)| name.as_str())
            .or(Some(first)),
        None => Some(first),
    }
}

/// Cooperative scheduler
pub struct Scheduler {
    config: SchedulerConfig,
    logger: Logger,
    registry: Mutex<TaskRegistry>,
}

impl Scheduler {
    /// Creates a scheduler with default configuration
    pub fn new(logger: Logger) -> Self {
        Self::with_config(SchedulerConfig::default(), logger)
    }

    /// Creates a scheduler with custom configuration
    pub fn with_config(config: SchedulerConfig, logger: Logger) -> Self {
        Self {
            config,
            logger,
            registry: Mutex::new(TaskRegistry::default()),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Validates and takes ownership of a task
    ///
    /// Rejects empty names, missing callbacks, over-limit wait periods and
    /// duplicate names. Nothing is inserted on rejection.
    pub fn register_task(&self, task: TaskControlBlock) -> Result<TaskId, SchedulerError> {
        let mut registry = self.lock();

        if let Err(err) = self.validate(&task) {
            self.log_registry(LogLevel::Error, "Task validation failed", task.name(), &err);
            return Err(err);
        }
        if registry.tasks.contains_key(task.name()) {
            let err = SchedulerError::DuplicateName(task.name().to_string());
            self.log_registry(LogLevel::Error, "Task name is duplicate", task.name(), &err);
            return Err(err);
        }

        let id = task.id();
        let name = task.name().to_string();
        self.logger.log(
            LogEntry::new(LogLevel::Info, "Task registered successfully")
                .with_category(LogCategory::Registry)
                .with_source(id)
                .with_field("task", &name)
                .with_field("priority", task.priority())
                .with_field("wait_period", task.wait_period()),
        );
        registry.tasks.insert(name, Arc::new(task));
        Ok(id)
    }

    /// Removes and drops a task
    ///
    /// A task that is mid-execution on another thread finishes its current
    /// run before it is dropped.
    pub fn unregister_task(&self, name: &str) -> Result<(), SchedulerError> {
        let mut registry = self.lock();
        match registry.tasks.remove(name) {
            Some(task) => {
                self.logger.log(
                    LogEntry::new(LogLevel::Info, "Task unregistered")
                        .with_category(LogCategory::Registry)
                        .with_source(task.id())
                        .with_field("task", name),
                );
                Ok(())
            }
            None => {
                let err = SchedulerError::NotFound(name.to_string());
                self.log_registry(LogLevel::Error, "Task not found for unregistration", name, &err);
                Err(err)
            }
        }
    }

    pub fn is_task_registered(&self, name: &str) -> bool {
        self.lock().tasks.contains_key(name)
    }

    /// Returns a shared handle to a registered task
    pub fn find_task_by_name(&self, name: &str) -> Option<Arc<TaskControlBlock>> {
        self.lock().tasks.get(name).cloned()
    }

    pub fn task_count(&self) -> usize {
        self.lock().tasks.len()
    }

    /// READY task names, HIGH to LOW, by name inside a priority
    pub fn ready_tasks_in_order(&self) -> Vec<String> {
        self.lock()
            .ready_in_order()
            .into_iter()
            .map(|(_, name)| name)
            .collect()
    }

    /// Applies the selection policy to a caller-supplied pool
    ///
    /// `ordered_ready` is expected to come from `ready_tasks_in_order()`;
    /// names that are no longer registered are skipped.
    pub fn next_task_to_execute(&self, ordered_ready: &[String]) -> Option<String> {
        let registry = self.lock();
        let pool: Vec<ReadyEntry> = ordered_ready
            .iter()
            .filter_map(|name| {
                registry
                    .tasks
                    .get(name)
                    .map(|task| (task.priority(), name.clone()))
            })
            .collect();
        select_next(&pool, registry.last_executed_task.as_deref()).map(str::to_string)
    }

    /// Name of the most recently selected task
    pub fn last_executed_task(&self) -> Option<String> {
        self.lock().last_executed_task.clone()
    }

    /// Selects and runs at most one READY task
    pub fn execute_next_ready_task(&self) -> ExecutionOutcome {
        let (name, task) = {
            let mut registry = self.lock();
            let ordered = registry.ready_in_order();
            let Some(name) = select_next(&ordered, registry.last_executed_task.as_deref())
                .map(str::to_string)
            else {
                self.logger
                    .debug(LogCategory::Scheduler, "No READY tasks available for execution");
                return ExecutionOutcome::Idle;
            };
            let Some(task) = registry.tasks.get(&name).cloned() else {
                let error = SchedulerError::NotFound(name.clone());
                return ExecutionOutcome::Aborted { task: name, error };
            };

            self.log_task(LogCategory::Scheduler, "Executing (READY -> RUNNING)", &task);
            if let Err(error) = task.set_state(TaskState::Running) {
                self.log_failure("Failed to transition to RUNNING", &task, &error);
                return ExecutionOutcome::Aborted { task: name, error };
            }
            registry.last_executed_task = Some(name.clone());
            (name, task)
        };

        let result = task.execute_task();
        match &result {
            Ok(()) => self.log_task(LogCategory::Scheduler, "Completed successfully", &task),
            Err(error) => self.log_failure("Task execution failed", &task, error),
        }

        match task.set_state(TaskState::Waiting) {
            Ok(()) => self.log_task(LogCategory::Scheduler, "Complete (RUNNING -> WAITING)", &task),
            Err(error) => self.log_failure("Failed to transition to WAITING", &task, &error),
        }

        match result {
            Ok(()) => ExecutionOutcome::Completed { task: name },
            Err(error) => ExecutionOutcome::Failed { task: name, error },
        }
    }

    /// Advances the wait timer of every WAITING task by one tick
    ///
    /// Returns the names of tasks whose timer expired on this call.
    pub fn update_task_timers(&self) -> Vec<String> {
        let registry = self.lock();
        let mut expired = Vec::new();

        for (name, task) in registry.tasks.iter() {
            if task.state() != TaskState::Waiting {
                continue;
            }
            if task.countdown_logging() {
                self.logger.log(
                    LogEntry::new(LogLevel::Info, "Countdown")
                        .with_category(LogCategory::Timer)
                        .with_source(task.id())
                        .with_field("task", name)
                        .with_field("remaining", task.remaining_wait_ticks()),
                );
            }
            if task.advance_wait_timer() {
                self.log_task(LogCategory::Timer, "Timer expired (WAITING -> READY)", task);
                expired.push(name.clone());
            }
        }

        expired.sort();
        expired
    }

    /// Changes a task's wait period
    pub fn adjust_task_timer(&self, name: &str, new_period: u32) -> Result<(), SchedulerError> {
        let registry = self.lock();
        let task = match registry.get(name) {
            Ok(task) => task,
            Err(err) => {
                self.log_registry(LogLevel::Error, "Timer adjustment failed", name, &err);
                return Err(err);
            }
        };
        let applied = self
            .check_period(name, new_period)
            .and_then(|_| task.set_wait_period(new_period));
        if let Err(err) = applied {
            self.log_registry(LogLevel::Error, "Timer adjustment rejected", name, &err);
            return Err(err);
        }
        self.logger.log(
            LogEntry::new(LogLevel::Info, "Timer adjusted")
                .with_category(LogCategory::Timer)
                .with_source(task.id())
                .with_field("task", name)
                .with_field("wait_period", new_period),
        );
        Ok(())
    }

    pub fn pause_task_timer(&self, name: &str) -> Result<(), SchedulerError> {
        self.with_task(name, "Timer paused", |task| task.pause_timer())
    }

    pub fn resume_task_timer(&self, name: &str) -> Result<(), SchedulerError> {
        self.with_task(name, "Timer resumed", |task| task.resume_timer())
    }

    /// Toggles per-tick countdown diagnostics for one task
    pub fn set_countdown_logging(&self, name: &str, enabled: bool) -> Result<(), SchedulerError> {
        self.with_task(name, "Countdown logging changed", |task| {
            task.set_countdown_logging(enabled)
        })
    }

    pub fn task_count_by_state(&self, state: TaskState) -> usize {
        self.lock().count_by_state(state)
    }

    pub fn task_count_by_priority(&self, priority: TaskPriority) -> usize {
        self.lock().count_by_priority(priority)
    }

    pub fn task_names_by_state(&self, state: TaskState) -> Vec<String> {
        self.lock().names_by_state(state)
    }

    pub fn has_task_with_priority(&self, priority: TaskPriority) -> bool {
        self.lock().count_by_priority(priority) > 0
    }

    pub fn registration_stats(&self) -> RegistrationStats {
        self.lock().registration_stats()
    }

    /// Snapshots of every task, HIGH to LOW, by name inside a priority
    pub fn task_summaries(&self) -> Vec<TaskSummary> {
        self.lock().summaries()
    }

    /// Wait-timer progress of every task, by name
    pub fn timer_status(&self) -> Vec<TimerStatus> {
        let registry = self.lock();
        let mut status: Vec<TimerStatus> = registry
            .tasks
            .values()
            .map(|task| TimerStatus {
                name: task.name().to_string(),
                current_wait_ticks: task.current_wait_ticks(),
                wait_period: task.wait_period(),
                paused: task.is_timer_paused(),
            })
            .collect();
        status.sort_by(|a, b| a.name.cmp(&b.name));
        status
    }

    /// Task with the most timer activations (ties broken by name)
    pub fn most_active_task(&self) -> Option<(String, u64)> {
        self.lock().most_active()
    }

    pub fn total_timer_activations(&self) -> u64 {
        self.lock().total_activations()
    }

    /// Mean wall-clock time between activations across all tasks
    pub fn average_wait_time(&self) -> Duration {
        self.lock().average_wait()
    }

    /// Share of registered tasks that are READY, in percent
    pub fn utilization_percent(&self) -> f64 {
        self.lock().utilization()
    }

    /// Consistent snapshot of every statistic, taken under one lock
    pub fn stats(&self) -> SchedulerStats {
        let registry = self.lock();
        SchedulerStats {
            registration: registry.registration_stats(),
            tasks: registry.summaries(),
            last_executed_task: registry.last_executed_task.clone(),
            most_active_task: registry.most_active(),
            total_timer_activations: registry.total_activations(),
            average_wait_ms: duration_millis(registry.average_wait()),
            utilization_percent: registry.utilization(),
        }
    }

    fn validate(&self, task: &TaskControlBlock) -> Result<(), SchedulerError> {
        if task.name().is_empty() {
            return Err(SchedulerError::Validation("task name is empty".to_string()));
        }
        if !task.has_callback() {
            return Err(SchedulerError::Validation(format!(
                "task {} has no callback",
                task.name()
            )));
        }
        let period = task.wait_period();
        if period > 0 {
            self.check_period(task.name(), period)?;
        }
        Ok(())
    }

    fn check_period(&self, name: &str, ticks: u32) -> Result<(), SchedulerError> {
        let over_limit = self.config.max_wait_ticks.is_some_and(|max| ticks > max);
        if ticks == 0 || over_limit {
            return Err(SchedulerError::InvalidTimerValue {
                task: name.to_string(),
                ticks,
            });
        }
        Ok(())
    }

    fn with_task<F>(&self, name: &str, message: &str, apply: F) -> Result<(), SchedulerError>
    where
        F: FnOnce(&TaskControlBlock),
    {
        let registry = self.lock();
        match registry.get(name) {
            Ok(task) => {
                apply(task);
                self.logger.log(
                    LogEntry::new(LogLevel::Info, message)
                        .with_category(LogCategory::Timer)
                        .with_source(task.id())
                        .with_field("task", name),
                );
                Ok(())
            }
            Err(err) => {
                self.log_registry(LogLevel::Error, message, name, &err);
                Err(err)
            }
        }
    }

    fn log_registry(&self, level: LogLevel, message: &str, name: &str, err: &SchedulerError) {
        self.logger.log(
            LogEntry::new(level, message)
                .with_category(LogCategory::Registry)
                .with_field("task", name)
                .with_field("reason", err),
        );
    }

    fn log_task(&self, category: LogCategory, message: &str, task: &TaskControlBlock) {
        self.logger.log(
            LogEntry::new(LogLevel::Info, message)
                .with_category(category)
                .with_source(task.id())
                .with_field("task", task.name()),
        );
    }

    fn log_failure(&self, message: &str, task: &TaskControlBlock, err: &SchedulerError) {
        self.logger.log(
            LogEntry::new(LogLevel::Error, message)
                .with_category(LogCategory::Scheduler)
                .with_source(task.id())
                .with_field("task", task.name())
                .with_field("reason", err),
        );
    }

    fn lock(&self) -> MutexGuard<'_, TaskRegistry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("config", &self.config)
            .field("tasks", &self.task_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TaskFailure;
    use crate::test_utils::{memory_logger, CallCounter};
    use services_logger::MemorySink;

    fn scheduler() -> (Scheduler, Arc<MemorySink>) {
        let (logger, sink) = memory_logger();
        (Scheduler::new(logger), sink)
    }

    fn noop(name: &str, priority: TaskPriority) -> TaskControlBlock {
        TaskControlBlock::new(name, priority).with_callback(|| Ok(()))
    }

    fn make_ready(scheduler: &Scheduler, name: &str) {
        let task = scheduler.find_task_by_name(name).unwrap();
        task.set_state(TaskState::Ready).unwrap();
    }

    fn make_waiting(scheduler: &Scheduler, name: &str) {
        let task = scheduler.find_task_by_name(name).unwrap();
        task.set_state(TaskState::Running).unwrap();
        task.set_state(TaskState::Waiting).unwrap();
    }

    #[test]
    fn test_scheduler_creation() {
        let (scheduler, _) = scheduler();
        assert_eq!(scheduler.task_count(), 0);
        assert!(scheduler.ready_tasks_in_order().is_empty());
        assert_eq!(scheduler.last_executed_task(), None);
        assert_eq!(scheduler.utilization_percent(), 0.0);
    }

    #[test]
    fn test_register_and_find() {
        let (scheduler, sink) = scheduler();
        let id = scheduler
            .register_task(noop("SystemMonitor", TaskPriority::High))
            .unwrap();

        assert!(scheduler.is_task_registered("SystemMonitor"));
        let task = scheduler.find_task_by_name("SystemMonitor").unwrap();
        assert_eq!(task.id(), id);
        assert!(scheduler.find_task_by_name("Other").is_none());
        assert!(sink.contains("Task registered successfully"));
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let (scheduler, sink) = scheduler();
        scheduler.register_task(noop("X", TaskPriority::Low)).unwrap();

        let result = scheduler.register_task(noop("X", TaskPriority::High));
        assert_eq!(result, Err(SchedulerError::DuplicateName("X".to_string())));
        assert_eq!(scheduler.task_count(), 1);
        assert_eq!(
            scheduler.find_task_by_name("X").unwrap().priority(),
            TaskPriority::Low
        );
        assert!(sink.contains("Task name is duplicate"));
    }

    #[test]
    fn test_missing_callback_rejected() {
        let (scheduler, _) = scheduler();
        let result = scheduler.register_task(TaskControlBlock::new("NoCallback", TaskPriority::Low));
        assert!(matches!(result, Err(SchedulerError::Validation(_))));
        assert_eq!(scheduler.task_count(), 0);
    }

    #[test]
    fn test_empty_name_rejected() {
        let (scheduler, _) = scheduler();
        let result = scheduler.register_task(noop("", TaskPriority::Low));
        assert!(matches!(result, Err(SchedulerError::Validation(_))));
        assert_eq!(scheduler.task_count(), 0);
    }

    #[test]
    fn test_bounded_config_rejects_long_periods() {
        let (logger, _) = memory_logger();
        let scheduler = Scheduler::with_config(SchedulerConfig::bounded(), logger);

        let result =
            scheduler.register_task(noop("Slow", TaskPriority::Low).with_wait_period(MAX_TIMER_VALUE + 1));
        assert!(matches!(result, Err(SchedulerError::InvalidTimerValue { .. })));

        scheduler
            .register_task(noop("Ok", TaskPriority::Low).with_wait_period(MAX_TIMER_VALUE))
            .unwrap();
        assert!(scheduler.adjust_task_timer("Ok", MAX_TIMER_VALUE + 1).is_err());
        assert_eq!(
            scheduler.find_task_by_name("Ok").unwrap().wait_period(),
            MAX_TIMER_VALUE
        );
    }

    #[test]
    fn test_unregister() {
        let (scheduler, _) = scheduler();
        scheduler.register_task(noop("A", TaskPriority::Low)).unwrap();

        assert!(scheduler.unregister_task("A").is_ok());
        assert!(!scheduler.is_task_registered("A"));
        assert_eq!(
            scheduler.unregister_task("A"),
            Err(SchedulerError::NotFound("A".to_string()))
        );
    }

    #[test]
    fn test_ready_pool_ordering() {
        let (scheduler, _) = scheduler();
        scheduler.register_task(noop("lowB", TaskPriority::Low)).unwrap();
        scheduler.register_task(noop("lowA", TaskPriority::Low)).unwrap();
        scheduler.register_task(noop("high", TaskPriority::High)).unwrap();
        scheduler.register_task(noop("mid", TaskPriority::Medium)).unwrap();
        scheduler.register_task(noop("waiting", TaskPriority::High)).unwrap();
        make_waiting(&scheduler, "waiting");

        assert_eq!(
            scheduler.ready_tasks_in_order(),
            vec!["high", "mid", "lowA", "lowB"]
        );
    }

    #[test]
    fn test_select_next_policy() {
        let pool: Vec<ReadyEntry> = ["A", "B", "C"]
            .iter()
            .map(|s| (TaskPriority::Medium, s.to_string()))
            .collect();
        assert_eq!(select_next(&[], Some("A")), None);
        assert_eq!(select_next(&pool, None), Some("A"));
        assert_eq!(select_next(&pool, Some("A")), Some("B"));
        assert_eq!(select_next(&pool, Some("C")), Some("A"));
        assert_eq!(select_next(&pool, Some("gone")), Some("A"));
    }

    #[test]
    fn test_select_next_stays_in_top_band() {
        let pool: Vec<ReadyEntry> = vec![
            (TaskPriority::High, "H".to_string()),
            (TaskPriority::Low, "L1".to_string()),
            (TaskPriority::Low, "L2".to_string()),
        ];
        // Continuing the LOW rotation to L2 would pass over H
        assert_eq!(select_next(&pool, Some("L1")), Some("H"));
        assert_eq!(select_next(&pool, Some("H")), Some("H"));
    }

    #[test]
    fn test_next_task_uses_last_executed() {
        let (scheduler, _) = scheduler();
        scheduler.register_task(noop("A", TaskPriority::Low)).unwrap();
        scheduler.register_task(noop("B", TaskPriority::Low)).unwrap();

        let pool = scheduler.ready_tasks_in_order();
        assert_eq!(scheduler.next_task_to_execute(&pool), Some("A".to_string()));

        scheduler.execute_next_ready_task();
        make_ready(&scheduler, "A");
        let pool = scheduler.ready_tasks_in_order();
        assert_eq!(scheduler.next_task_to_execute(&pool), Some("B".to_string()));
    }

    #[test]
    fn test_execute_idle() {
        let (scheduler, _) = scheduler();
        let outcome = scheduler.execute_next_ready_task();
        assert_eq!(outcome, ExecutionOutcome::Idle);
        assert!(!outcome.succeeded());
        assert_eq!(outcome.task(), None);
    }

    #[test]
    fn test_round_robin_fairness() {
        let (scheduler, _) = scheduler();
        let counter = CallCounter::new();
        for name in ["A", "B", "C"] {
            scheduler
                .register_task(
                    TaskControlBlock::new(name, TaskPriority::Medium)
                        .with_callback(counter.callback()),
                )
                .unwrap();
        }

        let mut visited = Vec::new();
        for _ in 0..3 {
            let outcome = scheduler.execute_next_ready_task();
            assert!(outcome.succeeded());
            let name = outcome.task().unwrap().to_string();
            make_ready(&scheduler, &name);
            visited.push(name);
        }

        assert_eq!(visited, vec!["A", "B", "C"]);
        assert_eq!(counter.count(), 3);

        // Fourth call wraps around
        let outcome = scheduler.execute_next_ready_task();
        assert_eq!(outcome.task(), Some("A"));
    }

    #[test]
    fn test_priority_precedence_over_rotation() {
        let (scheduler, _) = scheduler();
        scheduler.register_task(noop("H", TaskPriority::High)).unwrap();
        scheduler.register_task(noop("L", TaskPriority::Low)).unwrap();
        scheduler.register_task(noop("M", TaskPriority::Low)).unwrap();

        // Run H then L so that L is the last executed task
        make_waiting(&scheduler, "H");
        make_waiting(&scheduler, "M");
        assert_eq!(scheduler.execute_next_ready_task().task(), Some("L"));
        assert_eq!(scheduler.last_executed_task(), Some("L".to_string()));

        make_ready(&scheduler, "H");
        make_ready(&scheduler, "L");
        make_ready(&scheduler, "M");
        // Pool is [H, L, M]; continuing after L would give M, priority gives H
        assert_eq!(scheduler.ready_tasks_in_order(), vec!["H", "L", "M"]);
        let outcome = scheduler.execute_next_ready_task();
        assert_eq!(outcome.task(), Some("H"));

        // L left the pool entirely: restart at the top
        let (scheduler, _) = self::scheduler();
        scheduler.register_task(noop("H", TaskPriority::High)).unwrap();
        scheduler.register_task(noop("L", TaskPriority::Low)).unwrap();
        make_waiting(&scheduler, "H");
        assert_eq!(scheduler.execute_next_ready_task().task(), Some("L"));
        make_ready(&scheduler, "H");
        assert_eq!(scheduler.execute_next_ready_task().task(), Some("H"));
    }

    #[test]
    fn test_execution_cycles_to_waiting() {
        let (scheduler, sink) = scheduler();
        scheduler
            .register_task(noop("A", TaskPriority::High).with_wait_period(2))
            .unwrap();

        let outcome = scheduler.execute_next_ready_task();
        assert_eq!(
            outcome,
            ExecutionOutcome::Completed {
                task: "A".to_string()
            }
        );
        let task = scheduler.find_task_by_name("A").unwrap();
        assert_eq!(task.state(), TaskState::Waiting);
        assert_eq!(task.current_wait_ticks(), 0);
        assert!(sink.contains("Complete (RUNNING -> WAITING)"));

        // Nothing else is READY
        assert_eq!(scheduler.execute_next_ready_task(), ExecutionOutcome::Idle);
    }

    #[test]
    fn test_callback_failure_contained() {
        let (scheduler, sink) = scheduler();
        scheduler
            .register_task(
                TaskControlBlock::new("Faulty", TaskPriority::High)
                    .with_wait_period(1)
                    .with_callback(|| Err(TaskFailure::new("bus error"))),
            )
            .unwrap();
        scheduler
            .register_task(
                TaskControlBlock::new("Panicky", TaskPriority::Medium)
                    .with_callback(|| panic!("unrecoverable")),
            )
            .unwrap();

        let outcome = scheduler.execute_next_ready_task();
        assert!(!outcome.succeeded());
        assert!(matches!(
            outcome,
            ExecutionOutcome::Failed {
                error: SchedulerError::CallbackFailed { .. },
                ..
            }
        ));
        assert_eq!(
            scheduler.find_task_by_name("Faulty").unwrap().state(),
            TaskState::Waiting
        );

        let outcome = scheduler.execute_next_ready_task();
        assert_eq!(outcome.task(), Some("Panicky"));
        assert!(!outcome.succeeded());
        assert_eq!(
            scheduler.find_task_by_name("Panicky").unwrap().state(),
            TaskState::Waiting
        );
        assert!(sink.contains("Task execution failed"));

        // The failed task re-enters the wait cycle normally
        assert_eq!(scheduler.update_task_timers(), vec!["Faulty", "Panicky"]);
    }

    #[test]
    fn test_timer_expiry_through_scheduler() {
        let (scheduler, _) = scheduler();
        scheduler
            .register_task(noop("T", TaskPriority::Low).with_wait_period(3))
            .unwrap();
        make_waiting(&scheduler, "T");

        assert!(scheduler.update_task_timers().is_empty());
        assert!(scheduler.update_task_timers().is_empty());
        scheduler.pause_task_timer("T").unwrap();
        assert!(scheduler.update_task_timers().is_empty());
        scheduler.resume_task_timer("T").unwrap();
        assert_eq!(scheduler.update_task_timers(), vec!["T"]);
        assert_eq!(
            scheduler.find_task_by_name("T").unwrap().state(),
            TaskState::Ready
        );
    }

    #[test]
    fn test_end_to_end_scenario() {
        let (scheduler, _) = scheduler();
        let a_runs = CallCounter::new();
        scheduler
            .register_task(
                TaskControlBlock::new("A", TaskPriority::High)
                    .with_wait_period(3)
                    .with_callback(a_runs.callback()),
            )
            .unwrap();
        scheduler
            .register_task(noop("B", TaskPriority::Low).with_wait_period(5))
            .unwrap();
        make_waiting(&scheduler, "A");
        make_waiting(&scheduler, "B");

        let a = scheduler.find_task_by_name("A").unwrap();
        let b = scheduler.find_task_by_name("B").unwrap();

        for _ in 0..3 {
            scheduler.update_task_timers();
        }
        assert_eq!(a.state(), TaskState::Ready);
        assert_eq!(b.state(), TaskState::Waiting);
        assert_eq!(b.current_wait_ticks(), 3);

        let outcome = scheduler.execute_next_ready_task();
        assert_eq!(outcome.task(), Some("A"));
        assert!(outcome.succeeded());
        assert_eq!(a_runs.count(), 1);
        assert_eq!(a.state(), TaskState::Waiting);
        assert_eq!(a.current_wait_ticks(), 0);

        scheduler.update_task_timers();
        assert_eq!(b.state(), TaskState::Waiting);
        assert_eq!(scheduler.update_task_timers(), vec!["B"]);
        assert_eq!(b.state(), TaskState::Ready);
    }

    #[test]
    fn test_countdown_logging() {
        let (scheduler, sink) = scheduler();
        scheduler
            .register_task(noop("C", TaskPriority::Low).with_wait_period(4))
            .unwrap();
        make_waiting(&scheduler, "C");
        scheduler.set_countdown_logging("C", true).unwrap();

        scheduler.update_task_timers();
        let countdowns: Vec<_> = sink
            .entries_in(LogCategory::Timer)
            .into_iter()
            .filter(|e| e.message == "Countdown")
            .collect();
        assert_eq!(countdowns.len(), 1);
        assert_eq!(countdowns[0].field("remaining"), Some("4"));

        assert!(scheduler.set_countdown_logging("missing", true).is_err());
    }

    #[test]
    fn test_timer_control_not_found() {
        let (scheduler, _) = scheduler();
        let missing = Err(SchedulerError::NotFound("ghost".to_string()));
        assert_eq!(scheduler.adjust_task_timer("ghost", 3), missing);
        assert_eq!(scheduler.pause_task_timer("ghost"), missing);
        assert_eq!(scheduler.resume_task_timer("ghost"), missing);
    }

    #[test]
    fn test_adjust_task_timer() {
        let (scheduler, _) = scheduler();
        scheduler
            .register_task(noop("SystemMonitor", TaskPriority::High).with_wait_period(3))
            .unwrap();

        assert!(matches!(
            scheduler.adjust_task_timer("SystemMonitor", 0),
            Err(SchedulerError::InvalidTimerValue { ticks: 0, .. })
        ));
        scheduler.adjust_task_timer("SystemMonitor", 6).unwrap();
        let status = scheduler.timer_status();
        assert_eq!(status.len(), 1);
        assert_eq!(status[0].wait_period, 6);
        assert!(!status[0].paused);
    }

    #[test]
    fn test_statistics() {
        let (scheduler, _) = scheduler();
        scheduler
            .register_task(noop("H", TaskPriority::High).with_wait_period(1))
            .unwrap();
        scheduler.register_task(noop("M", TaskPriority::Medium)).unwrap();
        scheduler.register_task(noop("L1", TaskPriority::Low)).unwrap();
        scheduler.register_task(noop("L2", TaskPriority::Low)).unwrap();

        // Run H twice through its timer
        for _ in 0..2 {
            make_waiting(&scheduler, "H");
            scheduler.update_task_timers();
        }
        make_waiting(&scheduler, "M");

        let stats = scheduler.registration_stats();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.ready, 3);
        assert_eq!(stats.waiting, 1);
        assert_eq!(stats.running, 0);
        assert_eq!((stats.high, stats.medium, stats.low), (1, 1, 2));

        assert_eq!(scheduler.task_count_by_state(TaskState::Ready), 3);
        assert_eq!(scheduler.task_count_by_priority(TaskPriority::Low), 2);
        assert_eq!(scheduler.task_names_by_state(TaskState::Waiting), vec!["M"]);
        assert!(scheduler.has_task_with_priority(TaskPriority::Medium));
        assert_eq!(scheduler.most_active_task(), Some(("H".to_string(), 2)));
        assert_eq!(scheduler.total_timer_activations(), 2);
        assert_eq!(scheduler.utilization_percent(), 75.0);

        let names: Vec<_> = scheduler
            .task_summaries()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["H", "M", "L1", "L2"]);

        let snapshot = scheduler.stats();
        assert_eq!(snapshot.registration, stats);
        assert_eq!(snapshot.tasks.len(), 4);
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("\"most_active_task\":[\"H\",2]"));
    }

    #[test]
    fn test_most_active_tie_breaks_by_name() {
        let (scheduler, _) = scheduler();
        scheduler.register_task(noop("b", TaskPriority::Low)).unwrap();
        scheduler.register_task(noop("a", TaskPriority::Low)).unwrap();
        assert_eq!(scheduler.most_active_task(), Some(("a".to_string(), 0)));
    }

    #[test]
    fn test_queries_do_not_mutate() {
        let (scheduler, _) = scheduler();
        scheduler.register_task(noop("A", TaskPriority::Low)).unwrap();
        let before = scheduler.task_summaries();
        let _ = scheduler.stats();
        let _ = scheduler.timer_status();
        let _ = scheduler.utilization_percent();
        assert_eq!(scheduler.task_summaries(), before);
        assert_eq!(scheduler.last_executed_task(), None);
    }

    #[test]
    fn test_callback_can_query_scheduler() {
        let (logger, _) = memory_logger();
        let scheduler = Arc::new(Scheduler::new(logger));
        let observed = Arc::new(Mutex::new(None));

        let weak = Arc::downgrade(&scheduler);
        let sink = observed.clone();
        scheduler
            .register_task(
                TaskControlBlock::new("BackgroundLogger", TaskPriority::Low).with_callback(
                    move || {
                        let scheduler = weak.upgrade().ok_or("scheduler dropped")?;
                        let running = scheduler.task_count_by_state(TaskState::Running);
                        *sink.lock().unwrap() = Some(running);
                        Ok(())
                    },
                ),
            )
            .unwrap();

        assert!(scheduler.execute_next_ready_task().succeeded());
        assert_eq!(*observed.lock().unwrap(), Some(1));
    }

    #[test]
    fn test_concurrent_registration_and_execution() {
        let (logger, _) = memory_logger();
        let scheduler = Arc::new(Scheduler::new(logger));
        let counter = CallCounter::new();

        let registrar = {
            let scheduler = scheduler.clone();
            let counter = counter.clone();
            std::thread::spawn(move || {
                for i in 0..50 {
                    let task = TaskControlBlock::new(format!("task{:02}", i), TaskPriority::Medium)
                        .with_wait_period(1)
                        .with_callback(counter.callback());
                    scheduler.register_task(task).unwrap();
                }
            })
        };

        for _ in 0..200 {
            scheduler.update_task_timers();
            scheduler.execute_next_ready_task();
        }
        registrar.join().unwrap();

        assert_eq!(scheduler.task_count(), 50);
        assert_eq!(scheduler.task_count_by_state(TaskState::Running), 0);
        assert!(counter.count() > 0);
    }
}
