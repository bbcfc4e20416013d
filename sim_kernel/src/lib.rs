//! # Simulated Kernel
//!
//! The core of the vOS kernel simulation: task control blocks, a cooperative
//! priority round-robin scheduler with per-task wait timers, and a real-time
//! clock that drives it once every [`TICK_INTERVAL`].
//!
//! ## Shape
//!
//! - [`tcb`]: a task's identity, lifecycle state machine, callback and timer.
//! - [`scheduler`]: the task registry and the selection policy.
//! - [`clock`]: the tick thread.
//! - [`timer`]: the shared, monotonically increasing tick counter.
//! - [`report`]: renders scheduler snapshots to the log.
//! - [`Kernel`]: the context object that owns all of the above.
//!
//! There are no globals. Everything a component needs (scheduler, logger,
//! tick counter) is handed to it by the [`Kernel`] that owns it, so tests can
//! build as many independent kernels as they like.
//!
//! ## Example
//!
//! ```
//! use core_types::TaskPriority;
//! use services_logger::Logger;
//! use sim_kernel::{Kernel, KernelConfig, TaskControlBlock};
//!
//! let kernel = Kernel::new(KernelConfig::default(), Logger::null());
//! kernel
//!     .scheduler()
//!     .register_task(
//!         TaskControlBlock::new("Worker", TaskPriority::Medium)
//!             .with_wait_period(4)
//!             .with_callback(|| Ok(())),
//!     )
//!     .unwrap();
//!
//! kernel.boot().unwrap();
//! kernel.shutdown();
//! ```

pub mod clock;
pub mod error;
pub mod report;
pub mod scheduler;
pub mod tcb;
pub mod test_utils;
pub mod timer;

pub use clock::{Clock, TICK_INTERVAL};
pub use error::{ClockError, KernelError, SchedulerError, TaskFailure};
pub use scheduler::{
    ExecutionOutcome, RegistrationStats, Scheduler, SchedulerConfig, SchedulerStats, TimerStatus,
    MAX_TIMER_VALUE,
};
pub use tcb::{TaskCallback, TaskControlBlock, TaskSummary};
pub use timer::TickCounter;

use services_logger::{LogCategory, LogEntry, LogLevel, Logger};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Kernel configuration
#[derive(Debug, Clone)]
pub struct KernelConfig {
    pub scheduler: SchedulerConfig,
    /// Emit a heartbeat log entry on every tick
    pub heartbeat_logging: bool,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            scheduler: SchedulerConfig::default(),
            heartbeat_logging: true,
        }
    }
}

/// Kernel context
///
/// Owns the scheduler, the clock and the tick counter. `boot()` starts the
/// clock, `shutdown()` stops it, and dropping the kernel shuts it down. The
/// kernel counts as booted exactly while its clock runs.
pub struct Kernel {
    config: KernelConfig,
    logger: Logger,
    ticks: TickCounter,
    scheduler: Arc<Scheduler>,
    clock: Clock,
    lifecycle: Mutex<()>,
}

impl Kernel {
    pub const NAME: &'static str = "vOS Kernel";
    pub const VERSION: &'static str = "1.0";

    pub fn new(config: KernelConfig, logger: Logger) -> Self {
        let ticks = TickCounter::new();
        let scheduler = Arc::new(Scheduler::with_config(
            config.scheduler.clone(),
            logger.clone(),
        ));
        let clock = Clock::new(
            scheduler.clone(),
            ticks.clone(),
            logger.clone(),
            config.heartbeat_logging,
        );

        Self {
            config,
            logger,
            ticks,
            scheduler,
            clock,
            lifecycle: Mutex::new(()),
        }
    }

    /// Starts the clock
    ///
    /// Idempotent. On failure the kernel stays un-booted and may be booted
    /// again.
    pub fn boot(&self) -> Result<(), KernelError> {
        let _lifecycle = self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner);
        if self.clock.is_running() {
            return Ok(());
        }

        self.logger
            .header(format!("{} v{} booting", Self::NAME, Self::VERSION));
        self.clock.initialise()?;

        self.logger.log(
            LogEntry::new(LogLevel::Info, "Kernel initialized")
                .with_category(LogCategory::Kernel)
                .with_field("tasks", self.scheduler.task_count()),
        );
        Ok(())
    }

    /// Stops the clock
    ///
    /// Idempotent; a kernel that was never booted is left untouched. Safe
    /// to call from a task callback.
    pub fn shutdown(&self) {
        if !self.clock.stop() {
            return;
        }

        self.logger.log(
            LogEntry::new(LogLevel::Info, "Kernel shutdown complete")
                .with_category(LogCategory::Kernel)
                .with_field("tick", self.ticks.current_ticks()),
        );
    }

    pub fn is_booted(&self) -> bool {
        self.clock.is_running()
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Current tick count
    pub fn ticks(&self) -> u64 {
        self.ticks.current_ticks()
    }

    /// A read handle on the tick counter
    pub fn tick_counter(&self) -> TickCounter {
        self.ticks.clone()
    }

    /// Nominal uptime: ticks counted times the tick interval
    pub fn uptime(&self) -> Duration {
        self.ticks.uptime()
    }
}

impl Drop for Kernel {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for Kernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Kernel")
            .field("booted", &self.is_booted())
            .field("ticks", &self.ticks())
            .field("scheduler", &self.scheduler)
            .finish()
    }
}
