//! # Demo Runtime
//!
//! Owns the kernel for the lifetime of one demo run.

use crate::workload;
use services_logger::{LogCategory, Logger};
use sim_kernel::{
    report, Kernel, KernelConfig, KernelError, SchedulerConfig, SchedulerError, SchedulerStats,
};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Demo runtime error types
#[derive(Debug, Error)]
pub enum DemoError {
    #[error("Kernel error: {0}")]
    Kernel(#[from] KernelError),

    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to encode statistics: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Demo configuration
#[derive(Debug, Clone, PartialEq)]
pub struct DemoConfig {
    /// Total run time after boot
    pub duration: Duration,
    /// Interval between status reports
    pub status_every: Duration,
    /// When to change SystemMonitor's period (None = never)
    pub adjust_at: Option<Duration>,
    /// When to print the full timer statistics mid-run (None = never)
    pub statistics_at: Option<Duration>,
    /// Task whose countdown is logged every tick
    pub countdown_task: Option<String>,
    /// Print final statistics as JSON on stdout
    pub json: bool,
    /// Only warnings and errors reach the console
    pub quiet: bool,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(60),
            status_every: Duration::from_secs(5),
            adjust_at: Some(Duration::from_secs(30)),
            statistics_at: Some(Duration::from_secs(45)),
            countdown_task: Some(workload::BACKGROUND_LOGGER.to_string()),
            json: false,
            quiet: false,
        }
    }
}

/// Demo runtime
pub struct DemoRuntime {
    config: DemoConfig,
    kernel: Kernel,
}

impl DemoRuntime {
    /// Creates the kernel and registers the stock workload
    ///
    /// The kernel is not booted until [`DemoRuntime::run`].
    pub fn new(config: DemoConfig, logger: Logger) -> Result<Self, DemoError> {
        if config.status_every.is_zero() {
            return Err(DemoError::InvalidConfig(
                "status interval must be greater than zero".to_string(),
            ));
        }

        let kernel = Kernel::new(
            KernelConfig {
                scheduler: SchedulerConfig::bounded(),
                heartbeat_logging: !config.quiet,
            },
            logger,
        );

        let logger = kernel.logger();
        logger.header("vOS - Virtual Operating System");
        logger.header("Cooperative Scheduler Demo");

        workload::demonstrate_tcb(logger)?;
        workload::register(&kernel)?;
        workload::demonstrate_duplicate_rejection(kernel.scheduler(), logger);

        if let Some(name) = &config.countdown_task {
            kernel.scheduler().set_countdown_logging(name, true)?;
        }

        let summaries = kernel.scheduler().task_summaries();
        report::registered_tasks(&summaries, logger);
        report::registration_stats(&kernel.scheduler().registration_stats(), logger);
        report::task_summary(&summaries, logger);

        Ok(Self { config, kernel })
    }

    pub fn config(&self) -> &DemoConfig {
        &self.config
    }

    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    /// Boots, runs for the configured duration, shuts down
    ///
    /// Returns the final scheduler statistics, taken before shutdown.
    pub fn run(&self) -> Result<SchedulerStats, DemoError> {
        let logger = self.kernel.logger();
        let scheduler = self.kernel.scheduler();

        self.kernel.boot()?;
        logger.header(format!(
            "Running demo ({}s)",
            self.config.duration.as_secs()
        ));

        let start = Instant::now();
        let mut adjusted = false;
        let mut statistics_shown = false;

        while start.elapsed() < self.config.duration {
            let remaining = self.config.duration.saturating_sub(start.elapsed());
            thread::sleep(self.config.status_every.min(remaining));
            let elapsed = start.elapsed();

            logger.status(format!(
                "Demo Progress - {}s elapsed, Tick {}",
                elapsed.as_secs(),
                self.kernel.ticks()
            ));
            report::detailed_timer_status(&scheduler.timer_status(), logger);
            report::timer_efficiency(&scheduler.stats(), logger);

            if !adjusted && self.config.adjust_at.is_some_and(|at| elapsed >= at) {
                logger.info(LogCategory::Timer, "Demonstrating dynamic timer adjustment");
                scheduler.adjust_task_timer(workload::SYSTEM_MONITOR, 6)?;
                adjusted = true;
            }

            if !statistics_shown && self.config.statistics_at.is_some_and(|at| elapsed >= at) {
                report::timer_statistics(&scheduler.stats(), logger);
                statistics_shown = true;
            }

            logger.status("Status Complete");
        }

        let stats = scheduler.stats();
        logger.header("Demo Complete");
        report::timer_statistics(&stats, logger);
        logger.status(format!("Total ticks executed: {}", self.kernel.ticks()));
        logger.status(format!(
            "System uptime: {}ms",
            self.kernel.uptime().as_millis()
        ));
        logger.status(format!("Tasks managed: {}", stats.registration.total));

        logger.info(LogCategory::Kernel, "Shutting down vOS");
        self.kernel.shutdown();
        Ok(stats)
    }

    /// Pretty JSON rendering of final statistics
    pub fn render_json(stats: &SchedulerStats) -> Result<String, DemoError> {
        Ok(serde_json::to_string_pretty(stats)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_kernel::test_utils::memory_logger;

    fn short_config() -> DemoConfig {
        DemoConfig {
            duration: Duration::from_millis(700),
            status_every: Duration::from_millis(200),
            adjust_at: Some(Duration::ZERO),
            statistics_at: None,
            countdown_task: None,
            json: false,
            quiet: true,
        }
    }

    #[test]
    fn test_default_config_matches_stock_demo() {
        let config = DemoConfig::default();
        assert_eq!(config.duration, Duration::from_secs(60));
        assert_eq!(config.status_every, Duration::from_secs(5));
        assert_eq!(config.adjust_at, Some(Duration::from_secs(30)));
        assert_eq!(config.statistics_at, Some(Duration::from_secs(45)));
        assert_eq!(config.countdown_task.as_deref(), Some("BackgroundLogger"));
        assert!(!config.json);
    }

    #[test]
    fn test_new_registers_workload() {
        let (logger, sink) = memory_logger();
        let runtime = DemoRuntime::new(short_config(), logger).unwrap();

        let scheduler = runtime.kernel().scheduler();
        assert_eq!(scheduler.task_count(), 3);
        assert!(!runtime.kernel().is_booted());
        assert!(sink.contains("Duplicate prevention working correctly"));
        assert!(sink.contains("Task Registration Statistics"));
        assert!(sink.contains("Task Summary"));
    }

    #[test]
    fn test_zero_status_interval_rejected() {
        let config = DemoConfig {
            status_every: Duration::ZERO,
            ..short_config()
        };
        assert!(matches!(
            DemoRuntime::new(config, Logger::null()),
            Err(DemoError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_unknown_countdown_task_rejected() {
        let config = DemoConfig {
            countdown_task: Some("Nobody".to_string()),
            ..short_config()
        };
        assert!(matches!(
            DemoRuntime::new(config, Logger::null()),
            Err(DemoError::Scheduler(SchedulerError::NotFound(_)))
        ));
    }

    #[test]
    fn test_run_reports_and_adjusts() {
        let (logger, sink) = memory_logger();
        let runtime = DemoRuntime::new(short_config(), logger).unwrap();

        let stats = runtime.run().unwrap();

        assert!(!runtime.kernel().is_booted());
        assert_eq!(stats.registration.total, 3);
        let monitor = stats
            .tasks
            .iter()
            .find(|task| task.name == "SystemMonitor")
            .unwrap();
        assert_eq!(monitor.wait_period, 6);
        assert!(sink.contains("Demo Progress"));
        assert!(sink.contains("Detailed Timer Status"));
        assert!(sink.contains("Demo Complete"));
    }

    #[test]
    fn test_render_json() {
        let runtime = DemoRuntime::new(short_config(), Logger::null()).unwrap();
        let json = DemoRuntime::render_json(&runtime.kernel().scheduler().stats()).unwrap();

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["registration"]["total"], 3);
        assert_eq!(value["tasks"].as_array().map(Vec::len), Some(3));
    }
}
