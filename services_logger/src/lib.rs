//! # Logger Service
//!
//! This crate implements the structured logging boundary of the kernel.
//!
//! ## Philosophy
//!
//! Logging is explicit and structured, not text-based or printf-style.
//! Kernel components build [`LogEntry`] values and hand them to a
//! [`LogSink`]; only a sink decides how (or whether) an entry is rendered.
//! Nothing in the kernel writes to the console directly.

pub mod sink;

use core_types::TaskId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

pub use sink::{ConsoleSink, MemorySink, NullSink};

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    /// Debug information
    Debug,
    /// Informational messages
    Info,
    /// Warnings
    Warn,
    /// Errors
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        };
        f.write_str(label)
    }
}

/// Subsystem a log entry belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogCategory {
    /// Boot, shutdown and context lifecycle
    Kernel,
    /// Task registration and removal
    Registry,
    /// Selection and execution decisions
    Scheduler,
    /// Wait timer progress and expiry
    Timer,
    /// Per-tick clock heartbeat
    Heartbeat,
    /// Section heading in a report
    Header,
    /// Report body lines
    Status,
    /// Output produced by task callbacks
    Task,
}

impl fmt::Display for LogCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LogCategory::Kernel => "KERNEL",
            LogCategory::Registry => "REGISTRY",
            LogCategory::Scheduler => "SCHEDULER",
            LogCategory::Timer => "TIMER",
            LogCategory::Heartbeat => "HEARTBEAT",
            LogCategory::Header => "HEADER",
            LogCategory::Status => "STATUS",
            LogCategory::Task => "TASK",
        };
        f.write_str(label)
    }
}

/// A structured log entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Log level
    pub level: LogLevel,
    /// Originating subsystem
    pub category: LogCategory,
    /// Source task (if known)
    pub source: Option<TaskId>,
    /// Log message
    pub message: String,
    /// Structured fields
    pub fields: Vec<(String, String)>,
}

impl LogEntry {
    /// Creates a new log entry in the `Kernel` category
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            category: LogCategory::Kernel,
            source: None,
            message: message.into(),
            fields: Vec::new(),
        }
    }

    /// Sets the category
    pub fn with_category(mut self, category: LogCategory) -> Self {
        self.category = category;
        self
    }

    /// Sets the source task
    pub fn with_source(mut self, source: TaskId) -> Self {
        self.source = Some(source);
        self
    }

    /// Adds a field to the log entry
    pub fn with_field(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.fields.push((key.into(), value.to_string()));
        self
    }

    /// Looks up a field value by key
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Destination for log entries
///
/// Sinks are shared between the clock thread and caller threads, so they
/// must be `Send + Sync` and take `&self`.
pub trait LogSink: Send + Sync {
    /// Accepts one entry
    fn log(&self, entry: LogEntry);
}

/// Cloneable handle to a shared sink
#[derive(Clone)]
pub struct Logger {
    sink: Arc<dyn LogSink>,
}

impl Logger {
    /// Creates a logger writing to `sink`
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self { sink }
    }

    /// Creates a logger that discards everything
    pub fn null() -> Self {
        Self::new(Arc::new(NullSink))
    }

    /// Forwards a fully built entry
    pub fn log(&self, entry: LogEntry) {
        self.sink.log(entry);
    }

    pub fn debug(&self, category: LogCategory, message: impl Into<String>) {
        self.log(LogEntry::new(LogLevel::Debug, message).with_category(category));
    }

    pub fn info(&self, category: LogCategory, message: impl Into<String>) {
        self.log(LogEntry::new(LogLevel::Info, message).with_category(category));
    }

    pub fn warn(&self, category: LogCategory, message: impl Into<String>) {
        self.log(LogEntry::new(LogLevel::Warn, message).with_category(category));
    }

    pub fn error(&self, category: LogCategory, message: impl Into<String>) {
        self.log(LogEntry::new(LogLevel::Error, message).with_category(category));
    }

    /// Emits a report section heading
    pub fn header(&self, message: impl Into<String>) {
        self.info(LogCategory::Header, message);
    }

    /// Emits a report body line
    pub fn status(&self, message: impl Into<String>) {
        self.info(LogCategory::Status, message);
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warn);
        assert!(LogLevel::Warn < LogLevel::Error);
    }

    #[test]
    fn test_log_entry_creation() {
        let entry = LogEntry::new(LogLevel::Info, "test message");
        assert_eq!(entry.level, LogLevel::Info);
        assert_eq!(entry.category, LogCategory::Kernel);
        assert_eq!(entry.message, "test message");
        assert!(entry.source.is_none());
        assert!(entry.fields.is_empty());
    }

    #[test]
    fn test_log_entry_with_source() {
        let task_id = TaskId::new();
        let entry = LogEntry::new(LogLevel::Info, "test").with_source(task_id);
        assert_eq!(entry.source, Some(task_id));
    }

    #[test]
    fn test_log_entry_with_fields() {
        let entry = LogEntry::new(LogLevel::Info, "test")
            .with_field("task", "SystemMonitor")
            .with_field("remaining", 3);

        assert_eq!(entry.fields.len(), 2);
        assert_eq!(entry.field("task"), Some("SystemMonitor"));
        assert_eq!(entry.field("remaining"), Some("3"));
        assert_eq!(entry.field("missing"), None);
    }

    #[test]
    fn test_logger_helpers_route_to_sink() {
        let sink = Arc::new(MemorySink::new());
        let logger = Logger::new(sink.clone());

        logger.header("Task Summary");
        logger.status("Total Tasks: 3");
        logger.error(LogCategory::Registry, "Task validation failed");

        let entries = sink.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].category, LogCategory::Header);
        assert_eq!(entries[1].category, LogCategory::Status);
        assert_eq!(entries[2].level, LogLevel::Error);
        assert_eq!(entries[2].category, LogCategory::Registry);
    }

    #[test]
    fn test_null_logger_discards() {
        let logger = Logger::null();
        logger.info(LogCategory::Kernel, "dropped");
    }
}
