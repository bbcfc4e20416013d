//! Log sink implementations

use crate::{LogCategory, LogEntry, LogLevel, LogSink};
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Writes entries to stdout, one line each
///
/// The sink starts initialized. After `shutdown()` entries are dropped
/// until `initialize()` is called again.
pub struct ConsoleSink {
    min_level: LogLevel,
    active: AtomicBool,
    /// Serialises whole lines between the clock thread and callers
    write_lock: Mutex<()>,
}

impl ConsoleSink {
    /// Creates a sink that prints `Info` and above
    pub fn new() -> Self {
        Self::with_min_level(LogLevel::Info)
    }

    /// Creates a sink that prints `min_level` and above
    pub fn with_min_level(min_level: LogLevel) -> Self {
        Self {
            min_level,
            active: AtomicBool::new(true),
            write_lock: Mutex::new(()),
        }
    }

    /// Re-enables output; idempotent
    pub fn initialize(&self) -> bool {
        self.active.store(true, Ordering::Release);
        true
    }

    /// Stops output; idempotent
    pub fn shutdown(&self) {
        let _guard = self.lock();
        self.active.store(false, Ordering::Release);
    }

    pub fn is_initialized(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Renders an entry as a single console line
    pub fn render(entry: &LogEntry) -> String {
        let mut line = match entry.category {
            LogCategory::Heartbeat => {
                let tick = entry.field("tick").unwrap_or("?");
                format!("[Tick {}] {}", tick, entry.message)
            }
            LogCategory::Header => format!("=== {} ===", entry.message),
            LogCategory::Status => format!("[STATUS] {}", entry.message),
            category => format!("[{}][{}] {}", entry.level, category, entry.message),
        };

        let extra: Vec<String> = entry
            .fields
            .iter()
            .filter(|(key, _)| !(entry.category == LogCategory::Heartbeat && key == "tick"))
            .map(|(key, value)| format!("{}={}", key, value))
            .collect();
        if !extra.is_empty() {
            line.push_str(" (");
            line.push_str(&extra.join(", "));
            line.push(')');
        }
        line
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

impl LogSink for ConsoleSink {
    fn log(&self, entry: LogEntry) {
        if entry.level < self.min_level {
            return;
        }
        let _guard = self.lock();
        if !self.is_initialized() {
            return;
        }
        let stdout = io::stdout();
        let mut out = stdout.lock();
        // A closed stdout must never take the clock thread down
        let _ = writeln!(out, "{}", Self::render(&entry));
        let _ = out.flush();
    }
}

/// Records every entry in memory
///
/// Used by tests to assert on diagnostics and by hosts that render logs
/// themselves.
#[derive(Default)]
pub struct MemorySink {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of everything recorded so far
    pub fn entries(&self) -> Vec<LogEntry> {
        self.lock().clone()
    }

    /// Returns recorded entries of one category
    pub fn entries_in(&self, category: LogCategory) -> Vec<LogEntry> {
        self.lock()
            .iter()
            .filter(|entry| entry.category == category)
            .cloned()
            .collect()
    }

    /// Returns true if any recorded message contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.lock().iter().any(|entry| entry.message.contains(needle))
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, Vec<LogEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LogSink for MemorySink {
    fn log(&self, entry: LogEntry) {
        self.lock().push(entry);
    }
}

/// Discards every entry
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl LogSink for NullSink {
    fn log(&self, _entry: LogEntry) {}
}
