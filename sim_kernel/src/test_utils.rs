//! Test utilities
//!
//! Helpers shared by unit tests in this crate and by the integration test
//! crate: counting callbacks and a logger that records into memory.

use crate::error::TaskFailure;
use services_logger::{Logger, MemorySink};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Shared counter that hands out task callbacks
///
/// Every callback produced by [`CallCounter::callback`] increments the same
/// counter when it runs.
#[derive(Debug, Clone, Default)]
pub struct CallCounter {
    calls: Arc<AtomicUsize>,
}

impl CallCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a callback that bumps this counter and succeeds
    pub fn callback(&self) -> impl FnMut() -> Result<(), TaskFailure> + Send + 'static {
        let calls = self.calls.clone();
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Returns a callback that bumps this counter and then fails
    pub fn failing_callback(
        &self,
        reason: &'static str,
    ) -> impl FnMut() -> Result<(), TaskFailure> + Send + 'static {
        let calls = self.calls.clone();
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(TaskFailure::new(reason))
        }
    }

    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

/// Creates a logger backed by a fresh [`MemorySink`]
pub fn memory_logger() -> (Logger, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    (Logger::new(sink.clone()), sink)
}
