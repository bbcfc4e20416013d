//! # System Tick Counter
//!
//! The single, monotonically increasing tick count shared by the kernel.
//!
//! Every observer holds a clone of the same [`TickCounter`] and may read it
//! at any time. Only the clock advances it, exactly once per tick, which is
//! why `increment()` is crate-private.

use crate::clock::TICK_INTERVAL;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Shared system tick counter
///
/// # Examples
///
/// ```
/// use sim_kernel::timer::TickCounter;
///
/// let ticks = TickCounter::new();
/// let observer = ticks.clone();
/// assert_eq!(observer.current_ticks(), 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct TickCounter {
    ticks: Arc<AtomicU64>,
}

impl TickCounter {
    /// Creates a counter starting at tick 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a counter starting at a specific tick count
    ///
    /// Useful for tests that need to start with a non-zero time.
    pub fn with_initial_ticks(ticks: u64) -> Self {
        Self {
            ticks: Arc::new(AtomicU64::new(ticks)),
        }
    }

    /// Returns the current tick count
    pub fn current_ticks(&self) -> u64 {
        self.ticks.load(Ordering::Acquire)
    }

    /// Nominal time covered by the ticks counted so far
    pub fn uptime(&self) -> Duration {
        let millis = self
            .current_ticks()
            .saturating_mul(TICK_INTERVAL.as_millis() as u64);
        Duration::from_millis(millis)
    }

    /// Advances by one tick and returns the new count
    pub(crate) fn increment(&self) -> u64 {
        self.ticks.fetch_add(1, Ordering::AcqRel).wrapping_add(1)
    }
}
