//! # System Clock
//!
//! A single background thread that drives the scheduler at a fixed rate.
//!
//! Each tick, in order:
//! 1. increments the shared tick counter exactly once,
//! 2. advances every WAITING task's timer,
//! 3. executes at most one READY task,
//! 4. emits a heartbeat carrying the tick number.
//!
//! Deadlines advance by a fixed [`TICK_INTERVAL`] from the previous
//! deadline rather than from "now", so a slow tick does not shift every
//! later tick. A callback that never returns stalls the loop; stopping only
//! prevents the next tick from starting.
//!
//! Every spawned loop owns its own stop token. Stopping sets the token of the
//! loop it stops, so a later `initialise()` can never revive a loop that was
//! already told to exit.

use crate::error::ClockError;
use crate::scheduler::Scheduler;
use crate::timer::TickCounter;
use services_logger::{LogCategory, LogEntry, LogLevel, Logger};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Fixed tick interval
pub const TICK_INTERVAL: Duration = Duration::from_millis(100);

const CLOCK_THREAD_NAME: &str = "vos-clock";

/// State shared with the tick thread
struct ClockShared {
    running: AtomicBool,
    ticks: TickCounter,
    scheduler: Arc<Scheduler>,
    logger: Logger,
    heartbeat_logging: bool,
}

impl ClockShared {
    fn tick(&self) -> bool {
        if !self.running.load(Ordering::Acquire) {
            return false;
        }

        let tick = self.ticks.increment();
        self.scheduler.update_task_timers();
        self.scheduler.execute_next_ready_task();

        if self.heartbeat_logging {
            self.logger.log(
                LogEntry::new(LogLevel::Info, "System heartbeat")
                    .with_category(LogCategory::Heartbeat)
                    .with_field("tick", tick),
            );
        }
        true
    }
}

/// One spawned tick loop
struct Worker {
    handle: JoinHandle<()>,
    stop: Arc<AtomicBool>,
}

#[derive(Default)]
struct WorkerSlot {
    active: Option<Worker>,
    /// A loop stopped from its own thread, not yet joined
    detached: Option<JoinHandle<()>>,
}

/// Periodic tick driver
pub struct Clock {
    shared: Arc<ClockShared>,
    worker: Mutex<WorkerSlot>,
}

impl Clock {
    pub fn new(
        scheduler: Arc<Scheduler>,
        ticks: TickCounter,
        logger: Logger,
        heartbeat_logging: bool,
    ) -> Self {
        Self {
            shared: Arc::new(ClockShared {
                running: AtomicBool::new(false),
                ticks,
                scheduler,
                logger,
                heartbeat_logging,
            }),
            worker: Mutex::new(WorkerSlot::default()),
        }
    }

    /// Starts the tick thread
    ///
    /// Idempotent: if the clock is already running no second thread is
    /// spawned. A loop that stopped itself is joined first, unless this is
    /// called from that loop's own thread.
    pub fn initialise(&self) -> Result<(), ClockError> {
        self.reap_detached();

        let mut slot = self.lock_worker();
        if slot.active.is_some() && self.is_running() {
            return Ok(());
        }
        if let Some(stale) = slot.active.take() {
            stale.stop.store(true, Ordering::Release);
        }

        let stop = Arc::new(AtomicBool::new(false));
        self.shared.running.store(true, Ordering::Release);
        let shared = Arc::clone(&self.shared);
        let token = Arc::clone(&stop);
        let spawned = thread::Builder::new()
            .name(CLOCK_THREAD_NAME.to_string())
            .spawn(move || run(shared, token));

        match spawned {
            Ok(handle) => {
                slot.active = Some(Worker { handle, stop });
                self.shared.logger.log(
                    LogEntry::new(LogLevel::Info, "System clock initialized")
                        .with_category(LogCategory::Kernel)
                        .with_field("interval_ms", TICK_INTERVAL.as_millis()),
                );
                Ok(())
            }
            Err(err) => {
                self.shared.running.store(false, Ordering::Release);
                let err = ClockError::SpawnFailed(err.to_string());
                self.shared
                    .logger
                    .error(LogCategory::Kernel, err.to_string());
                Err(err)
            }
        }
    }

    /// Stops the tick thread and waits for it to exit
    ///
    /// Idempotent and safe on a clock that was never started. A tick that
    /// is already in progress runs to completion. When called from the
    /// tick thread itself the thread is not joined; it exits once the
    /// current tick returns. Returns whether the clock was running.
    pub fn stop(&self) -> bool {
        let (was_running, worker) = {
            let mut slot = self.lock_worker();
            let was_running = self.shared.running.swap(false, Ordering::AcqRel);
            let worker = slot.active.take();
            if let Some(worker) = &worker {
                worker.stop.store(true, Ordering::Release);
            }
            (was_running, worker)
        };

        if let Some(Worker { handle, .. }) = worker {
            if handle.thread().id() == thread::current().id() {
                self.lock_worker().detached = Some(handle);
            } else {
                self.join(handle);
            }
        }

        if was_running {
            self.shared.logger.log(
                LogEntry::new(LogLevel::Info, "System clock stopped")
                    .with_category(LogCategory::Kernel)
                    .with_field("tick", self.shared.ticks.current_ticks()),
            );
        }
        was_running
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Performs one tick now, if the clock is running
    ///
    /// Returns false (and does nothing) when stopped.
    pub fn tick(&self) -> bool {
        self.shared.tick()
    }

    pub fn current_ticks(&self) -> u64 {
        self.shared.ticks.current_ticks()
    }

    /// Joins a loop that stopped itself, if there is one
    fn reap_detached(&self) {
        let detached = self.lock_worker().detached.take();
        if let Some(handle) = detached {
            // Dropping our own handle detaches it; the loop's token is set
            if handle.thread().id() != thread::current().id() {
                self.join(handle);
            }
        }
    }

    fn join(&self, handle: JoinHandle<()>) {
        if handle.join().is_err() {
            self.shared
                .logger
                .error(LogCategory::Kernel, "Clock thread terminated abnormally");
        }
    }

    fn lock_worker(&self) -> MutexGuard<'_, WorkerSlot> {
        self.worker.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Clock {
    fn drop(&mut self) {
        self.stop();
        self.reap_detached();
    }
}

impl std::fmt::Debug for Clock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Clock")
            .field("running", &self.is_running())
            .field("ticks", &self.current_ticks())
            .finish()
    }
}

fn run(shared: Arc<ClockShared>, stop: Arc<AtomicBool>) {
    let mut deadline = Instant::now() + TICK_INTERVAL;

    while !stop.load(Ordering::Acquire) {
        let now = Instant::now();
        if deadline > now {
            thread::sleep(deadline - now);
        }
        if stop.load(Ordering::Acquire) {
            break;
        }

        // Nothing may unwind out of the loop: a dead clock thread would
        // silently stop the whole system.
        if panic::catch_unwind(AssertUnwindSafe(|| shared.tick())).is_err() {
            shared
                .logger
                .error(LogCategory::Kernel, "Tick aborted by panic; clock continues");
        }
        deadline += TICK_INTERVAL;
    }
}
