//! Run-state flags shared between the engine and its controllers
//!
//! Controllers flip flags; the engine observes them at its suspension points
//! (before every network operation and while paused). Nothing here touches
//! crawl data.

use crate::config::MIN_RATE_LIMIT_SECONDS;
use crate::state::RunStatus;
use crate::TrawlError;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

#[derive(Debug)]
pub struct RunControl {
    running: AtomicBool,
    paused: AtomicBool,

    /// Set while an engine task exists, including one draining after a stop
    active: AtomicBool,

    /// Bumped by every start; a task only acts while it owns the current value
    generation: AtomicU64,

    rate_limit_micros: AtomicU64,
    pause_poll: Duration,
    wake: Notify,
}

impl RunControl {
    pub fn new(rate_limit: Duration, pause_poll: Duration) -> Self {
        Self {
            running: AtomicBool::new(false),
            paused: AtomicBool::new(false),
            active: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            rate_limit_micros: AtomicU64::new(rate_limit.as_micros() as u64),
            pause_poll,
            wake: Notify::new(),
        }
    }

    /// Enters `Running` from `Stopped`, returning the new run's generation
    ///
    /// Returns None if a run is live, or if a stopped run's task has not
    /// exited yet. At most one engine task exists at any time.
    pub fn begin_run(&self) -> Option<u64> {
        if self
            .active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return None;
        }

        self.paused.store(false, Ordering::SeqCst);
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.running.store(true, Ordering::SeqCst);
        Some(generation)
    }

    /// Releases the task slot taken by `begin_run`
    fn end_task(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.paused.store(false, Ordering::SeqCst);
        self.active.store(false, Ordering::SeqCst);
        self.wake.notify_waiters();
    }

    /// Marks a run as finished on its own (frontier exhausted)
    ///
    /// No-op if the run was already stopped or superseded.
    pub fn finish_run(&self, generation: u64) {
        if self.generation.load(Ordering::SeqCst) == generation {
            self.running.store(false, Ordering::SeqCst);
            self.paused.store(false, Ordering::SeqCst);
            self.wake.notify_waiters();
        }
    }

    /// Requests a stop; returns false if nothing was running
    pub fn stop(&self) -> bool {
        let was_running = self.running.swap(false, Ordering::SeqCst);
        self.paused.store(false, Ordering::SeqCst);
        self.wake.notify_waiters();
        was_running
    }

    /// Freezes a running run; returns false if stopped or already paused
    pub fn pause(&self) -> bool {
        if !self.running.load(Ordering::SeqCst) {
            return false;
        }
        !self.paused.swap(true, Ordering::SeqCst)
    }

    /// Unfreezes a paused run; returns false if it was not paused
    pub fn resume(&self) -> bool {
        let was_paused = self.paused.swap(false, Ordering::SeqCst);
        if was_paused {
            self.wake.notify_waiters();
        }
        was_paused
    }

    /// Replaces the rate limit; the engine picks it up at its next wait
    pub fn set_rate_limit(&self, seconds: f64) -> Result<(), TrawlError> {
        if !seconds.is_finite() || seconds < MIN_RATE_LIMIT_SECONDS {
            return Err(TrawlError::InvalidRateLimit {
                got: seconds,
                min: MIN_RATE_LIMIT_SECONDS,
            });
        }

        let micros = (seconds * 1_000_000.0).round() as u64;
        self.rate_limit_micros.store(micros, Ordering::SeqCst);
        Ok(())
    }

    pub fn rate_limit(&self) -> Duration {
        Duration::from_micros(self.rate_limit_micros.load(Ordering::SeqCst))
    }

    pub fn pause_poll(&self) -> Duration {
        self.pause_poll
    }

    pub fn status(&self) -> RunStatus {
        if !self.running.load(Ordering::SeqCst) {
            RunStatus::Stopped
        } else if self.paused.load(Ordering::SeqCst) {
            RunStatus::Paused
        } else {
            RunStatus::Running
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Returns true while `generation` is the live, unstopped run
    pub fn is_current(&self, generation: u64) -> bool {
        self.running.load(Ordering::SeqCst) && self.generation() == generation
    }

    /// Suspension point: blocks while paused
    ///
    /// Returns true when the run may proceed and false once it has been
    /// stopped or superseded. `on_pause` runs once, just before the first
    /// block. Frontier and counters are untouched while waiting here.
    pub async fn checkpoint(&self, generation: u64, on_pause: impl FnOnce()) -> bool {
        let mut on_pause = Some(on_pause);
        loop {
            let signalled = self.wake.notified();

            if !self.is_current(generation) {
                return false;
            }
            if !self.paused.load(Ordering::SeqCst) {
                if on_pause.is_none() {
                    tracing::info!("Crawler resumed");
                }
                return true;
            }

            if let Some(on_pause) = on_pause.take() {
                on_pause();
                tracing::info!("Crawler paused");
            }
            let _ = tokio::time::timeout(self.pause_poll, signalled).await;
        }
    }

    /// Sleeps for at most `limit`, waking early on stop/resume
    pub async fn sleep_interruptible(&self, limit: Duration) {
        let signalled = self.wake.notified();
        let _ = tokio::time::timeout(limit, signalled).await;
    }
}

/// Owned by an engine task; frees the task slot when the task ends
///
/// Dropping covers every exit path, including a task aborted at runtime
/// shutdown.
pub(crate) struct TaskSlot {
    control: Arc<RunControl>,
}

impl TaskSlot {
    pub fn new(control: Arc<RunControl>) -> Self {
        Self { control }
    }
}

impl Drop for TaskSlot {
    fn drop(&mut self) {
        self.control.end_task();
    }
}
