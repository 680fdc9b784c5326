//! Background refresh loop.
//!
//! One task owns the timer. Each tick runs a full cycle on the blocking pool
//! and the loop awaits it before looking at the timer again, so cycles never
//! overlap; ticks that fall inside a long cycle are skipped, not queued.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::FloorTracker;

/// Drives [`FloorTracker::refresh`] at startup and then every `interval`.
pub struct RefreshScheduler {
    tracker: Arc<FloorTracker>,
    interval: Duration,
}

impl RefreshScheduler {
    /// Schedule at the tracker's configured refresh interval.
    pub fn new(tracker: Arc<FloorTracker>) -> Self {
        let interval = tracker.refresh_interval();
        Self { tracker, interval }
    }

    /// Override the interval. A zero interval is clamped to one second.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval.max(Duration::from_secs(1));
        self
    }

    /// Start the loop on the current Tokio runtime. The first cycle starts
    /// immediately.
    pub fn spawn(self) -> SchedulerHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(run_loop(self.tracker, self.interval, stop_rx));
        SchedulerHandle { stop_tx, task }
    }
}

async fn run_loop(tracker: Arc<FloorTracker>, interval: Duration, mut stop_rx: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!(interval_secs = interval.as_secs(), "refresh scheduler started");

    loop {
        tokio::select! {
            biased;
            changed = stop_rx.changed() => {
                // A dropped handle counts as a stop request.
                if changed.is_err() || *stop_rx.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                let tracker = Arc::clone(&tracker);
                match tokio::task::spawn_blocking(move || tracker.refresh()).await {
                    Ok(report) => debug!(?report, "scheduled refresh finished"),
                    Err(e) => warn!(error = %e, "scheduled refresh panicked"),
                }
            }
        }
    }

    info!("refresh scheduler stopped");
}

/// Stop handle for a spawned [`RefreshScheduler`].
///
/// Dropping the handle also stops the loop after any in-flight cycle.
pub struct SchedulerHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Stop the timer and wait for an in-flight cycle, if any, to finish.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        if let Err(e) = self.task.await {
            warn!(error = %e, "refresh scheduler task failed");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
