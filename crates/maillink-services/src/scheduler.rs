//! Fixed-interval scheduler for the forward cycle.
//!
//! The first run starts immediately, later runs follow every interval.
//! A failed run is logged and does not stop the schedule.

use std::future::Future;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::error::Result;
use crate::forward::ForwardCycle;

pub const DEFAULT_INTERVAL_SECS: u64 = 300;

/// Shortest interval accepted; smaller values are raised to it.
pub const MIN_INTERVAL_SECS: u64 = 60;

/// Repeats a job until cancelled.
pub struct Scheduler {
    interval: Duration,
}

impl Scheduler {
    /// Create a scheduler running every `interval_secs`, at least
    /// [`MIN_INTERVAL_SECS`].
    pub fn new(interval_secs: u64) -> Self {
        Self {
            interval: Duration::from_secs(interval_secs.max(MIN_INTERVAL_SECS)),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run `job` on every tick until `cancel` fires.
    ///
    /// Cancellation ends the wait between runs. A run already in progress
    /// finishes first. If a run overruns the interval the next one starts
    /// right after it and the schedule shifts.
    pub async fn run<F, Fut, T>(&self, cancel: CancellationToken, mut job: F)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        info!(interval_secs = self.interval.as_secs(), "scheduler started");
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("scheduler shutting down");
                    return;
                }
                _ = ticker.tick() => {
                    if let Err(e) = job().await {
                        error!(error = %e, "scheduled run failed");
                    }
                }
            }
        }
    }

    /// Repeat `cycle` against the local date of each tick.
    pub async fn run_forward(&self, cycle: &ForwardCycle, cancel: CancellationToken) {
        self.run(cancel, || cycle.run_once(crate::local_today()))
            .await;
    }
}
