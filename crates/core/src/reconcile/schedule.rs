//! Periodic recheck timer.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::Reconciler;

/// Runs a reconciliation tick every `interval` until stopped.
///
/// The first tick fires one interval after `start`. Ticks missed while a
/// pass is still running are skipped rather than queued.
pub struct RecheckSchedule {
    interval: Duration,
    reconciler: Arc<Reconciler>,
    task: Option<JoinHandle<()>>,
}

impl RecheckSchedule {
    pub fn new(reconciler: Arc<Reconciler>, interval: Duration) -> Self {
        Self { interval, reconciler, task: None }
    }

    /// Start the timer. Starting a running schedule restarts it.
    pub fn start(&mut self) {
        self.stop();

        let interval = self.interval;
        let reconciler = self.reconciler.clone();
        self.task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                tracing::debug!("recheck timer fired");
                reconciler.tick().await;
            }
        }));
        tracing::info!(interval_secs = interval.as_secs(), "recheck schedule started");
    }

    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::info!("recheck schedule stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Drop for RecheckSchedule {
    fn drop(&mut self) {
        self.stop();
    }
}
