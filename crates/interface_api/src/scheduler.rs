//! Periodic replay
//!
//! Runs `execute_all` on a fixed interval until shut down. A pass that fails
//! as a whole (storage unreachable, corrupt sequence) is logged and the next
//! tick tries again.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{error, info, warn};

use domain_replay::ReplayEngine;

/// Handle to the running scheduler task
pub struct ReplayScheduler {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ReplayScheduler {
    /// Spawns the scheduler; the first pass runs one `period` after start
    pub fn spawn(engine: ReplayEngine, period: Duration) -> Self {
        let (shutdown, mut stop) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut ticks = interval_at(Instant::now() + period, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!(period_secs = period.as_secs_f64(), "Replay scheduler started");

            loop {
                tokio::select! {
                    _ = ticks.tick() => run_pass(&engine).await,
                    _ = stop.changed() => break,
                }
            }

            info!("Replay scheduler stopped");
        });

        Self { shutdown, task }
    }

    /// Stops the scheduler, letting a running pass finish
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            warn!(error = %e, "Replay scheduler task ended abnormally");
        }
    }
}

async fn run_pass(engine: &ReplayEngine) {
    match engine.execute_all().await {
        Ok(summary) if summary.is_empty() => {}
        Ok(summary) => info!(
            executed = summary.executed().len(),
            failed = summary.failed().len(),
            skipped = summary.skipped().len(),
            "Scheduled replay finished"
        ),
        Err(e) => error!(error = %e, "Scheduled replay failed"),
    }
}
