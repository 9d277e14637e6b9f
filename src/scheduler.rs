// src/scheduler.rs
use std::sync::Arc;
use std::time::Duration;

use metrics::gauge;
use tokio::task::JoinHandle;

use crate::runner::{RunOptions, Runner};

/// Spawn an in-process trigger that runs the full pass every `interval`.
/// The first tick fires immediately; a slow pass delays the next one.
pub fn spawn_scheduler(runner: Arc<Runner>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let report = runner.run(RunOptions::default()).await;
            gauge!("watcher_last_run_ts").set(chrono::Utc::now().timestamp() as f64);
            tracing::info!(
                target: "scheduler",
                processed = report.processed,
                alerts_created = report.alerts_created,
                failures = report.failures,
                "scheduled run"
            );
        }
    })
}
