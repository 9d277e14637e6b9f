//! Watcher alerts service. Binary entrypoint.
//! Boots the Axum HTTP server with the run trigger, health and metrics routes,
//! plus the optional in-process scheduler.

use std::sync::Arc;
use std::time::Duration;

use shuttle_axum::ShuttleAxum;
use watcher_alerts::api::{create_router, AppState};
use watcher_alerts::metrics::Metrics;
use watcher_alerts::scheduler::spawn_scheduler;

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    watcher_alerts::init_tracing();

    let runner = Arc::new(watcher_alerts::build_runner_from_env()?);

    let schedule_secs = runner.config().schedule_secs;
    if schedule_secs > 0 {
        tracing::info!(schedule_secs, "in-process scheduler enabled");
        spawn_scheduler(runner.clone(), Duration::from_secs(schedule_secs));
    }

    let mut router = create_router(AppState::new(runner));
    match Metrics::init() {
        Ok(m) => router = router.merge(m.router()),
        Err(e) => tracing::warn!(error = %e, "metrics endpoint disabled"),
    }

    Ok(router.into())
}
