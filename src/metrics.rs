// src/metrics.rs
use anyhow::Context;
use axum::{routing::get, Router};
use metrics::describe_gauge;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

/// Provider latency buckets, milliseconds. Upper end covers the default call timeout.
const PROVIDER_CALL_BUCKETS_MS: &[f64] = &[
    50.0, 100.0, 250.0, 500.0, 1_000.0, 2_500.0, 5_000.0, 10_000.0, 15_000.0,
];

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder. Fails if a recorder is already installed.
    pub fn init() -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Full("provider_call_ms".to_string()),
                PROVIDER_CALL_BUCKETS_MS,
            )
            .context("prometheus: provider_call_ms buckets")?
            .install_recorder()
            .context("prometheus: install recorder")?;
        describe_gauge!(
            "watcher_last_run_ts",
            "Unix time of the last scheduled pass."
        );
        Ok(Self { handle })
    }

    pub fn render(&self) -> String {
        self.handle.render()
    }

    /// `/metrics` in the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
