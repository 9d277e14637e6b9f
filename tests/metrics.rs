// tests/metrics.rs
// One test per process: the Prometheus recorder is global.

mod common;

use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use common::*;
use watcher_alerts::metrics::Metrics;
use watcher_alerts::RunOptions;

#[tokio::test]
async fn run_counters_show_up_on_metrics_route() {
    let metrics = Metrics::init().expect("install recorder once");

    let h = harness(registry_of(vec![
        StubProvider::ok("remotive", vec![job("Rust job A", "https://jobs.example/a")]),
        StubProvider::failing("arbeitnow"),
    ]));
    h.store.add_profile("u1", Some("me@example.com")).await;
    h.store.add_watcher(jobs_watcher("w1", "u1", &["rust"])).await;
    h.runner.run_at(RunOptions::default(), morning()).await;

    let resp = metrics
        .router()
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = body::to_bytes(resp.into_body(), 1_048_576).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();

    for needle in [
        "watcher_runs_total",
        "watchers_processed_total",
        "alerts_created_total",
        "provider_errors_total",
        "provider_call_ms_bucket",
        "notify_emails_sent_total",
    ] {
        assert!(text.contains(needle), "metrics exposition missing '{needle}'\n{text}");
    }
    assert!(Metrics::init().is_err(), "second recorder install must fail");
}
