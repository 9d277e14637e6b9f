// tests/api_http.rs
//
// HTTP-level tests for the run trigger without opening sockets,
// via tower::ServiceExt::oneshot.

mod common;

use std::sync::Arc;

use serde_json::Value as Json;
use shuttle_axum::axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use tower::ServiceExt as _;

use common::*;
use watcher_alerts::api::{create_router, AppState};
use watcher_alerts::config::RunnerConfig;

const BODY_LIMIT: usize = 1024 * 1024;

async fn app(secret: Option<&str>) -> Router {
    let cfg = RunnerConfig {
        cron_secret: secret.map(str::to_string),
        ..RunnerConfig::default()
    };
    let h = harness_with(
        registry_of(vec![StubProvider::ok(
            "remotive",
            vec![job("Rust job A", "https://jobs.example/a")],
        )]),
        cfg,
    );
    h.store.add_profile("u1", Some("me@example.com")).await;
    h.store.add_watcher(jobs_watcher("w1", "u1", &["rust"])).await;
    create_router(AppState::new(Arc::new(h.runner)))
}

fn run_request(auth: Option<&str>, uri: &str, debug_header: bool) -> Request<Body> {
    let mut b = Request::builder().method("POST").uri(uri);
    if let Some(a) = auth {
        b = b.header("authorization", a);
    }
    if debug_header {
        b = b.header("x-debug", "1");
    }
    b.body(Body::empty()).expect("build request")
}

async fn json_body(resp: shuttle_axum::axum::response::Response) -> Json {
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn health_is_ok() {
    let req = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let resp = app(Some("s3cret")).await.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn missing_secret_config_is_server_error() {
    let resp = app(None)
        .await
        .oneshot(run_request(Some("Bearer anything"), "/api/watchers/run", false))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(resp).await["error"], "Missing WATCHER_CRON_SECRET");
}

#[tokio::test]
async fn wrong_or_missing_token_is_unauthorized() {
    for auth in [None, Some("Bearer nope"), Some("s3cret"), Some("Basic s3cret")] {
        let resp = app(Some("s3cret"))
            .await
            .oneshot(run_request(auth, "/api/watchers/run", false))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "auth = {auth:?}");
        assert_eq!(json_body(resp).await["error"], "Unauthorized");
    }
}

#[tokio::test]
async fn authorized_run_returns_camel_case_report() {
    let resp = app(Some("s3cret"))
        .await
        .oneshot(run_request(Some("Bearer s3cret"), "/api/watchers/run", false))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let v = json_body(resp).await;
    assert_eq!(v["processed"], 1);
    assert_eq!(v["alertsCreated"], 1);
    assert_eq!(v["immediateEmails"], 1);
    assert_eq!(v["failures"], 0);
    assert!(v.get("digestsSent").is_some());
    assert!(v.get("debugReport").is_none());
}

#[tokio::test]
async fn debug_flag_attaches_provider_traces() {
    for (uri, header) in [
        ("/api/watchers/run", true),
        ("/api/watchers/run?debug=1", false),
    ] {
        let resp = app(Some("s3cret"))
            .await
            .oneshot(run_request(Some("Bearer s3cret"), uri, header))
            .await
            .unwrap();
        let v = json_body(resp).await;
        let report = v["debugReport"].as_array().expect("debugReport array");
        assert_eq!(report.len(), 1);
        assert_eq!(report[0]["watcherId"], "w1");
        assert_eq!(report[0]["sources"][0]["source"], "remotive");
        assert_eq!(report[0]["sources"][0]["itemCount"], 1);
    }
}
