use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;
use shuttle_axum::axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::trace::TraceLayer;

use crate::runner::{RunOptions, Runner};

#[derive(Clone)]
pub struct AppState {
    pub runner: Arc<Runner>,
    /// Expected bearer token; `None` means the trigger is not configured.
    pub cron_secret: Option<Arc<str>>,
}

impl AppState {
    pub fn new(runner: Arc<Runner>) -> Self {
        let cron_secret = runner.config().cron_secret.as_deref().map(Arc::from);
        Self { runner, cron_secret }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/watchers/run", post(run_watchers))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunParams {
    #[serde(default)]
    debug: Option<String>,
    #[serde(default)]
    force_digest: Option<String>,
}

fn flag(headers: &HeaderMap, header: &str, query: Option<&str>) -> bool {
    headers.get(header).and_then(|v| v.to_str().ok()) == Some("1") || query == Some("1")
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn error(status: StatusCode, msg: &str) -> Response {
    (status, Json(json!({ "error": msg }))).into_response()
}

async fn run_watchers(
    State(state): State<AppState>,
    Query(params): Query<RunParams>,
    headers: HeaderMap,
) -> Response {
    let Some(secret) = state.cron_secret.as_deref() else {
        tracing::error!("WATCHER_CRON_SECRET is not configured");
        return error(StatusCode::INTERNAL_SERVER_ERROR, "Missing WATCHER_CRON_SECRET");
    };
    let presented = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or_default();
    if !constant_time_eq(presented.as_bytes(), secret.as_bytes()) {
        return error(StatusCode::UNAUTHORIZED, "Unauthorized");
    }

    let opts = RunOptions {
        debug: flag(&headers, "x-debug", params.debug.as_deref()),
        force_digest: flag(&headers, "x-force-digest", params.force_digest.as_deref()),
    };
    let report = state.runner.run(opts).await;
    Json(report).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_comparison() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
    }

    #[test]
    fn flags_from_header_or_query() {
        let mut h = HeaderMap::new();
        assert!(!flag(&h, "x-debug", None));
        assert!(flag(&h, "x-debug", Some("1")));
        h.insert("x-debug", "1".parse().unwrap());
        assert!(flag(&h, "x-debug", None));
        assert!(!flag(&h, "x-force-digest", Some("true")));
    }
}
