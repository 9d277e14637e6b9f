mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use watcher_alerts::config::RunnerConfig;
use watcher_alerts::model::{Category, SourcedItem, Watcher};
use watcher_alerts::notify::router::compose;
use watcher_alerts::store::MemoryStore;
use watcher_alerts::textgen::{synth, MockClient, TextGen};
use watcher_alerts::{RunOptions, Runner};

fn mock(reply: &str) -> TextGen {
    TextGen::new(Arc::new(MockClient::fixed(reply)), Duration::from_secs(2))
}

fn failing() -> TextGen {
    TextGen::new(Arc::new(MockClient::failing()), Duration::from_secs(2))
}

fn item(title: &str) -> SourcedItem {
    SourcedItem {
        source: "remotive".into(),
        title: title.into(),
        description: None,
        url: Some("https://jobs.example/a".into()),
        matched_keywords: vec!["rust".into()],
    }
}

#[tokio::test]
async fn failed_generation_uses_fallback_intro() {
    let w = Watcher::new("w1", "u1", "Rust", Category::Jobs, vec!["rust".into()]);
    let email = compose(&failing(), &w, &[item("Rust job A")], "me@example.com").await;
    let html = email.html.unwrap_or_default();
    assert!(html.contains("Here are the top 1 matches we found for you."));
}

#[tokio::test]
async fn blank_generation_is_treated_as_failure() {
    let w = Watcher::new("w1", "u1", "Rust", Category::Jobs, vec!["rust".into()]);
    let intro = synth::notification_intro(&mock("   "), &w, &[item("Rust job A")]).await;
    assert_eq!(intro, "Here are the top 1 matches we found for you.");
}

#[tokio::test]
async fn digest_summaries_fall_back_deterministically() {
    let tg = failing();
    let section =
        synth::watcher_section_summary(&tg, "Rust", &["A".to_string(), "B".to_string()]).await;
    assert_eq!(section, "Rust has 2 updates.");
    let daily = synth::daily_digest_summary(
        &tg,
        "Oct 19 2026",
        &[("Rust".to_string(), vec!["A".to_string()])],
    )
    .await;
    assert_eq!(daily, "Daily digest for Oct 19 2026. 1 watcher(s) had updates.");
}

#[tokio::test]
async fn planned_engine_narrows_the_provider_set() {
    let store = Arc::new(MemoryStore::new());
    let mailer = Arc::new(RecordingMailer::default());
    let serp = Arc::new(StubProvider::ok(
        "serpapi_google_jobs",
        vec![job("Rust engineer", "https://serp.example/1")],
    ));
    let board = Arc::new(StubProvider::ok(
        "remotive",
        vec![job("Rust job A", "https://jobs.example/a")],
    ));
    let mut registry = watcher_alerts::ingest::ProviderRegistry::new();
    registry.register_arc(serp.clone());
    registry.register_arc(board.clone());

    let runner = Runner::new(
        store.clone(),
        registry,
        mock(r#"{"engine":"google_jobs","query":"rust engineer"}"#),
        mailer.clone(),
        RunnerConfig::default(),
    );
    store.add_profile("u1", Some("me@example.com")).await;
    store.add_watcher(jobs_watcher("w1", "u1", &["rust"])).await;

    let report = runner.run_at(RunOptions::default(), morning()).await;

    assert_eq!(report.alerts_created, 1);
    assert_eq!(serp.calls(), 1);
    assert_eq!(board.calls(), 0);
    assert_eq!(store.alerts().await[0].source, "serpapi_google_jobs");
}

#[tokio::test]
async fn unusable_plan_keeps_default_sources() {
    let store = Arc::new(MemoryStore::new());
    let mailer = Arc::new(RecordingMailer::default());
    let board = Arc::new(StubProvider::ok(
        "remotive",
        vec![job("Rust job A", "https://jobs.example/a")],
    ));
    let mut registry = watcher_alerts::ingest::ProviderRegistry::new();
    registry.register_arc(board.clone());

    let runner = Runner::new(
        store.clone(),
        registry,
        mock(r#"{"engine":"bing","query":"rust"}"#),
        mailer.clone(),
        RunnerConfig::default(),
    );
    store.add_profile("u1", Some("me@example.com")).await;
    store.add_watcher(jobs_watcher("w1", "u1", &["rust"])).await;

    let report = runner.run_at(RunOptions::default(), morning()).await;
    assert_eq!(report.alerts_created, 1);
    assert_eq!(board.calls(), 1);
    assert_eq!(mailer.sent().len(), 1);
}
