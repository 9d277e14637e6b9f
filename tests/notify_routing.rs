mod common;

use common::*;
use watcher_alerts::RunOptions;

#[tokio::test]
async fn user_with_several_watchers_waits_for_digest() {
    let h = harness(registry_of(vec![StubProvider::ok(
        "remotive",
        vec![job("Rust job A", "https://jobs.example/a")],
    )]));
    h.store.add_profile("u1", Some("me@example.com")).await;
    h.store.add_watcher(jobs_watcher("w1", "u1", &["rust"])).await;
    h.store.add_watcher(jobs_watcher("w2", "u1", &["rust"])).await;

    let report = h.runner.run_at(RunOptions::default(), morning()).await;

    assert_eq!(report.processed, 2);
    assert_eq!(report.alerts_created, 2);
    assert_eq!(report.immediate_emails, 0);
    assert!(h.mailer.sent().is_empty());
}

#[tokio::test]
async fn single_watcher_user_gets_immediate_email() {
    let h = harness(registry_of(vec![StubProvider::ok(
        "remotive",
        vec![job("Rust job A", "https://jobs.example/a")],
    )]));
    h.store.add_profile("u1", Some("one@example.com")).await;
    h.store.add_profile("u2", Some("two@example.com")).await;
    h.store.add_watcher(jobs_watcher("w1", "u1", &["rust"])).await;
    h.store.add_watcher(jobs_watcher("w2", "u2", &["rust"])).await;
    h.store.add_watcher(jobs_watcher("w3", "u2", &["rust"])).await;

    let report = h.runner.run_at(RunOptions::default(), morning()).await;

    assert_eq!(report.immediate_emails, 1);
    let sent = h.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "one@example.com");
}

#[tokio::test]
async fn everything_is_stored_but_email_is_capped() {
    let items = (1..=25)
        .map(|i| job(&format!("Rust job {i:02}"), &format!("https://jobs.example/{i}")))
        .collect();
    let h = harness(registry_of(vec![StubProvider::ok("remotive", items)]));
    h.store.add_profile("u1", Some("me@example.com")).await;
    h.store.add_watcher(jobs_watcher("w1", "u1", &["rust"])).await;

    let report = h.runner.run_at(RunOptions::default(), morning()).await;

    assert_eq!(report.alerts_created, 25);
    assert_eq!(h.store.alerts().await.len(), 25);
    let sent = h.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].text.contains("20. "));
    assert!(!sent[0].text.contains("21. "));
}

#[tokio::test]
async fn email_lists_best_matches_first() {
    let h = harness(registry_of(vec![StubProvider::ok(
        "remotive",
        vec![
            job("Rust developer", "https://jobs.example/1"),
            job("Rust and Tokio engineer", "https://jobs.example/2"),
        ],
    )]));
    h.store.add_profile("u1", Some("me@example.com")).await;
    h.store.add_watcher(jobs_watcher("w1", "u1", &["rust", "tokio"])).await;

    h.runner.run_at(RunOptions::default(), morning()).await;

    let text = &h.mailer.sent()[0].text;
    assert!(text.contains("1. Rust and Tokio engineer"));
    assert!(text.contains("2. Rust developer"));
}
