#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use watcher_alerts::config::RunnerConfig;
use watcher_alerts::ingest::{Provider, ProviderOutcome, ProviderQuery, ProviderRegistry};
use watcher_alerts::model::{CandidateItem, Category, Watcher};
use watcher_alerts::notify::{Mailer, OutgoingEmail};
use watcher_alerts::store::MemoryStore;
use watcher_alerts::textgen::TextGen;
use watcher_alerts::Runner;

/// Canned provider: fixed items, optional failure and delay, counts calls.
pub struct StubProvider {
    pub id: &'static str,
    pub items: Vec<CandidateItem>,
    pub ok: bool,
    pub delay: Option<Duration>,
    pub calls: AtomicUsize,
}

impl StubProvider {
    pub fn ok(id: &'static str, items: Vec<CandidateItem>) -> Self {
        Self {
            id,
            items,
            ok: true,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(id: &'static str) -> Self {
        Self {
            ok: false,
            ..Self::ok(id, vec![])
        }
    }

    pub fn slow(id: &'static str, delay: Duration, items: Vec<CandidateItem>) -> Self {
        Self {
            delay: Some(delay),
            ..Self::ok(id, items)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for StubProvider {
    fn id(&self) -> &'static str {
        self.id
    }
    fn label(&self) -> &'static str {
        self.id
    }
    fn requires_api(&self) -> bool {
        false
    }
    async fn run(&self, _query: &ProviderQuery) -> ProviderOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }
        if self.ok {
            ProviderOutcome::fetched(self.id, "ok", self.items.clone())
        } else {
            ProviderOutcome::failed(self.id, "upstream 503")
        }
    }
}

/// Mailer that remembers every email; recipients starting with `reject` fail.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<OutgoingEmail>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &OutgoingEmail) -> anyhow::Result<()> {
        if email.to.starts_with("reject") {
            anyhow::bail!("mailbox unavailable");
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
    fn name(&self) -> &'static str {
        "recording"
    }
}

/// 04:00 at the default -08:00 digest offset: not digest time.
pub fn morning() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
}

/// 09:15 at -08:00: digest time.
pub fn digest_hour() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 19, 17, 15, 0).unwrap()
}

pub fn job(title: &str, url: &str) -> CandidateItem {
    CandidateItem::titled(title).with_url(url)
}

pub fn jobs_watcher(id: &str, user: &str, keywords: &[&str]) -> Watcher {
    Watcher::new(
        id,
        user,
        format!("Watcher {id}"),
        Category::Jobs,
        keywords.iter().map(|k| k.to_string()).collect(),
    )
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<RecordingMailer>,
    pub runner: Runner,
}

pub fn harness(registry: ProviderRegistry) -> Harness {
    harness_with(registry, RunnerConfig::default())
}

pub fn harness_with(registry: ProviderRegistry, cfg: RunnerConfig) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let mailer = Arc::new(RecordingMailer::default());
    let runner = Runner::new(
        store.clone(),
        registry,
        TextGen::disabled(),
        mailer.clone(),
        cfg,
    );
    Harness {
        store,
        mailer,
        runner,
    }
}

pub fn registry_of(providers: Vec<StubProvider>) -> ProviderRegistry {
    let mut reg = ProviderRegistry::new();
    for p in providers {
        reg.register(p);
    }
    reg
}
