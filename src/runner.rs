// src/runner.rs
//! One pass over all watchers: poll due ones, store and notify net-new items,
//! then send daily digests when it is digest time.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use serde::Serialize;

use crate::config::RunnerConfig;
use crate::digest::{is_digest_time, DigestAggregator};
use crate::due::is_due;
use crate::ingest::dedup::dedupe;
use crate::ingest::rank::{top_n, MAX_NOTIFICATION_ITEMS};
use crate::ingest::sources::select_sources;
use crate::ingest::{fan_out, ProviderQuery, ProviderRegistry, ProviderTrace};
use crate::model::{NewAlert, Watcher};
use crate::notify::router::{compose, should_send_immediately};
use crate::notify::{DynMailer, NotifyQueue};
use crate::store::DynStore;
use crate::textgen::{synth, TextGen};

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("watcher_runs_total", "Completed runner passes.");
        describe_counter!("watchers_processed_total", "Due watchers fully processed.");
        describe_counter!("alerts_created_total", "Alert rows written.");
        describe_counter!("digests_sent_total", "Daily digest emails sent.");
    });
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Attach per-provider traces to the report.
    pub debug: bool,
    /// Send digests now, over the last 24h, regardless of the hour.
    pub force_digest: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WatcherTrace {
    pub watcher_id: String,
    pub watcher_name: String,
    pub sources: Vec<ProviderTrace>,
}

#[derive(Debug, Default, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub processed: usize,
    pub alerts_created: usize,
    pub digests_sent: usize,
    pub immediate_emails: usize,
    pub failures: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_report: Option<Vec<WatcherTrace>>,
}

enum WatcherOutcome {
    /// Owner has no email; watcher untouched.
    Skipped,
    Processed {
        alerts_created: usize,
        failures: usize,
        trace: WatcherTrace,
    },
}

pub struct Runner {
    store: DynStore,
    registry: ProviderRegistry,
    textgen: TextGen,
    mailer: DynMailer,
    cfg: RunnerConfig,
}

impl Runner {
    pub fn new(
        store: DynStore,
        registry: ProviderRegistry,
        textgen: TextGen,
        mailer: DynMailer,
        cfg: RunnerConfig,
    ) -> Self {
        Self {
            store,
            registry,
            textgen,
            mailer,
            cfg,
        }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.cfg
    }

    pub fn store(&self) -> &DynStore {
        &self.store
    }

    pub async fn run(&self, opts: RunOptions) -> RunReport {
        self.run_at(opts, Utc::now()).await
    }

    /// Full pass with an explicit clock. Never fails: problems are counted in `failures`.
    pub async fn run_at(&self, opts: RunOptions, now: DateTime<Utc>) -> RunReport {
        ensure_metrics_described();
        counter!("watcher_runs_total").increment(1);

        let mut report = RunReport {
            debug_report: opts.debug.then(Vec::new),
            ..RunReport::default()
        };

        let watchers = match self.store.list_active_watchers().await {
            Ok(w) => w,
            Err(e) => {
                tracing::error!(target: "runner", error = %e, "loading watchers failed");
                report.failures = 1;
                return report;
            }
        };

        let mut per_user: HashMap<&str, usize> = HashMap::new();
        for w in &watchers {
            *per_user.entry(w.user_id.as_str()).or_default() += 1;
        }

        let queue = NotifyQueue::spawn(self.mailer.clone(), self.cfg.notify_queue_capacity);
        for w in &watchers {
            if !is_due(w.last_checked_at, w.notification_interval_minutes, now) {
                continue;
            }
            let siblings = per_user.get(w.user_id.as_str()).copied().unwrap_or(0);
            match self.process_watcher(w, siblings, now, &queue).await {
                Ok(WatcherOutcome::Skipped) => {}
                Ok(WatcherOutcome::Processed {
                    alerts_created,
                    failures,
                    trace,
                }) => {
                    report.processed += 1;
                    report.alerts_created += alerts_created;
                    report.failures += failures;
                    if let Some(d) = report.debug_report.as_mut() {
                        d.push(trace);
                    }
                }
                Err(e) => {
                    report.failures += 1;
                    tracing::warn!(target: "runner", watcher_id = %w.id, error = %e, "watcher failed");
                }
            }
        }
        let sent = queue.finish().await;
        report.immediate_emails = sent.sent;
        report.failures += sent.failed;

        if opts.force_digest
            || is_digest_time(now, self.cfg.digest_hour, self.cfg.digest_utc_offset_minutes)
        {
            let mut users: Vec<String> = Vec::new();
            for w in &watchers {
                if !users.contains(&w.user_id) {
                    users.push(w.user_id.clone());
                }
            }
            let digest = DigestAggregator {
                store: &self.store,
                textgen: &self.textgen,
                mailer: &self.mailer,
                utc_offset_minutes: self.cfg.digest_utc_offset_minutes,
            }
            .run(&users, now, opts.force_digest)
            .await;
            report.digests_sent = digest.sent;
            report.failures += digest.failures;
        }

        counter!("watchers_processed_total").increment(report.processed as u64);
        counter!("alerts_created_total").increment(report.alerts_created as u64);
        tracing::info!(
            target: "runner",
            processed = report.processed,
            alerts_created = report.alerts_created,
            digests_sent = report.digests_sent,
            immediate_emails = report.immediate_emails,
            failures = report.failures,
            "run finished"
        );
        report
    }

    async fn process_watcher(
        &self,
        w: &Watcher,
        siblings: usize,
        now: DateTime<Utc>,
        queue: &NotifyQueue,
    ) -> anyhow::Result<WatcherOutcome> {
        let profile = self.store.get_profile(&w.user_id).await?;
        let Some(email) = profile
            .and_then(|p| p.email)
            .filter(|e| !e.trim().is_empty())
        else {
            tracing::debug!(target: "runner", watcher_id = %w.id, "owner has no email; skipping");
            return Ok(WatcherOutcome::Skipped);
        };

        let mut filters = w.filters.clone();
        if let Some(plan) = synth::search_plan(&self.textgen, w).await {
            tracing::debug!(target: "runner", watcher_id = %w.id, engine = plan.engine.engine_name(), "search plan applied");
            plan.apply(&mut filters);
        }

        let ids = select_sources(w.category, &filters, &self.registry);
        let fan = fan_out(
            &self.registry,
            &ids,
            ProviderQuery::new(w.keywords.clone(), filters),
            self.cfg.provider_timeout(),
        )
        .await;
        let trace = WatcherTrace {
            watcher_id: w.id.clone(),
            watcher_name: w.name.clone(),
            sources: fan.traces,
        };

        let existing = self.store.list_alert_urls(&w.id).await?;
        let fresh = dedupe(fan.items, &existing);

        let mut alerts_created = 0;
        let mut failures = 0;
        if !fresh.is_empty() {
            let rows: Vec<NewAlert> = fresh.iter().map(|i| i.to_new_alert(w)).collect();
            match self.store.insert_alerts(&rows, now).await {
                Ok(n) => alerts_created = n,
                Err(e) => {
                    failures += 1;
                    tracing::warn!(target: "runner", watcher_id = %w.id, error = %e, "alert insert failed");
                }
            }

            let ranked = top_n(&fresh, MAX_NOTIFICATION_ITEMS);
            if should_send_immediately(siblings) {
                let message = compose(&self.textgen, w, &ranked, &email).await;
                if let Err(e) = queue.enqueue(message).await {
                    failures += 1;
                    tracing::warn!(target: "runner", watcher_id = %w.id, error = %e, "could not queue email");
                }
            } else {
                tracing::debug!(target: "runner", watcher_id = %w.id, siblings, "held for digest");
            }
        }

        if let Err(e) = self.store.touch_watcher(&w.id, now).await {
            failures += 1;
            tracing::warn!(target: "runner", watcher_id = %w.id, error = %e, "could not update last_checked_at");
        }

        tracing::info!(
            target: "runner",
            watcher_id = %w.id,
            sources = ids.len(),
            new_items = fresh.len(),
            alerts_created,
            "watcher processed"
        );
        Ok(WatcherOutcome::Processed {
            alerts_created,
            failures,
            trace,
        })
    }
}
