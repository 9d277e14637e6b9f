// src/ingest/fanout.rs
use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::{counter, histogram};
use serde::Serialize;
use tokio::task::JoinSet;

use crate::ingest::matching::apply_keyword_filter;
use crate::ingest::registry::ProviderRegistry;
use crate::ingest::types::{ProviderOutcome, ProviderQuery};
use crate::model::SourcedItem;

const TRACE_SAMPLE: usize = 3;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TraceSample {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Per-provider diagnostic line for the debug report.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderTrace {
    pub source: String,
    pub ok: bool,
    pub message: String,
    pub item_count: usize,
    pub sample: Vec<TraceSample>,
}

impl ProviderTrace {
    fn from_outcome(o: &ProviderOutcome) -> Self {
        Self {
            source: o.source.clone(),
            ok: o.ok,
            message: o.message.clone(),
            item_count: o.items.len(),
            sample: o
                .items
                .iter()
                .take(TRACE_SAMPLE)
                .map(|it| TraceSample {
                    title: it.title.clone(),
                    url: it.url.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Default)]
pub struct FanOut {
    pub items: Vec<SourcedItem>,
    pub traces: Vec<ProviderTrace>,
}

impl FanOut {
    pub fn failed_providers(&self) -> usize {
        self.traces.iter().filter(|t| !t.ok).count()
    }
}

/// Query every selected provider concurrently, each call bounded by `timeout`.
/// A failing, timed-out or unknown provider contributes no items and a failed
/// trace; it never aborts the others. Output follows selection order.
pub async fn fan_out(
    registry: &ProviderRegistry,
    ids: &[String],
    query: ProviderQuery,
    timeout: Duration,
) -> FanOut {
    crate::ingest::ensure_metrics_described();

    let query = Arc::new(query);
    let mut slots: Vec<Option<ProviderOutcome>> = vec![None; ids.len()];
    let mut set = JoinSet::new();

    for (idx, id) in ids.iter().enumerate() {
        let Some(provider) = registry.get(id) else {
            slots[idx] = Some(ProviderOutcome::failed(id, "Unknown provider"));
            continue;
        };
        let q = Arc::clone(&query);
        set.spawn(async move {
            let t0 = Instant::now();
            let outcome = match tokio::time::timeout(timeout, provider.run(&q)).await {
                Ok(o) => o,
                Err(_) => ProviderOutcome::failed(
                    provider.id(),
                    format!("timed out after {}ms", timeout.as_millis()),
                ),
            };
            histogram!("provider_call_ms", "provider" => provider.id()).record(t0.elapsed().as_secs_f64() * 1_000.0);
            (idx, outcome)
        });
    }

    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((idx, outcome)) => slots[idx] = Some(outcome),
            Err(e) => tracing::error!(target: "providers", error = %e, "provider task aborted"),
        }
    }

    let mut out = FanOut::default();
    for (id, slot) in ids.iter().zip(slots) {
        let outcome = slot.unwrap_or_else(|| ProviderOutcome::failed(id, "provider task aborted"));
        if !outcome.ok {
            counter!("provider_errors_total").increment(1);
            tracing::warn!(target: "providers", provider = %id, message = %outcome.message, "provider returned no results");
        }
        out.traces.push(ProviderTrace::from_outcome(&outcome));

        let source = outcome.source.clone();
        let titled = outcome
            .items
            .into_iter()
            .filter(|it| !it.title.trim().is_empty())
            .collect();
        for it in apply_keyword_filter(titled, &query.keywords, &query.filters) {
            out.items.push(SourcedItem {
                source: source.clone(),
                title: it.title,
                description: it.description,
                url: it.url,
                matched_keywords: it.matched_keywords.unwrap_or_default(),
            });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::Provider;
    use crate::model::CandidateItem;

    struct Fixed(&'static str, Vec<CandidateItem>);

    #[async_trait::async_trait]
    impl Provider for Fixed {
        fn id(&self) -> &'static str {
            self.0
        }
        fn label(&self) -> &'static str {
            self.0
        }
        async fn run(&self, _q: &ProviderQuery) -> ProviderOutcome {
            ProviderOutcome::fetched(self.0, "ok", self.1.clone())
        }
    }

    #[tokio::test]
    async fn blank_titles_dropped_and_items_tagged() {
        let mut reg = ProviderRegistry::new();
        reg.register(Fixed(
            "p1",
            vec![CandidateItem::titled("  "), CandidateItem::titled("Rust job").with_url("u1")],
        ));
        let out = fan_out(
            &reg,
            &["p1".to_string(), "nope".to_string()],
            ProviderQuery::new(vec!["rust".into()], Default::default()),
            Duration::from_secs(1),
        )
        .await;
        assert_eq!(out.items.len(), 1);
        assert_eq!(out.items[0].source, "p1");
        assert_eq!(out.items[0].matched_keywords, vec!["rust".to_string()]);
        assert_eq!(out.traces[1].message, "Unknown provider");
        assert_eq!(out.failed_providers(), 1);
    }
}
