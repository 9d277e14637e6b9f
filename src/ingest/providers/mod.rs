// src/ingest/providers/mod.rs
pub mod finnhub;
pub mod job_boards;
pub mod reddit;
pub mod serpapi;

use async_trait::async_trait;

use crate::ingest::types::{Provider, ProviderOutcome, ProviderQuery};

/// Catalog entry for a source that has no integration yet. Always reports `ok=false`.
pub struct UnconfiguredProvider {
    id: &'static str,
    label: &'static str,
}

impl UnconfiguredProvider {
    pub const fn new(id: &'static str, label: &'static str) -> Self {
        Self { id, label }
    }
}

#[async_trait]
impl Provider for UnconfiguredProvider {
    fn id(&self) -> &'static str {
        self.id
    }
    fn label(&self) -> &'static str {
        self.label
    }
    async fn run(&self, _query: &ProviderQuery) -> ProviderOutcome {
        ProviderOutcome::failed(self.id, "Provider API not configured")
    }
}
