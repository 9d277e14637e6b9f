// src/ingest/types.rs
use serde::Serialize;

use crate::model::{CandidateItem, Filters};

/// Input handed to every provider call. Owned so calls can run on spawned tasks.
#[derive(Debug, Clone, Default)]
pub struct ProviderQuery {
    pub keywords: Vec<String>,
    pub filters: Filters,
}

impl ProviderQuery {
    pub fn new(keywords: Vec<String>, filters: Filters) -> Self {
        Self { keywords, filters }
    }
}

/// What a provider reports back. Failures are values, never errors.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ProviderOutcome {
    pub source: String,
    pub ok: bool,
    pub message: String,
    pub items: Vec<CandidateItem>,
}

impl ProviderOutcome {
    pub fn fetched(source: &str, message: impl Into<String>, items: Vec<CandidateItem>) -> Self {
        Self {
            source: source.to_string(),
            ok: true,
            message: message.into(),
            items,
        }
    }

    pub fn failed(source: &str, message: impl Into<String>) -> Self {
        Self {
            source: source.to_string(),
            ok: false,
            message: message.into(),
            items: Vec::new(),
        }
    }

    /// Collapse a provider's internal `Result` into an outcome at the boundary.
    pub fn from_result(
        source: &str,
        ok_message: &str,
        res: anyhow::Result<Vec<CandidateItem>>,
    ) -> Self {
        match res {
            Ok(items) => Self::fetched(source, ok_message, items),
            Err(e) => {
                tracing::warn!(target: "providers", provider = source, error = %e, "provider failed");
                Self::failed(source, format!("{e:#}"))
            }
        }
    }
}

/// A pluggable content source.
#[async_trait::async_trait]
pub trait Provider: Send + Sync {
    fn id(&self) -> &'static str;
    fn label(&self) -> &'static str;
    fn requires_api(&self) -> bool {
        true
    }
    async fn run(&self, query: &ProviderQuery) -> ProviderOutcome;
}
