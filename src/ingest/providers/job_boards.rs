// src/ingest/providers/job_boards.rs
//! Keyless public job boards: Remotive, Remote OK, Arbeitnow.

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;

use crate::ingest::http::{url_with_params, HttpFetcher};
use crate::ingest::matching::{apply_keyword_filter, passes_location_filter};
use crate::ingest::types::{Provider, ProviderOutcome, ProviderQuery};
use crate::model::CandidateItem;

/// Location filter first, then keyword matching.
pub(crate) fn finish_job_items(raw: Vec<CandidateItem>, query: &ProviderQuery) -> Vec<CandidateItem> {
    let located = raw
        .into_iter()
        .filter(|it| passes_location_filter(&it.title, it.description.as_deref(), &query.filters))
        .collect();
    apply_keyword_filter(located, &query.keywords, &query.filters)
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|v| !v.trim().is_empty())
}

// ---------------- Remotive ----------------

#[derive(Debug, Deserialize)]
struct RemotiveResponse {
    #[serde(default)]
    jobs: Vec<RemotiveJob>,
}

#[derive(Debug, Deserialize)]
struct RemotiveJob {
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

pub struct RemotiveProvider {
    http: HttpFetcher,
}

impl RemotiveProvider {
    pub const ID: &'static str = "remotive";

    pub fn new(http: HttpFetcher) -> Self {
        Self { http }
    }

    // Remotive only supports a single search term; use the first keyword.
    fn search_url(keywords: &[String]) -> Result<String> {
        let base = "https://remotive.com/api/remote-jobs";
        match keywords.first().map(|k| k.trim()).filter(|k| !k.is_empty()) {
            Some(term) => url_with_params(base, &[("search", term)]),
            None => Ok(base.to_string()),
        }
    }

    async fn fetch(&self, query: &ProviderQuery) -> Result<Vec<CandidateItem>> {
        let url = Self::search_url(&query.keywords)?;
        let resp: RemotiveResponse = self.http.get_json(&url).await?;
        let raw = resp
            .jobs
            .into_iter()
            .map(|j| CandidateItem {
                title: j.title,
                description: j.description,
                url: non_empty(j.url),
                matched_keywords: None,
            })
            .collect();
        Ok(finish_job_items(raw, query))
    }
}

#[async_trait]
impl Provider for RemotiveProvider {
    fn id(&self) -> &'static str {
        Self::ID
    }
    fn label(&self) -> &'static str {
        "Remotive"
    }
    fn requires_api(&self) -> bool {
        false
    }
    async fn run(&self, query: &ProviderQuery) -> ProviderOutcome {
        ProviderOutcome::from_result(Self::ID, "Fetched Remotive jobs", self.fetch(query).await)
    }
}

// ---------------- Remote OK ----------------

#[derive(Debug, Deserialize)]
struct RemoteOkJob {
    #[serde(default)]
    position: Option<String>,
    #[serde(default)]
    company: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

pub struct RemoteOkProvider {
    http: HttpFetcher,
}

impl RemoteOkProvider {
    pub const ID: &'static str = "remoteok";

    pub fn new(http: HttpFetcher) -> Self {
        Self { http }
    }

    async fn fetch(&self, query: &ProviderQuery) -> Result<Vec<CandidateItem>> {
        let rows: Vec<serde_json::Value> = self.http.get_json("https://remoteok.com/api").await?;
        // The first array element is a legal notice, not a job.
        let raw = rows
            .into_iter()
            .skip(1)
            .filter_map(|v| serde_json::from_value::<RemoteOkJob>(v).ok())
            .map(|j| CandidateItem {
                title: non_empty(j.position)
                    .or_else(|| non_empty(j.company))
                    .unwrap_or_else(|| "Remote role".to_string()),
                description: j.description,
                url: non_empty(j.url),
                matched_keywords: None,
            })
            .collect();
        Ok(finish_job_items(raw, query))
    }
}

#[async_trait]
impl Provider for RemoteOkProvider {
    fn id(&self) -> &'static str {
        Self::ID
    }
    fn label(&self) -> &'static str {
        "Remote OK"
    }
    fn requires_api(&self) -> bool {
        false
    }
    async fn run(&self, query: &ProviderQuery) -> ProviderOutcome {
        ProviderOutcome::from_result(Self::ID, "Fetched Remote OK jobs", self.fetch(query).await)
    }
}

// ---------------- Arbeitnow ----------------

#[derive(Debug, Deserialize)]
struct ArbeitnowResponse {
    #[serde(default)]
    data: Vec<ArbeitnowJob>,
}

#[derive(Debug, Deserialize)]
struct ArbeitnowJob {
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

pub struct ArbeitnowProvider {
    http: HttpFetcher,
}

impl ArbeitnowProvider {
    pub const ID: &'static str = "arbeitnow";

    pub fn new(http: HttpFetcher) -> Self {
        Self { http }
    }

    async fn fetch(&self, query: &ProviderQuery) -> Result<Vec<CandidateItem>> {
        let resp: ArbeitnowResponse = self
            .http
            .get_json("https://www.arbeitnow.com/api/job-board-api")
            .await?;
        let raw = resp
            .data
            .into_iter()
            .map(|j| CandidateItem {
                title: j.title,
                description: j.description,
                url: non_empty(j.url),
                matched_keywords: None,
            })
            .collect();
        Ok(finish_job_items(raw, query))
    }
}

#[async_trait]
impl Provider for ArbeitnowProvider {
    fn id(&self) -> &'static str {
        Self::ID
    }
    fn label(&self) -> &'static str {
        "Arbeitnow"
    }
    fn requires_api(&self) -> bool {
        false
    }
    async fn run(&self, query: &ProviderQuery) -> ProviderOutcome {
        ProviderOutcome::from_result(Self::ID, "Fetched Arbeitnow jobs", self.fetch(query).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn remotive_uses_first_keyword_only() {
        let url = RemotiveProvider::search_url(&["rust dev".into(), "tokio".into()]).unwrap();
        assert_eq!(url, "https://remotive.com/api/remote-jobs?search=rust+dev");
        let bare = RemotiveProvider::search_url(&[]).unwrap();
        assert_eq!(bare, "https://remotive.com/api/remote-jobs");
    }

    #[test]
    fn finish_applies_location_then_keywords() {
        let q = ProviderQuery::new(
            vec!["rust".into()],
            json!({ "location": "berlin" }).as_object().unwrap().clone(),
        );
        let raw = vec![
            CandidateItem::titled("Rust dev Berlin"),
            CandidateItem::titled("Rust dev Paris"),
            CandidateItem::titled("Go dev Berlin"),
        ];
        let out = finish_job_items(raw, &q);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].title, "Rust dev Berlin");
    }
}
