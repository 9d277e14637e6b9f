// src/ingest/providers/serpapi.rs
//! SerpApi-backed Google engines (Jobs, Shopping, News). One provider type,
//! parameterised by engine; each engine registers under its own id.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::ingest::http::{url_with_params, HttpFetcher};
use crate::ingest::matching::apply_keyword_filter;
use crate::ingest::providers::job_boards::finish_job_items;
use crate::ingest::types::{Provider, ProviderOutcome, ProviderQuery};
use crate::model::{filter_str, CandidateItem};

const SEARCH_URL: &str = "https://serpapi.com/search.json";
const ENV_API_KEY: &str = "SERPAPI_API_KEY";
const MAX_SHOPPING_RESULTS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerpEngine {
    GoogleJobs,
    GoogleShopping,
    GoogleNews,
}

impl SerpEngine {
    pub const ALL: [SerpEngine; 3] = [
        SerpEngine::GoogleJobs,
        SerpEngine::GoogleShopping,
        SerpEngine::GoogleNews,
    ];

    /// Engine name as used by SerpApi and by the `serpapiEngine` filter hint.
    pub fn engine_name(&self) -> &'static str {
        match self {
            SerpEngine::GoogleJobs => "google_jobs",
            SerpEngine::GoogleShopping => "google_shopping",
            SerpEngine::GoogleNews => "google_news",
        }
    }

    pub fn provider_id(&self) -> &'static str {
        match self {
            SerpEngine::GoogleJobs => "serpapi_google_jobs",
            SerpEngine::GoogleShopping => "serpapi_google_shopping",
            SerpEngine::GoogleNews => "serpapi_google_news",
        }
    }

    pub fn from_engine_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.engine_name() == name.trim())
    }

    fn label(&self) -> &'static str {
        match self {
            SerpEngine::GoogleJobs => "Google Jobs (SerpApi)",
            SerpEngine::GoogleShopping => "Google Shopping (SerpApi)",
            SerpEngine::GoogleNews => "Google News (SerpApi)",
        }
    }

    fn default_query(&self) -> &'static str {
        match self {
            SerpEngine::GoogleJobs => "software engineer",
            SerpEngine::GoogleShopping => "used scooter",
            SerpEngine::GoogleNews => "technology news",
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SerpResponse {
    #[serde(default)]
    jobs_results: Vec<JobResult>,
    #[serde(default)]
    shopping_results: Vec<ShoppingResult>,
    #[serde(default)]
    news_results: Vec<NewsResult>,
}

#[derive(Debug, Deserialize)]
struct Link {
    #[serde(default)]
    link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JobResult {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    company_name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    related_links: Vec<Link>,
    #[serde(default)]
    apply_options: Vec<Link>,
    #[serde(default)]
    share_link: Option<String>,
}

impl JobResult {
    fn resolve_url(&self) -> Option<String> {
        self.apply_options
            .first()
            .and_then(|l| l.link.clone())
            .or_else(|| self.related_links.first().and_then(|l| l.link.clone()))
            .or_else(|| self.share_link.clone())
            .filter(|u| !u.is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct ShoppingResult {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    product_link: Option<String>,
    #[serde(default)]
    serpapi_product_api: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    price: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NewsResult {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    snippet: Option<String>,
    #[serde(default)]
    source: Option<Value>,
}

fn is_http_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Depth-first search for the first http(s) string inside a JSON document.
fn find_first_url(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if is_http_url(s) => Some(s.clone()),
        Value::Array(arr) => arr.iter().find_map(find_first_url),
        Value::Object(map) => map.values().find_map(find_first_url),
        _ => None,
    }
}

fn or_default(s: Option<String>, fallback: &str) -> String {
    s.filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

pub struct SerpApiProvider {
    engine: SerpEngine,
    http: HttpFetcher,
    api_key: Option<String>,
}

impl SerpApiProvider {
    pub fn new(engine: SerpEngine, http: HttpFetcher) -> Self {
        let api_key = std::env::var(ENV_API_KEY).ok().filter(|k| !k.trim().is_empty());
        Self {
            engine,
            http,
            api_key,
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    fn base_query(&self, query: &ProviderQuery) -> String {
        if let Some(q) = filter_str(&query.filters, "serpapiQuery") {
            return q.to_string();
        }
        if query.keywords.is_empty() {
            self.engine.default_query().to_string()
        } else {
            query.keywords.join(" ")
        }
    }

    fn location(query: &ProviderQuery) -> Option<&str> {
        filter_str(&query.filters, "serpapiLocation").or_else(|| filter_str(&query.filters, "location"))
    }

    fn search_url(&self, query: &ProviderQuery) -> Result<String> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow!("Missing required environment variable: {ENV_API_KEY}"))?;
        let mut q = self.base_query(query);
        let mut params = vec![("engine", self.engine.engine_name())];
        let location = Self::location(query);
        match (self.engine, location) {
            // Shopping has no location parameter; fold it into the query text.
            (SerpEngine::GoogleShopping, Some(loc)) => q = format!("{q} {loc}"),
            (SerpEngine::GoogleJobs, Some(loc)) => params.push(("location", loc)),
            _ => {}
        }
        params.push(("q", q.as_str()));
        params.push(("api_key", key));
        url_with_params(SEARCH_URL, &params)
    }

    async fn fetch(&self, query: &ProviderQuery) -> Result<Vec<CandidateItem>> {
        let url = self.search_url(query)?;
        let resp: SerpResponse = self.http.get_json(&url).await?;
        match self.engine {
            SerpEngine::GoogleJobs => Ok(self.map_jobs(resp.jobs_results, query)),
            SerpEngine::GoogleShopping => Ok(self.map_shopping(resp.shopping_results, query).await),
            SerpEngine::GoogleNews => Ok(self.map_news(resp.news_results, query)),
        }
    }

    fn map_jobs(&self, results: Vec<JobResult>, query: &ProviderQuery) -> Vec<CandidateItem> {
        let raw = results
            .into_iter()
            .map(|j| {
                let url = j.resolve_url();
                CandidateItem {
                    title: or_default(j.title, "Job opening"),
                    description: j
                        .description
                        .filter(|d| !d.is_empty())
                        .or(j.company_name)
                        .or_else(|| Some(String::new())),
                    url,
                    matched_keywords: None,
                }
            })
            .collect();
        finish_job_items(raw, query)
    }

    async fn resolve_shopping_link(&self, r: &ShoppingResult) -> Option<String> {
        if let Some(l) = r.link.as_deref().filter(|l| is_http_url(l)) {
            return Some(l.to_string());
        }
        if let Some(l) = r.product_link.as_deref().filter(|l| is_http_url(l)) {
            return Some(l.to_string());
        }
        let api = r.serpapi_product_api.as_deref().filter(|l| is_http_url(l))?;
        match self.http.get_json::<Value>(api).await {
            Ok(doc) => find_first_url(&doc),
            Err(e) => {
                tracing::debug!(target: "providers", error = %e, "product link lookup failed");
                None
            }
        }
    }

    async fn map_shopping(&self, results: Vec<ShoppingResult>, query: &ProviderQuery) -> Vec<CandidateItem> {
        let mut raw = Vec::new();
        for r in results.iter().take(MAX_SHOPPING_RESULTS) {
            // Listings without a resolvable link cannot be acted on; drop them.
            let Some(url) = self.resolve_shopping_link(r).await else {
                continue;
            };
            let description = r
                .price
                .as_deref()
                .map(|p| format!("{} · {}", p, r.source.as_deref().unwrap_or_default()));
            raw.push(CandidateItem {
                title: or_default(r.title.clone(), "Shopping result"),
                description: description.or_else(|| Some(String::new())),
                url: Some(url),
                matched_keywords: None,
            });
        }
        apply_keyword_filter(raw, &query.keywords, &query.filters)
    }

    fn map_news(&self, results: Vec<NewsResult>, query: &ProviderQuery) -> Vec<CandidateItem> {
        let raw = results
            .into_iter()
            .map(|n| {
                // `source` is a string on older responses and an object on newer ones.
                let source = match n.source {
                    Some(Value::String(s)) => Some(s),
                    Some(Value::Object(o)) => o.get("name").and_then(Value::as_str).map(str::to_string),
                    _ => None,
                };
                CandidateItem {
                    title: or_default(n.title, "News result"),
                    description: n
                        .snippet
                        .filter(|s| !s.is_empty())
                        .or(source)
                        .or_else(|| Some(String::new())),
                    url: n.link.filter(|l| !l.is_empty()),
                    matched_keywords: None,
                }
            })
            .collect();
        apply_keyword_filter(raw, &query.keywords, &query.filters)
    }

    fn ok_message(&self) -> String {
        match self.engine {
            SerpEngine::GoogleJobs => "Fetched Google Jobs via SerpApi",
            SerpEngine::GoogleShopping => "Fetched Google Shopping via SerpApi",
            SerpEngine::GoogleNews => "Fetched Google News via SerpApi",
        }
        .to_string()
    }
}

#[async_trait]
impl Provider for SerpApiProvider {
    fn id(&self) -> &'static str {
        self.engine.provider_id()
    }
    fn label(&self) -> &'static str {
        self.engine.label()
    }
    async fn run(&self, query: &ProviderQuery) -> ProviderOutcome {
        let msg = self.ok_message();
        ProviderOutcome::from_result(self.id(), &msg, self.fetch(query).await)
    }
}
