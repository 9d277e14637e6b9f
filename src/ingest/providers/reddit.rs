// src/ingest/providers/reddit.rs
//! Reddit public JSON search (no auth needed for basic search).
//!
//! Filters:
//! - `subreddits` (string list, default `["all"]`)
//! - `timeFilter` hour|day|week|month|year|all (default `day`)
//! - `sort` relevance|hot|new|top|comments (default `new`)
//! - `minScore` minimum upvotes (default 0)

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;

use crate::ingest::http::{url_with_params, HttpFetcher};
use crate::ingest::matching::apply_keyword_filter;
use crate::ingest::types::{Provider, ProviderOutcome, ProviderQuery};
use crate::model::{filter_f64, filter_str, filter_str_list, CandidateItem};

#[derive(Debug, Default, Deserialize)]
struct Listing {
    #[serde(default)]
    data: ListingData,
}

#[derive(Debug, Default, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: Post,
}

#[derive(Debug, Deserialize)]
struct Post {
    #[serde(default)]
    title: String,
    #[serde(default)]
    selftext: Option<String>,
    #[serde(default)]
    subreddit: Option<String>,
    #[serde(default)]
    permalink: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    num_comments: i64,
}

pub struct RedditProvider {
    http: HttpFetcher,
}

impl RedditProvider {
    pub const ID: &'static str = "reddit";

    pub fn new(http: HttpFetcher) -> Self {
        Self { http }
    }

    fn listing_url(subreddit: &str, query: &ProviderQuery) -> Result<String> {
        let time = filter_str(&query.filters, "timeFilter").unwrap_or("day");
        let sort = filter_str(&query.filters, "sort").unwrap_or("new");
        let q = query.keywords.join(" OR ");
        if q.trim().is_empty() {
            url_with_params(
                &format!("https://www.reddit.com/r/{subreddit}/{sort}.json"),
                &[("t", time), ("limit", "25"), ("raw_json", "1")],
            )
        } else {
            url_with_params(
                &format!("https://www.reddit.com/r/{subreddit}/search.json"),
                &[
                    ("q", q.as_str()),
                    ("t", time),
                    ("sort", sort),
                    ("limit", "25"),
                    ("raw_json", "1"),
                ],
            )
        }
    }

    fn post_to_item(p: Post) -> CandidateItem {
        let description = match p.selftext.filter(|s| !s.is_empty()) {
            Some(text) => format!("{}...", text.chars().take(200).collect::<String>()),
            None => format!(
                "r/{} • {} points • {} comments",
                p.subreddit.unwrap_or_default(),
                p.score,
                p.num_comments
            ),
        };
        let url = p
            .permalink
            .filter(|s| !s.is_empty())
            .map(|pl| format!("https://www.reddit.com{pl}"))
            .or(p.url);
        CandidateItem {
            title: if p.title.is_empty() {
                "Untitled post".to_string()
            } else {
                p.title
            },
            description: Some(description),
            url,
            matched_keywords: None,
        }
    }

    async fn fetch(&self, query: &ProviderQuery) -> Result<(Vec<CandidateItem>, Vec<String>)> {
        let mut subreddits = filter_str_list(&query.filters, "subreddits");
        if subreddits.is_empty() {
            subreddits.push("all".to_string());
        }
        let min_score = filter_f64(&query.filters, "minScore").unwrap_or(0.0);

        let mut all = Vec::new();
        for sub in &subreddits {
            let url = Self::listing_url(sub, query)?;
            let listing: Listing = self.http.get_json(&url).await?;
            let raw = listing
                .data
                .children
                .into_iter()
                .map(|c| c.data)
                .filter(|p| p.score as f64 >= min_score)
                .map(Self::post_to_item)
                .collect();
            all.extend(apply_keyword_filter(raw, &query.keywords, &query.filters));
        }
        Ok((all, subreddits))
    }
}

#[async_trait]
impl Provider for RedditProvider {
    fn id(&self) -> &'static str {
        Self::ID
    }
    fn label(&self) -> &'static str {
        "Reddit"
    }
    fn requires_api(&self) -> bool {
        false
    }
    async fn run(&self, query: &ProviderQuery) -> ProviderOutcome {
        match self.fetch(query).await {
            Ok((items, subs)) => ProviderOutcome::fetched(
                Self::ID,
                format!("Fetched posts from r/{}", subs.join(", r/")),
                items,
            ),
            Err(e) => ProviderOutcome::from_result(Self::ID, "", Err(e)),
        }
    }
}
