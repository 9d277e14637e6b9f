// src/ingest/sources.rs
//! Which providers to query for a watcher.
//!
//! Both lookup tables live here so the branching stays auditable:
//! - `category_members`: static provider membership per category
//! - `forced_provider`: `serpapiEngine` hint → single provider
//!
//! Order of precedence:
//! 1. forced engine hint (if the mapped provider is registered)
//! 2. explicit `sources` list, else the whole registry
//! 3. restricted to the category's members
//! 4. empty → the category's members from the whole registry

use crate::ingest::providers::serpapi::SerpEngine;
use crate::ingest::registry::ProviderRegistry;
use crate::model::{filter_str, filter_str_list, Category, Filters};

pub const FILTER_SOURCES: &str = "sources";
pub const FILTER_ENGINE: &str = "serpapiEngine";

const JOB_SOURCES: &[&str] = &["serpapi_google_jobs", "remotive", "remoteok", "arbeitnow"];
const SHOPPING_SOURCES: &[&str] = &["serpapi_google_shopping"];
const NEWS_SOURCES: &[&str] = &["serpapi_google_news"];
const STOCK_SOURCES: &[&str] = &["finnhub_stocks"];

/// Static provider membership; `None` means no restriction for the category.
pub fn category_members(category: Category) -> Option<&'static [&'static str]> {
    match category {
        Category::Jobs => Some(JOB_SOURCES),
        Category::Shopping | Category::RealEstate => Some(SHOPPING_SOURCES),
        Category::News => Some(NEWS_SOURCES),
        Category::Stocks => Some(STOCK_SOURCES),
        Category::SocialMedia => None,
    }
}

/// Categories backed by the multi-engine search provider.
pub fn accepts_engine_hint(category: Category) -> bool {
    matches!(
        category,
        Category::Jobs | Category::Shopping | Category::News | Category::RealEstate
    )
}

/// Provider id forced by the `serpapiEngine` filter, if any.
pub fn forced_provider(category: Category, filters: &Filters) -> Option<&'static str> {
    if !accepts_engine_hint(category) {
        return None;
    }
    filter_str(filters, FILTER_ENGINE)
        .and_then(SerpEngine::from_engine_name)
        .map(|e| e.provider_id())
}

fn restrict(category: Category, ids: Vec<String>) -> Vec<String> {
    match category_members(category) {
        Some(members) => ids.into_iter().filter(|id| members.contains(&id.as_str())).collect(),
        None => ids,
    }
}

/// Ordered provider ids to query for a watcher.
pub fn select_sources(category: Category, filters: &Filters, registry: &ProviderRegistry) -> Vec<String> {
    if let Some(id) = forced_provider(category, filters) {
        if registry.contains(id) {
            return vec![id.to_string()];
        }
        tracing::debug!(target: "sources", provider = id, "forced engine not registered; ignoring hint");
    }

    let registry_ids: Vec<String> = registry.ids().into_iter().map(str::to_string).collect();
    let explicit = filter_str_list(filters, FILTER_SOURCES);
    let configured = if explicit.is_empty() {
        registry_ids.clone()
    } else {
        explicit
    };

    let available = restrict(category, configured);
    if !available.is_empty() {
        return available;
    }
    restrict(category, registry_ids)
}
