// src/ingest/matching.rs
//! Keyword and location matching shared by providers and the fan-out stage.

use crate::model::{filter_bool, filter_str, CandidateItem, Filters};

/// Filter key that turns keyword matching off for a watcher.
pub const IGNORE_KEYWORD_FILTER: &str = "ignoreKeywordFilter";

fn haystack(title: &str, description: Option<&str>) -> String {
    format!("{}\n{}", title, description.unwrap_or_default()).to_lowercase()
}

/// Keywords (original casing, original order) found in title or description.
pub fn match_keywords(title: &str, description: Option<&str>, keywords: &[String]) -> Vec<String> {
    if keywords.is_empty() {
        return Vec::new();
    }
    let hay = haystack(title, description);
    keywords
        .iter()
        .filter(|k| {
            let k = k.trim();
            !k.is_empty() && hay.contains(&k.to_lowercase())
        })
        .cloned()
        .collect()
}

/// Keyword filtering is off when there are no keywords or the watcher opts out.
pub fn keyword_filter_disabled(filters: &Filters, keywords: &[String]) -> bool {
    keywords.is_empty() || filter_bool(filters, IGNORE_KEYWORD_FILTER)
}

/// `filters.location` must appear in title or description when set.
pub fn passes_location_filter(title: &str, description: Option<&str>, filters: &Filters) -> bool {
    match filter_str(filters, "location") {
        None => true,
        Some(loc) => haystack(title, description).contains(&loc.to_lowercase()),
    }
}

/// Fill in `matched_keywords` where the provider did not, then drop items without
/// any match when filtering is enabled. Pre-set match lists are trusted as-is.
pub fn apply_keyword_filter(
    items: Vec<CandidateItem>,
    keywords: &[String],
    filters: &Filters,
) -> Vec<CandidateItem> {
    let disabled = keyword_filter_disabled(filters, keywords);
    items
        .into_iter()
        .filter_map(|mut item| {
            if item.matched_keywords.is_none() {
                let matched = if disabled {
                    keywords.to_vec()
                } else {
                    match_keywords(&item.title, item.description.as_deref(), keywords)
                };
                if !disabled && matched.is_empty() {
                    return None;
                }
                item.matched_keywords = Some(matched);
            }
            Some(item)
        })
        .collect()
}
