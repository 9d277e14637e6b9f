// src/model.rs
//! Records shared by the pipeline: watchers, provider items, alerts and profiles.

use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default polling interval for a watcher (once a day).
pub const DEFAULT_INTERVAL_MINUTES: i64 = 1440;

/// Category-specific filter bag attached to a watcher (free-form JSON object).
pub type Filters = serde_json::Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Jobs,
    Shopping,
    RealEstate,
    Stocks,
    SocialMedia,
    News,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Jobs => "jobs",
            Category::Shopping => "shopping",
            Category::RealEstate => "real_estate",
            Category::Stocks => "stocks",
            Category::SocialMedia => "social_media",
            Category::News => "news",
        }
    }

    /// Noun used for a single item in notification bodies.
    pub fn item_label(&self) -> &'static str {
        match self {
            Category::Shopping | Category::RealEstate => "Listing",
            Category::Stocks => "Stock",
            Category::News => "Article",
            Category::Jobs | Category::SocialMedia => "Job",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jobs" => Ok(Category::Jobs),
            "shopping" => Ok(Category::Shopping),
            "real_estate" => Ok(Category::RealEstate),
            "stocks" => Ok(Category::Stocks),
            "social_media" => Ok(Category::SocialMedia),
            "news" => Ok(Category::News),
            other => Err(anyhow!("unknown watcher category: {other}")),
        }
    }
}

fn default_interval() -> i64 {
    DEFAULT_INTERVAL_MINUTES
}

fn default_true() -> bool {
    true
}

/// Nullable column → field default.
fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Watcher {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub category: Category,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub filters: Filters,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default = "default_true")]
    pub notification_email: bool,
    #[serde(default = "default_interval")]
    pub notification_interval_minutes: i64,
    #[serde(default)]
    pub last_checked_at: Option<DateTime<Utc>>,
}

impl Watcher {
    /// Active watcher with email notifications on, never checked, default interval.
    pub fn new(
        id: impl Into<String>,
        user_id: impl Into<String>,
        name: impl Into<String>,
        category: Category,
        keywords: Vec<String>,
    ) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            name: name.into(),
            category,
            keywords,
            filters: Filters::new(),
            is_active: true,
            notification_email: true,
            notification_interval_minutes: DEFAULT_INTERVAL_MINUTES,
            last_checked_at: None,
        }
    }
}

/// Raw provider output. Identity for dedup is `url`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CandidateItem {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_keywords: Option<Vec<String>>,
}

impl CandidateItem {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_matches(mut self, matched: Vec<String>) -> Self {
        self.matched_keywords = Some(matched);
        self
    }
}

/// Candidate tagged with the provider it came from; keyword matches resolved.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SourcedItem {
    pub source: String,
    pub title: String,
    pub description: Option<String>,
    pub url: Option<String>,
    pub matched_keywords: Vec<String>,
}

impl SourcedItem {
    pub fn to_new_alert(&self, watcher: &Watcher) -> NewAlert {
        NewAlert {
            watcher_id: watcher.id.clone(),
            user_id: watcher.user_id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            url: self.url.clone(),
            source: self.source.clone(),
            matched_keywords: self.matched_keywords.clone(),
        }
    }
}

/// Alert row before the store assigns id / timestamps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewAlert {
    pub watcher_id: String,
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub url: Option<String>,
    pub source: String,
    pub matched_keywords: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Alert {
    pub id: String,
    pub watcher_id: String,
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub source: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub matched_keywords: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub last_digest_sent_at: Option<DateTime<Utc>>,
}

// ---- filter bag accessors ----

pub fn filter_str<'a>(filters: &'a Filters, key: &str) -> Option<&'a str> {
    filters
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

pub fn filter_bool(filters: &Filters, key: &str) -> bool {
    filters.get(key).and_then(Value::as_bool).unwrap_or(false)
}

pub fn filter_f64(filters: &Filters, key: &str) -> Option<f64> {
    filters.get(key).and_then(Value::as_f64)
}

/// String list under `key`; non-string entries and blanks are skipped.
pub fn filter_str_list(filters: &Filters, key: &str) -> Vec<String> {
    filters
        .get(key)
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
