// src/store/postgrest.rs
//! Supabase/PostgREST backend over the `watchers`, `alerts` and `profiles` tables.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::Store;
use crate::ingest::http::url_with_params;
use crate::model::{Alert, Category, Filters, NewAlert, Profile, Watcher, DEFAULT_INTERVAL_MINUTES};

pub struct PostgrestStore {
    http: reqwest::Client,
    base: String,
    key: String,
}

/// Row shape as stored; nullable columns tolerated.
#[derive(Debug, Deserialize)]
struct WatcherRow {
    id: String,
    user_id: String,
    name: String,
    category: String,
    #[serde(default)]
    keywords: Option<Vec<String>>,
    #[serde(default)]
    filters: Option<Value>,
    #[serde(default)]
    is_active: Option<bool>,
    #[serde(default)]
    notification_email: Option<bool>,
    #[serde(default)]
    notification_interval_minutes: Option<i64>,
    #[serde(default)]
    last_checked_at: Option<DateTime<Utc>>,
}

impl WatcherRow {
    fn into_watcher(self) -> Option<Watcher> {
        let category: Category = match self.category.parse() {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(
                    target: "store",
                    watcher_id = %self.id,
                    user_id = %self.user_id,
                    category = %self.category,
                    error = %e,
                    "unknown category; watcher row dropped from this run"
                );
                return None;
            }
        };
        let filters: Filters = match self.filters {
            Some(Value::Object(m)) => m,
            _ => Filters::new(),
        };
        Some(Watcher {
            id: self.id,
            user_id: self.user_id,
            name: self.name,
            category,
            keywords: self.keywords.unwrap_or_default(),
            filters,
            is_active: self.is_active.unwrap_or(true),
            notification_email: self.notification_email.unwrap_or(true),
            notification_interval_minutes: self
                .notification_interval_minutes
                .unwrap_or(DEFAULT_INTERVAL_MINUTES),
            last_checked_at: self.last_checked_at,
        })
    }
}

#[derive(Serialize)]
struct AlertRow<'a> {
    watcher_id: &'a str,
    user_id: &'a str,
    title: &'a str,
    description: Option<&'a str>,
    url: Option<&'a str>,
    source: &'a str,
    matched_keywords: &'a [String],
    created_at: String,
}

/// Microsecond precision, matching `timestamptz`; digest markers depend on it.
fn ts(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl PostgrestStore {
    pub fn new(supabase_url: &str, service_key: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_default();
        Self {
            http,
            base: format!("{}/rest/v1", supabase_url.trim_end_matches('/')),
            key: service_key.into(),
        }
    }

    /// `None` unless SUPABASE_URL and SUPABASE_SERVICE_ROLE_KEY are both set.
    pub fn from_env() -> Option<Self> {
        let url = std::env::var("SUPABASE_URL").ok().filter(|v| !v.trim().is_empty())?;
        let key = std::env::var("SUPABASE_SERVICE_ROLE_KEY")
            .ok()
            .filter(|v| !v.trim().is_empty())?;
        Some(Self::new(&url, key))
    }

    fn table(&self, name: &str, params: &[(&str, &str)]) -> Result<String> {
        let base = format!("{}/{name}", self.base);
        if params.is_empty() {
            return Ok(base);
        }
        url_with_params(&base, params)
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("apikey", &self.key).bearer_auth(&self.key)
    }

    async fn get<T: DeserializeOwned>(&self, url: String) -> Result<T> {
        let resp = self.authed(self.http.get(&url)).send().await.context("postgrest GET")?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("postgrest GET {status}: {body}");
        }
        resp.json().await.context("decoding postgrest rows")
    }

    async fn write(&self, req: reqwest::RequestBuilder, what: &str) -> Result<()> {
        let resp = self
            .authed(req)
            .header("Prefer", "return=minimal")
            .send()
            .await
            .with_context(|| format!("postgrest {what}"))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("postgrest {what} {status}: {body}");
        }
        Ok(())
    }
}

#[async_trait]
impl Store for PostgrestStore {
    async fn list_active_watchers(&self) -> Result<Vec<Watcher>> {
        let url = self.table(
            "watchers",
            &[
                ("select", "*"),
                ("is_active", "eq.true"),
                ("notification_email", "eq.true"),
            ],
        )?;
        let rows: Vec<WatcherRow> = self.get(url).await?;
        Ok(rows.into_iter().filter_map(WatcherRow::into_watcher).collect())
    }

    async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>> {
        let id = format!("eq.{user_id}");
        let url = self.table(
            "profiles",
            &[("select", "id,email,last_digest_sent_at"), ("id", id.as_str())],
        )?;
        let rows: Vec<Profile> = self.get(url).await?;
        Ok(rows.into_iter().next())
    }

    async fn list_alert_urls(&self, watcher_id: &str) -> Result<HashSet<String>> {
        #[derive(Deserialize)]
        struct UrlRow {
            url: Option<String>,
        }
        let id = format!("eq.{watcher_id}");
        let url = self.table(
            "alerts",
            &[("select", "url"), ("watcher_id", id.as_str()), ("url", "not.is.null")],
        )?;
        let rows: Vec<UrlRow> = self.get(url).await?;
        Ok(rows.into_iter().filter_map(|r| r.url).collect())
    }

    async fn insert_alerts(&self, alerts: &[NewAlert], created_at: DateTime<Utc>) -> Result<usize> {
        if alerts.is_empty() {
            return Ok(0);
        }
        let created = ts(created_at);
        let rows: Vec<AlertRow<'_>> = alerts
            .iter()
            .map(|a| AlertRow {
                watcher_id: &a.watcher_id,
                user_id: &a.user_id,
                title: &a.title,
                description: a.description.as_deref(),
                url: a.url.as_deref(),
                source: &a.source,
                matched_keywords: &a.matched_keywords,
                created_at: created.clone(),
            })
            .collect();
        let url = self.table("alerts", &[])?;
        self.write(self.http.post(url).json(&rows), "insert alerts").await?;
        Ok(alerts.len())
    }

    async fn touch_watcher(&self, watcher_id: &str, at: DateTime<Utc>) -> Result<()> {
        let id = format!("eq.{watcher_id}");
        let url = self.table("watchers", &[("id", id.as_str())])?;
        self.write(
            self.http.patch(url).json(&json!({ "last_checked_at": ts(at) })),
            "update watcher",
        )
        .await
    }

    async fn list_alerts_since(&self, user_id: &str, since: DateTime<Utc>) -> Result<Vec<Alert>> {
        let id = format!("eq.{user_id}");
        let gte = format!("gte.{}", ts(since));
        let url = self.table(
            "alerts",
            &[
                ("select", "*"),
                ("user_id", id.as_str()),
                ("created_at", gte.as_str()),
                ("order", "created_at.desc"),
            ],
        )?;
        self.get(url).await
    }

    async fn watcher_names(&self, user_id: &str) -> Result<HashMap<String, String>> {
        #[derive(Deserialize)]
        struct NameRow {
            id: String,
            name: String,
        }
        let id = format!("eq.{user_id}");
        let url = self.table("watchers", &[("select", "id,name"), ("user_id", id.as_str())])?;
        let rows: Vec<NameRow> = self.get(url).await?;
        Ok(rows.into_iter().map(|r| (r.id, r.name)).collect())
    }

    async fn set_last_digest(&self, user_id: &str, at: DateTime<Utc>) -> Result<()> {
        let id = format!("eq.{user_id}");
        let url = self.table("profiles", &[("id", id.as_str())])?;
        self.write(
            self.http.patch(url).json(&json!({ "last_digest_sent_at": ts(at) })),
            "update profile",
        )
        .await
    }
}
