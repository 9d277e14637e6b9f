//! Persistence seam: watchers, alerts and profiles.

pub mod memory;
pub mod postgrest;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::model::{Alert, NewAlert, Profile, Watcher};

pub use memory::MemoryStore;
pub use postgrest::PostgrestStore;

#[async_trait]
pub trait Store: Send + Sync {
    /// Watchers with `is_active` and `notification_email` both set.
    async fn list_active_watchers(&self) -> Result<Vec<Watcher>>;
    async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>>;
    /// Every non-null alert URL already stored for the watcher.
    async fn list_alert_urls(&self, watcher_id: &str) -> Result<HashSet<String>>;
    /// Bulk insert; returns how many rows were written.
    async fn insert_alerts(&self, alerts: &[NewAlert], created_at: DateTime<Utc>) -> Result<usize>;
    async fn touch_watcher(&self, watcher_id: &str, at: DateTime<Utc>) -> Result<()>;
    /// Alerts created at/after `since`, most recent first.
    async fn list_alerts_since(&self, user_id: &str, since: DateTime<Utc>) -> Result<Vec<Alert>>;
    /// id → name for all of the user's watchers (active or not).
    async fn watcher_names(&self, user_id: &str) -> Result<HashMap<String, String>>;
    async fn set_last_digest(&self, user_id: &str, at: DateTime<Utc>) -> Result<()>;
}

pub type DynStore = Arc<dyn Store>;

/// PostgREST when `SUPABASE_URL` + `SUPABASE_SERVICE_ROLE_KEY` are set, else in-memory.
pub fn store_from_env() -> DynStore {
    match PostgrestStore::from_env() {
        Some(s) => Arc::new(s),
        None => {
            tracing::warn!("SUPABASE_URL not set; using an empty in-memory store");
            Arc::new(MemoryStore::new())
        }
    }
}
