// src/store/memory.rs
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::Store;
use crate::model::{Alert, NewAlert, Profile, Watcher};

#[derive(Default)]
struct Tables {
    watchers: Vec<Watcher>,
    profiles: HashMap<String, Profile>,
    alerts: Vec<Alert>,
}

/// In-process store for tests and local runs. Alert inserts skip rows whose
/// (watcher, url) pair already exists.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    fail_loads: AtomicBool,
    fail_inserts: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_watcher(&self, watcher: Watcher) {
        self.tables.write().await.watchers.push(watcher);
    }

    pub async fn add_profile(&self, user_id: &str, email: Option<&str>) {
        self.tables.write().await.profiles.insert(
            user_id.to_string(),
            Profile {
                id: user_id.to_string(),
                email: email.map(str::to_string),
                last_digest_sent_at: None,
            },
        );
    }

    /// Insert an alert row directly, bypassing URL dedup.
    pub async fn seed_alert(&self, alert: NewAlert, created_at: DateTime<Utc>) {
        self.tables.write().await.alerts.push(materialize(alert, created_at));
    }

    pub async fn alerts(&self) -> Vec<Alert> {
        self.tables.read().await.alerts.clone()
    }

    pub async fn watcher(&self, id: &str) -> Option<Watcher> {
        self.tables.read().await.watchers.iter().find(|w| w.id == id).cloned()
    }

    pub async fn profile(&self, user_id: &str) -> Option<Profile> {
        self.tables.read().await.profiles.get(user_id).cloned()
    }

    pub fn set_fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }
}

fn materialize(a: NewAlert, created_at: DateTime<Utc>) -> Alert {
    Alert {
        id: Uuid::new_v4().to_string(),
        watcher_id: a.watcher_id,
        user_id: a.user_id,
        title: a.title,
        description: a.description,
        url: a.url,
        source: a.source,
        matched_keywords: a.matched_keywords,
        is_read: false,
        created_at,
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn list_active_watchers(&self) -> Result<Vec<Watcher>> {
        if self.fail_loads.load(Ordering::SeqCst) {
            bail!("watcher table unavailable");
        }
        Ok(self
            .tables
            .read()
            .await
            .watchers
            .iter()
            .filter(|w| w.is_active && w.notification_email)
            .cloned()
            .collect())
    }

    async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>> {
        Ok(self.tables.read().await.profiles.get(user_id).cloned())
    }

    async fn list_alert_urls(&self, watcher_id: &str) -> Result<HashSet<String>> {
        Ok(self
            .tables
            .read()
            .await
            .alerts
            .iter()
            .filter(|a| a.watcher_id == watcher_id)
            .filter_map(|a| a.url.clone())
            .collect())
    }

    async fn insert_alerts(&self, alerts: &[NewAlert], created_at: DateTime<Utc>) -> Result<usize> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            bail!("alert insert rejected");
        }
        let mut t = self.tables.write().await;
        let mut inserted = 0;
        for a in alerts {
            let duplicate = a.url.as_ref().is_some_and(|url| {
                t.alerts
                    .iter()
                    .any(|e| e.watcher_id == a.watcher_id && e.url.as_ref() == Some(url))
            });
            if duplicate {
                continue;
            }
            t.alerts.push(materialize(a.clone(), created_at));
            inserted += 1;
        }
        Ok(inserted)
    }

    async fn touch_watcher(&self, watcher_id: &str, at: DateTime<Utc>) -> Result<()> {
        let mut t = self.tables.write().await;
        match t.watchers.iter_mut().find(|w| w.id == watcher_id) {
            Some(w) => {
                w.last_checked_at = Some(at);
                Ok(())
            }
            None => bail!("unknown watcher {watcher_id}"),
        }
    }

    async fn list_alerts_since(&self, user_id: &str, since: DateTime<Utc>) -> Result<Vec<Alert>> {
        let mut out: Vec<Alert> = self
            .tables
            .read()
            .await
            .alerts
            .iter()
            .filter(|a| a.user_id == user_id && a.created_at >= since)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    async fn watcher_names(&self, user_id: &str) -> Result<HashMap<String, String>> {
        Ok(self
            .tables
            .read()
            .await
            .watchers
            .iter()
            .filter(|w| w.user_id == user_id)
            .map(|w| (w.id.clone(), w.name.clone()))
            .collect())
    }

    async fn set_last_digest(&self, user_id: &str, at: DateTime<Utc>) -> Result<()> {
        match self.tables.write().await.profiles.get_mut(user_id) {
            Some(p) => {
                p.last_digest_sent_at = Some(at);
                Ok(())
            }
            None => bail!("unknown profile {user_id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Category;
    use chrono::Duration;

    fn alert(url: Option<&str>) -> NewAlert {
        NewAlert {
            watcher_id: "w1".into(),
            user_id: "u1".into(),
            title: "t".into(),
            description: None,
            url: url.map(str::to_string),
            source: "s".into(),
            matched_keywords: vec![],
        }
    }

    #[tokio::test]
    async fn insert_skips_existing_urls() {
        let s = MemoryStore::new();
        let now = Utc::now();
        assert_eq!(s.insert_alerts(&[alert(Some("A")), alert(None)], now).await.unwrap(), 2);
        assert_eq!(s.insert_alerts(&[alert(Some("A")), alert(Some("B")), alert(None)], now).await.unwrap(), 2);
        assert_eq!(s.alerts().await.len(), 4);
        assert_eq!(s.list_alert_urls("w1").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn alerts_since_are_newest_first() {
        let s = MemoryStore::new();
        let now = Utc::now();
        s.seed_alert(alert(Some("old")), now - Duration::hours(30)).await;
        s.seed_alert(alert(Some("a")), now - Duration::hours(2)).await;
        s.seed_alert(alert(Some("b")), now - Duration::hours(1)).await;
        let got = s.list_alerts_since("u1", now - Duration::hours(24)).await.unwrap();
        let urls: Vec<_> = got.iter().filter_map(|a| a.url.as_deref()).collect();
        assert_eq!(urls, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn only_active_email_enabled_watchers_listed() {
        let s = MemoryStore::new();
        s.add_watcher(Watcher::new("w1", "u1", "a", Category::Jobs, vec![])).await;
        let mut muted = Watcher::new("w2", "u1", "b", Category::Jobs, vec![]);
        muted.notification_email = false;
        s.add_watcher(muted).await;
        let mut paused = Watcher::new("w3", "u1", "c", Category::Jobs, vec![]);
        paused.is_active = false;
        s.add_watcher(paused).await;
        let ids: Vec<_> = s.list_active_watchers().await.unwrap().into_iter().map(|w| w.id).collect();
        assert_eq!(ids, vec!["w1"]);
        assert_eq!(s.watcher_names("u1").await.unwrap().len(), 3);
    }
}
