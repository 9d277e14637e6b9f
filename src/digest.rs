// src/digest.rs
//! Once-a-day roll-up of every user's recent alerts into a single email.

use std::collections::HashMap;

use chrono::{DateTime, Duration, FixedOffset, Offset, Timelike, Utc};
use metrics::counter;

use crate::model::Alert;
use crate::notify::queue::deliver;
use crate::notify::render::{digest_html, DigestLink, DigestSection};
use crate::notify::{DynMailer, OutgoingEmail};
use crate::store::DynStore;
use crate::textgen::{synth, TextGen};

/// Items shown per watcher in one digest.
pub const MAX_DIGEST_ITEMS_PER_WATCHER: usize = 10;
const DEFAULT_LOOKBACK_HOURS: i64 = 24;

fn local_offset(offset_minutes: i32) -> FixedOffset {
    FixedOffset::east_opt(offset_minutes * 60).unwrap_or_else(|| Utc.fix())
}

/// True when the local hour (at the fixed offset) equals `hour`.
pub fn is_digest_time(now: DateTime<Utc>, hour: u32, offset_minutes: i32) -> bool {
    now.with_timezone(&local_offset(offset_minutes)).hour() == hour
}

/// e.g. `Oct 19 2026`, in local time.
pub fn date_label(now: DateTime<Utc>, offset_minutes: i32) -> String {
    now.with_timezone(&local_offset(offset_minutes))
        .format("%b %d %Y")
        .to_string()
}

/// Start of the digest window. Forced runs always look back 24h.
pub fn lookback_horizon(
    last_digest_sent_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    force: bool,
) -> DateTime<Utc> {
    let default = now - Duration::hours(DEFAULT_LOOKBACK_HOURS);
    if force {
        return default;
    }
    last_digest_sent_at.unwrap_or(default)
}

/// Value stored as `last_digest_sent_at` after a send: strictly later than
/// every alert in the window, so the next pass starts after them.
pub fn digest_marker(alerts: &[Alert], now: DateTime<Utc>) -> DateTime<Utc> {
    let newest = alerts.iter().map(|a| a.created_at).max().unwrap_or(now);
    now.max(newest) + Duration::microseconds(1)
}

/// Group by watcher in first-seen order, keeping at most `cap` alerts per group.
pub fn group_alerts(alerts: &[Alert], cap: usize) -> Vec<(String, Vec<&Alert>)> {
    let mut order: Vec<(String, Vec<&Alert>)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for a in alerts {
        let i = *index.entry(a.watcher_id.as_str()).or_insert_with(|| {
            order.push((a.watcher_id.clone(), Vec::new()));
            order.len() - 1
        });
        if order[i].1.len() < cap {
            order[i].1.push(a);
        }
    }
    order
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DigestOutcome {
    pub sent: usize,
    pub failures: usize,
}

pub struct DigestAggregator<'a> {
    pub store: &'a DynStore,
    pub textgen: &'a TextGen,
    pub mailer: &'a DynMailer,
    pub utc_offset_minutes: i32,
}

impl DigestAggregator<'_> {
    /// One digest per user in `user_ids`; a failing user never stops the others.
    pub async fn run(&self, user_ids: &[String], now: DateTime<Utc>, force: bool) -> DigestOutcome {
        let label = date_label(now, self.utc_offset_minutes);
        let mut out = DigestOutcome::default();
        for user_id in user_ids {
            match self.run_user(user_id, now, force, &label).await {
                Ok(true) => {
                    out.sent += 1;
                    counter!("digests_sent_total").increment(1);
                }
                Ok(false) => {}
                Err(e) => {
                    out.failures += 1;
                    tracing::warn!(target: "digest", user_id = %user_id, error = %e, "digest failed");
                }
            }
        }
        out
    }

    /// `Ok(false)` when there is nothing to send or nowhere to send it.
    async fn run_user(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
        force: bool,
        label: &str,
    ) -> anyhow::Result<bool> {
        let Some(profile) = self.store.get_profile(user_id).await? else {
            return Ok(false);
        };
        let Some(email) = profile.email.filter(|e| !e.trim().is_empty()) else {
            return Ok(false);
        };

        let since = lookback_horizon(profile.last_digest_sent_at, now, force);
        let alerts = self.store.list_alerts_since(user_id, since).await?;
        if alerts.is_empty() {
            tracing::debug!(target: "digest", user_id = %user_id, "no alerts since last digest");
            return Ok(false);
        }

        let names = self.store.watcher_names(user_id).await?;
        let mut sections = Vec::new();
        let mut prompt_groups = Vec::new();
        for (watcher_id, group) in group_alerts(&alerts, MAX_DIGEST_ITEMS_PER_WATCHER) {
            let name = names
                .get(&watcher_id)
                .cloned()
                .unwrap_or_else(|| "Watcher".to_string());
            let titles: Vec<String> = group.iter().map(|a| a.title.clone()).collect();
            let summary = synth::watcher_section_summary(self.textgen, &name, &titles).await;
            sections.push(DigestSection {
                watcher_name: name.clone(),
                summary,
                items: group
                    .iter()
                    .map(|a| DigestLink {
                        title: a.title.clone(),
                        url: a.url.clone(),
                    })
                    .collect(),
            });
            prompt_groups.push((name, titles));
        }

        let summary = synth::daily_digest_summary(self.textgen, label, &prompt_groups).await;
        let message = OutgoingEmail {
            to: email,
            subject: format!("Daily Digest · {label}"),
            html: Some(digest_html(label, &summary, &sections)),
            text: summary,
        };
        deliver(self.mailer, &message).await?;
        self.store
            .set_last_digest(user_id, digest_marker(&alerts, now))
            .await?;
        tracing::info!(target: "digest", user_id = %user_id, sections = sections.len(), "digest sent");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn alert(watcher: &str, title: &str) -> Alert {
        Alert {
            id: title.into(),
            watcher_id: watcher.into(),
            user_id: "u1".into(),
            title: title.into(),
            description: None,
            url: None,
            source: "s".into(),
            matched_keywords: vec![],
            is_read: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn digest_hour_at_fixed_offset() {
        // 17:00 UTC is 09:00 at -08:00
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 17, 30, 0).unwrap();
        assert!(is_digest_time(now, 9, -480));
        assert!(!is_digest_time(now, 9, 0));
        assert_eq!(date_label(now, -480), "Oct 19 2026");
    }

    #[test]
    fn horizon_rules() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 17, 0, 0).unwrap();
        let last = now - Duration::hours(3);
        assert_eq!(lookback_horizon(Some(last), now, false), last);
        assert_eq!(lookback_horizon(None, now, false), now - Duration::hours(24));
        assert_eq!(lookback_horizon(Some(last), now, true), now - Duration::hours(24));
    }

    #[test]
    fn marker_lands_after_every_alert_in_the_window() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 17, 0, 0).unwrap();
        let mut same_run = alert("w1", "a");
        same_run.created_at = now;
        let mut older = alert("w1", "b");
        older.created_at = now - Duration::hours(2);

        let marker = digest_marker(&[same_run.clone(), older], now);
        assert!(marker > now);
        assert!(marker > same_run.created_at);
        assert_eq!(marker, now + Duration::microseconds(1));

        let mut clock_skewed = alert("w1", "c");
        clock_skewed.created_at = now + Duration::seconds(5);
        assert_eq!(
            digest_marker(&[clock_skewed], now),
            now + Duration::seconds(5) + Duration::microseconds(1)
        );
    }

    #[test]
    fn groups_keep_first_seen_order_and_cap() {
        let mut alerts = vec![alert("w2", "x")];
        alerts.extend((0..12).map(|i| alert("w1", &format!("a{i}"))));
        alerts.push(alert("w2", "y"));
        let groups = group_alerts(&alerts, MAX_DIGEST_ITEMS_PER_WATCHER);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, "w2");
        assert_eq!(groups[0].1.len(), 2);
        assert_eq!(groups[1].1.len(), 10);
        assert_eq!(groups[1].1[0].title, "a0");
    }
}
