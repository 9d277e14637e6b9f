// src/due.rs
use chrono::{DateTime, Duration, Utc};

/// A watcher is due when it was never checked, or when at least
/// `interval_minutes` have elapsed since `last_checked_at` (inclusive boundary).
/// An interval too large to represent never comes due.
pub fn is_due(
    last_checked_at: Option<DateTime<Utc>>,
    interval_minutes: i64,
    now: DateTime<Utc>,
) -> bool {
    let Some(last) = last_checked_at else {
        return true;
    };
    Duration::try_minutes(interval_minutes.max(0))
        .and_then(|interval| last.checked_add_signed(interval))
        .is_some_and(|next| now >= next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn never_checked_is_due() {
        let now = Utc.with_ymd_and_hms(2025, 9, 6, 9, 0, 0).unwrap();
        assert!(is_due(None, 1440, now));
        assert!(is_due(None, 0, now));
    }

    #[test]
    fn exact_boundary_is_due() {
        let last = Utc.with_ymd_and_hms(2025, 9, 6, 9, 0, 0).unwrap();
        let now = last + Duration::minutes(60);
        assert!(is_due(Some(last), 60, now));
        assert!(!is_due(Some(last), 60, now - Duration::seconds(1)));
    }

    #[test]
    fn oversized_interval_is_never_due() {
        let last = Utc.with_ymd_and_hms(2025, 9, 6, 9, 0, 0).unwrap();
        assert!(!is_due(Some(last), i64::MAX, last));
        assert!(!is_due(Some(last), i64::MAX / 60_000, last + Duration::days(365)));
        assert!(!is_due(Some(DateTime::<Utc>::MAX_UTC), 1, DateTime::<Utc>::MAX_UTC));
    }

    #[test]
    fn negative_interval_treated_as_zero() {
        let last = Utc.with_ymd_and_hms(2025, 9, 6, 9, 0, 0).unwrap();
        assert!(is_due(Some(last), -5, last));
    }
}
