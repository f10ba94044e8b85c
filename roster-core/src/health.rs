//! Staleness policy for peer records.
//!
//! A record is healthy while `now - last_seen <= threshold`. Records stamped
//! in the future (clock skew between nodes) count as healthy.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::types::PeerRecord;

/// Whether `record` is still fresh enough to be kept at `now`.
pub fn is_healthy(record: &PeerRecord, now: DateTime<Utc>, threshold: Duration) -> bool {
    let age = now.signed_duration_since(record.last_seen);
    match chrono::Duration::from_std(threshold) {
        Ok(threshold) => age <= threshold,
        // Thresholds beyond chrono's range never expire anything.
        Err(_) => true,
    }
}

/// Keep only the healthy records, preserving their order.
pub fn filter_healthy(
    records: Vec<PeerRecord>,
    now: DateTime<Utc>,
    threshold: Duration,
) -> Vec<PeerRecord> {
    records
        .into_iter()
        .filter(|record| {
            let healthy = is_healthy(record, now, threshold);
            if !healthy {
                tracing::debug!(url = %record.url, last_seen = %record.last_seen, "skipping unhealthy target");
            }
            healthy
        })
        .collect()
}

/// Human-readable age of `timestamp` relative to `now` (`42s`, `5m`, `3h`, `2d`).
pub fn format_age(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = now.signed_duration_since(timestamp).num_seconds().max(0) as u64;
    if seconds < 60 {
        return format!("{seconds}s");
    }
    if seconds < 60 * 60 {
        return format!("{}m", seconds / 60);
    }
    if seconds < 60 * 60 * 24 {
        return format!("{}h", seconds / (60 * 60));
    }
    format!("{}d", seconds / (60 * 60 * 24))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn record(url: &str, age_secs: i64) -> PeerRecord {
        PeerRecord {
            url: url.to_string(),
            last_seen: now() - chrono::Duration::seconds(age_secs),
        }
    }

    #[rstest]
    #[case::fresh(10, true)]
    #[case::exactly_at_threshold(60, true)]
    #[case::just_past_threshold(61, false)]
    #[case::long_gone(120, false)]
    #[case::future_timestamp(-30, true)]
    fn health_by_age(#[case] age_secs: i64, #[case] healthy: bool) {
        let threshold = Duration::from_secs(60);
        assert_eq!(is_healthy(&record("a", age_secs), now(), threshold), healthy);
    }

    #[test]
    fn filter_drops_stale_and_keeps_order() {
        let records = vec![
            record("a", 10),
            record("b", 120),
            record("c", 59),
            record("d", 3600),
        ];
        let healthy = filter_healthy(records, now(), Duration::from_secs(60));
        let urls: Vec<&str> = healthy.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, vec!["a", "c"]);
    }

    #[test]
    fn filter_of_empty_list_is_empty() {
        assert!(filter_healthy(Vec::new(), now(), Duration::from_secs(60)).is_empty());
    }

    #[test]
    fn huge_threshold_keeps_everything() {
        let records = vec![record("old", 10 * 365 * 24 * 3600)];
        assert_eq!(filter_healthy(records, now(), Duration::MAX).len(), 1);
    }

    #[rstest]
    #[case(5, "5s")]
    #[case(125, "2m")]
    #[case(7300, "2h")]
    #[case(3 * 86_400, "3d")]
    #[case(-10, "0s")]
    fn age_formatting(#[case] age_secs: i64, #[case] expected: &str) {
        assert_eq!(format_age(record("a", age_secs).last_seen, now()), expected);
    }
}
