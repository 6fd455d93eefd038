//! Per-item display signals: recency, age, heat, sentiment.
//!
//! All functions take the evaluation-time `now` explicitly; nothing here
//! caches a clock reading.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::types::{ResearchItem, SentimentLabel};

/// Items younger than this carry the "new" badge.
pub const RECENT_WINDOW_MINS: i64 = 60;

// Heat tiers on `upvotes + 2 * comments`. Each bound is the inclusive top
// of its tier.
const HEAT_TIER_1_MAX: u64 = 5_000;
const HEAT_TIER_2_MAX: u64 = 20_000;
const HEAT_TIER_3_MAX: u64 = 50_000;

/// Whether `timestamp` lies strictly within `window` of `now`.
pub fn is_recent_within(timestamp: Option<DateTime<Utc>>, now: DateTime<Utc>, window: Duration) -> bool {
    match timestamp {
        Some(ts) => now - ts < window,
        None => false,
    }
}

/// Whether the item was observed less than 60 minutes before `now`.
pub fn is_recent(item: &ResearchItem, now: DateTime<Utc>) -> bool {
    is_recent_within(item.timestamp, now, Duration::minutes(RECENT_WINDOW_MINS))
}

/// Coarse age label: `"42m"`, `"3h"`, `"2d"`. Always floors.
/// Timestamps in the future read as `"0m"`.
pub fn format_time_ago(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let age = (now - timestamp).max(Duration::zero());
    let mins = age.num_minutes();
    if mins < 60 {
        format!("{mins}m")
    } else if age.num_hours() < 24 {
        format!("{}h", age.num_hours())
    } else {
        format!("{}d", age.num_days())
    }
}

/// Engagement heat on a 1–4 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct HeatLevel(u8);

impl HeatLevel {
    pub fn level(&self) -> u8 {
        self.0
    }

    /// Level 1 renders no badge.
    pub fn shows_badge(&self) -> bool {
        self.0 >= 2
    }

    pub fn is_hot(&self) -> bool {
        self.0 >= 3
    }
}

/// Raw heat score: comments count double.
pub fn heat_score(upvotes: u64, comments: u64) -> u64 {
    upvotes.saturating_add(comments.saturating_mul(2))
}

pub fn heat_level(upvotes: u64, comments: u64) -> HeatLevel {
    let score = heat_score(upvotes, comments);
    HeatLevel(if score <= HEAT_TIER_1_MAX {
        1
    } else if score <= HEAT_TIER_2_MAX {
        2
    } else if score <= HEAT_TIER_3_MAX {
        3
    } else {
        4
    })
}

pub fn sentiment_label(sentiment: f64) -> SentimentLabel {
    if sentiment > 0.0 {
        SentimentLabel::Bullish
    } else if sentiment < 0.0 {
        SentimentLabel::Bearish
    } else {
        SentimentLabel::Neutral
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn aged(minutes: i64) -> ResearchItem {
        let mut i = ResearchItem::new("r/stocks", "t");
        i.timestamp = Some(now() - Duration::minutes(minutes));
        i
    }

    #[test]
    fn test_recency_boundary() {
        assert!(is_recent(&aged(0), now()));
        assert!(is_recent(&aged(59), now()));
        assert!(!is_recent(&aged(60), now()));
        assert!(!is_recent(&aged(600), now()));
    }

    #[test]
    fn test_recency_just_under_window() {
        let mut i = aged(60);
        i.timestamp = i.timestamp.map(|t| t + Duration::milliseconds(1));
        assert!(is_recent(&i, now()));
    }

    #[test]
    fn test_recency_without_timestamp() {
        assert!(!is_recent(&ResearchItem::new("x", "y"), now()));
    }

    #[test]
    fn test_recency_uses_given_now() {
        let item = aged(30);
        assert!(is_recent(&item, now()));
        assert!(!is_recent(&item, now() + Duration::minutes(31)));
    }

    #[test]
    fn test_format_time_ago_units() {
        let n = now();
        assert_eq!(format_time_ago(n, n), "0m");
        assert_eq!(format_time_ago(n - Duration::seconds(59), n), "0m");
        assert_eq!(format_time_ago(n - Duration::minutes(42), n), "42m");
        assert_eq!(format_time_ago(n - Duration::minutes(59), n), "59m");
        assert_eq!(format_time_ago(n - Duration::minutes(60), n), "1h");
        assert_eq!(format_time_ago(n - Duration::minutes(3 * 60 + 59), n), "3h");
        assert_eq!(format_time_ago(n - Duration::hours(23) - Duration::minutes(59), n), "23h");
        assert_eq!(format_time_ago(n - Duration::hours(24), n), "1d");
        assert_eq!(format_time_ago(n - Duration::hours(71), n), "2d");
    }

    #[test]
    fn test_format_time_ago_future() {
        assert_eq!(format_time_ago(now() + Duration::minutes(5), now()), "0m");
    }

    #[test]
    fn test_heat_thresholds() {
        assert_eq!(heat_level(2500, 1250).level(), 1);
        assert_eq!(heat_level(2501, 1250).level(), 2);
        assert_eq!(heat_level(20_000, 0).level(), 2);
        assert_eq!(heat_level(20_001, 0).level(), 3);
        assert_eq!(heat_level(0, 25_000).level(), 3);
        assert_eq!(heat_level(50_001, 0).level(), 4);
        assert_eq!(heat_level(60_000, 100).level(), 4);
        assert_eq!(heat_level(0, 0).level(), 1);
    }

    #[test]
    fn test_heat_badges() {
        assert!(!heat_level(100, 0).shows_badge());
        assert!(heat_level(6000, 0).shows_badge());
        assert!(!heat_level(6000, 0).is_hot());
        assert!(heat_level(30_000, 0).is_hot());
    }

    #[test]
    fn test_heat_score_saturates() {
        assert_eq!(heat_score(u64::MAX, u64::MAX), u64::MAX);
        assert_eq!(heat_level(u64::MAX, 1).level(), 4);
    }

    #[test]
    fn test_sentiment_label() {
        assert_eq!(sentiment_label(0.4), SentimentLabel::Bullish);
        assert_eq!(sentiment_label(-0.01), SentimentLabel::Bearish);
        assert_eq!(sentiment_label(0.0), SentimentLabel::Neutral);
    }
}
