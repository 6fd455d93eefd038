//! Source classifier.
//!
//! Assigns every research item to exactly one display bucket. Rules are
//! evaluated in a fixed priority so an item matching several predicates
//! lands in the first one only:
//!
//! 1. markets : `prediction_market` type, or a market-platform name
//! 2. social  : `social_media` type, `@handle`, or the Fear & Greed index
//! 3. news    : `news` type, or a known outlet name
//! 4. reddit  : `reddit` type, or an `r/` subreddit name
//!
//! Items matching nothing are "unclassified"; [`SourceClassifier::classify`]
//! resolves them to the configured fallback bucket (reddit by default).

use serde::{Deserialize, Serialize};

use crate::types::{Bucket, ResearchItem};

/// Market-platform names matched inside `source_name`.
pub const DEFAULT_MARKET_PLATFORMS: &[&str] = &["Polymarket", "Metaculus", "Manifold", "Kalshi"];

/// News outlet names matched inside `source_name`.
pub const DEFAULT_NEWS_OUTLETS: &[&str] = &[
    "Reuters",
    "Bloomberg",
    "CNBC",
    "Associated Press",
    "BBC",
    "NYT",
    "New York Times",
    "Wall Street Journal",
    "WSJ",
    "Financial Times",
    "Politico",
    "The Hill",
    "ESPN",
    "Yahoo",
    "CBS",
    "CoinTelegraph",
    "CoinDesk",
    "Decrypt",
    "Variety",
    "Hollywood Reporter",
    "Google News",
];

const FEAR_AND_GREED: &str = "Fear & Greed";

/// Static matching tables plus the fallback policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierRules {
    pub market_platforms: Vec<String>,
    pub news_outlets: Vec<String>,
    /// Where unclassified items are shown.
    pub fallback: Bucket,
}

impl Default for ClassifierRules {
    fn default() -> Self {
        Self {
            market_platforms: DEFAULT_MARKET_PLATFORMS.iter().map(|s| s.to_string()).collect(),
            news_outlets: DEFAULT_NEWS_OUTLETS.iter().map(|s| s.to_string()).collect(),
            fallback: Bucket::Reddit,
        }
    }
}

/// Pure, deterministic item → bucket classifier.
#[derive(Debug, Clone, Default)]
pub struct SourceClassifier {
    rules: ClassifierRules,
}

impl SourceClassifier {
    pub fn new(rules: ClassifierRules) -> Self {
        Self { rules }
    }

    /// Classify an item, or `None` when no rule matches.
    pub fn classify_strict(&self, item: &ResearchItem) -> Option<Bucket> {
        let source_type = item.source_type.as_deref().unwrap_or("");
        let name = item.source_name.as_deref().unwrap_or("");

        if source_type == "prediction_market" || contains_any(name, &self.rules.market_platforms) {
            return Some(Bucket::Markets);
        }
        if source_type == "social_media" || name.starts_with('@') || name.contains(FEAR_AND_GREED) {
            return Some(Bucket::Social);
        }
        if source_type == "news" || contains_any(name, &self.rules.news_outlets) {
            return Some(Bucket::News);
        }
        if source_type == "reddit" || name.starts_with("r/") {
            return Some(Bucket::Reddit);
        }
        None
    }

    /// Classify an item, resolving unmatched items to the fallback bucket.
    pub fn classify(&self, item: &ResearchItem) -> Bucket {
        self.classify_strict(item).unwrap_or(self.rules.fallback)
    }
}

fn contains_any(haystack: &str, needles: &[String]) -> bool {
    !haystack.is_empty()
        && needles
            .iter()
            .any(|n| !n.is_empty() && haystack.contains(n.as_str()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
