//! Per-bucket summaries: volume, average sentiment, and top items.

use serde::Serialize;
use std::collections::BTreeMap;

use super::ranker::rank_by_engagement;
use crate::types::{Bucket, ResearchItem, SentimentLabel};

/// Average sentiment beyond ±0.1 sets a direction.
const DIRECTION_THRESHOLD: f64 = 0.1;
const TOP_ITEMS: usize = 5;
const TITLE_MAX_CHARS: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopItem {
    pub title: String,
    pub source: String,
    pub engagement: f64,
    pub sentiment: f64,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketSummary {
    pub bucket: Bucket,
    pub total_items: usize,
    pub by_source: BTreeMap<String, usize>,
    pub average_sentiment: f64,
    pub direction: SentimentLabel,
    pub top_items: Vec<TopItem>,
}

/// Summarise the items already assigned to `bucket`.
pub fn summarize(bucket: Bucket, items: &[ResearchItem]) -> BucketSummary {
    let mut by_source = BTreeMap::new();
    for item in items {
        let source = item.source_name.clone().unwrap_or_else(|| "unknown".to_string());
        *by_source.entry(source).or_insert(0) += 1;
    }

    let average = if items.is_empty() {
        0.0
    } else {
        items.iter().map(|i| i.sentiment).sum::<f64>() / items.len() as f64
    };
    let average_sentiment = (average * 1000.0).round() / 1000.0;

    let direction = if average_sentiment > DIRECTION_THRESHOLD {
        SentimentLabel::Bullish
    } else if average_sentiment < -DIRECTION_THRESHOLD {
        SentimentLabel::Bearish
    } else {
        SentimentLabel::Neutral
    };

    let top_items = rank_by_engagement(items, TOP_ITEMS)
        .into_iter()
        .map(|i| TopItem {
            title: i.title.chars().take(TITLE_MAX_CHARS).collect(),
            source: i.source_name.clone().unwrap_or_default(),
            engagement: i.engagement(),
            sentiment: i.sentiment,
            url: i.url.clone(),
        })
        .collect();

    BucketSummary {
        bucket,
        total_items: items.len(),
        by_source,
        average_sentiment,
        direction,
        top_items,
    }
}
