//! Feed projection: snapshot + `now` → everything the terminal renders.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use super::badges::{format_time_ago, heat_level, is_recent_within, sentiment_label, RECENT_WINDOW_MINS};
use super::classifier::SourceClassifier;
use super::ranker::PriorityRanker;
use super::summary::{summarize, BucketSummary};
use crate::types::{Bucket, FeedSnapshot, ResearchItem, ResearchStats, SentimentLabel, SourceFailure, TradingSignal};

/// One item with its derived display metadata.
#[derive(Debug, Clone, Serialize)]
pub struct FeedItemView {
    #[serde(flatten)]
    pub item: ResearchItem,
    pub bucket: Bucket,
    pub is_recent: bool,
    /// `None` when the item carries no usable timestamp.
    pub age: Option<String>,
    pub heat_level: u8,
    pub is_hot: bool,
    pub sentiment_label: SentimentLabel,
}

/// Four display columns.
#[derive(Debug, Clone, Serialize)]
pub struct BucketColumns<T> {
    pub markets: Vec<T>,
    pub reddit: Vec<T>,
    pub news: Vec<T>,
    pub social: Vec<T>,
}

impl<T> Default for BucketColumns<T> {
    fn default() -> Self {
        Self {
            markets: Vec::new(),
            reddit: Vec::new(),
            news: Vec::new(),
            social: Vec::new(),
        }
    }
}

impl<T> BucketColumns<T> {
    pub fn get(&self, bucket: Bucket) -> &[T] {
        match bucket {
            Bucket::Markets => &self.markets,
            Bucket::Reddit => &self.reddit,
            Bucket::News => &self.news,
            Bucket::Social => &self.social,
        }
    }

    pub fn push(&mut self, bucket: Bucket, value: T) {
        match bucket {
            Bucket::Markets => self.markets.push(value),
            Bucket::Reddit => self.reddit.push(value),
            Bucket::News => self.news.push(value),
            Bucket::Social => self.social.push(value),
        }
    }

    pub fn total(&self) -> usize {
        self.markets.len() + self.reddit.len() + self.news.len() + self.social.len()
    }
}

/// Everything derived from one snapshot at one instant.
#[derive(Debug, Clone, Serialize)]
pub struct FeedView {
    pub generated_at: DateTime<Utc>,
    pub generation: u64,
    pub refreshed_at: Option<DateTime<Utc>>,
    pub columns: BucketColumns<FeedItemView>,
    pub priority: Vec<FeedItemView>,
    pub summaries: Vec<BucketSummary>,
    /// Highest confidence first.
    pub signals: Vec<TradingSignal>,
    pub stats: Option<ResearchStats>,
    pub failures: Vec<SourceFailure>,
    /// Every item stream failed; the UI offers a retry.
    pub needs_retry: bool,
}

/// Pure projector over feed snapshots. Never mutates its input.
#[derive(Debug, Clone)]
pub struct FeedProjector {
    classifier: SourceClassifier,
    ranker: PriorityRanker,
    recent_window: Duration,
}

impl Default for FeedProjector {
    fn default() -> Self {
        Self::new(SourceClassifier::default(), PriorityRanker::default(), Duration::minutes(RECENT_WINDOW_MINS))
    }
}

impl FeedProjector {
    pub fn new(classifier: SourceClassifier, ranker: PriorityRanker, recent_window: Duration) -> Self {
        Self { classifier, ranker, recent_window }
    }

    pub fn classifier(&self) -> &SourceClassifier {
        &self.classifier
    }

    /// Decorate a single item.
    pub fn decorate(&self, item: &ResearchItem, now: DateTime<Utc>) -> FeedItemView {
        let heat = heat_level(item.upvotes, item.comments);
        FeedItemView {
            item: item.clone(),
            bucket: self.classifier.classify(item),
            is_recent: is_recent_within(item.timestamp, now, self.recent_window),
            age: item.timestamp.map(|ts| format_time_ago(ts, now)),
            heat_level: heat.level(),
            is_hot: heat.is_hot(),
            sentiment_label: sentiment_label(item.sentiment),
        }
    }

    /// Split items into display columns, preserving input order within each.
    pub fn partition(&self, items: &[ResearchItem]) -> BucketColumns<ResearchItem> {
        let mut columns = BucketColumns::default();
        for item in items {
            columns.push(self.classifier.classify(item), item.clone());
        }
        columns
    }

    /// Build the full view of `snapshot` as of `now`.
    pub fn project(&self, snapshot: &FeedSnapshot, now: DateTime<Utc>) -> FeedView {
        let raw_columns = self.partition(&snapshot.items);

        let mut columns = BucketColumns::default();
        for bucket in Bucket::ALL {
            for item in raw_columns.get(*bucket) {
                columns.push(*bucket, self.decorate(item, now));
            }
        }

        let priority = self
            .ranker
            .rank(&snapshot.items)
            .into_iter()
            .map(|i| self.decorate(i, now))
            .collect();

        let summaries = Bucket::ALL
            .iter()
            .map(|b| summarize(*b, raw_columns.get(*b)))
            .collect();

        let mut signals = snapshot.signals.clone();
        signals.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        FeedView {
            generated_at: now,
            generation: snapshot.generation,
            refreshed_at: snapshot.refreshed_at,
            columns,
            priority,
            summaries,
            signals,
            stats: snapshot.stats.clone(),
            failures: snapshot.failures.clone(),
            needs_retry: snapshot.is_total_failure(),
        }
    }
}
