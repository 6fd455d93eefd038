//! Intelligence feed aggregation.
//!
//! Pure functions over a feed snapshot: classify items into display
//! buckets, rank the priority lane, and derive recency/heat/sentiment
//! badges. Nothing in this module performs I/O or mutates its input.

pub mod badges;
pub mod classifier;
pub mod ranker;
pub mod summary;
pub mod view;

pub use badges::{format_time_ago, heat_level, is_recent, sentiment_label, HeatLevel};
pub use classifier::{ClassifierRules, SourceClassifier};
pub use ranker::{rank_by_engagement, PriorityRanker};
pub use summary::{summarize, BucketSummary};
pub use view::{BucketColumns, FeedItemView, FeedProjector, FeedView};
