//! Shared types for the PLUTUS feed aggregator.
//!
//! These types mirror the JSON contracts of the remote research and
//! trading backends. Every wire type deserialises leniently: missing or
//! `null` fields collapse to zero values instead of failing the whole
//! response, so one malformed item never hides the rest of a feed.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Lenient field decoding
// ---------------------------------------------------------------------------

/// Treat an explicit `null` the same as a missing field.
fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

/// Engagement counters arrive as ints, floats, or not at all.
/// Negative and non-numeric values become 0.
fn lenient_count<'de, D>(d: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(d)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => {
            if let Some(u) = n.as_u64() {
                u
            } else if let Some(f) = n.as_f64() {
                if f.is_finite() && f > 0.0 { f.floor() as u64 } else { 0 }
            } else {
                0
            }
        }
        _ => 0,
    })
}

fn lenient_f64<'de, D>(d: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(d)?;
    Ok(value
        .and_then(|v| v.as_f64())
        .filter(|f| f.is_finite())
        .unwrap_or(0.0))
}

fn lenient_opt_f64<'de, D>(d: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(d)?;
    Ok(value.and_then(|v| v.as_f64()).filter(|f| f.is_finite()))
}

/// Scalars are stringified; arrays, objects and `null` become `None`.
fn scalar_to_string(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Text fields tolerate numbers and booleans; anything else is empty.
fn lenient_string<'de, D>(d: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(d)?;
    Ok(value.and_then(scalar_to_string).unwrap_or_default())
}

/// Empty strings are as good as absent (an empty `url` renders as text).
fn non_empty_string<'de, D>(d: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(d)?;
    Ok(value.and_then(scalar_to_string).filter(|s| !s.trim().is_empty()))
}

/// Unknown or missing sides decode as `None` instead of failing the signal.
fn lenient_side<'de, D>(d: D) -> Result<Option<Side>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(d)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => match s.trim().to_ascii_uppercase().as_str() {
            "YES" => Some(Side::Yes),
            "NO" => Some(Side::No),
            _ => None,
        },
        _ => None,
    })
}

fn lenient_timestamp<'de, D>(d: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(d)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => parse_timestamp(&s),
        // Epoch seconds or milliseconds.
        Some(serde_json::Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
            .and_then(|raw| {
                if raw > 10_000_000_000 {
                    DateTime::from_timestamp_millis(raw)
                } else {
                    DateTime::from_timestamp(raw, 0)
                }
            }),
        _ => None,
    })
}

/// Parse an RFC 3339 timestamp, falling back to naive ISO forms
/// (assumed UTC). Returns `None` for anything unparseable.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

// ---------------------------------------------------------------------------
// Research items
// ---------------------------------------------------------------------------

/// A single collected unit of market-relevant text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchItem {
    #[serde(default, deserialize_with = "non_empty_string")]
    pub id: Option<String>,
    /// Open-ended origin tag: "reddit" | "news" | "prediction_market" | "social_media" | ...
    #[serde(default, deserialize_with = "non_empty_string")]
    pub source_type: Option<String>,
    /// Human-readable origin, e.g. "r/wallstreetbets", "Reuters", "@someuser"
    #[serde(default, deserialize_with = "non_empty_string")]
    pub source_name: Option<String>,
    /// Topic category assigned upstream (politics, sports, crypto, ...)
    #[serde(default, deserialize_with = "non_empty_string")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(default, deserialize_with = "non_empty_string")]
    pub url: Option<String>,
    /// When the item was observed, not necessarily when it was authored.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Signed score: >0 bullish, <0 bearish, 0 neutral.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub sentiment: f64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub upvotes: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub comments: u64,
    /// Precomputed ranking score. Absent means 0.
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub engagement_score: Option<f64>,
}

impl fmt::Display for ResearchItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} (▲{} 💬{} eng={:.1})",
            self.source_name.as_deref().unwrap_or("unknown"),
            self.title,
            self.upvotes,
            self.comments,
            self.engagement(),
        )
    }
}

impl ResearchItem {
    /// A bare item with only a source name and title set.
    pub fn new(source_name: &str, title: &str) -> Self {
        Self {
            id: None,
            source_type: None,
            source_name: Some(source_name.to_string()),
            category: None,
            title: title.to_string(),
            url: None,
            timestamp: None,
            sentiment: 0.0,
            upvotes: 0,
            comments: 0,
            engagement_score: None,
        }
    }

    /// Engagement score used for ranking (missing or non-finite → 0).
    pub fn engagement(&self) -> f64 {
        match self.engagement_score {
            Some(s) if s.is_finite() => s,
            _ => 0.0,
        }
    }
}

/// The four item streams the research API serves, keyed by `source_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Reddit,
    News,
    PredictionMarket,
    SocialMedia,
}

impl SourceType {
    /// All streams, in the order they are merged into a snapshot.
    pub const ALL: &'static [SourceType] = &[
        SourceType::PredictionMarket,
        SourceType::Reddit,
        SourceType::News,
        SourceType::SocialMedia,
    ];

    /// Wire tag used in `source_type` query parameters and item fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Reddit => "reddit",
            SourceType::News => "news",
            SourceType::PredictionMarket => "prediction_market",
            SourceType::SocialMedia => "social_media",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Display buckets
// ---------------------------------------------------------------------------

/// The four display columns of the intelligence feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    Markets,
    Reddit,
    News,
    Social,
}

impl Bucket {
    /// All buckets, in column order.
    pub const ALL: &'static [Bucket] = &[Bucket::Markets, Bucket::Reddit, Bucket::News, Bucket::Social];

    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::Markets => "markets",
            Bucket::Reddit => "reddit",
            Bucket::News => "news",
            Bucket::Social => "social",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Bucket {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "markets" | "market" | "prediction_market" => Ok(Bucket::Markets),
            "reddit" => Ok(Bucket::Reddit),
            "news" => Ok(Bucket::News),
            "social" | "social_media" => Ok(Bucket::Social),
            _ => Err(FeedError::Config(format!("Unknown feed bucket: {s}"))),
        }
    }
}

/// Direction label derived from a sentiment scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SentimentLabel {
    Bullish,
    Bearish,
    Neutral,
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SentimentLabel::Bullish => write!(f, "Bullish"),
            SentimentLabel::Bearish => write!(f, "Bearish"),
            SentimentLabel::Neutral => write!(f, "Neutral"),
        }
    }
}

// ---------------------------------------------------------------------------
// Signals & stats
// ---------------------------------------------------------------------------

/// Recommended side of a prediction market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    #[serde(rename = "YES", alias = "yes", alias = "Yes")]
    Yes,
    #[serde(rename = "NO", alias = "no", alias = "No")]
    No,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Yes => write!(f, "YES"),
            Side::No => write!(f, "NO"),
        }
    }
}

/// A recommendation produced upstream. Display-only on this side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingSignal {
    #[serde(default, deserialize_with = "non_empty_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub category: String,
    /// `None` when the backend sent no recognisable side.
    #[serde(default, deserialize_with = "lenient_side")]
    pub side: Option<Side>,
    /// 0.0–1.0
    #[serde(default, deserialize_with = "lenient_f64")]
    pub confidence: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub sentiment_score: f64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub sources_count: u64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub reasoning: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub market_question: String,
    #[serde(default, deserialize_with = "non_empty_string")]
    pub generated_at: Option<String>,
    #[serde(default, deserialize_with = "non_empty_string")]
    pub expires_at: Option<String>,
}

impl fmt::Display for TradingSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} | conf={:.0}% sent={:+.2} | {} sources",
            self.category.to_uppercase(),
            self.side.map_or_else(|| "?".to_string(), |s| s.to_string()),
            self.confidence * 100.0,
            self.sentiment_score,
            self.sources_count,
        )
    }
}

/// Aggregate counters from `GET /research/stats`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResearchStats {
    #[serde(default, deserialize_with = "lenient_count")]
    pub total_items: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub active_signals: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub sources_count: u64,
    #[serde(default, deserialize_with = "non_empty_string")]
    pub last_collection: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub by_category: BTreeMap<String, u64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub by_source: BTreeMap<String, u64>,
}

/// Response of `GET /research/health`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResearchHealth {
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub monitoring_active: bool,
    #[serde(default, deserialize_with = "non_empty_string")]
    pub timestamp: Option<String>,
}

impl ResearchHealth {
    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("healthy") || self.status.eq_ignore_ascii_case("ok")
    }
}

// ---------------------------------------------------------------------------
// Collection runs
// ---------------------------------------------------------------------------

/// Per-collector progress state reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectorState {
    #[default]
    Pending,
    Running,
    Complete,
    Error,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectorProgress {
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: CollectorState,
    #[serde(default, deserialize_with = "lenient_count")]
    pub count: u64,
}

/// Response of `GET /research/collect/status`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectionStatus {
    #[serde(default, deserialize_with = "null_as_default")]
    pub running: bool,
    /// Present once the run has produced its final summary.
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub progress: BTreeMap<String, CollectorProgress>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub completed_count: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub total_count: u64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub percent_complete: f64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub total_items: u64,
}

impl CollectionStatus {
    /// The job has stopped and published a result.
    pub fn is_finished(&self) -> bool {
        !self.running && self.result.as_ref().is_some_and(|r| !r.is_null())
    }
}

/// Client-side snapshot of an in-flight collection job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionRun {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub running: bool,
    pub progress: BTreeMap<String, CollectorProgress>,
    pub completed_count: u64,
    pub total_count: u64,
    /// Rendered as received; semantics are owned by the backend.
    pub percent_complete: f64,
    pub total_items: u64,
    pub polls: u32,
}

impl CollectionRun {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at,
            running: true,
            progress: BTreeMap::new(),
            completed_count: 0,
            total_count: 0,
            percent_complete: 0.0,
            total_items: 0,
            polls: 0,
        }
    }

    /// Fold the latest status response into this snapshot.
    pub fn apply(&mut self, status: &CollectionStatus) {
        self.running = status.running;
        self.progress = status.progress.clone();
        self.completed_count = status.completed_count;
        self.total_count = status.total_count;
        self.percent_complete = status.percent_complete;
        self.total_items = status.total_items;
        self.polls += 1;
    }
}

impl fmt::Display for CollectionRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "run {} | {}/{} collectors | {:.0}% | {} items | {} polls",
            self.run_id,
            self.completed_count,
            self.total_count,
            self.percent_complete,
            self.total_items,
            self.polls,
        )
    }
}

// ---------------------------------------------------------------------------
// Feed snapshot
// ---------------------------------------------------------------------------

/// A fetch that failed during a refresh cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceFailure {
    pub source: String,
    pub message: String,
}

/// The latest consistent view of the research feed. Replaced as a whole
/// once every constituent fetch of a refresh has settled.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FeedSnapshot {
    /// Monotonic refresh counter; 0 means never refreshed.
    pub generation: u64,
    pub refreshed_at: Option<DateTime<Utc>>,
    pub items: Vec<ResearchItem>,
    pub signals: Vec<TradingSignal>,
    pub stats: Option<ResearchStats>,
    pub failures: Vec<SourceFailure>,
}

impl FeedSnapshot {
    /// Every item stream failed, so there is nothing to show but a retry.
    pub fn is_total_failure(&self) -> bool {
        self.generation > 0
            && self.items.is_empty()
            && SourceType::ALL
                .iter()
                .all(|s| self.failures.iter().any(|f| f.source == s.as_str()))
    }
}

// ---------------------------------------------------------------------------
// Trading session (external backend)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Account {
    #[serde(default, deserialize_with = "non_empty_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub currency: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub cash: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub buying_power: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub equity: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub portfolio_value: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub last_equity: f64,
}

impl Account {
    /// Equity change since the previous close.
    pub fn day_change(&self) -> f64 {
        self.equity - self.last_equity
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BrokerPosition {
    #[serde(default, deserialize_with = "lenient_string")]
    pub symbol: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub qty: f64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub side: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub avg_entry_price: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub current_price: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub market_value: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub unrealized_pl: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub unrealized_plpc: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Order {
    #[serde(default, deserialize_with = "non_empty_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub symbol: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub qty: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub filled_qty: f64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub side: String,
    #[serde(default, rename = "type", deserialize_with = "lenient_string")]
    pub order_type: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: String,
    #[serde(default, deserialize_with = "non_empty_string")]
    pub created_at: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub filled_avg_price: f64,
}

/// A row of the backend trade log. Columns beyond the common ones are
/// kept verbatim in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub symbol: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub side: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub qty: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub price: f64,
    #[serde(default, deserialize_with = "non_empty_string")]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Latest heartbeat view of the trading session.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionSnapshot {
    pub beats: u64,
    pub updated_at: Option<DateTime<Utc>>,
    pub account: Option<Account>,
    pub positions: Vec<BrokerPosition>,
    pub orders: Vec<Order>,
    pub trades: Vec<TradeRecord>,
    /// Endpoints that failed on the latest beat; their previous values are kept.
    pub failures: Vec<SourceFailure>,
}

impl SessionSnapshot {
    /// Sum of unrealized P&L across open positions.
    pub fn unrealized_pnl(&self) -> f64 {
        self.positions.iter().map(|p| p.unrealized_pl).sum()
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for PLUTUS.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("API error ({endpoint}): {message}")]
    Api { endpoint: String, message: String },

    #[error("HTTP {status} from {endpoint}")]
    HttpStatus { endpoint: String, status: u16 },

    #[error("A collection run is already in progress")]
    CollectionInProgress,

    #[error("Failed to trigger collection: {0}")]
    TriggerFailed(String),

    #[error("Strategy allocations total {total:.1}%, exceeding 100%")]
    OverAllocated { total: f64 },

    #[error("Invalid allocation: {0}")]
    InvalidAllocation(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
