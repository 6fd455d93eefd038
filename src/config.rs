//! Configuration loading from TOML with environment variable overrides.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Every field has a default, so a partial (or absent) file yields the
//! terminal's standard intervals: 300s feed refresh, 5s heartbeat, 2s
//! collection polling with a 180s bound.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::feed::{ClassifierRules, FeedProjector, PriorityRanker, SourceClassifier};
use crate::strategy::StrategyAllocations;
use crate::types::Bucket;

/// Environment variable overriding `api.base_url`.
pub const API_URL_ENV: &str = "PLUTUS_API_URL";

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub feed: FeedConfig,
    pub classifier: ClassifierConfig,
    pub collection: CollectionConfig,
    pub heartbeat: HeartbeatConfig,
    pub strategy: StrategyConfig,
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000/api".to_string(),
            request_timeout_secs: 30,
            user_agent: "PLUTUS/0.1.0 (intelligence-feed)".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FeedConfig {
    pub refresh_interval_secs: u64,
    pub items_per_source: u32,
    pub priority_lane_size: usize,
    pub recent_window_mins: i64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 300,
            items_per_source: 50,
            priority_lane_size: 8,
            recent_window_mins: 60,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ClassifierConfig {
    pub market_platforms: Vec<String>,
    pub news_outlets: Vec<String>,
    pub fallback_bucket: Bucket,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        let rules = ClassifierRules::default();
        Self {
            market_platforms: rules.market_platforms,
            news_outlets: rules.news_outlets,
            fallback_bucket: rules.fallback,
        }
    }
}

impl ClassifierConfig {
    pub fn rules(&self) -> ClassifierRules {
        ClassifierRules {
            market_platforms: self.market_platforms.clone(),
            news_outlets: self.news_outlets.clone(),
            fallback: self.fallback_bucket,
        }
    }
}

/// How a collection run is followed after it has been accepted.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CollectionStrategy {
    /// Poll `/collect/status` until the run finishes or times out.
    #[default]
    Poll,
    /// Wait a flat delay, then refetch.
    Delay,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CollectionConfig {
    pub strategy: CollectionStrategy,
    pub poll_interval_secs: u64,
    pub timeout_secs: u64,
    pub delay_secs: u64,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            strategy: CollectionStrategy::Poll,
            poll_interval_secs: 2,
            timeout_secs: 180,
            delay_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HeartbeatConfig {
    pub enabled: bool,
    pub interval_secs: u64,
    pub trades_limit: u32,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 5,
            trades_limit: 100,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct StrategyConfig {
    /// Strategy name → percentage of capital.
    pub allocations: StrategyAllocations,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DashboardConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self { enabled: true, port: 8090 }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::parse(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Load from `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        Ok(config)
    }

    /// Apply environment overrides (currently only the API base URL).
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                self.api.base_url = url.trim().to_string();
            }
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.request_timeout_secs.max(1))
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.feed.refresh_interval_secs.max(1))
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat.interval_secs.max(1))
    }

    /// Classifier, ranker and recency window wired from `[classifier]` and `[feed]`.
    pub fn feed_projector(&self) -> FeedProjector {
        FeedProjector::new(
            SourceClassifier::new(self.classifier.rules()),
            PriorityRanker::new(self.feed.priority_lane_size),
            chrono::Duration::minutes(self.feed.recent_window_mins.max(0)),
        )
    }
}
