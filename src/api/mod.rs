//! Remote backend integrations.
//!
//! Defines the `ResearchApi` and `TradingApi` traits and their HTTP
//! implementations:
//! - Research: items, signals, stats, and collection-run control under `/research`
//! - Trading: account, positions, orders, and trades for the session heartbeat

pub mod http;
pub mod research;
pub mod trading;

use anyhow::Result;
use async_trait::async_trait;

use crate::types::{
    Account, BrokerPosition, CollectionStatus, Order, ResearchHealth, ResearchItem, ResearchStats,
    SourceType, TradeRecord, TradingSignal,
};

/// Abstraction over the research backend.
///
/// Every call is a single request; retries are left to the caller's next
/// scheduled tick.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResearchApi: Send + Sync {
    /// Connectivity check, used once before polling loops start.
    async fn health(&self) -> Result<ResearchHealth>;

    /// Items of one source stream (`/items?source_type=X&limit=N`).
    async fn fetch_items(&self, source: SourceType, limit: u32) -> Result<Vec<ResearchItem>>;

    /// Items of one topic category (`/items/{category}?limit=N`).
    async fn fetch_category_items(&self, category: &str, limit: u32) -> Result<Vec<ResearchItem>>;

    async fn fetch_signals(&self) -> Result<Vec<TradingSignal>>;

    async fn fetch_stats(&self) -> Result<ResearchStats>;

    /// Start a background collection run. Any 2xx counts as accepted.
    async fn trigger_collection(&self) -> Result<()>;

    async fn collection_status(&self) -> Result<CollectionStatus>;
}

/// Abstraction over the paper-trading backend (read side only).
#[async_trait]
pub trait TradingApi: Send + Sync {
    async fn fetch_account(&self) -> Result<Account>;

    async fn fetch_positions(&self) -> Result<Vec<BrokerPosition>>;

    async fn fetch_orders(&self) -> Result<Vec<Order>>;

    async fn fetch_trades(&self, limit: u32) -> Result<Vec<TradeRecord>>;
}
