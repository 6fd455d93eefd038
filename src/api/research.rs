//! Research backend client.
//!
//! Endpoints (relative to the configured base URL):
//! - `GET  /research/health`
//! - `GET  /research/items?source_type={type}&limit={n}`
//! - `GET  /research/items/{category}?limit={n}`
//! - `GET  /research/signals`
//! - `GET  /research/stats`
//! - `POST /research/collect`
//! - `GET  /research/collect/status`

use anyhow::Result;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use super::http::JsonClient;
use super::ResearchApi;
use crate::types::{
    CollectionStatus, ResearchHealth, ResearchItem, ResearchStats, SourceType, TradingSignal,
};

const PREFIX: &str = "/research";

// ---------------------------------------------------------------------------
// Response envelopes
// ---------------------------------------------------------------------------

// Entries stay raw until `decode_each` so one bad entry cannot fail the list.

#[derive(Debug, Deserialize)]
struct ItemsResponse {
    #[serde(default)]
    items: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct SignalsResponse {
    #[serde(default)]
    signals: Option<Vec<serde_json::Value>>,
}

/// Decode each entry on its own, skipping the ones that are not objects
/// of the expected shape.
fn decode_each<T: DeserializeOwned>(kind: &str, raw: Option<Vec<serde_json::Value>>) -> Vec<T> {
    raw.unwrap_or_default()
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(kind, index, error = %e, "Skipping malformed entry");
                None
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct HttpResearchClient {
    client: JsonClient,
}

impl HttpResearchClient {
    pub fn new(base_url: &str, timeout: Duration, user_agent: &str) -> Result<Self> {
        Ok(Self {
            client: JsonClient::new(base_url, timeout, user_agent)?,
        })
    }

    pub fn items_path(source: SourceType, limit: u32) -> String {
        format!("{PREFIX}/items?source_type={}&limit={limit}", source.as_str())
    }

    pub fn category_items_path(category: &str, limit: u32) -> String {
        format!("{PREFIX}/items/{}?limit={limit}", urlencoding::encode(category))
    }
}

#[async_trait]
impl ResearchApi for HttpResearchClient {
    async fn health(&self) -> Result<ResearchHealth> {
        self.client.get_json(&format!("{PREFIX}/health")).await
    }

    async fn fetch_items(&self, source: SourceType, limit: u32) -> Result<Vec<ResearchItem>> {
        let resp: ItemsResponse = self.client.get_json(&Self::items_path(source, limit)).await?;
        let items: Vec<ResearchItem> = decode_each("item", resp.items);
        debug!(source = %source, count = items.len(), "Research items fetched");
        Ok(items)
    }

    async fn fetch_category_items(&self, category: &str, limit: u32) -> Result<Vec<ResearchItem>> {
        let resp: ItemsResponse = self
            .client
            .get_json(&Self::category_items_path(category, limit))
            .await?;
        Ok(decode_each("item", resp.items))
    }

    async fn fetch_signals(&self) -> Result<Vec<TradingSignal>> {
        let resp: SignalsResponse = self.client.get_json(&format!("{PREFIX}/signals")).await?;
        Ok(decode_each("signal", resp.signals))
    }

    async fn fetch_stats(&self) -> Result<ResearchStats> {
        self.client.get_json(&format!("{PREFIX}/stats")).await
    }

    async fn trigger_collection(&self) -> Result<()> {
        self.client.post_empty(&format!("{PREFIX}/collect")).await
    }

    async fn collection_status(&self) -> Result<CollectionStatus> {
        self.client.get_json(&format!("{PREFIX}/collect/status")).await
    }
}
