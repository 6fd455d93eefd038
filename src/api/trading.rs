//! Paper-trading backend client (read side).
//!
//! Only the endpoints the session heartbeat needs. Order placement and
//! bot control stay out of this crate.

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

use super::http::JsonClient;
use super::TradingApi;
use crate::types::{Account, BrokerPosition, Order, TradeRecord};

pub struct HttpTradingClient {
    client: JsonClient,
}

impl HttpTradingClient {
    pub fn new(base_url: &str, timeout: Duration, user_agent: &str) -> Result<Self> {
        Ok(Self {
            client: JsonClient::new(base_url, timeout, user_agent)?,
        })
    }
}

#[async_trait]
impl TradingApi for HttpTradingClient {
    async fn fetch_account(&self) -> Result<Account> {
        self.client.get_json("/account").await
    }

    async fn fetch_positions(&self) -> Result<Vec<BrokerPosition>> {
        self.client.get_json("/positions").await
    }

    async fn fetch_orders(&self) -> Result<Vec<Order>> {
        self.client.get_json("/orders").await
    }

    async fn fetch_trades(&self, limit: u32) -> Result<Vec<TradeRecord>> {
        self.client.get_json(&format!("/trades?limit={limit}")).await
    }
}
