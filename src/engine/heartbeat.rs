//! Session heartbeat: periodic read of the paper-trading account.
//!
//! Fetches account, positions, orders and recent trades concurrently. A
//! failed endpoint keeps its previous value so a single flaky call does
//! not blank the session panel.

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::api::TradingApi;
use crate::types::{SessionSnapshot, SourceFailure};

pub struct SessionHeartbeat {
    api: Arc<dyn TradingApi>,
    trades_limit: u32,
    snapshot: RwLock<Arc<SessionSnapshot>>,
}

impl SessionHeartbeat {
    pub fn new(api: Arc<dyn TradingApi>, trades_limit: u32) -> Self {
        Self {
            api,
            trades_limit,
            snapshot: RwLock::new(Arc::new(SessionSnapshot::default())),
        }
    }

    pub async fn snapshot(&self) -> Arc<SessionSnapshot> {
        self.snapshot.read().await.clone()
    }

    /// Run one heartbeat and publish the merged snapshot.
    pub async fn beat(&self) -> Arc<SessionSnapshot> {
        let (account, positions, orders, trades) = tokio::join!(
            self.api.fetch_account(),
            self.api.fetch_positions(),
            self.api.fetch_orders(),
            self.api.fetch_trades(self.trades_limit),
        );

        let previous = self.snapshot().await;
        let mut failures = Vec::new();
        let next = SessionSnapshot {
            beats: previous.beats + 1,
            updated_at: Some(Utc::now()),
            account: merge("account", account.map(Some), &previous.account, &mut failures),
            positions: merge("positions", positions, &previous.positions, &mut failures),
            orders: merge("orders", orders, &previous.orders, &mut failures),
            trades: merge("trades", trades, &previous.trades, &mut failures),
            failures,
        };

        debug!(
            beat = next.beats,
            positions = next.positions.len(),
            orders = next.orders.len(),
            unrealized_pnl = next.unrealized_pnl(),
            day_change = next.account.as_ref().map_or(0.0, |a| a.day_change()),
            failures = next.failures.len(),
            "Session heartbeat"
        );

        let next = Arc::new(next);
        *self.snapshot.write().await = next.clone();
        next
    }
}

fn merge<T: Clone>(endpoint: &str, result: Result<T>, previous: &T, failures: &mut Vec<SourceFailure>) -> T {
    match result {
        Ok(v) => v,
        Err(e) => {
            warn!(endpoint, error = %e, "Session fetch failed, keeping previous value");
            failures.push(SourceFailure { source: endpoint.to_string(), message: e.to_string() });
            previous.clone()
        }
    }
}
