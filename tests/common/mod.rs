//! In-memory research backend for integration testing.
//!
//! Provides a deterministic `ResearchApi` implementation whose items,
//! failures and collection progress are fully controllable from test
//! code, with call counters for asserting what was requested.

#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use plutus::api::ResearchApi;
use plutus::types::*;

#[derive(Default)]
pub struct MockResearchApi {
    items: Mutex<HashMap<SourceType, Vec<ResearchItem>>>,
    signals: Mutex<Vec<TradingSignal>>,
    failing: Mutex<HashSet<SourceType>>,
    trigger_error: Mutex<Option<String>>,
    /// Consumed one per status call; the last entry repeats.
    statuses: Mutex<VecDeque<Result<CollectionStatus, String>>>,
    pub item_calls: AtomicUsize,
    pub trigger_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
}

impl MockResearchApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(self, source: SourceType, items: Vec<ResearchItem>) -> Self {
        self.items.lock().unwrap().insert(source, items);
        self
    }

    pub fn with_signals(self, signals: Vec<TradingSignal>) -> Self {
        *self.signals.lock().unwrap() = signals;
        self
    }

    pub fn fail_source(&self, source: SourceType) {
        self.failing.lock().unwrap().insert(source);
    }

    pub fn heal_source(&self, source: SourceType) {
        self.failing.lock().unwrap().remove(&source);
    }

    pub fn reject_trigger(&self, message: &str) {
        *self.trigger_error.lock().unwrap() = Some(message.to_string());
    }

    pub fn push_status(&self, status: CollectionStatus) {
        self.statuses.lock().unwrap().push_back(Ok(status));
    }

    pub fn push_status_error(&self, message: &str) {
        self.statuses.lock().unwrap().push_back(Err(message.to_string()));
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResearchApi for MockResearchApi {
    async fn health(&self) -> Result<ResearchHealth> {
        Ok(ResearchHealth { status: "healthy".into(), monitoring_active: true, timestamp: None })
    }

    async fn fetch_items(&self, source: SourceType, limit: u32) -> Result<Vec<ResearchItem>> {
        self.item_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.lock().unwrap().contains(&source) {
            return Err(anyhow!("{source} stream unavailable"));
        }
        let items = self.items.lock().unwrap().get(&source).cloned().unwrap_or_default();
        Ok(items.into_iter().take(limit as usize).collect())
    }

    async fn fetch_category_items(&self, category: &str, limit: u32) -> Result<Vec<ResearchItem>> {
        let items = self.items.lock().unwrap();
        Ok(items
            .values()
            .flatten()
            .filter(|i| i.category.as_deref() == Some(category))
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn fetch_signals(&self) -> Result<Vec<TradingSignal>> {
        Ok(self.signals.lock().unwrap().clone())
    }

    async fn fetch_stats(&self) -> Result<ResearchStats> {
        let items = self.items.lock().unwrap();
        Ok(ResearchStats {
            total_items: items.values().map(|v| v.len() as u64).sum(),
            active_signals: self.signals.lock().unwrap().len() as u64,
            ..Default::default()
        })
    }

    async fn trigger_collection(&self) -> Result<()> {
        self.trigger_calls.fetch_add(1, Ordering::SeqCst);
        match self.trigger_error.lock().unwrap().clone() {
            Some(msg) => Err(anyhow!(msg)),
            None => Ok(()),
        }
    }

    async fn collection_status(&self) -> Result<CollectionStatus> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let mut queue = self.statuses.lock().unwrap();
        let next = if queue.len() > 1 { queue.pop_front() } else { queue.front().cloned() };
        match next {
            Some(Ok(status)) => Ok(status),
            Some(Err(msg)) => Err(anyhow!(msg)),
            None => Ok(running(0, 4)),
        }
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

pub fn item(source_type: Option<&str>, source_name: &str, title: &str) -> ResearchItem {
    let mut i = ResearchItem::new(source_name, title);
    i.source_type = source_type.map(str::to_string);
    i.timestamp = Some(Utc::now() - Duration::minutes(5));
    i
}

pub fn running(completed: u64, total: u64) -> CollectionStatus {
    CollectionStatus {
        running: true,
        completed_count: completed,
        total_count: total,
        percent_complete: if total > 0 { completed as f64 * 100.0 / total as f64 } else { 0.0 },
        ..Default::default()
    }
}

pub fn finished(total_items: u64) -> CollectionStatus {
    CollectionStatus {
        running: false,
        result: Some(serde_json::json!({ "total_items": total_items })),
        completed_count: 4,
        total_count: 4,
        percent_complete: 100.0,
        total_items,
        ..Default::default()
    }
}
