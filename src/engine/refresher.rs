//! Feed refresher: fetches every research stream and publishes one
//! consistent snapshot.
//!
//! All six fetches of a refresh (four item streams, signals, stats) run
//! concurrently and are joined. A failed fetch is logged and recorded in
//! the snapshot's `failures`; it never blocks the others. The previous
//! snapshot stays visible until the new one is complete.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use chrono::Utc;
use futures::future::join_all;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::api::ResearchApi;
use crate::types::{FeedSnapshot, SourceFailure, SourceType};

/// Outcome of a single refresh cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshReport {
    pub generation: u64,
    pub items: usize,
    pub signals: usize,
    pub failures: usize,
    pub elapsed_ms: u128,
}

pub struct FeedRefresher {
    api: Arc<dyn ResearchApi>,
    items_per_source: u32,
    snapshot: RwLock<Arc<FeedSnapshot>>,
    generation: AtomicU64,
    /// Serialises refreshes so generations are published in order.
    in_flight: Mutex<()>,
}

impl FeedRefresher {
    pub fn new(api: Arc<dyn ResearchApi>, items_per_source: u32) -> Self {
        Self {
            api,
            items_per_source,
            snapshot: RwLock::new(Arc::new(FeedSnapshot::default())),
            generation: AtomicU64::new(0),
            in_flight: Mutex::new(()),
        }
    }

    /// The latest published snapshot.
    pub async fn snapshot(&self) -> Arc<FeedSnapshot> {
        self.snapshot.read().await.clone()
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Fetch every stream and swap in a fresh snapshot.
    pub async fn refresh(&self) -> RefreshReport {
        let _guard = self.in_flight.lock().await;
        let started = Instant::now();
        let limit = self.items_per_source;

        let streams = join_all(SourceType::ALL.iter().map(|&source| async move {
            (source, self.api.fetch_items(source, limit).await)
        }));
        let (streams, signals, stats) =
            tokio::join!(streams, self.api.fetch_signals(), self.api.fetch_stats());

        let mut failures = Vec::new();
        let mut items = Vec::new();
        for (source, result) in streams {
            items.extend(collect_stream(source.as_str(), result, &mut failures));
        }

        let signals = collect_stream("signals", signals, &mut failures);

        let stats = match stats {
            Ok(s) => Some(s),
            Err(e) => {
                warn!(error = %e, "Research stats fetch failed, continuing without");
                failures.push(SourceFailure { source: "stats".to_string(), message: e.to_string() });
                None
            }
        };

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let snapshot = FeedSnapshot {
            generation,
            refreshed_at: Some(Utc::now()),
            items,
            signals,
            stats,
            failures,
        };

        let report = RefreshReport {
            generation,
            items: snapshot.items.len(),
            signals: snapshot.signals.len(),
            failures: snapshot.failures.len(),
            elapsed_ms: started.elapsed().as_millis(),
        };

        if snapshot.is_total_failure() {
            warn!(generation, "Every research stream failed; feed is empty until the next refresh");
        }

        *self.snapshot.write().await = Arc::new(snapshot);

        info!(
            generation = report.generation,
            items = report.items,
            signals = report.signals,
            failures = report.failures,
            elapsed_ms = report.elapsed_ms as u64,
            "Feed refreshed"
        );

        report
    }
}

fn collect_stream<T>(source: &str, result: Result<Vec<T>>, failures: &mut Vec<SourceFailure>) -> Vec<T> {
    match result {
        Ok(v) => {
            debug!(source, count = v.len(), "Stream fetched");
            v
        }
        Err(e) => {
            warn!(source, error = %e, "Stream fetch failed, continuing without");
            failures.push(SourceFailure { source: source.to_string(), message: e.to_string() });
            Vec::new()
        }
    }
}
