//! Dashboard API route handlers.
//!
//! All endpoints return JSON. State is shared via `Arc<DashboardState>`.
//! Handlers only read published snapshots; the one write path is
//! `POST /api/collect`, which hands off to the collection poller.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::api::ResearchApi;
use crate::engine::{CollectionPhase, CollectionPoller, CollectionState, FeedRefresher, SessionHeartbeat};
use crate::feed::{FeedItemView, FeedProjector, FeedView};
use crate::strategy::{AllocationCheck, StrategyAllocations};
use crate::types::{FeedError, SessionSnapshot, TradingSignal};

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Shared state accessible by all route handlers.
pub struct DashboardState {
    pub api: Arc<dyn ResearchApi>,
    pub refresher: Arc<FeedRefresher>,
    pub poller: Arc<CollectionPoller>,
    pub projector: FeedProjector,
    pub heartbeat: Option<Arc<SessionHeartbeat>>,
    pub allocations: StrategyAllocations,
    pub started_at: DateTime<Utc>,
}

impl DashboardState {
    pub fn new(
        api: Arc<dyn ResearchApi>,
        refresher: Arc<FeedRefresher>,
        poller: Arc<CollectionPoller>,
        projector: FeedProjector,
    ) -> Self {
        Self {
            api,
            refresher,
            poller,
            projector,
            heartbeat: None,
            allocations: StrategyAllocations::default(),
            started_at: Utc::now(),
        }
    }

    pub fn with_heartbeat(mut self, heartbeat: Arc<SessionHeartbeat>) -> Self {
        self.heartbeat = Some(heartbeat);
        self
    }

    pub fn with_allocations(mut self, allocations: StrategyAllocations) -> Self {
        self.allocations = allocations;
        self
    }

    async fn view(&self) -> FeedView {
        let snapshot = self.refresher.snapshot().await;
        self.projector.project(&snapshot, Utc::now())
    }
}

pub type AppState = Arc<DashboardState>;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub generation: u64,
    pub collection: CollectionPhase,
    pub uptime_secs: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CollectResponse {
    pub status: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<u32>,
}

const DEFAULT_CATEGORY_LIMIT: u32 = 20;

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        generation: state.refresher.generation(),
        collection: state.poller.phase(),
        uptime_secs: (Utc::now() - state.started_at).num_seconds(),
    })
}

/// GET /api/feed
pub async fn get_feed(State(state): State<AppState>) -> Json<FeedView> {
    Json(state.view().await)
}

/// GET /api/priority
pub async fn get_priority(State(state): State<AppState>) -> Json<Vec<FeedItemView>> {
    Json(state.view().await.priority)
}

/// GET /api/signals
pub async fn get_signals(State(state): State<AppState>) -> Json<Vec<TradingSignal>> {
    Json(state.view().await.signals)
}

/// GET /api/category/:category?limit=N
///
/// Pass-through to the backend's category filter, decorated like feed items.
pub async fn get_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
    Query(q): Query<LimitQuery>,
) -> Result<Json<Vec<FeedItemView>>, (StatusCode, Json<ErrorResponse>)> {
    let limit = q.limit.unwrap_or(DEFAULT_CATEGORY_LIMIT);
    match state.api.fetch_category_items(&category, limit).await {
        Ok(items) => {
            let now = Utc::now();
            Ok(Json(items.iter().map(|i| state.projector.decorate(i, now)).collect()))
        }
        Err(e) => {
            warn!(category = %category, error = %e, "Category fetch failed");
            Err((StatusCode::BAD_GATEWAY, Json(ErrorResponse { error: e.to_string() })))
        }
    }
}

/// GET /api/collection
pub async fn get_collection(State(state): State<AppState>) -> Json<CollectionState> {
    Json(state.poller.state().await)
}

/// POST /api/collect
pub async fn post_collect(State(state): State<AppState>) -> (StatusCode, Json<CollectResponse>) {
    match state.poller.start(state.refresher.clone()) {
        // Detached; DELETE /api/collect or shutdown stops it via `cancel()`.
        Ok(_) => {
            info!("Collection run started from dashboard");
            (
                StatusCode::ACCEPTED,
                Json(CollectResponse { status: "started", message: "Collection run started".into() }),
            )
        }
        Err(e) => {
            let status = match e.downcast_ref::<FeedError>() {
                Some(FeedError::CollectionInProgress) => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (status, Json(CollectResponse { status: "rejected", message: e.to_string() }))
        }
    }
}

/// DELETE /api/collect
pub async fn cancel_collect(State(state): State<AppState>) -> Json<CollectResponse> {
    if state.poller.cancel().await {
        info!("Collection run cancelled from dashboard");
        Json(CollectResponse { status: "cancelled", message: "Collection run cancelled".into() })
    } else {
        Json(CollectResponse { status: "idle", message: "No collection run in progress".into() })
    }
}

/// GET /api/session
pub async fn get_session(State(state): State<AppState>) -> Result<Json<SessionSnapshot>, StatusCode> {
    match &state.heartbeat {
        Some(hb) => Ok(Json(hb.snapshot().await.as_ref().clone())),
        None => Err(StatusCode::NOT_FOUND),
    }
}

/// GET /api/allocations
pub async fn get_allocations(State(state): State<AppState>) -> Json<AllocationCheck> {
    Json(AllocationCheck::from(&state.allocations))
}

/// POST /api/allocations/validate
pub async fn validate_allocations(Json(allocations): Json<StrategyAllocations>) -> Json<AllocationCheck> {
    Json(AllocationCheck::from(&allocations))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
