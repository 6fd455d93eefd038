//! PLUTUS: Research intelligence feed aggregator
//!
//! Entry point. Loads configuration, initialises structured logging,
//! checks backend connectivity, then runs the feed-refresh and session
//! heartbeat loops until Ctrl+C.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{error, info, warn};

use plutus::api::research::HttpResearchClient;
use plutus::api::trading::HttpTradingClient;
use plutus::api::{ResearchApi, TradingApi};
use plutus::config;
use plutus::dashboard::{self, DashboardState};
use plutus::engine::{CollectionPoller, FeedRefresher, PollerSettings, PollingTask, SessionHeartbeat};

const BANNER: &str = r#"
 ____  _    _   _ _____ _   _ ____
|  _ \| |  | | | |_   _| | | / ___|
| |_) | |  | | | | | | | | | \___ \
|  __/| |__| |_| | | | | |_| |___) |
|_|   |_____\___/  |_|  \___/|____/

  Research Intelligence Feed
  v0.1.0
"#;

const CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let mut cfg = config::AppConfig::load_or_default(CONFIG_PATH)?;
    cfg.apply_env();

    init_logging();

    println!("{BANNER}");
    info!(
        api = %cfg.api.base_url,
        refresh_interval_secs = cfg.feed.refresh_interval_secs,
        heartbeat_secs = cfg.heartbeat.interval_secs,
        "PLUTUS starting up"
    );

    if let Err(e) = cfg.strategy.allocations.validate() {
        warn!(error = %e, "Strategy allocations are invalid; the bot must not be started with them");
    }

    // -- Clients ---------------------------------------------------------

    let timeout = cfg.request_timeout();
    let research: Arc<dyn ResearchApi> =
        Arc::new(HttpResearchClient::new(&cfg.api.base_url, timeout, &cfg.api.user_agent)?);

    // -- Connectivity check ----------------------------------------------

    let health = research
        .health()
        .await
        .with_context(|| format!("Research backend unreachable at {}", cfg.api.base_url))?;
    if !health.is_healthy() {
        warn!(status = %health.status, "Research backend reports degraded health");
    }
    info!(status = %health.status, monitoring = health.monitoring_active, "Connected to research backend");

    // -- Engine ----------------------------------------------------------

    let refresher = Arc::new(FeedRefresher::new(research.clone(), cfg.feed.items_per_source));
    let poller = Arc::new(CollectionPoller::new(research.clone(), PollerSettings::from(&cfg.collection)));

    let initial = refresher.refresh().await;
    if initial.failures > 0 {
        warn!(failures = initial.failures, "Initial feed refresh was partial");
    }

    let mut tasks = Vec::new();

    let r = refresher.clone();
    tasks.push(PollingTask::spawn("feed-refresh", cfg.refresh_interval(), false, move || {
        let r = r.clone();
        async move {
            r.refresh().await;
        }
    }));

    let heartbeat = if cfg.heartbeat.enabled {
        let trading: Arc<dyn TradingApi> =
            Arc::new(HttpTradingClient::new(&cfg.api.base_url, timeout, &cfg.api.user_agent)?);
        let hb = Arc::new(SessionHeartbeat::new(trading, cfg.heartbeat.trades_limit));
        let h = hb.clone();
        tasks.push(PollingTask::spawn("session-heartbeat", cfg.heartbeat_interval(), true, move || {
            let h = h.clone();
            async move {
                h.beat().await;
            }
        }));
        Some(hb)
    } else {
        None
    };

    // -- Dashboard -------------------------------------------------------

    if cfg.dashboard.enabled {
        let mut state = DashboardState::new(research.clone(), refresher.clone(), poller.clone(), cfg.feed_projector())
            .with_allocations(cfg.strategy.allocations.clone());
        if let Some(hb) = &heartbeat {
            state = state.with_heartbeat(hb.clone());
        }
        if let Err(e) = dashboard::spawn_dashboard(Arc::new(state), cfg.dashboard.port).await {
            error!(error = %e, "Dashboard failed to start; continuing without it");
        }
    }

    info!(tasks = tasks.len(), "Polling loops running. Press Ctrl+C to stop.");

    tokio::signal::ctrl_c().await.context("Failed to listen for Ctrl+C")?;
    info!("Shutdown signal received.");

    if poller.cancel().await {
        info!("Cancelled in-flight collection run");
    }

    for task in tasks {
        let name = task.name();
        if !task.is_running() {
            warn!(task = name, "Task had already exited");
        }
        task.stop().await;
        info!(task = name, "Stopped");
    }

    info!(generation = refresher.generation(), "PLUTUS shut down cleanly.");
    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("plutus=info"));

    let json_logging = std::env::var("PLUTUS_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
