//! Refresh → snapshot → projected view, against the in-memory backend.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use chrono::Utc;
use plutus::api::ResearchApi;
use plutus::config::AppConfig;
use plutus::engine::FeedRefresher;
use plutus::feed::FeedProjector;
use plutus::types::{Bucket, SourceType, TradingSignal};

use common::{item, MockResearchApi};

fn four_source_backend() -> MockResearchApi {
    let mut reddit = item(Some("reddit"), "r/stocks", "NVDA earnings thread");
    reddit.upvotes = 60_000;
    reddit.comments = 100;
    reddit.engagement_score = Some(60_200.0);

    let mut market = item(Some("prediction_market"), "Polymarket", "Will the Fed cut in June?");
    market.engagement_score = Some(900.0);

    let mut news = item(Some("news"), "Reuters", "Oil climbs on supply worries");
    news.engagement_score = Some(300.0);

    let mut social = item(Some("social_media"), "@someuser", "Rates are going lower");
    social.engagement_score = Some(50.0);

    MockResearchApi::new()
        .with_items(SourceType::Reddit, vec![reddit])
        .with_items(SourceType::PredictionMarket, vec![market])
        .with_items(SourceType::News, vec![news])
        .with_items(SourceType::SocialMedia, vec![social])
}

#[tokio::test]
async fn end_to_end_one_item_per_bucket() {
    let api = Arc::new(four_source_backend());
    let refresher = FeedRefresher::new(api.clone(), 50);
    let report = refresher.refresh().await;
    assert_eq!(report.items, 4);
    assert_eq!(report.failures, 0);

    let snapshot = refresher.snapshot().await;
    let view = FeedProjector::default().project(&snapshot, Utc::now());

    for bucket in Bucket::ALL {
        assert_eq!(view.columns.get(*bucket).len(), 1, "bucket {bucket}");
    }
    assert_eq!(view.columns.markets[0].item.source_name.as_deref(), Some("Polymarket"));
    assert_eq!(view.columns.news[0].item.source_name.as_deref(), Some("Reuters"));
    assert_eq!(view.columns.social[0].item.source_name.as_deref(), Some("@someuser"));

    let reddit = &view.columns.reddit[0];
    assert_eq!(reddit.heat_level, 4);
    assert!(reddit.is_hot);
    assert!(reddit.is_recent);
    assert_eq!(reddit.age.as_deref(), Some("5m"));

    // Priority lane ordered by engagement score.
    let lane: Vec<_> = view.priority.iter().map(|v| v.item.source_name.clone().unwrap_or_default()).collect();
    assert_eq!(lane, vec!["r/stocks", "Polymarket", "Reuters", "@someuser"]);
    assert_eq!(api.item_calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn partial_fetch_failure_keeps_other_streams() {
    let api = Arc::new(four_source_backend());
    api.fail_source(SourceType::News);
    let refresher = FeedRefresher::new(api.clone(), 50);

    let report = refresher.refresh().await;
    assert_eq!(report.items, 3);
    assert_eq!(report.failures, 1);

    let snapshot = refresher.snapshot().await;
    let view = FeedProjector::default().project(&snapshot, Utc::now());
    assert_eq!(view.columns.markets.len(), 1);
    assert_eq!(view.columns.reddit.len(), 1);
    assert_eq!(view.columns.social.len(), 1);
    assert!(view.columns.news.is_empty());
    assert_eq!(view.failures[0].source, "news");
    assert!(!view.needs_retry);

    // The next refresh recovers the stream.
    api.heal_source(SourceType::News);
    refresher.refresh().await;
    let snapshot = refresher.snapshot().await;
    let view = FeedProjector::default().project(&snapshot, Utc::now());
    assert_eq!(view.columns.news.len(), 1);
    assert!(view.failures.is_empty());
}

#[tokio::test]
async fn total_failure_asks_for_retry() {
    let api = Arc::new(four_source_backend());
    for s in SourceType::ALL {
        api.fail_source(*s);
    }
    let refresher = FeedRefresher::new(api, 50);
    refresher.refresh().await;

    let snapshot = refresher.snapshot().await;
    let view = FeedProjector::default().project(&snapshot, Utc::now());
    assert!(view.needs_retry);
    assert_eq!(view.columns.total(), 0);
    assert!(view.priority.is_empty());
}

#[tokio::test]
async fn configured_fallback_bucket_applies() {
    let unknown = item(None, "RandomBlog", "An opinion");
    let api = Arc::new(MockResearchApi::new().with_items(SourceType::Reddit, vec![unknown]));
    let refresher = FeedRefresher::new(api, 50);
    refresher.refresh().await;
    let snapshot = refresher.snapshot().await;

    let default_view = FeedProjector::default().project(&snapshot, Utc::now());
    assert_eq!(default_view.columns.reddit.len(), 1);

    let cfg = AppConfig::parse("[classifier]\nfallback_bucket = \"news\"\n").unwrap();
    let view = cfg.feed_projector().project(&snapshot, Utc::now());
    assert!(view.columns.reddit.is_empty());
    assert_eq!(view.columns.news.len(), 1);
}

#[tokio::test]
async fn items_per_source_limit_is_applied() {
    let many: Vec<_> = (0..10).map(|i| item(Some("news"), "CNBC", &format!("story {i}"))).collect();
    let api = Arc::new(MockResearchApi::new().with_items(SourceType::News, many));
    let refresher = FeedRefresher::new(api, 3);
    let report = refresher.refresh().await;
    assert_eq!(report.items, 3);
}

#[tokio::test]
async fn signals_sorted_and_stats_present() {
    let low: TradingSignal =
        serde_json::from_str(r#"{"category":"crypto","side":"NO","confidence":0.35}"#).unwrap();
    let high: TradingSignal =
        serde_json::from_str(r#"{"category":"economics","side":"YES","confidence":0.8}"#).unwrap();
    let api = Arc::new(four_source_backend().with_signals(vec![low, high]));

    let refresher = FeedRefresher::new(api.clone(), 50);
    refresher.refresh().await;
    let snapshot = refresher.snapshot().await;
    let view = FeedProjector::default().project(&snapshot, Utc::now());

    assert_eq!(view.signals[0].category, "economics");
    let stats = view.stats.expect("stats fetched");
    assert_eq!(stats.total_items, 4);
    assert_eq!(stats.active_signals, 2);

    let health = api.health().await.unwrap();
    assert!(health.is_healthy());
}
