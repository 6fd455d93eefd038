//! Collection-run poller.
//!
//! Drives one backend collection job at a time:
//!
//! ```text
//! Idle → Triggering → Polling → Complete | TimedOut | FailedToTrigger → Idle
//! ```
//!
//! A rejected trigger is surfaced to the caller and never retried. While
//! polling, each status response is folded into the visible
//! `CollectionRun`; transport errors are logged and polling continues.
//! The run is force-stopped once the timeout elapses, which is reported
//! as a normal (non-error) outcome. A completed run refreshes the feed.
//! `cancel()` stops an in-flight run at its next await point.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, timeout_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::api::ResearchApi;
use crate::config::{CollectionConfig, CollectionStrategy};
use crate::engine::refresher::FeedRefresher;
use crate::types::{CollectionRun, FeedError};

// ---------------------------------------------------------------------------
// States and outcomes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionPhase {
    #[default]
    Idle,
    Triggering,
    Polling,
    Complete,
    TimedOut,
    FailedToTrigger,
    Cancelled,
}

impl CollectionPhase {
    pub fn is_idle(&self) -> bool {
        matches!(self, CollectionPhase::Idle)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CollectionOutcome {
    /// Backend reported `running == false` with a result.
    Complete { total_items: u64, polls: u32 },
    /// Stopped polling after the timeout. The job may still be running
    /// server-side; from here it is treated as done.
    TimedOut { polls: u32, elapsed_secs: u64 },
    /// Delay strategy: waited a fixed time, then refetched.
    Waited { delay_secs: u64 },
    FailedToTrigger { message: String },
    /// Stopped by `cancel()`; no refetch.
    Cancelled { polls: u32 },
}

/// Dashboard view of the poller.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionState {
    pub phase: CollectionPhase,
    pub run: Option<CollectionRun>,
    pub last_outcome: Option<CollectionOutcome>,
}

#[derive(Debug, Clone)]
pub struct PollerSettings {
    pub strategy: CollectionStrategy,
    pub poll_interval: Duration,
    pub timeout: Duration,
    pub delay: Duration,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self::from(&CollectionConfig::default())
    }
}

impl From<&CollectionConfig> for PollerSettings {
    fn from(cfg: &CollectionConfig) -> Self {
        Self {
            strategy: cfg.strategy,
            poll_interval: Duration::from_secs(cfg.poll_interval_secs.max(1)),
            timeout: Duration::from_secs(cfg.timeout_secs),
            delay: Duration::from_secs(cfg.delay_secs),
        }
    }
}

// ---------------------------------------------------------------------------
// Shared run state
// ---------------------------------------------------------------------------

struct RunState {
    phase: watch::Sender<CollectionPhase>,
    run: watch::Sender<Option<CollectionRun>>,
    /// Bumped by `cancel()`.
    stop: watch::Sender<u64>,
}

/// Held for the lifetime of a run; returns the poller to `Idle` and
/// clears the visible run however the run ends (including abort).
pub struct RunGuard {
    state: Arc<RunState>,
    stop_rx: watch::Receiver<u64>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.state.run.send_replace(None);
        self.state.phase.send_replace(CollectionPhase::Idle);
    }
}

// ---------------------------------------------------------------------------
// Poller
// ---------------------------------------------------------------------------

pub struct CollectionPoller {
    api: Arc<dyn ResearchApi>,
    settings: PollerSettings,
    state: Arc<RunState>,
    last_outcome: RwLock<Option<CollectionOutcome>>,
}

impl CollectionPoller {
    pub fn new(api: Arc<dyn ResearchApi>, settings: PollerSettings) -> Self {
        let (phase, _) = watch::channel(CollectionPhase::Idle);
        let (run, _) = watch::channel(None);
        let (stop, _) = watch::channel(0);
        Self {
            api,
            settings,
            state: Arc::new(RunState { phase, run, stop }),
            last_outcome: RwLock::new(None),
        }
    }

    pub fn phase(&self) -> CollectionPhase {
        *self.state.phase.borrow()
    }

    pub fn current_run(&self) -> Option<CollectionRun> {
        self.state.run.borrow().clone()
    }

    pub fn subscribe_phase(&self) -> watch::Receiver<CollectionPhase> {
        self.state.phase.subscribe()
    }

    pub async fn state(&self) -> CollectionState {
        CollectionState {
            phase: self.phase(),
            run: self.current_run(),
            last_outcome: self.last_outcome.read().await.clone(),
        }
    }

    /// Claim the poller for a new run. Fails with
    /// `FeedError::CollectionInProgress` unless it is idle.
    pub fn begin(&self) -> Result<RunGuard> {
        // Subscribe before claiming so a cancel racing the claim is seen.
        let stop_rx = self.state.stop.subscribe();
        let claimed = self.state.phase.send_if_modified(|phase| {
            if phase.is_idle() {
                *phase = CollectionPhase::Triggering;
                true
            } else {
                false
            }
        });
        if !claimed {
            return Err(FeedError::CollectionInProgress.into());
        }
        Ok(RunGuard { state: Arc::clone(&self.state), stop_rx })
    }

    /// Stop the in-flight run, if any, and wait until the poller is idle.
    /// Returns whether a run was active.
    pub async fn cancel(&self) -> bool {
        if self.phase().is_idle() {
            return false;
        }
        self.state.stop.send_modify(|n| *n = n.wrapping_add(1));
        let mut phase = self.subscribe_phase();
        let _ = phase.wait_for(|p| p.is_idle()).await;
        true
    }

    /// Trigger a run and follow it to completion on the current task.
    pub async fn run(&self, refresher: &FeedRefresher) -> Result<CollectionOutcome> {
        let guard = self.begin()?;
        self.execute(guard, refresher).await
    }

    /// Claim the poller, then follow the run on a background task.
    pub fn start(
        self: &Arc<Self>,
        refresher: Arc<FeedRefresher>,
    ) -> Result<JoinHandle<Result<CollectionOutcome>>> {
        let guard = self.begin()?;
        let poller = Arc::clone(self);
        Ok(tokio::spawn(async move { poller.execute(guard, &refresher).await }))
    }

    async fn execute(&self, guard: RunGuard, refresher: &FeedRefresher) -> Result<CollectionOutcome> {
        let mut stop_rx = guard.stop_rx.clone();

        let outcome = tokio::select! {
            biased;
            _ = stop_rx.changed() => {
                CollectionOutcome::Cancelled { polls: self.current_run().map_or(0, |r| r.polls) }
            }
            result = self.follow() => result?,
        };

        let refetch = match &outcome {
            CollectionOutcome::TimedOut { polls, elapsed_secs } => {
                warn!(polls, elapsed_secs, "Collection run timed out; stopped polling");
                self.state.phase.send_replace(CollectionPhase::TimedOut);
                false
            }
            CollectionOutcome::Cancelled { polls } => {
                info!(polls, "Collection run cancelled");
                self.state.phase.send_replace(CollectionPhase::Cancelled);
                false
            }
            _ => {
                info!(?outcome, "Collection run finished");
                self.state.phase.send_replace(CollectionPhase::Complete);
                true
            }
        };

        self.record(outcome.clone()).await;
        drop(guard);

        if refetch {
            refresher.refresh().await;
        }
        Ok(outcome)
    }

    /// Trigger, then poll or wait according to the strategy.
    async fn follow(&self) -> Result<CollectionOutcome> {
        let started = Instant::now();
        info!("Triggering research collection");

        if let Err(e) = self.api.trigger_collection().await {
            warn!(error = %e, "Collection trigger rejected");
            self.state.phase.send_replace(CollectionPhase::FailedToTrigger);
            self.record(CollectionOutcome::FailedToTrigger { message: e.to_string() }).await;
            return Err(FeedError::TriggerFailed(e.to_string()).into());
        }

        self.state.run.send_replace(Some(CollectionRun::new(Utc::now())));
        self.state.phase.send_replace(CollectionPhase::Polling);

        Ok(match self.settings.strategy {
            CollectionStrategy::Poll => self.poll_until_done(started).await,
            CollectionStrategy::Delay => {
                sleep(self.settings.delay).await;
                CollectionOutcome::Waited { delay_secs: self.settings.delay.as_secs() }
            }
        })
    }

    async fn poll_until_done(&self, started: Instant) -> CollectionOutcome {
        let period = self.settings.poll_interval;
        let deadline = started + self.settings.timeout;
        let mut ticker = interval_at(started + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut polls = 0u32;

        loop {
            ticker.tick().await;
            if Instant::now() >= deadline {
                break;
            }

            polls += 1;
            match timeout_at(deadline, self.api.collection_status()).await {
                Err(_) => break,
                Ok(Err(e)) => {
                    warn!(error = %e, polls, "Collection status poll failed, will retry");
                }
                Ok(Ok(status)) => {
                    self.state.run.send_modify(|run| {
                        if let Some(run) = run {
                            run.apply(&status);
                        }
                    });
                    debug!(
                        completed = status.completed_count,
                        total = status.total_count,
                        percent = status.percent_complete,
                        "Collection progress"
                    );
                    if status.is_finished() {
                        return CollectionOutcome::Complete { total_items: status.total_items, polls };
                    }
                }
            }
        }

        CollectionOutcome::TimedOut { polls, elapsed_secs: started.elapsed().as_secs() }
    }

    async fn record(&self, outcome: CollectionOutcome) {
        *self.last_outcome.write().await = Some(outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockResearchApi;
    use crate::types::{CollectionStatus, ResearchStats};
    use anyhow::anyhow;

    fn running_status() -> CollectionStatus {
        CollectionStatus {
            running: true,
            completed_count: 1,
            total_count: 4,
            percent_complete: 25.0,
            ..Default::default()
        }
    }

    fn finished_status(total_items: u64) -> CollectionStatus {
        CollectionStatus {
            running: false,
            result: Some(serde_json::json!({"total_items": total_items})),
            completed_count: 4,
            total_count: 4,
            percent_complete: 100.0,
            total_items,
            ..Default::default()
        }
    }

    fn expect_refresh(mock: &mut MockResearchApi) {
        mock.expect_fetch_items().returning(|_, _| Ok(Vec::new()));
        mock.expect_fetch_signals().returning(|| Ok(Vec::new()));
        mock.expect_fetch_stats().returning(|| Ok(ResearchStats::default()));
    }

    fn harness(mock: MockResearchApi) -> (CollectionPoller, FeedRefresher) {
        let api: Arc<dyn ResearchApi> = Arc::new(mock);
        let poller = CollectionPoller::new(api.clone(), PollerSettings::default());
        let refresher = FeedRefresher::new(api, 50);
        (poller, refresher)
    }

    #[test]
    fn test_settings_from_config() {
        let s = PollerSettings::default();
        assert_eq!(s.poll_interval, Duration::from_secs(2));
        assert_eq!(s.timeout, Duration::from_secs(180));
        assert_eq!(s.strategy, CollectionStrategy::Poll);
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_after_exactly_timeout() {
        let mut mock = MockResearchApi::new();
        mock.expect_trigger_collection().times(1).returning(|| Ok(()));
        // Polls at 2s, 4s, ..., 178s; the 180s tick hits the deadline.
        mock.expect_collection_status().times(89).returning(|| Ok(running_status()));
        let (poller, refresher) = harness(mock);

        let started = Instant::now();
        let outcome = poller.run(&refresher).await.unwrap();

        assert_eq!(started.elapsed(), Duration::from_secs(180));
        assert_eq!(outcome, CollectionOutcome::TimedOut { polls: 89, elapsed_secs: 180 });
        assert_eq!(poller.phase(), CollectionPhase::Idle);
        assert!(poller.current_run().is_none());
        // A timed-out run does not refetch.
        assert_eq!(refresher.generation(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_completion_refreshes_feed() {
        let mut mock = MockResearchApi::new();
        mock.expect_trigger_collection().returning(|| Ok(()));
        let mut calls = 0;
        mock.expect_collection_status().times(3).returning(move || {
            calls += 1;
            Ok(if calls < 3 { running_status() } else { finished_status(412) })
        });
        expect_refresh(&mut mock);
        let (poller, refresher) = harness(mock);

        let outcome = poller.run(&refresher).await.unwrap();
        assert_eq!(outcome, CollectionOutcome::Complete { total_items: 412, polls: 3 });
        assert_eq!(refresher.generation(), 1);
        assert!(poller.phase().is_idle());

        let state = poller.state().await;
        assert!(state.run.is_none());
        assert_eq!(state.last_outcome, Some(outcome));
    }

    #[tokio::test(start_paused = true)]
    async fn test_trigger_failure_returns_to_idle() {
        let mut mock = MockResearchApi::new();
        mock.expect_trigger_collection().times(1).returning(|| Err(anyhow!("HTTP 503")));
        mock.expect_collection_status().never();
        let (poller, refresher) = harness(mock);

        let err = poller.run(&refresher).await.unwrap_err();
        assert!(matches!(err.downcast_ref::<FeedError>(), Some(FeedError::TriggerFailed(_))));
        assert!(poller.phase().is_idle());
        assert!(matches!(
            poller.state().await.last_outcome,
            Some(CollectionOutcome::FailedToTrigger { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_errors_do_not_stop_polling() {
        let mut mock = MockResearchApi::new();
        mock.expect_trigger_collection().returning(|| Ok(()));
        let mut calls = 0;
        mock.expect_collection_status().times(4).returning(move || {
            calls += 1;
            if calls <= 2 {
                Err(anyhow!("connection refused"))
            } else if calls == 3 {
                Ok(running_status())
            } else {
                Ok(finished_status(7))
            }
        });
        expect_refresh(&mut mock);
        let (poller, refresher) = harness(mock);

        let outcome = poller.run(&refresher).await.unwrap();
        assert_eq!(outcome, CollectionOutcome::Complete { total_items: 7, polls: 4 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_run_rejected_while_in_flight() {
        let mut mock = MockResearchApi::new();
        mock.expect_trigger_collection().times(1).returning(|| Ok(()));
        mock.expect_collection_status().returning(|| Ok(running_status()));
        let api: Arc<dyn ResearchApi> = Arc::new(mock);
        let poller = Arc::new(CollectionPoller::new(api.clone(), PollerSettings::default()));
        let refresher = Arc::new(FeedRefresher::new(api, 50));

        let handle = poller.start(refresher.clone()).unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(poller.phase(), CollectionPhase::Polling);
        let run = poller.current_run().unwrap();
        assert_eq!(run.polls, 2);
        assert_eq!(run.completed_count, 1);

        let err = poller.start(refresher.clone()).unwrap_err();
        assert!(matches!(err.downcast_ref::<FeedError>(), Some(FeedError::CollectionInProgress)));

        handle.abort();
        let _ = handle.await;
        // Aborting the run still releases the poller.
        assert!(poller.phase().is_idle());
        assert!(poller.current_run().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_polling() {
        let mut mock = MockResearchApi::new();
        mock.expect_trigger_collection().times(1).returning(|| Ok(()));
        // Polls at 2s and 4s only.
        mock.expect_collection_status().times(2).returning(|| Ok(running_status()));
        let api: Arc<dyn ResearchApi> = Arc::new(mock);
        let poller = Arc::new(CollectionPoller::new(api.clone(), PollerSettings::default()));
        let refresher = Arc::new(FeedRefresher::new(api, 50));

        assert!(!poller.cancel().await);

        let handle = poller.start(refresher.clone()).unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(poller.cancel().await);
        assert!(poller.phase().is_idle());
        assert!(poller.current_run().is_none());

        let outcome = handle.await.unwrap().unwrap();
        assert_eq!(outcome, CollectionOutcome::Cancelled { polls: 2 });
        assert_eq!(poller.state().await.last_outcome, Some(outcome));

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(refresher.generation(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_strategy() {
        let mut mock = MockResearchApi::new();
        mock.expect_trigger_collection().returning(|| Ok(()));
        mock.expect_collection_status().never();
        expect_refresh(&mut mock);
        let api: Arc<dyn ResearchApi> = Arc::new(mock);
        let settings = PollerSettings {
            strategy: CollectionStrategy::Delay,
            delay: Duration::from_secs(30),
            ..PollerSettings::default()
        };
        let poller = CollectionPoller::new(api.clone(), settings);
        let refresher = FeedRefresher::new(api, 50);

        let started = Instant::now();
        let outcome = poller.run(&refresher).await.unwrap();
        assert_eq!(started.elapsed(), Duration::from_secs(30));
        assert_eq!(outcome, CollectionOutcome::Waited { delay_secs: 30 });
        assert_eq!(refresher.generation(), 1);
    }
}
