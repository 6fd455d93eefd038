//! Cancellable fixed-interval background loops.
//!
//! Each loop owns a `watch` stop signal. Calling `stop()` or dropping the
//! handle ends the loop; an in-flight tick is abandoned at its next await
//! point rather than run to completion.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, warn};

pub struct PollingTask {
    name: &'static str,
    stop_tx: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
}

impl PollingTask {
    /// Spawn `tick` every `period`. With `immediate`, the first tick fires
    /// right away; otherwise one full period elapses first.
    pub fn spawn<F, Fut>(name: &'static str, period: Duration, immediate: bool, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (stop_tx, mut stop_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let start = if immediate { Instant::now() } else { Instant::now() + period };
            let mut ticker = interval_at(start, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            debug!(task = name, period_secs = period.as_secs_f64(), "Polling task started");

            loop {
                tokio::select! {
                    biased;
                    _ = stop_rx.changed() => break,
                    _ = ticker.tick() => {
                        tokio::select! {
                            biased;
                            _ = stop_rx.changed() => break,
                            _ = tick() => {}
                        }
                    }
                }
            }

            debug!(task = name, "Polling task stopped");
        });

        Self { name, stop_tx, handle: Some(handle) }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Signal the loop to stop and wait for it to wind down.
    pub async fn stop(mut self) {
        let _ = self.stop_tx.send(true);
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                if e.is_panic() {
                    warn!(task = self.name, "Polling task panicked");
                }
            }
        }
    }
}

impl Drop for PollingTask {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(true);
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
