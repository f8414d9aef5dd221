//! Periodic refresh loop.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};

use crate::models::RefreshConfig;
use crate::pipeline::{IngestionPipeline, RefreshOutcome};

/// Runs a refresh immediately and then every `update_interval` until shutdown.
///
/// Refreshes are awaited inline, so a slow cycle delays the next tick instead
/// of overlapping with it.
pub struct Scheduler {
    pipeline: IngestionPipeline,
    update_interval: Duration,
    status_interval: Option<Duration>,
}

impl Scheduler {
    pub fn new(pipeline: IngestionPipeline, update_interval: Duration) -> Self {
        Self {
            pipeline,
            update_interval,
            status_interval: None,
        }
    }

    pub fn from_config(pipeline: IngestionPipeline, config: &RefreshConfig) -> Self {
        Self::new(pipeline, config.update_interval())
            .with_status_interval(config.status_interval())
    }

    /// Log the cache state at this interval. `None` disables it.
    pub fn with_status_interval(mut self, interval: Option<Duration>) -> Self {
        self.status_interval = interval;
        self
    }

    /// Loop until `true` is sent on `shutdown` (or the sender is dropped).
    ///
    /// Returns the pipeline so callers can inspect the final state.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> IngestionPipeline {
        let mut refresh = time::interval(self.update_interval);
        refresh.set_missed_tick_behavior(MissedTickBehavior::Skip);

        // placeholder period when disabled; the select guard keeps it from firing
        let status_every = self
            .status_interval
            .unwrap_or(Duration::from_secs(60 * 60 * 24 * 365));
        let mut status = time::interval_at(time::Instant::now() + status_every, status_every);
        status.set_missed_tick_behavior(MissedTickBehavior::Skip);

        log::info!(
            "Refreshing every {:?} (cache duration {:?})",
            self.update_interval,
            self.pipeline.cache_duration()
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = refresh.tick() => {
                    let outcome = self.pipeline.refresh().await;
                    log::debug!("Refresh finished: {:?}", outcome);
                    if outcome == RefreshOutcome::Cancelled {
                        break;
                    }
                }
                _ = status.tick(), if self.status_interval.is_some() => {
                    log::debug!("{}", self.pipeline.status_line());
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        log::info!("Scheduler stopped");
        self.pipeline
    }
}
