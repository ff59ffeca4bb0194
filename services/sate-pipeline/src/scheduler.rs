//! Periodic driving of the pipeline and of bucket retention.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

use crate::cleanup::BucketCleaner;
use crate::config::PipelineConfig;
use crate::pipeline::{Pipeline, TickReport};

pub struct Scheduler {
    pipeline: Arc<Pipeline>,
    cleaner: BucketCleaner,
    poll_interval: Duration,
    cleanup_interval: Duration,
}

impl Scheduler {
    pub fn new(pipeline: Arc<Pipeline>, config: &PipelineConfig) -> Self {
        Self {
            pipeline,
            cleaner: BucketCleaner::new(config.monitored_dirs(), config.retention.keep_buckets),
            poll_interval: Duration::from_secs(config.schedule.poll_interval_secs.max(1)),
            cleanup_interval: Duration::from_secs(config.schedule.cleanup_interval_secs.max(1)),
        }
    }

    /// Run a single tick for `at`.
    pub async fn run_once(&self, at: DateTime<Utc>) -> TickReport {
        self.pipeline.tick(at).await
    }

    /// Tick every poll interval and clean up every cleanup interval until
    /// `shutdown` fires. Both timers fire immediately on start.
    pub async fn run_forever(&self, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        let mut ticks = interval(self.poll_interval);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut cleanups = interval(self.cleanup_interval);
        cleanups.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            poll_secs = self.poll_interval.as_secs(),
            cleanup_secs = self.cleanup_interval.as_secs(),
            "Starting scheduler"
        );

        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => {
                    info!("Shutting down scheduler");
                    break;
                }
                _ = ticks.tick() => {
                    self.pipeline.tick(Utc::now()).await;
                }
                _ = cleanups.tick() => {
                    let cleaner = self.cleaner.clone();
                    if let Err(e) = tokio::task::spawn_blocking(move || cleaner.run()).await {
                        error!(error = %e, "Cleanup task panicked");
                    }
                }
            }
        }

        Ok(())
    }
}
