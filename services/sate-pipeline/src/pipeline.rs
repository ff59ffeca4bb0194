//! One tick of the acquisition pipeline.
//!
//! resolve scan cycle -> name tasks -> fetch -> decode, calibrate, navigate
//! -> emit one product per configured variant.
//!
//! Variants of the same band share one local file, so each file is fetched
//! and decoded once. A failure in one band never reaches the others, and a
//! failure of the tick as a whole is logged and swallowed.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use metrics::{counter, histogram};
use tracing::{debug, error, info, instrument, warn};

use hsd_parser::HsdFile;
use sate_common::{
    resolve_scan_cycle, AcquisitionTask, Band, Enhancement, MaskedGrid, PathNaming, ScanCycle,
};

use crate::config::{BandVariant, PipelineConfig};
use crate::sink::{Product, RenderSink};
use crate::transfer::Transfer;

/// Outcome counts of one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Resolved cycle; `None` when the tick failed before resolving.
    pub cycle: Option<ScanCycle>,
    /// Files fetched and large enough to decode.
    pub fetched: usize,
    /// Files absent, failed to transfer, or too small.
    pub skipped: usize,
    /// Files that failed to decode, or products the sink rejected.
    pub failed: usize,
    /// Products handed to the sink.
    pub emitted: usize,
    /// Set when the tick stopped early on an unexpected error.
    pub aborted: bool,
}

/// All tasks that share one local file.
#[derive(Debug, Clone)]
struct FileJob {
    cycle: ScanCycle,
    band: Band,
    remote_path: String,
    local_path: PathBuf,
    variants: Vec<Option<Enhancement>>,
}

/// Decoded, calibrated and navigated content of one file.
struct Processed {
    values: Arc<MaskedGrid<f64>>,
    lons: Arc<MaskedGrid<f64>>,
    lats: Arc<MaskedGrid<f64>>,
    satellite: String,
    observation_start: Option<DateTime<Utc>>,
}

/// Orchestrates fetch and processing for every configured band variant.
pub struct Pipeline {
    naming: PathNaming,
    variants: Vec<BandVariant>,
    transfer: Arc<dyn Transfer>,
    sink: Arc<dyn RenderSink>,
    max_concurrent: usize,
    min_file_size: u64,
}

impl Pipeline {
    pub fn new(
        config: &PipelineConfig,
        transfer: Arc<dyn Transfer>,
        sink: Arc<dyn RenderSink>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            naming: config.naming(),
            variants: config.band_variants()?,
            transfer,
            sink,
            max_concurrent: config.source.max_concurrent,
            min_file_size: config.schedule.min_file_size,
        })
    }

    /// Name every task of `cycle` without touching the filesystem.
    pub fn plan(&self, cycle: ScanCycle) -> Vec<AcquisitionTask> {
        self.variants
            .iter()
            .map(|(band, enhancement)| {
                AcquisitionTask::plan(&self.naming, cycle, *band, enhancement.clone())
            })
            .collect()
    }

    /// Run one tick for the instant `now`. Never fails; errors are logged.
    #[instrument(skip_all, fields(now = %now))]
    pub async fn tick(&self, now: DateTime<Utc>) -> TickReport {
        counter!("sate_ticks_total").increment(1);
        let mut report = TickReport::default();
        if let Err(e) = self.run_tick(now, &mut report).await {
            error!(error = %e, "Tick aborted");
            report.aborted = true;
        }
        info!(
            cycle = ?report.cycle.map(|c| c.to_string()),
            fetched = report.fetched,
            skipped = report.skipped,
            failed = report.failed,
            emitted = report.emitted,
            aborted = report.aborted,
            "Tick complete"
        );
        report
    }

    async fn run_tick(&self, now: DateTime<Utc>, report: &mut TickReport) -> Result<()> {
        let cycle = resolve_scan_cycle(now);
        report.cycle = Some(cycle);
        info!(cycle = %cycle, "Resolved scan cycle");

        let mut tasks = Vec::with_capacity(self.variants.len());
        for (band, enhancement) in &self.variants {
            let task = AcquisitionTask::create(&self.naming, cycle, *band, enhancement.clone())
                .with_context(|| format!("Failed to prepare local directory for {}", band))?;
            tasks.push(task);
        }
        let jobs = group_by_file(tasks);
        let total = jobs.len();

        let fetched: Vec<FileJob> = stream::iter(jobs)
            .map(|job| self.fetch(job))
            .buffer_unordered(self.max_concurrent)
            .filter_map(|job| async move { job })
            .collect()
            .await;
        report.fetched = fetched.len();
        report.skipped = total - fetched.len();

        let outcomes: Vec<(FileJob, Result<Processed>)> = stream::iter(fetched)
            .map(|job| async move {
                let result = process_file(job.local_path.clone(), job.band).await;
                (job, result)
            })
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await;

        for (job, result) in outcomes {
            match result {
                Ok(processed) => {
                    counter!("sate_bands_processed_total", "band" => job.band.to_string())
                        .increment(1);
                    self.emit_variants(&job, &processed, report).await;
                }
                Err(e) => {
                    counter!("sate_bands_failed_total", "band" => job.band.to_string()).increment(1);
                    error!(
                        band = %job.band,
                        path = %job.local_path.display(),
                        error = %e,
                        "Band processing failed"
                    );
                    report.failed += 1;
                }
            }
        }
        Ok(())
    }

    /// Fetch one file; `None` when the band must be skipped this tick.
    async fn fetch(&self, job: FileJob) -> Option<FileJob> {
        let result = self.transfer.fetch(&job.remote_path, &job.local_path).await;
        match result {
            Ok(bytes) if bytes < self.min_file_size => {
                skip(&job, &format!("file is {} bytes, below {}", bytes, self.min_file_size));
                None
            }
            Ok(bytes) => {
                debug!(band = %job.band, bytes, path = %job.local_path.display(), "Fetched");
                Some(job)
            }
            Err(e) => {
                skip(&job, &e.to_string());
                None
            }
        }
    }

    async fn emit_variants(&self, job: &FileJob, processed: &Processed, report: &mut TickReport) {
        for enhancement in &job.variants {
            let product = Product {
                cycle: job.cycle,
                band: job.band,
                enhancement: enhancement.clone(),
                values: processed.values.clone(),
                lons: processed.lons.clone(),
                lats: processed.lats.clone(),
                satellite: processed.satellite.clone(),
                observation_start: processed.observation_start,
            };
            match self.sink.emit(&product).await {
                Ok(()) => report.emitted += 1,
                Err(e) => {
                    error!(band = %job.band, enhancement = ?enhancement, error = %e, "Sink rejected product");
                    report.failed += 1;
                }
            }
        }
    }
}

fn skip(job: &FileJob, reason: &str) {
    counter!("sate_bands_skipped_total", "band" => job.band.to_string()).increment(1);
    warn!(
        band = %job.band,
        remote = %job.remote_path,
        reason = %reason,
        "Skipping band"
    );
}

/// Merge tasks naming the same local file, keeping first-seen order.
fn group_by_file(tasks: Vec<AcquisitionTask>) -> Vec<FileJob> {
    let mut jobs: Vec<FileJob> = Vec::new();
    for task in tasks {
        match jobs.iter_mut().find(|j| j.local_path == task.local_path) {
            Some(job) => job.variants.push(task.enhancement),
            None => jobs.push(FileJob {
                cycle: task.cycle,
                band: task.band,
                remote_path: task.remote_path,
                local_path: task.local_path,
                variants: vec![task.enhancement],
            }),
        }
    }
    jobs
}

/// Decode, calibrate and navigate one file off the async runtime.
#[instrument(skip_all, fields(path = %path.display(), band = %band))]
async fn process_file(path: PathBuf, band: Band) -> Result<Processed> {
    let started = Instant::now();
    let processed = tokio::task::spawn_blocking(move || -> Result<Processed> {
        let file = HsdFile::open(&path)?;
        let declared = file.header.band()?;
        if declared != band {
            return Err(anyhow!("file header declares {}, expected {}", declared, band));
        }
        let values = file.calibrate();
        let (lons, lats) = file.geolocate()?;
        Ok(Processed {
            values: Arc::new(values),
            lons: Arc::new(lons),
            lats: Arc::new(lats),
            satellite: file.header.basic.satellite_name.clone(),
            observation_start: file.header.basic.observation_start(),
        })
    })
    .await
    .context("Processing task panicked")??;

    histogram!("sate_band_process_seconds").record(started.elapsed().as_secs_f64());
    debug!(valid = processed.values.valid_count(), "Band processed");
    Ok(processed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_group_by_file() {
        let naming = PathNaming::new("H08", "jma/hsd", "/tmp/sate", "bz2");
        let cycle = ScanCycle::from_nominal(Utc.with_ymd_and_hms(2024, 1, 5, 23, 50, 0).unwrap()).unwrap();
        let b8 = Band::new(8).unwrap();
        let b13 = Band::new(13).unwrap();
        let tasks = vec![
            AcquisitionTask::plan(&naming, cycle, b8, Some(Enhancement::new("nrl"))),
            AcquisitionTask::plan(&naming, cycle, b13, None),
            AcquisitionTask::plan(&naming, cycle, b13, Some(Enhancement::new("bd"))),
        ];
        let jobs = group_by_file(tasks);
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].band, b8);
        assert_eq!(jobs[1].variants, vec![None, Some(Enhancement::new("bd"))]);
    }
}
