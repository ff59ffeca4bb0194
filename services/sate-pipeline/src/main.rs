//! Rapid-scan satellite acquisition service.
//!
//! Polls the distribution mirror for the newest rapid-scan image, processes
//! the configured bands, and hands the results to the render sink. Expired
//! hour buckets are pruned on a separate timer.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use tokio::sync::broadcast;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use sate_pipeline::{
    HttpTransfer, LogSink, MirrorTransfer, Pipeline, PipelineConfig, Scheduler, Transfer,
};

#[derive(Parser, Debug)]
#[command(name = "sate-pipeline")]
#[command(about = "Rapid-scan satellite acquisition pipeline")]
struct Args {
    /// Pipeline configuration file
    #[arg(long, env = "SATE_CONFIG", default_value = "config/pipeline.yaml")]
    config: PathBuf,

    /// Run a single tick and exit (vs continuous polling)
    #[arg(long)]
    once: bool,

    /// Instant to resolve the scan cycle for, RFC 3339 (default: now)
    #[arg(long, value_parser = parse_instant)]
    at: Option<DateTime<Utc>>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Override storage.tmp_root
    #[arg(long, env = "SATE_TMP_ROOT")]
    tmp_root: Option<PathBuf>,

    /// Read files from a local mirror directory instead of over HTTP
    #[arg(long, env = "SATE_MIRROR_DIR")]
    mirror_dir: Option<PathBuf>,
}

fn parse_instant(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| format!("invalid RFC 3339 instant '{}': {}", s, e))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting satellite pipeline");

    let mut config = if args.config.exists() {
        PipelineConfig::load(&args.config)?
    } else {
        warn!(path = %args.config.display(), "Config file not found, using defaults");
        PipelineConfig::default()
    };
    if let Some(tmp_root) = args.tmp_root {
        config.storage.tmp_root = tmp_root;
    }
    config.validate()?;

    tokio::fs::create_dir_all(&config.storage.tmp_root)
        .await
        .with_context(|| format!("Failed to create {}", config.storage.tmp_root.display()))?;

    let transfer: Arc<dyn Transfer> = match &args.mirror_dir {
        Some(dir) => {
            info!(mirror = %dir.display(), "Using local mirror");
            Arc::new(MirrorTransfer::new(dir.clone()))
        }
        None => {
            info!(base_url = %config.source.base_url, "Using HTTP source");
            Arc::new(HttpTransfer::new(
                config.source.base_url.clone(),
                Duration::from_secs(config.source.timeout_secs),
            )?)
        }
    };

    let pipeline = Arc::new(Pipeline::new(&config, transfer, Arc::new(LogSink))?);
    let scheduler = Scheduler::new(pipeline, &config);

    if args.once {
        let at = args.at.unwrap_or_else(Utc::now);
        info!(at = %at, "Running single tick");
        let report = scheduler.run_once(at).await;
        info!(
            fetched = report.fetched,
            skipped = report.skipped,
            failed = report.failed,
            emitted = report.emitted,
            "Single tick finished"
        );
    } else {
        if args.at.is_some() {
            warn!("--at only applies with --once; polling uses the current time");
        }
        let (shutdown_tx, _) = broadcast::channel::<()>(1);
        let shutdown_rx = shutdown_tx.subscribe();

        let shutdown_tx_clone = shutdown_tx.clone();
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            info!("Received shutdown signal");
            shutdown_tx_clone.send(()).ok();
        });

        scheduler.run_forever(shutdown_rx).await?;
    }

    info!("Satellite pipeline stopped");
    Ok(())
}
