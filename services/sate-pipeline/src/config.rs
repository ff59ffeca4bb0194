//! Pipeline configuration.
//!
//! Loaded from a single YAML file (`config/pipeline.yaml`). Every section
//! has defaults, so a file listing only `tasks` is valid.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::{debug, warn};

use sate_common::{Band, Enhancement, PathNaming};

/// Root configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Satellite short name used in remote file names, e.g. `H08`.
    #[serde(default = "default_satellite")]
    pub satellite: String,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub tasks: Vec<TaskConfig>,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
}

fn default_satellite() -> String {
    "H08".to_string()
}

/// Where segment files are fetched from.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Leading remote directory, prepended to every remote path.
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_prefix() -> String {
    "jma/hsd".to_string()
}

fn default_max_concurrent() -> usize {
    4
}

fn default_timeout_secs() -> u64 {
    300
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            prefix: default_prefix(),
            max_concurrent: default_max_concurrent(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Local storage of fetched files.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Root of the hour buckets.
    #[serde(default = "default_tmp_root")]
    pub tmp_root: PathBuf,
    #[serde(default = "default_compression_ext")]
    pub compression_ext: String,
}

fn default_tmp_root() -> PathBuf {
    PathBuf::from("/tmp/sate")
}

fn default_compression_ext() -> String {
    "bz2".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            tmp_root: default_tmp_root(),
            compression_ext: default_compression_ext(),
        }
    }
}

/// One configured band and the enhancement variants to produce for it.
///
/// A `null` entry in `enhancements` is the plain (unenhanced) product. An
/// empty list means the plain product only.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    pub band: u16,
    #[serde(default)]
    pub enhancements: Vec<Option<String>>,
}

/// Tick and cleanup cadence.
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Fetched files smaller than this many bytes count as failed transfers.
    #[serde(default = "default_min_file_size")]
    pub min_file_size: u64,
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_secs: u64,
}

fn default_poll_interval() -> u64 {
    120
}

fn default_min_file_size() -> u64 {
    100
}

fn default_cleanup_interval() -> u64 {
    3600
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            min_file_size: default_min_file_size(),
            cleanup_interval_secs: default_cleanup_interval(),
        }
    }
}

/// Hour-bucket retention.
#[derive(Debug, Clone, Deserialize)]
pub struct RetentionConfig {
    /// Newest buckets kept in every monitored directory.
    #[serde(default = "default_keep_buckets")]
    pub keep_buckets: usize,
    /// Directories cleaned besides `storage.tmp_root`.
    #[serde(default)]
    pub extra_dirs: Vec<PathBuf>,
}

fn default_keep_buckets() -> usize {
    1
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            keep_buckets: default_keep_buckets(),
            extra_dirs: Vec::new(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            satellite: default_satellite(),
            source: SourceConfig::default(),
            storage: StorageConfig::default(),
            tasks: Vec::new(),
            schedule: ScheduleConfig::default(),
            retention: RetentionConfig::default(),
        }
    }
}

/// A validated (band, enhancement) pair.
pub type BandVariant = (Band, Option<Enhancement>);

impl PipelineConfig {
    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        debug!(path = %path.display(), tasks = config.tasks.len(), "Loaded pipeline config");
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: PipelineConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.satellite.is_empty() {
            bail!("satellite must not be empty");
        }
        if self.source.max_concurrent == 0 {
            bail!("source.max_concurrent must be at least 1");
        }
        if self.retention.keep_buckets == 0 {
            bail!("retention.keep_buckets must be at least 1");
        }
        for task in &self.tasks {
            Band::new(task.band).with_context(|| format!("Invalid task band {}", task.band))?;
        }
        Ok(())
    }

    /// Expand `tasks` into one entry per (band, variant), in file order.
    ///
    /// Visible bands carry no enhancement; configured variants for them are
    /// dropped with a warning. Duplicate pairs are removed.
    pub fn band_variants(&self) -> Result<Vec<BandVariant>> {
        let mut out: Vec<BandVariant> = Vec::new();
        for task in &self.tasks {
            let band = Band::new(task.band)?;
            let mut variants: Vec<Option<Enhancement>> = if task.enhancements.is_empty() {
                vec![None]
            } else {
                task.enhancements
                    .iter()
                    .map(|e| e.as_deref().map(Enhancement::new))
                    .collect()
            };
            if band.is_visible() && variants.iter().any(Option::is_some) {
                warn!(band = %band, "Visible bands have no enhancements; producing the plain variant only");
                variants = vec![None];
            }
            for variant in variants {
                let pair = (band, variant);
                if !out.contains(&pair) {
                    out.push(pair);
                }
            }
        }
        Ok(out)
    }

    pub fn naming(&self) -> PathNaming {
        PathNaming::new(
            self.satellite.clone(),
            self.source.prefix.clone(),
            self.storage.tmp_root.clone(),
            self.storage.compression_ext.clone(),
        )
    }

    /// Directories whose hour buckets are subject to retention.
    pub fn monitored_dirs(&self) -> Vec<PathBuf> {
        let mut dirs = vec![self.storage.tmp_root.clone()];
        dirs.extend(self.retention.extra_dirs.iter().cloned());
        dirs
    }
}
