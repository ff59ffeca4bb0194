//! Hour-bucket retention.
//!
//! Local files live in `YYYYMMDDHH` directories, so name order is time
//! order and retention is "sort, keep the last N, remove the rest".

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

/// Removes all but the newest hour buckets from a set of directories.
#[derive(Debug, Clone)]
pub struct BucketCleaner {
    dirs: Vec<PathBuf>,
    keep: usize,
}

impl BucketCleaner {
    pub fn new(dirs: Vec<PathBuf>, keep: usize) -> Self {
        Self { dirs, keep }
    }

    /// Clean every monitored directory, returning the buckets removed.
    ///
    /// A failure in one directory is logged and does not stop the others.
    pub fn run(&self) -> Vec<PathBuf> {
        let mut removed = Vec::new();
        for dir in &self.dirs {
            match clean_dir(dir, self.keep) {
                Ok(mut gone) => removed.append(&mut gone),
                Err(e) => warn!(dir = %dir.display(), error = %e, "Bucket cleanup failed"),
            }
        }
        if !removed.is_empty() {
            info!(removed = removed.len(), "Removed expired hour buckets");
        }
        removed
    }
}

fn is_hour_bucket(name: &str) -> bool {
    name.len() == 10 && name.bytes().all(|b| b.is_ascii_digit())
}

/// Hour buckets directly under `dir`, oldest first.
pub fn list_buckets(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut buckets = Vec::new();
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("Failed to list {}", dir.display()))?
    {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        if entry.file_name().to_str().is_some_and(is_hour_bucket) {
            buckets.push(entry.path());
        }
    }
    buckets.sort();
    Ok(buckets)
}

fn clean_dir(dir: &Path, keep: usize) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        debug!(dir = %dir.display(), "Monitored directory absent");
        return Ok(Vec::new());
    }
    let buckets = list_buckets(dir)?;
    let expired = buckets.len().saturating_sub(keep);
    let mut removed = Vec::with_capacity(expired);
    for bucket in buckets.into_iter().take(expired) {
        std::fs::remove_dir_all(&bucket)
            .with_context(|| format!("Failed to remove {}", bucket.display()))?;
        debug!(bucket = %bucket.display(), "Removed hour bucket");
        removed.push(bucket);
    }
    Ok(removed)
}
