//! Deterministic naming of remote source and local target files.
//!
//! Remote files follow the distribution layout
//! `<prefix>/<YYYYMM>/<DD>/<HH>/HS_<sat>_<YYYYMMDD>_<HHMM>_B<bb>_R30<g>_R20_S0101.DAT.<ext>`
//! where the time is the 10-minute anchor and `g` the rapid-scan generation.
//!
//! Local files live in hour buckets, `<root>/<YYYYMMDDHH>/<minute>_B<band>.<ext>`,
//! so a retention job can drop whole buckets by name order.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, Timelike, Utc};

use crate::band::{Band, Enhancement};
use crate::error::{SateError, SateResult};
use crate::time::{Generation, ScanCycle};

/// Format of hour-bucket directory names.
pub const HOUR_BUCKET_FORMAT: &str = "%Y%m%d%H";

/// Naming conventions shared by every task of one pipeline.
#[derive(Debug, Clone)]
pub struct PathNaming {
    /// Satellite short name, e.g. `H08`.
    pub satellite: String,
    /// Leading remote directory, e.g. `jma/hsd`. May be empty.
    pub remote_prefix: String,
    /// Root of the local hour buckets.
    pub local_root: PathBuf,
    /// Container compression extension, e.g. `bz2`.
    pub extension: String,
}

impl PathNaming {
    pub fn new(
        satellite: impl Into<String>,
        remote_prefix: impl Into<String>,
        local_root: impl Into<PathBuf>,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            satellite: satellite.into(),
            remote_prefix: remote_prefix.into(),
            local_root: local_root.into(),
            extension: extension.into(),
        }
    }

    /// Remote path of the segment file for `cycle` and `band`.
    pub fn remote_path(&self, cycle: &ScanCycle, band: Band) -> String {
        let file = format!(
            "HS_{}_{}_B{:02}_{}_R20_S0101.DAT.{}",
            self.satellite,
            cycle.anchor().format("%Y%m%d_%H%M"),
            band.number(),
            cycle.generation,
            self.extension
        );
        let dir = cycle.nominal.format("%Y%m/%d/%H").to_string();
        let prefix = self.remote_prefix.trim_matches('/');
        if prefix.is_empty() {
            format!("{}/{}", dir, file)
        } else {
            format!("{}/{}/{}", prefix, dir, file)
        }
    }

    /// Local target path for `cycle` and `band`.
    pub fn local_path(&self, cycle: &ScanCycle, band: Band) -> PathBuf {
        self.local_root.join(hour_bucket(cycle.nominal)).join(format!(
            "{}_B{}.{}",
            cycle.nominal.minute(),
            band.number(),
            self.extension
        ))
    }

    /// Recover `(cycle, band)` from a remote path produced by [`remote_path`](Self::remote_path).
    pub fn parse_remote(&self, remote: &str) -> SateResult<(ScanCycle, Band)> {
        let file = remote.rsplit('/').next().unwrap_or(remote);
        let parts: Vec<&str> = file.split('_').collect();
        if parts.len() != 8 || parts[0] != "HS" {
            return Err(SateError::path(remote, "expected HS_<sat>_<date>_<time>_B<bb>_R30<g>_R20_S0101"));
        }
        let anchor = NaiveDateTime::parse_from_str(&format!("{}{}", parts[2], parts[3]), "%Y%m%d%H%M")
            .map_err(|e| SateError::path(remote, format!("bad timestamp: {}", e)))?
            .and_utc();
        let band = parse_band(remote, parts[4])?;
        let generation = parts[5]
            .strip_prefix("R30")
            .and_then(|g| g.parse::<u8>().ok())
            .ok_or_else(|| SateError::path(remote, "bad rapid-scan field"))
            .and_then(Generation::from_index)?;
        Ok((ScanCycle::from_anchor(anchor, generation), band))
    }

    /// Recover `(cycle, band)` from a local path produced by [`local_path`](Self::local_path).
    pub fn parse_local(&self, local: &Path) -> SateResult<(ScanCycle, Band)> {
        let shown = local.display().to_string();
        let bucket = local
            .parent()
            .and_then(Path::file_name)
            .and_then(|s| s.to_str())
            .ok_or_else(|| SateError::path(&shown, "missing hour bucket"))?;
        let file = local
            .file_name()
            .and_then(|s| s.to_str())
            .ok_or_else(|| SateError::path(&shown, "missing file name"))?;
        let (minute, rest) = file
            .split_once('_')
            .ok_or_else(|| SateError::path(&shown, "expected <minute>_B<band>"))?;
        let minute: u32 = minute
            .parse()
            .map_err(|_| SateError::path(&shown, "bad minute"))?;
        let band_field = rest.split('.').next().unwrap_or(rest);
        let band = parse_band(&shown, band_field)?;

        // Generations 2 and 4 start half a minute past their nominal minute.
        let second = if matches!(minute % 10, 2 | 7) { 30 } else { 0 };
        let nominal = NaiveDateTime::parse_from_str(
            &format!("{}{:02}{:02}", bucket, minute, second),
            "%Y%m%d%H%M%S",
        )
        .map_err(|e| SateError::path(&shown, format!("bad hour bucket: {}", e)))?
        .and_utc();
        Ok((ScanCycle::from_nominal(nominal)?, band))
    }
}

/// Hour-bucket directory name for an instant.
pub fn hour_bucket(t: DateTime<Utc>) -> String {
    t.format(HOUR_BUCKET_FORMAT).to_string()
}

fn parse_band(path: &str, field: &str) -> SateResult<Band> {
    let number: u16 = field
        .strip_prefix('B')
        .and_then(|b| b.parse().ok())
        .ok_or_else(|| SateError::path(path, format!("bad band field '{}'", field)))?;
    Band::new(number)
}

/// One band of one rapid-scan image to fetch and process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquisitionTask {
    pub cycle: ScanCycle,
    pub band: Band,
    /// Enhancement variant; always `None` for visible bands.
    pub enhancement: Option<Enhancement>,
    pub remote_path: String,
    pub local_path: PathBuf,
}

impl AcquisitionTask {
    /// Name the task without touching the filesystem.
    pub fn plan(
        naming: &PathNaming,
        cycle: ScanCycle,
        band: Band,
        enhancement: Option<Enhancement>,
    ) -> Self {
        let enhancement = if band.is_visible() { None } else { enhancement };
        Self {
            cycle,
            band,
            enhancement,
            remote_path: naming.remote_path(&cycle, band),
            local_path: naming.local_path(&cycle, band),
        }
    }

    /// Name the task and make sure its local hour bucket exists.
    pub fn create(
        naming: &PathNaming,
        cycle: ScanCycle,
        band: Band,
        enhancement: Option<Enhancement>,
    ) -> SateResult<Self> {
        let task = Self::plan(naming, cycle, band, enhancement);
        task.ensure_local_dir()?;
        Ok(task)
    }

    /// Create the local parent directory; succeeds if it already exists.
    pub fn ensure_local_dir(&self) -> SateResult<()> {
        if let Some(parent) = self.local_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}
