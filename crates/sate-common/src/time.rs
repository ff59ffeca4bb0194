//! Rapid-scan cycle resolution.
//!
//! The imager produces four sub-images ("generations") inside every nominal
//! 10-minute cycle, nominally at 0s, 150s, 300s and 450s past the 10-minute
//! boundary. Each one becomes downloadable several minutes later, so the
//! most recent *available* image depends only on how far "now" is into its
//! own 10-minute window:
//!
//! ```text
//! 0 -(R302)- 45 -(R303)- 150 -(R304)- 405 -(R301)- 525 -(R302)- 600
//! ```
//!
//! Generations whose availability spills into the following window look
//! back a fixed amount before flooring to the 10-minute anchor, which keeps
//! the result correct across minute, hour and day boundaries.

use std::fmt;
use std::ops::RangeInclusive;

use chrono::{DateTime, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{SateError, SateResult};

/// Length of one nominal observation cycle in seconds.
pub const CYCLE_SECONDS: u32 = 600;

/// Rapid-scan generation within a 10-minute cycle (`R301`..`R304`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Generation {
    R1,
    R2,
    R3,
    R4,
}

impl Generation {
    pub const ALL: [Generation; 4] = [Generation::R1, Generation::R2, Generation::R3, Generation::R4];

    pub fn from_index(index: u8) -> SateResult<Self> {
        match index {
            1 => Ok(Generation::R1),
            2 => Ok(Generation::R2),
            3 => Ok(Generation::R3),
            4 => Ok(Generation::R4),
            other => Err(SateError::InvalidGeneration(other)),
        }
    }

    /// Generation index, 1-4.
    pub fn index(self) -> u8 {
        match self {
            Generation::R1 => 1,
            Generation::R2 => 2,
            Generation::R3 => 3,
            Generation::R4 => 4,
        }
    }

    /// Nominal start of this generation relative to the 10-minute anchor.
    pub fn offset_seconds(self) -> i64 {
        match self {
            Generation::R1 => 0,
            Generation::R2 => 150,
            Generation::R3 => 300,
            Generation::R4 => 450,
        }
    }

    /// Generation whose nominal offset equals `seconds` past the anchor.
    pub fn from_offset_seconds(seconds: i64) -> Option<Self> {
        Generation::ALL
            .into_iter()
            .find(|g| g.offset_seconds() == seconds)
    }

    /// How far to step back from "now" before flooring to the anchor.
    fn lookback(self) -> Duration {
        match self {
            Generation::R1 => Duration::zero(),
            Generation::R2 => Duration::seconds(90),
            Generation::R3 | Generation::R4 => Duration::minutes(10),
        }
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R30{}", self.index())
    }
}

/// Availability windows over seconds-into-cycle, in evaluation order.
///
/// Integer closed ranges; together they cover `0..600` exactly once.
pub const AVAILABILITY_WINDOWS: [(RangeInclusive<u32>, Generation); 5] = [
    (0..=45, Generation::R2),
    (46..=150, Generation::R3),
    (151..=405, Generation::R4),
    (406..=525, Generation::R1),
    (526..=599, Generation::R2),
];

/// Identifies one rapid-scan image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScanCycle {
    /// Nominal observation time: the 10-minute anchor plus the generation offset.
    pub nominal: DateTime<Utc>,
    pub generation: Generation,
}

impl ScanCycle {
    /// Build a cycle from its 10-minute anchor.
    pub fn from_anchor(anchor: DateTime<Utc>, generation: Generation) -> Self {
        Self {
            nominal: floor_to_cycle(anchor) + Duration::seconds(generation.offset_seconds()),
            generation,
        }
    }

    /// Build a cycle from a nominal time, inferring the generation from its offset.
    pub fn from_nominal(nominal: DateTime<Utc>) -> SateResult<Self> {
        let anchor = floor_to_cycle(nominal);
        let offset = (nominal - anchor).num_seconds();
        let generation = Generation::from_offset_seconds(offset)
            .ok_or_else(|| SateError::NotNominal(nominal.to_rfc3339()))?;
        Ok(Self {
            nominal: anchor + Duration::seconds(offset),
            generation,
        })
    }

    /// The 10-minute boundary this image belongs to.
    pub fn anchor(&self) -> DateTime<Utc> {
        floor_to_cycle(self.nominal)
    }
}

impl fmt::Display for ScanCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.nominal.format("%Y-%m-%dT%H:%M:%SZ"), self.generation)
    }
}

/// Seconds elapsed since the last 10-minute boundary.
pub fn seconds_into_cycle(t: DateTime<Utc>) -> u32 {
    (t.minute() % 10) * 60 + t.second().min(59)
}

/// Which generation is the newest complete one at `seconds` into the cycle.
pub fn window_generation(seconds: u32) -> Generation {
    let seconds = seconds % CYCLE_SECONDS;
    AVAILABILITY_WINDOWS
        .iter()
        .find(|(range, _)| range.contains(&seconds))
        .map(|(_, generation)| *generation)
        // Windows cover 0..600, so the modulo above makes this unreachable.
        .unwrap_or(Generation::R2)
}

/// Truncate to the enclosing 10-minute boundary.
pub fn floor_to_cycle(t: DateTime<Utc>) -> DateTime<Utc> {
    t - Duration::seconds(seconds_into_cycle(t) as i64)
        - Duration::nanoseconds(t.nanosecond() as i64)
}

/// Resolve the most recently available rapid-scan image at instant `now`.
///
/// Pure: the result depends only on `now`.
pub fn resolve_scan_cycle(now: DateTime<Utc>) -> ScanCycle {
    let generation = window_generation(seconds_into_cycle(now));
    ScanCycle::from_anchor(now - generation.lookback(), generation)
}
