//! Sensor band identity and enhancement variants.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{SateError, SateResult};

/// Highest band number carried by the imager.
pub const MAX_BAND: u8 = 16;

/// Highest band number calibrated with the reflectance model.
pub const LAST_VISIBLE_BAND: u8 = 6;

/// An imager band number in `1..=16`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct Band(u8);

impl Band {
    pub fn new(number: u16) -> SateResult<Self> {
        match number {
            1..=16 => Ok(Band(number as u8)),
            _ => Err(SateError::InvalidBand(number)),
        }
    }

    pub fn number(self) -> u8 {
        self.0
    }

    /// Bands 1-6 carry reflectance, 7-16 brightness temperature.
    pub fn is_visible(self) -> bool {
        self.0 <= LAST_VISIBLE_BAND
    }

    pub fn is_infrared(self) -> bool {
        !self.is_visible()
    }
}

impl TryFrom<u16> for Band {
    type Error = SateError;

    fn try_from(value: u16) -> SateResult<Self> {
        Band::new(value)
    }
}

impl From<Band> for u16 {
    fn from(band: Band) -> u16 {
        band.0 as u16
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "B{:02}", self.0)
    }
}

/// Named enhancement variant (a rendering colour table) for an infrared band.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Enhancement(String);

impl Enhancement {
    pub fn new(name: impl Into<String>) -> Self {
        Enhancement(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Enhancement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
