//! Whole-file decoding: container, header, then the 16-bit count payload.

use std::path::Path;

use tracing::{debug, instrument};

use sate_common::MaskedGrid;

use crate::calibration::calibrate;
use crate::decompress::decompress;
use crate::error::{HsdError, HsdResult};
use crate::header::{parse_header, HeaderMetadata};

/// Raw counts of one segment, masked where the sensor reported no data.
pub type RawGrid = MaskedGrid<u16>;

/// Counts at or above this value are reserved for invalid pixels.
pub const INVALID_COUNT_THRESHOLD: u16 = 65530;

/// A decoded segment file: header plus raw counts.
#[derive(Debug, Clone)]
pub struct HsdFile {
    pub header: HeaderMetadata,
    pub raw: RawGrid,
}

impl HsdFile {
    /// Read and decode a file from disk, compressed or not.
    pub fn open(path: impl AsRef<Path>) -> HsdResult<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        decode(&bytes)
    }

    /// Reflectance (bands 1-6) or brightness temperature in Celsius (7-16).
    pub fn calibrate(&self) -> MaskedGrid<f64> {
        calibrate(&self.header, &self.raw)
    }

    /// Longitude and latitude of every pixel centre of this segment.
    ///
    /// Pixels off the earth disk, and pixels whose raw count is invalid, are
    /// masked. Cells masked only by calibration keep their coordinates.
    pub fn geolocate(&self) -> HsdResult<(MaskedGrid<f64>, MaskedGrid<f64>)> {
        let (lons, lats) = self
            .header
            .fixed_grid()
            .navigate(&self.header.pixel_window());
        Ok((
            lons.mask_where_missing(&self.raw)?,
            lats.mask_where_missing(&self.raw)?,
        ))
    }
}

/// Decode a file as downloaded: bzip2, gzip or plain.
#[instrument(skip(container), fields(bytes = container.len()))]
pub fn decode(container: &[u8]) -> HsdResult<HsdFile> {
    let plain = decompress(container)?;
    decode_uncompressed(&plain)
}

/// Decode an uncompressed segment file.
///
/// The payload after the header must hold exactly `lines * columns` little-endian
/// u16 counts. Counts at or above [`INVALID_COUNT_THRESHOLD`], or equal to the
/// error or outside-scan counts declared in block 5, are masked.
pub fn decode_uncompressed(data: &[u8]) -> HsdResult<HsdFile> {
    let header = parse_header(data)?;
    let lines = header.lines();
    let columns = header.columns();

    let payload = &data[header.header_length..];
    let expected = lines * columns * 2;
    if payload.len() != expected {
        return Err(HsdError::PayloadSize {
            expected,
            actual: payload.len(),
        });
    }

    let error_count = header.calibration.error_pixel_count;
    let outside_count = header.calibration.outside_scan_count;
    let mut raw = RawGrid::masked(columns, lines);
    for (cell, pair) in raw.cells_mut().iter_mut().zip(payload.chunks_exact(2)) {
        let count = u16::from_le_bytes([pair[0], pair[1]]);
        let invalid =
            count >= INVALID_COUNT_THRESHOLD || count == error_count || count == outside_count;
        *cell = (!invalid).then_some(count);
    }

    debug!(
        band = header.calibration.band_number,
        segment = header.segment.segment_number,
        lines,
        columns,
        valid = raw.valid_count(),
        "Decoded segment"
    );

    Ok(HsdFile { header, raw })
}
