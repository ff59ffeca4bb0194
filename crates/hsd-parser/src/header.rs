//! Header blocks of a Himawari Standard Data segment file.
//!
//! Only the blocks needed for calibration and navigation are decoded:
//!
//! | block | content |
//! |---|---|
//! | 1 | basic information (identity, times, header length) |
//! | 2 | data information (bits per pixel, columns, lines) |
//! | 3 | projection information (COFF/CFAC, LOFF/LFAC, earth constants) |
//! | 5 | calibration information, with a band-dependent record |
//! | 7 | segment information (first line number) |
//!
//! Blocks 4, 6 and 8-11 are stepped over by their declared length.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use tracing::{trace, warn};

use projection::{FixedGrid, PixelWindow};
use sate_common::Band;

use crate::error::{HsdError, HsdResult};
use crate::reader::{Block, BlockReader};

/// Byte order flag for little-endian files.
pub const LITTLE_ENDIAN: u8 = 0;

/// Block numbers that must be present.
pub const MANDATORY_BLOCKS: [u8; 5] = [1, 2, 3, 5, 7];

/// Block 1: basic information.
#[derive(Debug, Clone, PartialEq)]
pub struct BasicInfo {
    pub total_header_blocks: u16,
    pub byte_order: u8,
    pub satellite_name: String,
    pub processing_center: String,
    pub observation_area: String,
    pub other_observation_info: String,
    pub observation_timeline: u16,
    /// Modified Julian Date
    pub observation_start_mjd: f64,
    pub observation_end_mjd: f64,
    pub file_creation_mjd: f64,
    pub total_header_length: u32,
    pub total_data_length: u32,
    pub quality_flags: [u8; 4],
    pub format_version: String,
    pub file_name: String,
}

impl BasicInfo {
    fn parse(block: &Block<'_>) -> HsdResult<Self> {
        let mut f = block.fields();
        Ok(Self {
            total_header_blocks: f.u16()?,
            byte_order: f.u8()?,
            satellite_name: f.ascii(16)?,
            processing_center: f.ascii(16)?,
            observation_area: f.ascii(4)?,
            other_observation_info: f.ascii(2)?,
            observation_timeline: f.u16()?,
            observation_start_mjd: f.f64()?,
            observation_end_mjd: f.f64()?,
            file_creation_mjd: f.f64()?,
            total_header_length: f.u32()?,
            total_data_length: f.u32()?,
            quality_flags: [f.u8()?, f.u8()?, f.u8()?, f.u8()?],
            format_version: f.ascii(32)?,
            file_name: f.ascii(128)?,
        })
    }

    pub fn observation_start(&self) -> Option<DateTime<Utc>> {
        mjd_to_datetime(self.observation_start_mjd)
    }

    pub fn observation_end(&self) -> Option<DateTime<Utc>> {
        mjd_to_datetime(self.observation_end_mjd)
    }

    pub fn file_creation(&self) -> Option<DateTime<Utc>> {
        mjd_to_datetime(self.file_creation_mjd)
    }
}

/// Block 2: data information.
#[derive(Debug, Clone, PartialEq)]
pub struct DataInfo {
    pub bits_per_pixel: u16,
    pub columns: u16,
    pub lines: u16,
    pub compression_flag: u8,
}

impl DataInfo {
    fn parse(block: &Block<'_>) -> HsdResult<Self> {
        let mut f = block.fields();
        Ok(Self {
            bits_per_pixel: f.u16()?,
            columns: f.u16()?,
            lines: f.u16()?,
            compression_flag: f.u8()?,
        })
    }
}

/// Block 3: projection information.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionInfo {
    /// Sub-satellite longitude (degrees east)
    pub sub_lon: f64,
    pub cfac: u32,
    pub lfac: u32,
    pub coff: f32,
    pub loff: f32,
    /// Distance from earth centre to the satellite (km)
    pub distance: f64,
    pub earth_equatorial_radius: f64,
    pub earth_polar_radius: f64,
    /// (req^2 - rpol^2) / req^2
    pub earth_const1: f64,
    /// rpol^2 / req^2
    pub earth_const2: f64,
    /// req^2 / rpol^2
    pub earth_const3: f64,
    /// distance^2 - req^2
    pub earth_const_std: f64,
    pub resampling_types: u16,
    pub resampling_size: u16,
}

impl ProjectionInfo {
    fn parse(block: &Block<'_>) -> HsdResult<Self> {
        let mut f = block.fields();
        Ok(Self {
            sub_lon: f.f64()?,
            cfac: f.u32()?,
            lfac: f.u32()?,
            coff: f.f32()?,
            loff: f.f32()?,
            distance: f.f64()?,
            earth_equatorial_radius: f.f64()?,
            earth_polar_radius: f.f64()?,
            earth_const1: f.f64()?,
            earth_const2: f.f64()?,
            earth_const3: f.f64()?,
            earth_const_std: f.f64()?,
            resampling_types: f.u16()?,
            resampling_size: f.u16()?,
        })
    }

    /// Navigation constants for the fixed grid.
    pub fn fixed_grid(&self) -> FixedGrid {
        FixedGrid {
            sub_lon: self.sub_lon,
            cfac: self.cfac as f64,
            lfac: self.lfac as f64,
            coff: self.coff as f64,
            loff: self.loff as f64,
            distance: self.distance,
            earth_equatorial_radius: self.earth_equatorial_radius,
            earth_polar_radius: self.earth_polar_radius,
            earth_const3: self.earth_const3,
            earth_const_std: self.earth_const_std,
        }
    }
}

/// Reflectance record of block 5 for bands 1-6.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibleRecord {
    /// Radiance to albedo conversion coefficient c*
    pub c_star: f64,
}

/// Brightness temperature record of block 5 for bands 7-16.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InfraredRecord {
    /// Effective to true brightness temperature correction, c0 + c1 T + c2 T^2
    pub c0: f64,
    pub c1: f64,
    pub c2: f64,
    /// Inverse correction (true to effective temperature)
    pub inverse_c0: f64,
    pub inverse_c1: f64,
    pub inverse_c2: f64,
    /// Speed of light (m/s)
    pub light_speed: f64,
    /// Planck constant (J s)
    pub planck: f64,
    /// Boltzmann constant (J/K)
    pub boltzmann: f64,
}

/// Band-dependent part of block 5, selected by the band number.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BandRecord {
    Visible(VisibleRecord),
    Infrared(InfraredRecord),
}

/// Block 5: calibration information.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationInfo {
    pub band_number: u16,
    /// Central wavelength (micrometres)
    pub central_wavelength: f64,
    pub valid_bits_per_pixel: u16,
    pub error_pixel_count: u16,
    pub outside_scan_count: u16,
    /// Count to radiance gain
    pub gain: f64,
    /// Count to radiance constant
    pub constant: f64,
    pub record: BandRecord,
}

impl CalibrationInfo {
    fn parse(block: &Block<'_>) -> HsdResult<Self> {
        let mut f = block.fields();
        let band_number = f.u16()?;
        let central_wavelength = f.f64()?;
        let valid_bits_per_pixel = f.u16()?;
        let error_pixel_count = f.u16()?;
        let outside_scan_count = f.u16()?;
        let gain = f.f64()?;
        let constant = f.f64()?;

        let band = Band::new(band_number).map_err(|_| HsdError::UnsupportedBand(band_number))?;
        let record = if band.is_visible() {
            BandRecord::Visible(VisibleRecord { c_star: f.f64()? })
        } else {
            BandRecord::Infrared(InfraredRecord {
                c0: f.f64()?,
                c1: f.f64()?,
                c2: f.f64()?,
                inverse_c0: f.f64()?,
                inverse_c1: f.f64()?,
                inverse_c2: f.f64()?,
                light_speed: f.f64()?,
                planck: f.f64()?,
                boltzmann: f.f64()?,
            })
        };

        Ok(Self {
            band_number,
            central_wavelength,
            valid_bits_per_pixel,
            error_pixel_count,
            outside_scan_count,
            gain,
            constant,
            record,
        })
    }
}

/// Block 7: segment information.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentInfo {
    pub total_segments: u8,
    pub segment_number: u8,
    /// Line number of the first line of this segment, in full-disk numbering
    pub first_line_number: u16,
}

impl SegmentInfo {
    fn parse(block: &Block<'_>) -> HsdResult<Self> {
        let mut f = block.fields();
        Ok(Self {
            total_segments: f.u8()?,
            segment_number: f.u8()?,
            first_line_number: f.u16()?,
        })
    }
}

/// Decoded header of one segment file. Immutable once parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderMetadata {
    pub basic: BasicInfo,
    pub data: DataInfo,
    pub projection: ProjectionInfo,
    pub calibration: CalibrationInfo,
    pub segment: SegmentInfo,
    /// Bytes consumed by the header blocks; the pixel payload starts here.
    pub header_length: usize,
}

impl HeaderMetadata {
    pub fn band(&self) -> HsdResult<Band> {
        Band::new(self.calibration.band_number)
            .map_err(|_| HsdError::UnsupportedBand(self.calibration.band_number))
    }

    pub fn lines(&self) -> usize {
        self.data.lines as usize
    }

    pub fn columns(&self) -> usize {
        self.data.columns as usize
    }

    /// Pixel index ranges covered by this segment, all columns.
    pub fn pixel_window(&self) -> PixelWindow {
        PixelWindow::new(
            self.segment.first_line_number as u32,
            self.lines(),
            0,
            self.columns(),
        )
    }

    pub fn fixed_grid(&self) -> FixedGrid {
        self.projection.fixed_grid()
    }
}

/// Walk the header blocks and decode the ones we understand.
pub fn parse_header(data: &[u8]) -> HsdResult<HeaderMetadata> {
    let mut reader = BlockReader::new(data);

    let first = reader.next_block()?;
    if first.number != 1 {
        return Err(HsdError::MissingBlock(1));
    }
    let basic = BasicInfo::parse(&first)?;
    if basic.byte_order != LITTLE_ENDIAN {
        return Err(HsdError::Unsupported(format!(
            "byte order flag {} (only little-endian files are handled)",
            basic.byte_order
        )));
    }

    let mut data_info = None;
    let mut projection = None;
    let mut calibration = None;
    let mut segment = None;

    for _ in 1..basic.total_header_blocks {
        let block = reader.next_block()?;
        match block.number {
            2 => data_info = Some(DataInfo::parse(&block)?),
            3 => projection = Some(ProjectionInfo::parse(&block)?),
            5 => calibration = Some(CalibrationInfo::parse(&block)?),
            7 => segment = Some(SegmentInfo::parse(&block)?),
            other => trace!(
                block = other,
                length = block.declared_length,
                "Skipping header block"
            ),
        }
    }

    let data_info = data_info.ok_or(HsdError::MissingBlock(2))?;
    let projection = projection.ok_or(HsdError::MissingBlock(3))?;
    let calibration = calibration.ok_or(HsdError::MissingBlock(5))?;
    let segment = segment.ok_or(HsdError::MissingBlock(7))?;

    if data_info.bits_per_pixel != 16 {
        return Err(HsdError::Unsupported(format!(
            "{} bits per pixel",
            data_info.bits_per_pixel
        )));
    }
    if data_info.compression_flag != 0 {
        return Err(HsdError::Unsupported(format!(
            "payload compression flag {}",
            data_info.compression_flag
        )));
    }

    let header_length = reader.position();
    if basic.total_header_length as usize != header_length {
        warn!(
            declared = basic.total_header_length,
            walked = header_length,
            "Header length in block 1 disagrees with the block walk"
        );
    }

    Ok(HeaderMetadata {
        basic,
        data: data_info,
        projection,
        calibration,
        segment,
        header_length,
    })
}

/// Convert a Modified Julian Date to UTC; `None` for non-finite input.
pub fn mjd_to_datetime(mjd: f64) -> Option<DateTime<Utc>> {
    if !mjd.is_finite() {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1858, 11, 17)?.and_hms_opt(0, 0, 0)?.and_utc();
    let millis = (mjd * 86_400_000.0).round();
    if millis.abs() > i64::MAX as f64 / 2.0 {
        return None;
    }
    epoch.checked_add_signed(Duration::milliseconds(millis as i64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_mjd_epoch() {
        assert_eq!(
            mjd_to_datetime(0.0),
            Some(Utc.with_ymd_and_hms(1858, 11, 17, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_mjd_observation_time() {
        // 2015-07-07T02:00:00Z
        let dt = mjd_to_datetime(57210.083333333336).unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2015, 7, 7, 2, 0, 0).unwrap());
    }

    #[test]
    fn test_mjd_rejects_nan() {
        assert!(mjd_to_datetime(f64::NAN).is_none());
    }

    #[test]
    fn test_first_block_must_be_basic_info() {
        let data = [2u8, 3, 0];
        assert!(matches!(parse_header(&data), Err(HsdError::MissingBlock(1))));
    }
}
