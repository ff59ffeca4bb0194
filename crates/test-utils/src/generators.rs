//! Synthetic Himawari Standard Data files.
//!
//! [`HsdBuilder`] writes byte-exact segment files: all eleven header blocks
//! with their fixed layouts, followed by the 16-bit count payload. Every
//! field can be overridden, and the builder can also produce malformed
//! files (padded or missing blocks, wrong payload size, foreign byte order)
//! for negative tests.

use std::io::Write;

use crate::fixtures::{himawari8, infrared, visible};

/// Fixed length of block 1 (basic information).
pub const BLOCK1_LEN: u16 = 282;
/// Fixed length of block 2 (data information).
pub const BLOCK2_LEN: u16 = 50;
/// Fixed length of block 3 (projection information).
pub const BLOCK3_LEN: u16 = 127;
/// Fixed length of block 5 (calibration information) including the band record.
pub const BLOCK5_LEN: u16 = 147;
/// Fixed length of block 7 (segment information).
pub const BLOCK7_LEN: u16 = 47;

/// Lengths written for the blocks the decoder steps over.
const OPAQUE_BLOCKS: [(u8, u16); 6] = [(4, 139), (6, 259), (8, 35), (9, 37), (10, 37), (11, 259)];

/// Builder for one synthetic segment file.
#[derive(Debug, Clone)]
pub struct HsdBuilder {
    pub band: u16,
    pub columns: u16,
    pub lines: u16,
    pub first_line: u16,
    pub total_segments: u8,
    pub segment_number: u8,
    pub satellite_name: String,
    pub observation_start_mjd: f64,
    pub byte_order: u8,
    pub bits_per_pixel: u16,
    pub compression_flag: u8,

    pub sub_lon: f64,
    pub cfac: u32,
    pub lfac: u32,
    pub coff: f32,
    pub loff: f32,

    pub wavelength: f64,
    pub gain: f64,
    pub constant: f64,
    pub error_count: u16,
    pub outside_count: u16,
    pub c_star: f64,
    pub correction: (f64, f64, f64),

    counts: Option<Vec<u16>>,
    padding: Vec<(u8, u16)>,
    omitted: Vec<u8>,
    optional_blocks: bool,
    payload_adjust: isize,
}

impl HsdBuilder {
    /// Defaults: 8 x 4 segment at the top of the full disk, Himawari-8
    /// navigation, calibration typical of the band's family.
    pub fn new(band: u16) -> Self {
        let visible_band = band <= 6;
        Self {
            band,
            columns: 8,
            lines: 4,
            first_line: 1,
            total_segments: 10,
            segment_number: 1,
            satellite_name: "Himawari-8".to_string(),
            observation_start_mjd: 60314.98958333333,
            byte_order: 0,
            bits_per_pixel: 16,
            compression_flag: 0,
            sub_lon: himawari8::SUB_LON,
            cfac: himawari8::CFAC,
            lfac: himawari8::CFAC,
            coff: himawari8::COFF,
            loff: himawari8::COFF,
            wavelength: if visible_band { visible::WAVELENGTH } else { infrared::WAVELENGTH },
            gain: if visible_band { visible::GAIN } else { infrared::GAIN },
            constant: if visible_band { visible::CONSTANT } else { infrared::CONSTANT },
            error_count: 65535,
            outside_count: 65534,
            c_star: visible::C_STAR,
            correction: infrared::CORRECTION,
            counts: None,
            padding: Vec::new(),
            omitted: Vec::new(),
            optional_blocks: true,
            payload_adjust: 0,
        }
    }

    pub fn size(mut self, columns: u16, lines: u16) -> Self {
        self.columns = columns;
        self.lines = lines;
        self
    }

    pub fn first_line(mut self, first_line: u16) -> Self {
        self.first_line = first_line;
        self
    }

    pub fn segment(mut self, number: u8, total: u8) -> Self {
        self.segment_number = number;
        self.total_segments = total;
        self
    }

    /// Row-major counts; must hold `columns * lines` values.
    pub fn counts(mut self, counts: Vec<u16>) -> Self {
        self.counts = Some(counts);
        self
    }

    /// Sub-satellite longitude written to block 3.
    pub fn sub_lon(mut self, degrees: f64) -> Self {
        self.sub_lon = degrees;
        self
    }

    pub fn offsets(mut self, coff: f32, loff: f32) -> Self {
        self.coff = coff;
        self.loff = loff;
        self
    }

    pub fn calibration(mut self, gain: f64, constant: f64) -> Self {
        self.gain = gain;
        self.constant = constant;
        self
    }

    pub fn wavelength(mut self, micrometres: f64) -> Self {
        self.wavelength = micrometres;
        self
    }

    pub fn c_star(mut self, c_star: f64) -> Self {
        self.c_star = c_star;
        self
    }

    pub fn correction(mut self, c0: f64, c1: f64, c2: f64) -> Self {
        self.correction = (c0, c1, c2);
        self
    }

    pub fn error_counts(mut self, error: u16, outside_scan: u16) -> Self {
        self.error_count = error;
        self.outside_count = outside_scan;
        self
    }

    pub fn byte_order(mut self, flag: u8) -> Self {
        self.byte_order = flag;
        self
    }

    pub fn bits_per_pixel(mut self, bits: u16) -> Self {
        self.bits_per_pixel = bits;
        self
    }

    pub fn compression_flag(mut self, flag: u8) -> Self {
        self.compression_flag = flag;
        self
    }

    /// Append `extra` bytes to a block and declare the longer length.
    pub fn pad_block(mut self, block: u8, extra: u16) -> Self {
        self.padding.push((block, extra));
        self
    }

    /// Leave a block out entirely (the block count shrinks with it).
    pub fn omit_block(mut self, block: u8) -> Self {
        self.omitted.push(block);
        self
    }

    /// Write only blocks 1, 2, 3, 5 and 7.
    pub fn mandatory_blocks_only(mut self) -> Self {
        self.optional_blocks = false;
        self
    }

    /// Grow (positive) or shrink (negative) the payload by this many bytes.
    pub fn payload_adjust(mut self, bytes: isize) -> Self {
        self.payload_adjust = bytes;
        self
    }

    fn pixel_count(&self) -> usize {
        self.columns as usize * self.lines as usize
    }

    fn payload(&self) -> Vec<u8> {
        let counts = self
            .counts
            .clone()
            .unwrap_or_else(|| (0..self.pixel_count()).map(|i| 1000 + i as u16).collect());
        let mut out: Vec<u8> = counts.iter().flat_map(|c| c.to_le_bytes()).collect();
        if self.payload_adjust >= 0 {
            out.extend(std::iter::repeat(0u8).take(self.payload_adjust as usize));
        } else {
            let keep = out.len().saturating_sub(self.payload_adjust.unsigned_abs());
            out.truncate(keep);
        }
        out
    }

    fn block1(&self, header_length: u32, data_length: u32, total_blocks: u16) -> Vec<u8> {
        let mut b = Vec::new();
        put_u16(&mut b, total_blocks);
        b.push(self.byte_order);
        put_ascii(&mut b, &self.satellite_name, 16);
        put_ascii(&mut b, "MSC", 16);
        put_ascii(&mut b, "FLDK", 4);
        put_ascii(&mut b, "", 2);
        put_u16(&mut b, 0);
        put_f64(&mut b, self.observation_start_mjd);
        put_f64(&mut b, self.observation_start_mjd + 10.0 / 1440.0);
        put_f64(&mut b, self.observation_start_mjd + 15.0 / 1440.0);
        put_u32(&mut b, header_length);
        put_u32(&mut b, data_length);
        b.extend_from_slice(&[0, 0, 0, 0]);
        put_ascii(&mut b, "1.3", 32);
        put_ascii(&mut b, "HS_H08_SYNTHETIC_S0101.DAT", 128);
        b.extend_from_slice(&[0u8; 40]);
        b
    }

    fn block2(&self) -> Vec<u8> {
        let mut b = Vec::new();
        put_u16(&mut b, self.bits_per_pixel);
        put_u16(&mut b, self.columns);
        put_u16(&mut b, self.lines);
        b.push(self.compression_flag);
        b.extend_from_slice(&[0u8; 40]);
        b
    }

    fn block3(&self) -> Vec<u8> {
        let mut b = Vec::new();
        put_f64(&mut b, self.sub_lon);
        put_u32(&mut b, self.cfac);
        put_u32(&mut b, self.lfac);
        put_f32(&mut b, self.coff);
        put_f32(&mut b, self.loff);
        put_f64(&mut b, himawari8::DISTANCE);
        put_f64(&mut b, himawari8::EQUATORIAL_RADIUS);
        put_f64(&mut b, himawari8::POLAR_RADIUS);
        put_f64(&mut b, himawari8::CONST1);
        put_f64(&mut b, himawari8::CONST2);
        put_f64(&mut b, himawari8::CONST3);
        put_f64(&mut b, himawari8::CONST_STD);
        put_u16(&mut b, 4);
        put_u16(&mut b, 4);
        b.extend_from_slice(&[0u8; 40]);
        b
    }

    fn block5(&self) -> Vec<u8> {
        let mut b = Vec::new();
        put_u16(&mut b, self.band);
        put_f64(&mut b, self.wavelength);
        put_u16(&mut b, if self.band <= 6 { 11 } else { 12 });
        put_u16(&mut b, self.error_count);
        put_u16(&mut b, self.outside_count);
        put_f64(&mut b, self.gain);
        put_f64(&mut b, self.constant);
        if self.band <= 6 {
            put_f64(&mut b, self.c_star);
            b.extend_from_slice(&[0u8; 104]);
        } else {
            let (c0, c1, c2) = self.correction;
            for v in [c0, c1, c2, -c0, 1.0 / c1, 0.0] {
                put_f64(&mut b, v);
            }
            put_f64(&mut b, infrared::LIGHT_SPEED);
            put_f64(&mut b, infrared::PLANCK);
            put_f64(&mut b, infrared::BOLTZMANN);
            b.extend_from_slice(&[0u8; 40]);
        }
        b
    }

    fn block7(&self) -> Vec<u8> {
        let mut b = Vec::new();
        b.push(self.total_segments);
        b.push(self.segment_number);
        put_u16(&mut b, self.first_line);
        b.extend_from_slice(&[0u8; 40]);
        b
    }

    fn header_blocks(&self, header_length: u32, data_length: u32, total_blocks: u16) -> Vec<(u8, Vec<u8>)> {
        let mut blocks = vec![
            (1u8, self.block1(header_length, data_length, total_blocks)),
            (2, self.block2()),
            (3, self.block3()),
            (5, self.block5()),
            (7, self.block7()),
        ];
        if self.optional_blocks {
            for (number, length) in OPAQUE_BLOCKS {
                blocks.push((number, vec![0xEE; length as usize - 3]));
            }
        }
        blocks.retain(|(number, _)| !self.omitted.contains(number));
        blocks.sort_by_key(|(number, _)| *number);

        for (number, body) in blocks.iter_mut() {
            for (padded, extra) in &self.padding {
                if padded == number {
                    body.extend(std::iter::repeat(0xAB).take(*extra as usize));
                }
            }
        }
        blocks
    }

    /// Serialize as an uncompressed segment file.
    pub fn build(&self) -> Vec<u8> {
        let payload = self.payload();

        // Layout is length-stable, so a first pass fixes the header length.
        let probe = self.header_blocks(0, 0, 0);
        let total_blocks = probe.len() as u16;
        let header_length: usize = probe.iter().map(|(_, body)| body.len() + 3).sum();

        let blocks = self.header_blocks(header_length as u32, payload.len() as u32, total_blocks);
        let mut out = Vec::with_capacity(header_length + payload.len());
        for (number, body) in blocks {
            out.push(number);
            put_u16(&mut out, (body.len() + 3) as u16);
            out.extend_from_slice(&body);
        }
        out.extend_from_slice(&payload);
        out
    }

    /// Serialize and bzip2-compress, as distributed.
    pub fn build_bz2(&self) -> Vec<u8> {
        let mut encoder = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
        encoder
            .write_all(&self.build())
            .expect("in-memory bzip2 write");
        encoder.finish().expect("in-memory bzip2 finish")
    }

    /// Serialize and gzip-compress.
    pub fn build_gzip(&self) -> Vec<u8> {
        let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder
            .write_all(&self.build())
            .expect("in-memory gzip write");
        encoder.finish().expect("in-memory gzip finish")
    }
}

fn put_u16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn put_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn put_f32(out: &mut Vec<u8>, v: f32) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn put_f64(out: &mut Vec<u8>, v: f64) {
    out.extend_from_slice(&v.to_le_bytes());
}

/// NUL-padded fixed-width ASCII.
fn put_ascii(out: &mut Vec<u8>, s: &str, width: usize) {
    let bytes = s.as_bytes();
    let n = bytes.len().min(width);
    out.extend_from_slice(&bytes[..n]);
    out.extend(std::iter::repeat(0u8).take(width - n));
}
