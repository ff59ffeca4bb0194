//! Himawari Standard Data (HSD) segment decoder.
//!
//! An HSD file is a sequence of length-prefixed header blocks followed by a
//! payload of 16-bit little-endian counts, row-major. Files are usually
//! distributed bzip2-compressed.
//!
//! # Example
//!
//! ```ignore
//! use hsd_parser::HsdFile;
//!
//! let file = HsdFile::open("HS_H08_20240105_2350_B13_R302_R20_S0101.DAT.bz2")?;
//! let celsius = file.calibrate();
//! let (lons, lats) = file.geolocate()?;
//! ```

pub mod calibration;
pub mod decode;
pub mod decompress;
pub mod error;
pub mod header;
pub mod reader;

pub use calibration::{calibrate, Calibration};
pub use decode::{decode, decode_uncompressed, HsdFile, RawGrid, INVALID_COUNT_THRESHOLD};
pub use decompress::{decompress, detect_container, Container};
pub use error::{HsdError, HsdResult};
pub use header::{parse_header, HeaderMetadata};
