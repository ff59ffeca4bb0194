//! Container decompression.
//!
//! Segment files are distributed bzip2-compressed; some mirrors re-pack them
//! with gzip. The container type is sniffed from the magic bytes.

use std::borrow::Cow;
use std::io::Read;

use crate::error::{HsdError, HsdResult};

/// Outer container of a segment file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    Bzip2,
    Gzip,
    /// Uncompressed HSD
    Plain,
}

/// Identify the container from its leading bytes.
pub fn detect_container(data: &[u8]) -> Container {
    if data.starts_with(b"BZh") {
        Container::Bzip2
    } else if data.starts_with(&[0x1f, 0x8b]) {
        Container::Gzip
    } else {
        Container::Plain
    }
}

/// Return the uncompressed segment bytes, borrowing when already plain.
pub fn decompress(data: &[u8]) -> HsdResult<Cow<'_, [u8]>> {
    match detect_container(data) {
        Container::Plain => Ok(Cow::Borrowed(data)),
        Container::Bzip2 => {
            let mut decoder = bzip2::read::BzDecoder::new(data);
            let mut out = Vec::new();
            decoder
                .read_to_end(&mut out)
                .map_err(|e| HsdError::Decompression(format!("bzip2: {}", e)))?;
            Ok(Cow::Owned(out))
        }
        Container::Gzip => {
            let mut decoder = flate2::read::GzDecoder::new(data);
            let mut out = Vec::new();
            decoder
                .read_to_end(&mut out)
                .map_err(|e| HsdError::Decompression(format!("gzip: {}", e)))?;
            Ok(Cow::Owned(out))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use std::io::Write;

    #[test]
    fn test_detect() {
        assert_eq!(detect_container(b"BZh91AY"), Container::Bzip2);
        assert_eq!(detect_container(&[0x1f, 0x8b, 8]), Container::Gzip);
        assert_eq!(detect_container(&[1, 26, 1]), Container::Plain);
        assert_eq!(detect_container(&[]), Container::Plain);
    }

    #[test]
    fn test_plain_is_borrowed() {
        let data = [1u8, 2, 3];
        assert!(matches!(decompress(&data).unwrap(), Cow::Borrowed(_)));
    }

    #[test]
    fn test_bzip2() {
        let mut encoder = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::best());
        encoder.write_all(b"segment payload").unwrap();
        let compressed = encoder.finish().unwrap();
        assert_eq!(decompress(&compressed).unwrap().as_ref(), b"segment payload");
    }

    #[test]
    fn test_gzip() {
        let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(b"segment payload").unwrap();
        let compressed = encoder.finish().unwrap();
        assert_eq!(decompress(&compressed).unwrap().as_ref(), b"segment payload");
    }

    #[test]
    fn test_corrupt_bzip2() {
        let result = decompress(b"BZh9 definitely not bzip2");
        assert!(matches!(result, Err(HsdError::Decompression(_))));
    }
}
