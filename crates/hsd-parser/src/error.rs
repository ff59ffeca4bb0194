//! Error types for HSD decoding.

use thiserror::Error;

use sate_common::SateError;

/// Result type for HSD parser operations.
pub type HsdResult<T> = Result<T, HsdError>;

/// Format errors raised while decoding a segment file.
#[derive(Error, Debug)]
pub enum HsdError {
    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Input ended before a mandatory field or block
    #[error("Truncated input at byte {offset}: needed {needed} bytes, {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// Declared block length is shorter than its fixed layout, or runs past the input
    #[error("Block {block} declares {declared} bytes: {reason}")]
    BlockLength {
        block: u8,
        declared: u16,
        reason: String,
    },

    /// A mandatory header block never appeared
    #[error("Missing mandatory header block {0}")]
    MissingBlock(u8),

    /// Band number with no calibration model
    #[error("Unsupported band number: {0}")]
    UnsupportedBand(u16),

    /// Valid HSD feature this decoder does not handle
    #[error("Unsupported format feature: {0}")]
    Unsupported(String),

    /// Pixel payload size does not match lines x columns
    #[error("Pixel payload is {actual} bytes, header declares {expected}")]
    PayloadSize { expected: usize, actual: usize },

    /// Container decompression failed
    #[error("Decompression failed: {0}")]
    Decompression(String),

    #[error("Grid error: {0}")]
    Grid(#[from] SateError),
}
