//! Common types shared across the satellite acquisition pipeline.

pub mod band;
pub mod error;
pub mod grid;
pub mod task;
pub mod time;

pub use band::{Band, Enhancement};
pub use error::{SateError, SateResult};
pub use grid::{GeoExtent, MaskedGrid};
pub use task::{AcquisitionTask, PathNaming};
pub use time::{resolve_scan_cycle, Generation, ScanCycle};
