//! Fixed-grid navigation for geostationary imagers.
//!
//! Converts pixel indices of a scan-angle grid to geodetic longitude and
//! latitude and back.

pub mod geostationary;

pub use geostationary::{FixedGrid, PixelWindow, SCLUNIT};
