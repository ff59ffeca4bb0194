//! Shared test utilities for the satellite pipeline workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Synthetic HSD segment files ([`HsdBuilder`])
//! - Himawari navigation and calibration fixtures
//! - Test data path helpers and skip macros
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{require_test_file, HsdBuilder};
//! ```

pub mod fixtures;
pub mod generators;
pub mod paths;

// Re-export commonly used items at the crate root
pub use generators::HsdBuilder;
pub use paths::*;

/// Resolve a real sample file or return from the calling test.
///
/// Full-disk segments run to tens of megabytes, so they live outside the
/// repository. Point `TEST_DATA_DIR` at a directory holding them.
///
/// ```ignore
/// let path = require_test_file!("HS_H08_20150707_0200_B13_FLDK_R20_S0110.DAT.bz2");
/// ```
#[macro_export]
macro_rules! require_test_file {
    ($name:expr) => {{
        let Some(path) = $crate::find_test_file($name) else {
            eprintln!("skipping: sample segment '{}' not available (set TEST_DATA_DIR)", $name);
            return;
        };
        path
    }};
}

/// `|left - right| <= tolerance`, reporting both values on failure.
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $tolerance:expr) => {{
        let (left, right, tolerance) = ($left as f64, $right as f64, $tolerance as f64);
        assert!(
            (left - right).abs() <= tolerance,
            "values differ by more than {}: left {:?}, right {:?}",
            tolerance,
            left,
            right
        );
    }};
}

/// [`assert_approx_eq!`] on both members of a `(lon, lat)` pair.
#[macro_export]
macro_rules! assert_coords_approx_eq {
    (($lon:expr, $lat:expr), ($want_lon:expr, $want_lat:expr), $tolerance:expr) => {{
        $crate::assert_approx_eq!($lon, $want_lon, $tolerance);
        $crate::assert_approx_eq!($lat, $want_lat, $tolerance);
    }};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_approx_within_tolerance() {
        assert_approx_eq!(-20.8276, -20.82763, 1e-4);
        assert_approx_eq!(0.0_f32, 0.0, 0.0);
    }

    #[test]
    #[should_panic(expected = "values differ")]
    fn test_approx_outside_tolerance() {
        assert_approx_eq!(273.15, 273.0, 0.1);
    }

    #[test]
    fn test_coords_within_tolerance() {
        assert_coords_approx_eq!((140.6731, 0.00904), (140.673, 0.009), 1e-3);
    }
}
