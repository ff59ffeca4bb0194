//! Common test fixtures for the satellite pipeline tests.
//!
//! Constants here mirror what real Himawari-8 segment headers carry, so
//! synthetic files navigate and calibrate like the real thing.

/// Himawari-8 fixed-grid navigation constants (block 3).
pub mod himawari8 {
    /// Sub-satellite longitude (degrees east)
    pub const SUB_LON: f64 = 140.7;
    /// Column/line scaling factor of the 2 km grid
    pub const CFAC: u32 = 20_466_275;
    /// Column/line offset of the 2 km grid
    pub const COFF: f32 = 2750.5;
    /// Full-disk size of the 2 km grid
    pub const FULL_DISK: u16 = 5500;

    pub const DISTANCE: f64 = 42164.0;
    pub const EQUATORIAL_RADIUS: f64 = 6378.137;
    pub const POLAR_RADIUS: f64 = 6356.7523;
    pub const CONST1: f64 = 0.00669438444;
    pub const CONST2: f64 = 0.993305616;
    pub const CONST3: f64 = 1.006739501;
    pub const CONST_STD: f64 = 1_737_122_264.0;
}

/// Calibration typical of an infrared window band (block 5).
pub mod infrared {
    /// Central wavelength (micrometres)
    pub const WAVELENGTH: f64 = 10.4;
    pub const GAIN: f64 = -0.0033;
    pub const CONSTANT: f64 = 14.0;
    /// Effective to true brightness temperature polynomial
    pub const CORRECTION: (f64, f64, f64) = (-0.1, 1.0002, -1.5e-6);

    pub const LIGHT_SPEED: f64 = 2.99792458e8;
    pub const PLANCK: f64 = 6.62606957e-34;
    pub const BOLTZMANN: f64 = 1.3806488e-23;
}

/// Calibration typical of a visible band (block 5).
pub mod visible {
    pub const WAVELENGTH: f64 = 0.64;
    pub const GAIN: f64 = 0.3;
    pub const CONSTANT: f64 = -6.0;
    pub const C_STAR: f64 = 0.0019;
}

/// Instants used by pipeline tests.
pub mod time {
    /// 490 s into its 10-minute cycle: the first generation of 23:50 is
    /// the newest available image.
    pub const REFERENCE_TIME: &str = "2024-01-05T23:58:10Z";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_earth_constants_consistent() {
        let req = himawari8::EQUATORIAL_RADIUS;
        let rpol = himawari8::POLAR_RADIUS;
        assert!((req * req / (rpol * rpol) - himawari8::CONST3).abs() < 1e-9);
        assert!((himawari8::DISTANCE.powi(2) - req * req - himawari8::CONST_STD).abs() < 1.0);
    }
}
