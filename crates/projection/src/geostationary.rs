//! Normalized geostationary projection (CGMS LRIT/HRIT fixed grid).
//!
//! The imager samples Earth on a fixed grid of scan angles seen from a
//! satellite parked above the equator. Pixel indices map to intermediate
//! scan angles through the column/line offsets and scaling factors
//! (COFF/CFAC, LOFF/LFAC), and scan angles map to geodetic coordinates on
//! the WGS84 ellipsoid.
//!
//! Reference: CGMS 03, LRIT/HRIT Global Specification, section 4.4.

use rayon::prelude::*;
use sate_common::MaskedGrid;

/// Scaling unit of CFAC/LFAC, 2^-16 degrees.
pub const SCLUNIT: f64 = 1.0 / 65536.0;

/// Fixed-grid navigation constants, as carried by block 3 of a segment file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedGrid {
    /// Sub-satellite longitude (degrees east)
    pub sub_lon: f64,
    /// Column scaling factor
    pub cfac: f64,
    /// Line scaling factor
    pub lfac: f64,
    /// Column offset
    pub coff: f64,
    /// Line offset
    pub loff: f64,
    /// Distance from earth centre to the satellite (km)
    pub distance: f64,
    /// Equatorial radius (km)
    pub earth_equatorial_radius: f64,
    /// Polar radius (km)
    pub earth_polar_radius: f64,
    /// req^2 / rpol^2
    pub earth_const3: f64,
    /// distance^2 - req^2
    pub earth_const_std: f64,
}

impl FixedGrid {
    /// Himawari-8 full disk at 2 km (5500 x 5500 infrared grid).
    pub fn himawari8() -> Self {
        Self {
            sub_lon: 140.7,
            cfac: 20_466_275.0,
            lfac: 20_466_275.0,
            coff: 2750.5,
            loff: 2750.5,
            distance: 42164.0,
            earth_equatorial_radius: 6378.137,
            earth_polar_radius: 6356.7523,
            earth_const3: 1.006739501,
            earth_const_std: 1_737_122_264.0,
        }
    }

    /// Pixel indices to intermediate scan angles (radians).
    #[inline]
    pub fn pixel_to_scan(&self, column: f64, line: f64) -> (f64, f64) {
        let x = ((column - self.coff) / (SCLUNIT * self.cfac)).to_radians();
        let y = ((line - self.loff) / (SCLUNIT * self.lfac)).to_radians();
        (x, y)
    }

    /// Scan angles (radians) to pixel indices.
    #[inline]
    pub fn scan_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        let column = self.coff + x.to_degrees() * SCLUNIT * self.cfac;
        let line = self.loff + y.to_degrees() * SCLUNIT * self.lfac;
        (column, line)
    }

    /// Scan angles (radians) to `(lon, lat)` in degrees.
    ///
    /// Returns None when the line of sight misses the ellipsoid. Longitudes
    /// are `sub_lon` plus an offset in (-90, 90) and are not wrapped into
    /// [-180, 180].
    pub fn scan_to_geo(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let (sin_x, cos_x) = x.sin_cos();
        let (sin_y, cos_y) = y.sin_cos();
        let k = self.earth_const3;

        let flattening = cos_y * cos_y + k * sin_y * sin_y;
        let along = self.distance * cos_x * cos_y;
        let discriminant = along * along - flattening * self.earth_const_std;
        if discriminant.is_nan() || discriminant < 0.0 {
            return None;
        }

        let sd = discriminant.sqrt();
        let sn = (along - sd) / flattening;
        let s1 = self.distance - sn * cos_x * cos_y;
        let s2 = sn * sin_x * cos_y;
        let s3 = -sn * sin_y;
        let sxy = s1.hypot(s2);

        let lon = s2.atan2(s1).to_degrees() + self.sub_lon;
        let lat = (k * s3 / sxy).atan().to_degrees();
        if !lon.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return None;
        }
        Some((lon, lat))
    }

    /// `(lon, lat)` in degrees to scan angles (radians).
    ///
    /// Returns None when the point is on the far side of the Earth.
    pub fn geo_to_scan(&self, lon: f64, lat: f64) -> Option<(f64, f64)> {
        let k = self.earth_const3;
        let lambda = (lon - self.sub_lon).to_radians();
        let c_lat = (lat.to_radians().tan() / k).atan();
        let e2 = 1.0 - 1.0 / k;
        let cos_c = c_lat.cos();
        let rl = self.earth_polar_radius / (1.0 - e2 * cos_c * cos_c).sqrt();

        let toward = rl * cos_c * lambda.cos();
        let r1 = self.distance - toward;
        let r2 = -rl * cos_c * lambda.sin();
        let r3 = rl * c_lat.sin();

        // Surface normal must face the satellite
        if r1 * toward - r2 * r2 - r3 * r3 * k <= 0.0 {
            return None;
        }

        let rn = (r1 * r1 + r2 * r2 + r3 * r3).sqrt();
        let x = (-r2 / r1).atan();
        let y = (-r3 / rn).asin();
        Some((x, y))
    }

    /// Pixel indices to `(lon, lat)`; None when off the Earth disk.
    pub fn pixel_to_geo(&self, column: f64, line: f64) -> Option<(f64, f64)> {
        let (x, y) = self.pixel_to_scan(column, line);
        self.scan_to_geo(x, y)
    }

    /// `(lon, lat)` to fractional pixel indices `(column, line)`.
    pub fn geo_to_pixel(&self, lon: f64, lat: f64) -> Option<(f64, f64)> {
        let (x, y) = self.geo_to_scan(lon, lat)?;
        Some(self.scan_to_pixel(x, y))
    }

    /// Longitude and latitude grids for every pixel of `window`.
    ///
    /// Both grids are `window.lines() x window.columns()`, row-major by line,
    /// with off-disk pixels masked in both. Rows are computed in parallel.
    pub fn navigate(&self, window: &PixelWindow) -> (MaskedGrid<f64>, MaskedGrid<f64>) {
        let width = window.columns();
        let height = window.lines();
        let mut lons = MaskedGrid::masked(width, height);
        let mut lats = MaskedGrid::masked(width, height);
        if width == 0 || height == 0 {
            return (lons, lats);
        }

        lons.cells_mut()
            .par_chunks_mut(width)
            .zip(lats.cells_mut().par_chunks_mut(width))
            .enumerate()
            .for_each(|(row, (lon_row, lat_row))| {
                let line = window.first_line as f64 + row as f64;
                for (i, (lon, lat)) in lon_row.iter_mut().zip(lat_row.iter_mut()).enumerate() {
                    let column = (window.column_west + i) as f64;
                    if let Some((x, y)) = self.pixel_to_geo(column, line) {
                        *lon = Some(x);
                        *lat = Some(y);
                    }
                }
            });

        (lons, lats)
    }
}

/// Rectangle of pixel indices: lines `first_line..first_line + lines`,
/// columns `column_west..column_east`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelWindow {
    pub first_line: u32,
    pub line_count: usize,
    pub column_west: usize,
    pub column_east: usize,
}

impl PixelWindow {
    pub fn new(first_line: u32, lines: usize, column_west: usize, column_east: usize) -> Self {
        Self {
            first_line,
            line_count: lines,
            column_west,
            column_east: column_east.max(column_west),
        }
    }

    pub fn lines(&self) -> usize {
        self.line_count
    }

    pub fn columns(&self) -> usize {
        self.column_east - self.column_west
    }
}
