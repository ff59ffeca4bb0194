//! Row-major 2D grids with explicit per-cell validity.
//!
//! Missing, off-earth and out-of-domain cells are stored as `None`, never as
//! a sentinel number, so downstream consumers cannot mistake them for data.

use serde::{Deserialize, Serialize};

use crate::error::{SateError, SateResult};

/// A `height x width` grid stored row-major, one `Option<T>` per cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskedGrid<T> {
    width: usize,
    height: usize,
    cells: Vec<Option<T>>,
}

impl<T: Copy> MaskedGrid<T> {
    /// Wrap existing cells; `cells.len()` must equal `width * height`.
    pub fn from_cells(width: usize, height: usize, cells: Vec<Option<T>>) -> SateResult<Self> {
        let expected = width * height;
        if cells.len() != expected {
            return Err(SateError::GridShape {
                expected,
                actual: cells.len(),
            });
        }
        Ok(Self {
            width,
            height,
            cells,
        })
    }

    /// Grid with every cell masked.
    pub fn masked(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![None; width * height],
        }
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of lines.
    pub fn height(&self) -> usize {
        self.height
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Value at (line, column); `None` when masked or out of bounds.
    pub fn get(&self, line: usize, column: usize) -> Option<T> {
        if line >= self.height || column >= self.width {
            return None;
        }
        self.cells[line * self.width + column]
    }

    pub fn is_masked(&self, line: usize, column: usize) -> bool {
        self.get(line, column).is_none()
    }

    pub fn cells(&self) -> &[Option<T>] {
        &self.cells
    }

    /// Mutable row-major cells, for producers that fill a grid in place.
    pub fn cells_mut(&mut self) -> &mut [Option<T>] {
        &mut self.cells
    }

    /// Number of unmasked cells.
    pub fn valid_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    /// Apply `f` to every valid cell. Masked cells stay masked and `f` is
    /// never called for them; `f` may mask further cells by returning `None`.
    pub fn map_valid<U, F>(&self, f: F) -> MaskedGrid<U>
    where
        U: Copy,
        F: Fn(T) -> Option<U>,
    {
        MaskedGrid {
            width: self.width,
            height: self.height,
            cells: self.cells.iter().map(|c| c.and_then(&f)).collect(),
        }
    }

    /// Mask every cell where `other` is masked. Shapes must agree.
    pub fn mask_where_missing<U: Copy>(&self, other: &MaskedGrid<U>) -> SateResult<Self> {
        if other.width != self.width || other.height != self.height {
            return Err(SateError::GridShape {
                expected: self.len(),
                actual: other.len(),
            });
        }
        let cells = self
            .cells
            .iter()
            .zip(&other.cells)
            .map(|(a, b)| b.and(*a))
            .collect();
        Ok(Self {
            width: self.width,
            height: self.height,
            cells,
        })
    }
}

impl MaskedGrid<f64> {
    /// Minimum and maximum over valid cells.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        self.cells.iter().flatten().fold(None, |acc, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
    }
}

/// Geographic extent covered by the valid cells of a lon/lat pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoExtent {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl GeoExtent {
    /// Extent of cells valid in both grids; `None` if no such cell exists.
    pub fn from_grids(lons: &MaskedGrid<f64>, lats: &MaskedGrid<f64>) -> Option<Self> {
        lons.cells()
            .iter()
            .zip(lats.cells())
            .filter_map(|(lon, lat)| Some(((*lon)?, (*lat)?)))
            .fold(None, |acc: Option<GeoExtent>, (lon, lat)| {
                Some(match acc {
                    None => GeoExtent {
                        min_lon: lon,
                        min_lat: lat,
                        max_lon: lon,
                        max_lat: lat,
                    },
                    Some(e) => GeoExtent {
                        min_lon: e.min_lon.min(lon),
                        min_lat: e.min_lat.min(lat),
                        max_lon: e.max_lon.max(lon),
                        max_lat: e.max_lat.max(lat),
                    },
                })
            })
    }
}
