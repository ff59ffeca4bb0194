//! Hand-off of calibrated, geolocated grids to the rendering side.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use sate_common::{Band, Enhancement, GeoExtent, MaskedGrid, ScanCycle};

/// One band variant ready for rendering.
///
/// Variants of the same band share the grids.
#[derive(Debug, Clone)]
pub struct Product {
    pub cycle: ScanCycle,
    pub band: Band,
    pub enhancement: Option<Enhancement>,
    /// Reflectance for visible bands, degrees Celsius for infrared bands.
    pub values: Arc<MaskedGrid<f64>>,
    pub lons: Arc<MaskedGrid<f64>>,
    pub lats: Arc<MaskedGrid<f64>>,
    pub satellite: String,
    pub observation_start: Option<DateTime<Utc>>,
}

impl Product {
    pub fn summary(&self) -> ProductSummary {
        ProductSummary {
            nominal: self.cycle.nominal,
            generation: self.cycle.generation.index(),
            band: self.band.number(),
            enhancement: self.enhancement.as_ref().map(|e| e.as_str().to_string()),
            width: self.values.width(),
            height: self.values.height(),
            valid: self.values.valid_count(),
            value_range: self.values.value_range(),
            extent: GeoExtent::from_grids(&self.lons, &self.lats),
        }
    }
}

/// Loggable digest of a [`Product`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductSummary {
    pub nominal: DateTime<Utc>,
    pub generation: u8,
    pub band: u8,
    pub enhancement: Option<String>,
    pub width: usize,
    pub height: usize,
    pub valid: usize,
    pub value_range: Option<(f64, f64)>,
    pub extent: Option<GeoExtent>,
}

/// Consumer of finished products.
#[async_trait]
pub trait RenderSink: Send + Sync {
    async fn emit(&self, product: &Product) -> Result<()>;
}

/// Logs a JSON summary per product.
#[derive(Debug, Default)]
pub struct LogSink;

#[async_trait]
impl RenderSink for LogSink {
    async fn emit(&self, product: &Product) -> Result<()> {
        let summary = serde_json::to_string(&product.summary())?;
        info!(
            band = %product.band,
            enhancement = product.enhancement.as_ref().map(|e| e.as_str()).unwrap_or("plain"),
            cycle = %product.cycle,
            summary = %summary,
            "Product ready"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn product() -> Product {
        let grid = |cells: Vec<Option<f64>>| Arc::new(MaskedGrid::from_cells(2, 1, cells).unwrap());
        Product {
            cycle: ScanCycle::from_nominal(Utc.with_ymd_and_hms(2024, 1, 5, 23, 57, 30).unwrap())
                .unwrap(),
            band: Band::new(13).unwrap(),
            enhancement: Some(Enhancement::new("bd")),
            values: grid(vec![Some(-40.0), Some(25.5)]),
            lons: grid(vec![Some(140.0), None]),
            lats: grid(vec![Some(1.0), None]),
            satellite: "Himawari-8".to_string(),
            observation_start: None,
        }
    }

    #[test]
    fn test_summary() {
        let summary = product().summary();
        assert_eq!(summary.generation, 4);
        assert_eq!(summary.band, 13);
        assert_eq!(summary.enhancement.as_deref(), Some("bd"));
        assert_eq!(summary.valid, 2);
        assert_eq!(summary.value_range, Some((-40.0, 25.5)));
        assert_eq!(summary.extent.unwrap().min_lon, 140.0);
    }

    #[test]
    fn test_log_sink_accepts_product() {
        tokio_test::block_on(LogSink.emit(&product())).unwrap();
    }
}
