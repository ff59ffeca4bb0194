//! Radiometric calibration of raw counts.
//!
//! Visible bands (1-6) become reflectance through an affine transform.
//! Infrared bands (7-16) become radiance, then effective brightness
//! temperature by inverting Planck's law, then brightness temperature via
//! the sensor correction polynomial, reported in degrees Celsius.
//!
//! Calibration only ever sees valid counts: masked cells of the raw grid
//! stay masked, and any non-finite result is masked too.

use sate_common::MaskedGrid;

use crate::header::{BandRecord, HeaderMetadata, InfraredRecord, VisibleRecord};

/// Kelvin to Celsius offset.
pub const KELVIN_OFFSET: f64 = 273.15;

/// Radiance unit conversion, per micrometre to per metre.
const PER_MICROMETRE_TO_PER_METRE: f64 = 1e6;

/// Per-pixel calibration model built from one header.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Calibration {
    Reflectance {
        gain: f64,
        constant: f64,
        c_star: f64,
    },
    BrightnessTemperature {
        gain: f64,
        constant: f64,
        /// h c / (k lambda)
        const1: f64,
        /// 2 h c^2 / lambda^5
        const2: f64,
        c0: f64,
        c1: f64,
        c2: f64,
    },
}

impl Calibration {
    pub fn from_header(header: &HeaderMetadata) -> Self {
        let cal = &header.calibration;
        match cal.record {
            BandRecord::Visible(VisibleRecord { c_star }) => Calibration::Reflectance {
                gain: cal.gain,
                constant: cal.constant,
                c_star,
            },
            BandRecord::Infrared(ir) => {
                let (const1, const2) = planck_constants(&ir, cal.central_wavelength);
                Calibration::BrightnessTemperature {
                    gain: cal.gain,
                    constant: cal.constant,
                    const1,
                    const2,
                    c0: ir.c0,
                    c1: ir.c1,
                    c2: ir.c2,
                }
            }
        }
    }

    /// Physical value of one valid count; `None` when the result is not finite.
    pub fn apply(&self, count: u16) -> Option<f64> {
        let count = count as f64;
        let value = match *self {
            Calibration::Reflectance {
                gain,
                constant,
                c_star,
            } => c_star * (gain * count + constant),
            Calibration::BrightnessTemperature {
                gain,
                constant,
                const1,
                const2,
                c0,
                c1,
                c2,
            } => {
                let radiance = (gain * count + constant) * PER_MICROMETRE_TO_PER_METRE;
                if radiance <= 0.0 {
                    return None;
                }
                let effective = const1 / (const2 / radiance).ln_1p();
                c0 + c1 * effective + c2 * effective * effective - KELVIN_OFFSET
            }
        };
        value.is_finite().then_some(value)
    }
}

/// `(h c / (k lambda), 2 h c^2 / lambda^5)` with lambda in metres.
fn planck_constants(ir: &InfraredRecord, central_wavelength_um: f64) -> (f64, f64) {
    let lambda = central_wavelength_um * 1e-6;
    let const1 = ir.planck * ir.light_speed / (ir.boltzmann * lambda);
    let const2 = 2.0 * ir.planck * ir.light_speed.powi(2) * lambda.powi(-5);
    (const1, const2)
}

/// Calibrate every valid count of `raw`.
///
/// Reflectance is left unclipped; values above 1.0 are passed through.
pub fn calibrate(header: &HeaderMetadata, raw: &MaskedGrid<u16>) -> MaskedGrid<f64> {
    let calibration = Calibration::from_header(header);
    raw.map_valid(|count| calibration.apply(count))
}
