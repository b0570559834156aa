//! Viscous df-correction coefficients.
//!
//! The evaluator itself is an oracle over externally tabulated data; this
//! module fixes the record layout, the lookup trait, and the bulk-pressure
//! regulator that keeps the PTB scheme inside its tabulated range.

use serde::{Deserialize, Serialize};

/// Safety margin keeping the regulated bulk pressure strictly inside the
/// tabulated interval.
pub const BULK_RATIO_MARGIN: f64 = 1e-5;

/// The full df-coefficient record.
///
/// Every correction scheme reads a subset; a source that only knows some
/// fields leaves the rest zero (they drop out of the formulas).
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DfCoefficients {
    /// 14-moment bulk coefficient c0 (GeV^-2 fm^3 / GeV).
    pub c0: f64,
    /// 14-moment bulk coefficient c1.
    pub c1: f64,
    /// 14-moment bulk coefficient c2.
    pub c2: f64,
    /// 14-moment diffusion coefficient c3.
    pub c3: f64,
    /// 14-moment diffusion coefficient c4.
    pub c4: f64,
    /// 14-moment shear normalization 2 T^2 (e + p) (GeV^2 GeV/fm^3).
    pub shear14: f64,
    /// Chapman-Enskog / PTM bulk coefficient F (GeV).
    pub f: f64,
    /// Chapman-Enskog / PTM bulk coefficient G (dimensionless).
    pub g: f64,
    /// Bulk modulus beta_Pi (GeV/fm^3).
    pub beta_bulk: f64,
    /// Diffusion modulus beta_V (fm^-3).
    pub beta_v: f64,
    /// Shear modulus beta_pi (GeV/fm^3).
    pub beta_pi: f64,
    /// PTB isotropic momentum-scale expansion lambda.
    pub lambda: f64,
    /// PTB normalization factor z.
    pub z: f64,
    /// Linearized PTB lambda expansion delta_lambda.
    pub delta_lambda: f64,
    /// Linearized PTB normalization expansion delta_z.
    pub delta_z: f64,
}

/// Oracle over the external df-coefficient tables.
pub trait DfCoefficientSource {
    /// Coefficients at the cell's thermodynamic state.
    fn evaluate(&self, t: f64, mub: f64, energy: f64, pressure: f64, bulk_pi: f64)
        -> DfCoefficients;

    /// Largest tabulated Pi / P_eq ratio of the PTB tables.
    fn bulk_pi_over_peq_max(&self) -> f64 {
        f64::INFINITY
    }
}

/// A state-independent coefficient record. The default is the ideal-gas
/// point with unit moduli and `z = 1`: with vanishing viscous fields every
/// correction drops out and emission is pure equilibrium (the moduli only
/// ever divide correction terms, so they must stay nonzero).
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ConstantCoefficients {
    /// The record returned for every cell.
    pub record: DfCoefficients,
    /// Largest tabulated Pi / P_eq ratio.
    pub bulk_pi_over_peq_max: f64,
}

impl Default for ConstantCoefficients {
    fn default() -> Self {
        Self {
            record: DfCoefficients {
                shear14: 1.0,
                beta_bulk: 1.0,
                beta_v: 1.0,
                beta_pi: 1.0,
                z: 1.0,
                ..DfCoefficients::default()
            },
            bulk_pi_over_peq_max: f64::INFINITY,
        }
    }
}

impl DfCoefficientSource for ConstantCoefficients {
    fn evaluate(&self, _: f64, _: f64, _: f64, _: f64, _: f64) -> DfCoefficients {
        self.record
    }

    fn bulk_pi_over_peq_max(&self) -> f64 {
        self.bulk_pi_over_peq_max
    }
}

/// Clamps the bulk pressure to `Pi/P in [-1 + margin, max_ratio - margin]`
/// so the PTB table lookup never extrapolates. Returns the regulated value
/// and whether clamping occurred.
#[must_use]
pub fn regulate_bulk_pressure(bulk_pi: f64, pressure: f64, max_ratio: f64) -> (f64, bool) {
    if bulk_pi <= -pressure {
        (-(1.0 - BULK_RATIO_MARGIN) * pressure, true)
    } else if bulk_pi / pressure >= max_ratio {
        (pressure * (max_ratio - BULK_RATIO_MARGIN), true)
    } else {
        (bulk_pi, false)
    }
}
