//! Surface-averaged thermodynamic state.
//!
//! The FAST feasibility check and the precomputed density tables are
//! evaluated at one averaged state instead of per cell. The averages are
//! weighted with each cell's max volume element and computed once, up
//! front; the emission loop only ever sees them behind a shared reference.

use crate::cell::FreezeoutCell;
use crate::coefficients::DfCoefficientSource;

/// Max-volume-weighted thermodynamic averages over the freezeout surface.
#[derive(Clone, Copy, Debug, Default)]
pub struct EnvAverages {
    /// Average temperature (GeV).
    pub temperature: f64,
    /// Average baryon chemical potential (GeV).
    pub mub: f64,
    /// Average energy density (GeV/fm^3).
    pub energy_density: f64,
    /// Average equilibrium pressure (GeV/fm^3).
    pub pressure: f64,
    /// Bulk coefficient F at the averaged state.
    pub f: f64,
    /// Bulk modulus beta_Pi at the averaged state.
    pub beta_bulk: f64,
}

impl EnvAverages {
    /// Averages over `surface`, then evaluates the df coefficients needed
    /// by the FAST feasibility check at the averaged state.
    #[must_use]
    pub fn from_surface(surface: &[FreezeoutCell], source: &impl DfCoefficientSource) -> Self {
        let mut averages = Self::default();
        let mut total_volume = 0.0;

        for cell in surface {
            let ds_max = cell.max_volume_element();

            averages.temperature += cell.temperature * ds_max;
            averages.mub += cell.mub * ds_max;
            averages.energy_density += cell.energy_density * ds_max;
            averages.pressure += cell.pressure * ds_max;
            total_volume += ds_max;
        }

        if total_volume > 0.0 {
            averages.temperature /= total_volume;
            averages.mub /= total_volume;
            averages.energy_density /= total_volume;
            averages.pressure /= total_volume;
        }

        let df = source.evaluate(averages.temperature, averages.mub, 0.0, 0.0, 0.0);
        averages.f = df.f;
        averages.beta_bulk = df.beta_bulk;

        averages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coefficients::ConstantCoefficients;
    use float_cmp::assert_approx_eq;

    #[test]
    fn uniform_surface_averages_to_itself() {
        let cell = FreezeoutCell {
            tau: 1.0,
            dsigma_tau: 0.5,
            temperature: 0.15,
            pressure: 0.08,
            energy_density: 0.4,
            ..FreezeoutCell::default()
        };
        let surface = vec![cell.clone(), cell];
        let averages = EnvAverages::from_surface(&surface, &ConstantCoefficients::default());

        assert_approx_eq!(f64, averages.temperature, 0.15, ulps = 2);
        assert_approx_eq!(f64, averages.pressure, 0.08, ulps = 2);
    }

    #[test]
    fn weighting_follows_volume() {
        let small = FreezeoutCell {
            tau: 1.0,
            dsigma_tau: 0.1,
            temperature: 0.1,
            ..FreezeoutCell::default()
        };
        let large = FreezeoutCell {
            tau: 1.0,
            dsigma_tau: 0.3,
            temperature: 0.2,
            ..FreezeoutCell::default()
        };
        let averages =
            EnvAverages::from_surface(&[small, large], &ConstantCoefficients::default());

        assert_approx_eq!(f64, averages.temperature, 0.175, epsilon = 1e-12);
    }
}
