//! Feasibility of the modified-equilibrium (feqmod) reformulations.
//!
//! The PTM and PTB schemes absorb the viscous correction into a linear
//! deformation of the momentum argument. The deformation is only
//! invertible while its determinant stays away from zero and while the
//! linearized pion density stays positive; otherwise the cell falls back
//! to the linear Chapman-Enskog correction.

use crate::averages::EnvAverages;
use crate::basis::LrfShearTensor;
use crate::config::DfMode;
use crate::quadrature::GaussLaguerre;
use crate::thermal::{j20_moment, neq_moment};
use crate::TWO_PI2_HBARC3;

/// Determinant of the deformation matrix
/// `A_ij = (1 + bulk_mod) delta_ij + shear_mod pi_ij`.
#[must_use]
pub fn deformation_determinant(pi: &LrfShearTensor, shear_mod: f64, bulk_mod: f64) -> f64 {
    let axx = 1.0 + pi.xx * shear_mod + bulk_mod;
    let axy = pi.xy * shear_mod;
    let axz = pi.xz * shear_mod;
    let ayy = 1.0 + pi.yy * shear_mod + bulk_mod;
    let ayz = pi.yz * shear_mod;
    let azz = 1.0 + pi.zz * shear_mod + bulk_mod;

    // A is symmetric while diffusion is absorbed elsewhere
    axx * (ayy * azz - ayz * ayz) - axy * (axy * azz - ayz * axz)
        + axz * (axy * ayz - ayy * axz)
}

/// Whether the linearized pion-0 density
/// `n_eq + Pi (n_eq + J20 F / T^2) / beta_bulk` turns negative.
#[must_use]
pub fn linear_pion_density_negative(
    laguerre: &GaussLaguerre,
    mass_pion0: f64,
    t: f64,
    f: f64,
    beta_bulk: f64,
    bulk_pi: f64,
) -> bool {
    let mbar = mass_pion0 / t;
    let neq_fact = t * t * t / TWO_PI2_HBARC3;
    let j20_fact = t * neq_fact;

    let neq = neq_fact * neq_moment(laguerre, mbar, 0.0, -1.0);
    let j20 = j20_fact * j20_moment(laguerre, mbar, 0.0, -1.0);

    let dn = bulk_pi * (neq + j20 * f / (t * t)) / beta_bulk;

    neq + dn < 0.0
}

/// Inputs of the per-cell feasibility decision.
#[derive(Clone, Copy, Debug)]
pub struct BreakdownCheck<'a> {
    /// Active correction scheme.
    pub df_mode: DfMode,
    /// Pion-0 mass (GeV).
    pub mass_pion0: f64,
    /// Cell temperature (GeV).
    pub temperature: f64,
    /// Bulk coefficient F of the cell.
    pub f: f64,
    /// Regulated bulk pressure of the cell.
    pub bulk_pi: f64,
    /// Bulk modulus of the cell.
    pub beta_bulk: f64,
    /// Deformation determinant of the cell.
    pub det_a: f64,
    /// Determinant floor.
    pub det_a_min: f64,
    /// PTB normalization factor.
    pub z: f64,
    /// Averaged state for the FAST variant of the pion-density check.
    pub fast: Option<&'a EnvAverages>,
}

impl BreakdownCheck<'_> {
    /// Decides whether the modified reformulation breaks down for this
    /// cell. Linear schemes never break down.
    #[must_use]
    pub fn breaks_down(&self, laguerre: &GaussLaguerre) -> bool {
        match self.df_mode {
            DfMode::PtmModified => {
                let (t, f, beta_bulk) = self.fast.map_or(
                    (self.temperature, self.f, self.beta_bulk),
                    |avg| (avg.temperature, avg.f, avg.beta_bulk),
                );

                self.det_a <= self.det_a_min
                    || linear_pion_density_negative(
                        laguerre,
                        self.mass_pion0,
                        t,
                        f,
                        beta_bulk,
                        self.bulk_pi,
                    )
            }
            DfMode::PtbModified => self.det_a <= self.det_a_min || self.z < 0.0,
            DfMode::Grad14 | DfMode::ChapmanEnskog | DfMode::PtmAniso => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    fn check(df_mode: DfMode) -> BreakdownCheck<'static> {
        BreakdownCheck {
            df_mode,
            mass_pion0: 0.1349766,
            temperature: 0.15,
            f: 0.0,
            bulk_pi: 0.0,
            beta_bulk: 0.1,
            det_a: 1.0,
            det_a_min: 0.01,
            z: 1.0,
            fast: None,
        }
    }

    #[test]
    fn identity_deformation_has_unit_determinant() {
        let pi = LrfShearTensor::default();

        assert_approx_eq!(f64, deformation_determinant(&pi, 0.5, 0.0), 1.0, ulps = 2);
    }

    #[test]
    fn isotropic_bulk_scales_determinant_cubically() {
        let pi = LrfShearTensor::default();
        let det = deformation_determinant(&pi, 0.0, -0.2);

        assert_approx_eq!(f64, det, 0.8_f64.powi(3), epsilon = 1e-14);
    }

    #[test]
    fn shear_preserves_determinant_to_first_order() {
        // traceless perturbation: det(1 + eps pi) = 1 + O(eps^2)
        let pi = LrfShearTensor {
            xx: 0.01,
            yy: -0.004,
            zz: -0.006,
            xy: 0.002,
            xz: -0.001,
            yz: 0.003,
        };
        let det = deformation_determinant(&pi, 1e-3, 0.0);

        assert!((det - 1.0).abs() < 1e-7);
    }

    #[test]
    fn linear_schemes_never_break_down() {
        let laguerre = GaussLaguerre::new(24).unwrap();
        let mut c = check(DfMode::ChapmanEnskog);
        c.det_a = -1.0;

        assert!(!c.breaks_down(&laguerre));
    }

    #[test]
    fn small_determinant_breaks_ptm() {
        let laguerre = GaussLaguerre::new(24).unwrap();
        let mut c = check(DfMode::PtmModified);
        c.det_a = 0.001;

        assert!(c.breaks_down(&laguerre));
    }

    #[test]
    fn negative_z_breaks_ptb() {
        let laguerre = GaussLaguerre::new(24).unwrap();
        let mut c = check(DfMode::PtbModified);
        c.z = -0.5;

        assert!(c.breaks_down(&laguerre));
    }

    #[test]
    fn negative_pion_density_breaks_ptm() {
        let laguerre = GaussLaguerre::new(24).unwrap();
        let mut c = check(DfMode::PtmModified);
        // large negative bulk pressure against a small bulk modulus
        c.bulk_pi = -0.5;
        c.beta_bulk = 0.01;

        assert!(c.breaks_down(&laguerre));
        assert!(linear_pion_density_negative(
            &laguerre, 0.1349766, 0.15, 0.0, 0.01, -0.5
        ));
    }

    #[test]
    fn fast_mode_uses_averaged_state() {
        let laguerre = GaussLaguerre::new(24).unwrap();
        let averages = EnvAverages {
            temperature: 0.15,
            beta_bulk: 1e6,
            ..EnvAverages::default()
        };
        let mut c = check(DfMode::PtmModified);
        c.bulk_pi = -0.5;
        c.beta_bulk = 0.01;
        c.fast = Some(&averages);

        // the huge averaged bulk modulus suppresses the correction
        assert!(!c.breaks_down(&laguerre));
    }
}
