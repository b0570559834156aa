//! Freezeout cell records and the tensor components reconstructed from
//! them.
//!
//! The upstream hydrodynamic code only stores the five spatial components
//! of the shear stress and the spatial components of the baryon diffusion
//! current; the remaining components are re-established here from the
//! orthogonality and tracelessness constraints rather than trusted from
//! input.

use serde::{Deserialize, Serialize};

/// A single cell of the freezeout hypersurface.
///
/// Units: `tau`, `x`, `y` in fm, `eta` dimensionless, `dsigma_tau/x/y` in
/// fm^-2, `dsigma_eta` in fm^-3, `un` in fm^-1, `temperature` and `mub` in
/// GeV, `energy_density`, `pressure`, `pi**`, `bulk_pi` in GeV/fm^3 (the
/// `*n` shear and diffusion components in GeV/fm^4).
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct FreezeoutCell {
    /// Longitudinal proper time tau.
    pub tau: f64,
    /// Transverse coordinate x.
    pub x: f64,
    /// Transverse coordinate y.
    pub y: f64,
    /// Space-time rapidity eta.
    pub eta: f64,
    /// Covariant surface normal dSigma_tau.
    pub dsigma_tau: f64,
    /// Covariant surface normal dSigma_x.
    pub dsigma_x: f64,
    /// Covariant surface normal dSigma_y.
    pub dsigma_y: f64,
    /// Covariant surface normal dSigma_eta.
    pub dsigma_eta: f64,
    /// Contravariant fluid velocity u^x.
    pub ux: f64,
    /// Contravariant fluid velocity u^y.
    pub uy: f64,
    /// Contravariant fluid velocity u^eta.
    pub un: f64,
    /// Temperature.
    pub temperature: f64,
    /// Equilibrium pressure.
    pub pressure: f64,
    /// Energy density.
    pub energy_density: f64,
    /// Shear stress pi^xx.
    pub pixx: f64,
    /// Shear stress pi^xy.
    pub pixy: f64,
    /// Shear stress pi^{x eta}.
    pub pixn: f64,
    /// Shear stress pi^yy.
    pub piyy: f64,
    /// Shear stress pi^{y eta}.
    pub piyn: f64,
    /// Bulk viscous pressure Pi.
    pub bulk_pi: f64,
    /// Baryon chemical potential mu_B.
    pub mub: f64,
    /// Net baryon density n_B.
    pub nb: f64,
    /// Baryon diffusion current V^x.
    pub vx: f64,
    /// Baryon diffusion current V^y.
    pub vy: f64,
    /// Baryon diffusion current V^eta.
    pub vn: f64,
}

impl FreezeoutCell {
    /// u^tau from the normalization u.u = 1.
    #[must_use]
    pub fn u_tau(&self) -> f64 {
        let tau2 = self.tau * self.tau;
        (1.0 + self.ux * self.ux + self.uy * self.uy + tau2 * self.un * self.un).sqrt()
    }

    /// u^mu dSigma_mu (the eta weight is factored out by the caller).
    #[must_use]
    pub fn u_dot_dsigma(&self) -> f64 {
        self.u_tau() * self.dsigma_tau
            + self.ux * self.dsigma_x
            + self.uy * self.dsigma_y
            + self.un * self.dsigma_eta
    }

    /// Frame-independent max volume element |dSigma| = |u.dSigma| +
    /// sqrt((u.dSigma)^2 - dSigma.dSigma), which bounds p.dSigma / E over
    /// all momentum directions.
    #[must_use]
    pub fn max_volume_element(&self) -> f64 {
        let tau2 = self.tau * self.tau;
        let uds = self.u_dot_dsigma();
        let ds_ds = self.dsigma_tau * self.dsigma_tau
            - self.dsigma_x * self.dsigma_x
            - self.dsigma_y * self.dsigma_y
            - self.dsigma_eta * self.dsigma_eta / tau2;

        uds.abs() + (uds * uds - ds_ds).abs().sqrt()
    }
}

/// The full contravariant shear stress tensor pi^{mu nu}.
#[derive(Clone, Copy, Debug, Default)]
pub struct ShearTensor {
    /// pi^{tau tau}.
    pub tt: f64,
    /// pi^{tau x}.
    pub tx: f64,
    /// pi^{tau y}.
    pub ty: f64,
    /// pi^{tau eta}.
    pub tn: f64,
    /// pi^{xx}.
    pub xx: f64,
    /// pi^{xy}.
    pub xy: f64,
    /// pi^{x eta}.
    pub xn: f64,
    /// pi^{yy}.
    pub yy: f64,
    /// pi^{y eta}.
    pub yn: f64,
    /// pi^{eta eta}.
    pub nn: f64,
}

impl ShearTensor {
    /// Reconstructs pi^{eta eta}, pi^{tau *} from the five spatial inputs
    /// using pi.u = 0 and Tr(pi) = 0.
    #[must_use]
    pub fn reconstruct(cell: &FreezeoutCell) -> Self {
        let tau2 = cell.tau * cell.tau;
        let ut = cell.u_tau();
        let (ux, uy, un) = (cell.ux, cell.uy, cell.un);
        let ut2 = ut * ut;
        let ux2 = ux * ux;
        let uy2 = uy * uy;
        let utperp2 = 1.0 + ux2 + uy2;

        let (xx, xy, xn, yy, yn) = (cell.pixx, cell.pixy, cell.pixn, cell.piyy, cell.piyn);

        let nn = (xx * (ux2 - ut2)
            + yy * (uy2 - ut2)
            + 2.0 * (xy * ux * uy + tau2 * un * (xn * ux + yn * uy)))
            / (tau2 * utperp2);
        let tn = (xn * ux + yn * uy + tau2 * nn * un) / ut;
        let ty = (xy * ux + yy * uy + tau2 * yn * un) / ut;
        let tx = (xx * ux + xy * uy + tau2 * xn * un) / ut;
        let tt = (tx * ux + ty * uy + tau2 * tn * un) / ut;

        Self {
            tt,
            tx,
            ty,
            tn,
            xx,
            xy,
            xn,
            yy,
            yn,
            nn,
        }
    }

    /// Largest violation of pi.u = 0 and Tr(pi) = 0, normalized; should
    /// vanish by construction up to rounding.
    #[must_use]
    pub fn constraint_violation(&self, cell: &FreezeoutCell) -> f64 {
        let tau2 = cell.tau * cell.tau;
        let ut = cell.u_tau();
        let (ux, uy, un) = (cell.ux, cell.uy, cell.un);

        // pi^{mu nu} u_nu with u_nu = (ut, -ux, -uy, -tau2 un)
        let pu_t = self.tt * ut - self.tx * ux - self.ty * uy - tau2 * self.tn * un;
        let pu_x = self.tx * ut - self.xx * ux - self.xy * uy - tau2 * self.xn * un;
        let pu_y = self.ty * ut - self.xy * ux - self.yy * uy - tau2 * self.yn * un;
        let pu_n = self.tn * ut - self.xn * ux - self.yn * uy - tau2 * self.nn * un;

        let trace = self.tt - self.xx - self.yy - tau2 * self.nn;

        [pu_t, pu_x, pu_y, pu_n, trace]
            .into_iter()
            .map(f64::abs)
            .fold(0.0, f64::max)
    }
}

/// The full contravariant baryon diffusion current V^mu.
#[derive(Clone, Copy, Debug, Default)]
pub struct DiffusionCurrent {
    /// V^tau.
    pub t: f64,
    /// V^x.
    pub x: f64,
    /// V^y.
    pub y: f64,
    /// V^eta.
    pub n: f64,
}

impl DiffusionCurrent {
    /// Reconstructs V^tau from the spatial inputs using V.u = 0.
    #[must_use]
    pub fn reconstruct(cell: &FreezeoutCell) -> Self {
        let tau2 = cell.tau * cell.tau;
        let ut = cell.u_tau();
        let t = (cell.vx * cell.ux + cell.vy * cell.uy + tau2 * cell.vn * cell.un) / ut;

        Self {
            t,
            x: cell.vx,
            y: cell.vy,
            n: cell.vn,
        }
    }

    /// V^mu dSigma_mu.
    #[must_use]
    pub fn dot_dsigma(&self, cell: &FreezeoutCell) -> f64 {
        self.t * cell.dsigma_tau
            + self.x * cell.dsigma_x
            + self.y * cell.dsigma_y
            + self.n * cell.dsigma_eta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    fn flowing_cell() -> FreezeoutCell {
        FreezeoutCell {
            tau: 2.5,
            eta: 0.3,
            dsigma_tau: 0.1,
            dsigma_x: 0.02,
            dsigma_y: -0.01,
            dsigma_eta: 0.005,
            ux: 0.4,
            uy: -0.2,
            un: 0.05,
            temperature: 0.155,
            pressure: 0.08,
            energy_density: 0.45,
            pixx: 0.01,
            pixy: -0.004,
            pixn: 0.002,
            piyy: 0.007,
            piyn: -0.001,
            bulk_pi: -0.01,
            mub: 0.05,
            nb: 0.02,
            vx: 0.003,
            vy: -0.002,
            vn: 0.001,
            ..FreezeoutCell::default()
        }
    }

    #[test]
    fn flow_normalization() {
        let cell = flowing_cell();
        let ut = cell.u_tau();
        let tau2 = cell.tau * cell.tau;
        let norm = ut * ut - cell.ux * cell.ux - cell.uy * cell.uy - tau2 * cell.un * cell.un;

        assert_approx_eq!(f64, norm, 1.0, epsilon = 1e-14);
    }

    #[test]
    fn shear_reconstruction_restores_constraints() {
        let cell = flowing_cell();
        let pimunu = ShearTensor::reconstruct(&cell);

        assert!(pimunu.constraint_violation(&cell) < 1e-10);
    }

    #[test]
    fn diffusion_reconstruction_is_orthogonal() {
        let cell = flowing_cell();
        let tau2 = cell.tau * cell.tau;
        let vmu = DiffusionCurrent::reconstruct(&cell);
        let ut = cell.u_tau();
        let vu = vmu.t * ut - vmu.x * cell.ux - vmu.y * cell.uy - tau2 * vmu.n * cell.un;

        assert_approx_eq!(f64, vu, 0.0, epsilon = 1e-14);
    }

    #[test]
    fn max_volume_bounds_time_component() {
        let cell = flowing_cell();

        assert!(cell.max_volume_element() >= cell.u_dot_dsigma().abs());
    }
}
