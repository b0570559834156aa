//! Milne tetrad construction and tensor boosts between the lab frame and
//! the fluid local rest frame (LRF).
//!
//! The tetrad {u, X, Y, Z} is a right-handed orthonormal basis with Z
//! aligned along the longitudinal direction in the tau-eta plane and X in
//! the transverse plane. All contractions below use the Milne metric
//! g = diag(1, -1, -1, -tau^2).

use crate::cell::{DiffusionCurrent, FreezeoutCell, ShearTensor};
use crate::momentum::LrfMomentum;

/// Transverse flow below this magnitude degenerates X and Y to the
/// coordinate axes.
const UPERP_EPSILON: f64 = 1e-5;

/// Contravariant fluid velocity together with the derived magnitudes the
/// tetrad construction needs.
#[derive(Clone, Copy, Debug)]
pub struct FluidVelocity {
    /// u^tau.
    pub t: f64,
    /// u^x.
    pub x: f64,
    /// u^y.
    pub y: f64,
    /// u^eta.
    pub n: f64,
    /// u_perp = sqrt(ux^2 + uy^2).
    pub perp: f64,
    /// u_{T,perp} = sqrt(1 + ux^2 + uy^2).
    pub t_perp: f64,
}

impl FluidVelocity {
    /// Velocity of a freezeout cell with u^tau re-established from the
    /// normalization u.u = 1.
    #[must_use]
    pub fn of_cell(cell: &FreezeoutCell) -> Self {
        let perp2 = cell.ux * cell.ux + cell.uy * cell.uy;

        Self {
            t: cell.u_tau(),
            x: cell.ux,
            y: cell.uy,
            n: cell.un,
            perp: perp2.sqrt(),
            t_perp: (1.0 + perp2).sqrt(),
        }
    }
}

/// The spatial tetrad vectors {X^mu, Y^mu, Z^mu} orthogonal to u^mu.
///
/// Y has no tau or eta component and Z no transverse components, so only
/// the nonvanishing entries are stored.
#[derive(Clone, Copy, Debug)]
pub struct MilneBasis {
    /// X^tau.
    pub xt: f64,
    /// X^x.
    pub xx: f64,
    /// X^y.
    pub xy: f64,
    /// X^eta.
    pub xn: f64,
    /// Y^x.
    pub yx: f64,
    /// Y^y.
    pub yy: f64,
    /// Z^tau.
    pub zt: f64,
    /// Z^eta.
    pub zn: f64,
}

impl MilneBasis {
    /// Constructs the tetrad at a cell with proper time `tau`.
    #[must_use]
    pub fn new(u: &FluidVelocity, tau: f64) -> Self {
        let sinh_l = tau * u.n / u.t_perp;
        let cosh_l = u.t / u.t_perp;

        let mut basis = Self {
            xt: u.perp * cosh_l,
            xx: 1.0,
            xy: 0.0,
            xn: u.perp * sinh_l / tau,
            yx: 0.0,
            yy: 1.0,
            zt: sinh_l,
            zn: cosh_l / tau,
        };

        // stops 0/0 for cells without transverse flow
        if u.perp > UPERP_EPSILON {
            basis.xx = u.t_perp * u.x / u.perp;
            basis.xy = u.t_perp * u.y / u.perp;
            basis.yx = -u.y / u.perp;
            basis.yy = u.x / u.perp;
        }

        basis
    }

    /// Largest deviation from u.u = 1, X.X = Y.Y = Z.Z = -1 and the
    /// pairwise orthogonality relations.
    #[must_use]
    pub fn orthonormality_violation(&self, u: &FluidVelocity, tau2: f64) -> f64 {
        let uu = u.t * u.t - u.x * u.x - u.y * u.y - tau2 * u.n * u.n;
        let xx = self.xt * self.xt - self.xx * self.xx - self.xy * self.xy - tau2 * self.xn * self.xn;
        let yy = -self.yx * self.yx - self.yy * self.yy;
        let zz = self.zt * self.zt - tau2 * self.zn * self.zn;

        let ux = u.t * self.xt - u.x * self.xx - u.y * self.xy - tau2 * u.n * self.xn;
        let uy = -u.x * self.yx - u.y * self.yy;
        let uz = u.t * self.zt - tau2 * u.n * self.zn;
        let xy = -self.xx * self.yx - self.xy * self.yy;
        let xz = self.xt * self.zt - tau2 * self.xn * self.zn;

        [uu - 1.0, xx + 1.0, yy + 1.0, zz + 1.0, ux, uy, uz, xy, xz]
            .into_iter()
            .map(f64::abs)
            .fold(0.0, f64::max)
    }
}

/// The covariant surface element boosted into the LRF.
#[derive(Clone, Copy, Debug)]
pub struct LrfSurfaceElement {
    /// u^mu dSigma_mu.
    pub time: f64,
    /// -X^mu dSigma_mu.
    pub x: f64,
    /// -Y^mu dSigma_mu.
    pub y: f64,
    /// -Z^mu dSigma_mu.
    pub z: f64,
    /// Magnitude of the spatial part.
    pub space: f64,
    /// Max volume element |dSigma| bounding p.dSigma / E.
    pub max_volume: f64,
}

impl LrfSurfaceElement {
    /// Boosts the covariant normal vector of `cell` into the LRF.
    #[must_use]
    pub fn boost(cell: &FreezeoutCell, u: &FluidVelocity, basis: &MilneBasis) -> Self {
        let (dat, dax, day, dan) = (
            cell.dsigma_tau,
            cell.dsigma_x,
            cell.dsigma_y,
            cell.dsigma_eta,
        );

        let time = u.t * dat + u.x * dax + u.y * day + u.n * dan;
        let x = -(basis.xt * dat + basis.xx * dax + basis.xy * day + basis.xn * dan);
        let y = -(basis.yx * dax + basis.yy * day);
        let z = -(basis.zt * dat + basis.zn * dan);
        let space = (x * x + y * y + z * z).sqrt();

        Self {
            time,
            x,
            y,
            z,
            space,
            max_volume: time.abs() + space,
        }
    }

    /// p^mu dSigma_mu for an LRF momentum.
    #[must_use]
    pub fn flux(&self, p: &LrfMomentum) -> f64 {
        p.e * self.time - p.px * self.x - p.py * self.y - p.pz * self.z
    }
}

/// The shear stress tensor boosted into the LRF; a symmetric traceless
/// 3-tensor.
#[derive(Clone, Copy, Debug, Default)]
pub struct LrfShearTensor {
    /// pi_xx in the LRF.
    pub xx: f64,
    /// pi_xy in the LRF.
    pub xy: f64,
    /// pi_xz in the LRF.
    pub xz: f64,
    /// pi_yy in the LRF.
    pub yy: f64,
    /// pi_yz in the LRF.
    pub yz: f64,
    /// pi_zz in the LRF.
    pub zz: f64,
}

impl LrfShearTensor {
    /// Boosts pi^{mu nu} into the LRF; pi_zz follows from tracelessness.
    #[must_use]
    pub fn boost(pi: &ShearTensor, basis: &MilneBasis, tau2: f64) -> Self {
        let b = basis;

        // X_mu pi^{mu nu} and Y_mu pi^{mu nu} with covariant components
        // X_mu = (Xt, -Xx, -Xy, -tau2 Xn), Y_mu = (0, -Yx, -Yy, 0)
        let xpi_t = b.xt * pi.tt - b.xx * pi.tx - b.xy * pi.ty - tau2 * b.xn * pi.tn;
        let xpi_x = b.xt * pi.tx - b.xx * pi.xx - b.xy * pi.xy - tau2 * b.xn * pi.xn;
        let xpi_y = b.xt * pi.ty - b.xx * pi.xy - b.xy * pi.yy - tau2 * b.xn * pi.yn;
        let xpi_n = b.xt * pi.tn - b.xx * pi.xn - b.xy * pi.yn - tau2 * b.xn * pi.nn;

        let ypi_t = -b.yx * pi.tx - b.yy * pi.ty;
        let ypi_x = -b.yx * pi.xx - b.yy * pi.xy;
        let ypi_y = -b.yx * pi.xy - b.yy * pi.yy;
        let ypi_n = -b.yx * pi.xn - b.yy * pi.yn;

        let xx = b.xt * xpi_t - b.xx * xpi_x - b.xy * xpi_y - tau2 * b.xn * xpi_n;
        let xy = -(b.yx * xpi_x + b.yy * xpi_y);
        let xz = b.zt * xpi_t - tau2 * b.zn * xpi_n;
        let yy = -(b.yx * ypi_x + b.yy * ypi_y);
        let yz = b.zt * ypi_t - tau2 * b.zn * ypi_n;
        let zz = -(xx + yy);

        Self {
            xx,
            xy,
            xz,
            yy,
            yz,
            zz,
        }
    }

    /// pi_ij p^i p^j for an LRF momentum.
    #[must_use]
    pub fn contract(&self, p: &LrfMomentum) -> f64 {
        p.px * p.px * self.xx
            + p.py * p.py * self.yy
            + p.pz * p.pz * self.zz
            + 2.0 * (p.px * p.py * self.xy + p.px * p.pz * self.xz + p.py * p.pz * self.yz)
    }

    /// Residual trace pi^i_i; vanishes by construction.
    #[must_use]
    pub fn trace(&self) -> f64 {
        self.xx + self.yy + self.zz
    }
}

/// The baryon diffusion current boosted into the LRF; a 3-vector.
#[derive(Clone, Copy, Debug, Default)]
pub struct LrfDiffusion {
    /// V_x in the LRF.
    pub x: f64,
    /// V_y in the LRF.
    pub y: f64,
    /// V_z in the LRF.
    pub z: f64,
}

impl LrfDiffusion {
    /// Boosts V^mu into the LRF.
    #[must_use]
    pub fn boost(v: &DiffusionCurrent, basis: &MilneBasis, tau2: f64) -> Self {
        Self {
            x: -(basis.xt * v.t - basis.xx * v.x - basis.xy * v.y - tau2 * basis.xn * v.n),
            y: basis.yx * v.x + basis.yy * v.y,
            z: -(basis.zt * v.t - tau2 * basis.zn * v.n),
        }
    }

    /// V_mu p^mu restricted to the spatial LRF components (the time
    /// component vanishes by orthogonality).
    #[must_use]
    pub fn contract(&self, p: &LrfMomentum) -> f64 {
        -(p.px * self.x + p.py * self.y + p.pz * self.z)
    }
}

/// A lab-frame Milne momentum (p^tau, p^x, p^y, p^eta).
#[derive(Clone, Copy, Debug)]
pub struct LabMomentum {
    /// p^tau.
    pub ptau: f64,
    /// p^x.
    pub px: f64,
    /// p^y.
    pub py: f64,
    /// p^eta.
    pub pn: f64,
}

impl LabMomentum {
    /// Boosts an LRF momentum back to the lab frame,
    /// p^mu = E u^mu + p_x X^mu + p_y Y^mu + p_z Z^mu.
    #[must_use]
    pub fn boost(p: &LrfMomentum, u: &FluidVelocity, basis: &MilneBasis) -> Self {
        Self {
            ptau: p.e * u.t + p.px * basis.xt + p.pz * basis.zt,
            px: p.e * u.x + p.px * basis.xx + p.py * basis.yx,
            py: p.e * u.y + p.px * basis.xy + p.py * basis.yy,
            pn: p.e * u.n + p.px * basis.xn + p.pz * basis.zn,
        }
    }
}
