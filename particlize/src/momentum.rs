//! Rejection sampling of local-rest-frame momenta from the
//! Maxwell-Juttner distribution, and the linear momentum transformations
//! of the modified-equilibrium schemes.
//!
//! The envelope changes with the dimensionless mass `mbar = m / T`: light
//! hadrons are drawn from the massless thermal shape `p^2 exp(-p/T)`,
//! heavy hadrons from a three-component mixture in the kinetic energy
//! `k = E - m` with integrated weights `{mbar^2, 2 mbar, 2}`.

use crate::basis::{LrfDiffusion, LrfShearTensor};
use rand::distributions::{Distribution, Uniform, WeightedIndex};
use rand::Rng;
use std::f64::consts::TAU;

/// Boundary between the pion and heavy envelope regimes.
const MBAR_PION_REGIME: f64 = 1.008;

/// Below this mass ratio the boson equilibrium weight develops an interior
/// maximum that must be divided out.
const MBAR_WEIGHT_RESCALE: f64 = 0.8554;

/// A four-momentum in the fluid local rest frame (GeV).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LrfMomentum {
    /// Energy.
    pub e: f64,
    /// x momentum component.
    pub px: f64,
    /// y momentum component.
    pub py: f64,
    /// z momentum component.
    pub pz: f64,
}

/// An accepted thermal sample together with the equilibrium occupation at
/// its energy, needed by the downstream viscous weight.
#[derive(Clone, Copy, Debug)]
pub struct ThermalSample {
    /// The sampled momentum.
    pub momentum: LrfMomentum,
    /// `f_eq(E)` at the sampled energy.
    pub feq: f64,
}

/// Acceptance bookkeeping of the rejection kernel.
#[derive(Clone, Copy, Debug, Default)]
pub struct SamplerCounters {
    /// Trial draws.
    pub samples: u64,
    /// Accepted draws.
    pub acceptances: u64,
}

impl SamplerCounters {
    /// Fraction of trials accepted.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn efficiency(&self) -> f64 {
        if self.samples == 0 {
            0.0
        } else {
            self.acceptances as f64 / self.samples as f64
        }
    }

    /// Accumulates the counts of another stream.
    pub fn merge(&mut self, other: &Self) {
        self.samples += other.samples;
        self.acceptances += other.acceptances;
    }
}

/// Maximum of the pion equilibrium weight `exp(p/T) f_eq(E)` for bosons
/// with `x = m / T < 0.8554`, from a rational fit of the interior maximum.
#[must_use]
pub fn pion_thermal_weight_max(x: f64, chem: f64) -> f64 {
    // the fit assumes no pion chemical potential
    if chem != 0.0 {
        tracing::warn!(chem, "pion thermal weight max called with nonzero chemical potential");
    }

    if x < 0.1 {
        tracing::warn!(x, "pion thermal weight max extrapolated below fitted range");
    }

    let x2 = x * x;
    let x3 = x2 * x;
    let x4 = x3 * x;

    let max = (143206.88623164667 - 95956.76008684626 * x - 21341.937407169076 * x2
        + 14388.446116867359 * x3
        - 6083.775788504437 * x4)
        / (-0.3541350577684533 + 143218.69233952634 * x - 24516.803600065778 * x2
            - 115811.59391199696 * x3
            + 35814.36403387459 * x4);

    // keeps the rescaled weight <= 1 numerically
    let buffer = 1.00001;

    buffer * max
}

fn canonical<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    rng.gen::<f64>()
}

/// Draws an LRF four-momentum from `f_eq(E) = 1 / (exp((E - mu)/T) + sign)`.
///
/// `chem = mu / T` is the reduced chemical potential; `sign` is +1 for
/// fermions and -1 for bosons. The pion-regime weight ignores `chem` (no
/// pion chemical potential is supported).
pub fn sample_momentum<R: Rng + ?Sized>(
    rng: &mut R,
    counters: &mut SamplerCounters,
    mass: f64,
    sign: f64,
    t: f64,
    chem: f64,
) -> ThermalSample {
    let mbar = mass / t;
    let mbar_squared = mbar * mbar;

    let (pbar, ebar, phi_over_2pi, costheta, feq);

    if mbar < MBAR_PION_REGIME {
        let weq_max = if mbar < MBAR_WEIGHT_RESCALE && sign == -1.0 {
            pion_thermal_weight_max(mbar, chem)
        } else {
            1.0
        };

        // draw (p, phi, costheta) from p^2 exp(-p/T) dp dphi dcostheta
        loop {
            counters.samples += 1;

            let r1 = 1.0 - canonical(rng);
            let r2 = 1.0 - canonical(rng);
            let r3 = 1.0 - canonical(rng);

            let l1 = r1.ln();
            let l2 = r2.ln();
            let l3 = r3.ln();

            let p = -(l1 + l2 + l3);
            let e = (p * p + mbar_squared).sqrt();
            let f = 1.0 / (e.exp() + sign);

            let weight = f / weq_max / (r1 * r2 * r3);

            if canonical(rng) < weight {
                pbar = p;
                ebar = e;
                feq = f;
                phi_over_2pi = (l1 + l2) * (l1 + l2) / (p * p);
                costheta = (l1 - l2) / (l1 + l2);
                break;
            }
        }
    } else {
        // kinetic-energy transformation for heavy hadrons; pick one of
        // three envelope shapes by their integrated weights
        let costheta_distribution = Uniform::new_inclusive(-1.0, 1.0);
        let envelope = WeightedIndex::new([mbar_squared, 2.0 * mbar, 2.0])
            .unwrap_or_else(|_| unreachable!());

        loop {
            counters.samples += 1;

            let (kbar, phi, cos);

            match envelope.sample(rng) {
                0 => {
                    // k from exp(-k/T) dk, directions uniform
                    kbar = -(1.0 - canonical(rng)).ln();
                    phi = canonical(rng);
                    cos = costheta_distribution.sample(rng);
                }
                1 => {
                    // (k, phi) from k exp(-k/T) dk dphi, costheta uniform
                    let l1 = (1.0 - canonical(rng)).ln();
                    let l2 = (1.0 - canonical(rng)).ln();

                    kbar = -(l1 + l2);
                    phi = -l1 / kbar;
                    cos = costheta_distribution.sample(rng);
                }
                _ => {
                    // (k, phi, costheta) from k^2 exp(-k/T) dk dphi dcostheta
                    let l1 = (1.0 - canonical(rng)).ln();
                    let l2 = (1.0 - canonical(rng)).ln();
                    let l3 = (1.0 - canonical(rng)).ln();

                    kbar = -(l1 + l2 + l3);
                    phi = (l1 + l2) * (l1 + l2) / (kbar * kbar);
                    cos = (l1 - l2) / (l1 + l2);
                }
            }

            let e = kbar + mbar;
            let p = (e * e - mbar_squared).sqrt();

            let boltz = (e - chem).exp();
            let f = 1.0 / (boltz + sign);
            let weight = p / e * boltz * f;

            if canonical(rng) < weight {
                pbar = p;
                ebar = e;
                feq = f;
                phi_over_2pi = phi;
                costheta = cos;
                break;
            }
        }
    }

    counters.acceptances += 1;

    let p = pbar * t;
    let phi = phi_over_2pi * TAU;
    let sintheta = (1.0 - costheta * costheta).sqrt();

    ThermalSample {
        momentum: LrfMomentum {
            e: ebar * t,
            px: p * sintheta * phi.cos(),
            py: p * sintheta * phi.sin(),
            pz: p * costheta,
        },
        feq,
    }
}

/// Shear, bulk and diffusion deformation applied to a momentum sampled
/// with the modified thermodynamic parameters,
/// `p_i = (1 + Pi/(3 beta_bulk)) p_i + pi_ij p_j / (2 beta_pi) + q_i`.
#[must_use]
#[allow(clippy::too_many_arguments)]
pub fn rescale_momentum(
    p_mod: &LrfMomentum,
    mass_squared: f64,
    baryon: f64,
    pi: &LrfShearTensor,
    v: &LrfDiffusion,
    shear_mod: f64,
    isotropic_scale: f64,
    diff_mod: f64,
    baryon_enthalpy_ratio: f64,
) -> LrfMomentum {
    let (e, px, py, pz) = (p_mod.e, p_mod.px, p_mod.py, p_mod.pz);

    let diff_mod = diff_mod * (e * baryon_enthalpy_ratio + baryon);

    let qx = isotropic_scale * px + shear_mod * (pi.xx * px + pi.xy * py + pi.xz * pz)
        + diff_mod * v.x;
    let qy = isotropic_scale * py + shear_mod * (pi.xy * px + pi.yy * py + pi.yz * pz)
        + diff_mod * v.y;
    let qz = isotropic_scale * pz + shear_mod * (pi.xz * px + pi.yz * py + pi.zz * pz)
        + diff_mod * v.z;

    LrfMomentum {
        e: (mass_squared + qx * qx + qy * qy + qz * qz).sqrt(),
        px: qx,
        py: qy,
        pz: qz,
    }
}

/// Symmetric deformation matrix of the anisotropic scheme, `B = C A`.
#[derive(Clone, Copy, Debug)]
pub struct DeformationMatrix {
    /// B_xx.
    pub xx: f64,
    /// B_xy.
    pub xy: f64,
    /// B_xz.
    pub xz: f64,
    /// B_yy.
    pub yy: f64,
    /// B_yz.
    pub yz: f64,
    /// B_zz.
    pub zz: f64,
}

impl DeformationMatrix {
    /// The identity deformation used once the anisotropic scheme breaks
    /// down.
    pub const IDENTITY: Self = Self {
        xx: 1.0,
        xy: 0.0,
        xz: 0.0,
        yy: 1.0,
        yz: 0.0,
        zz: 1.0,
    };
}

/// Anisotropic deformation `p_i = B_ij p_mod_j`.
#[must_use]
pub fn rescale_momentum_aniso(
    p_mod: &LrfMomentum,
    mass_squared: f64,
    b: &DeformationMatrix,
) -> LrfMomentum {
    let (px, py, pz) = (p_mod.px, p_mod.py, p_mod.pz);

    let qx = b.xx * px + b.xy * py + b.xz * pz;
    let qy = b.xy * px + b.yy * py + b.yz * pz;
    let qz = b.xz * px + b.yz * py + b.zz * pz;

    LrfMomentum {
        e: (mass_squared + qx * qx + qy * qy + qz * qz).sqrt(),
        px: qx,
        py: qy,
        pz: qz,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;
    use rand::SeedableRng;
    use rand_pcg::Pcg64;

    fn rng() -> Pcg64 {
        Pcg64::seed_from_u64(42)
    }

    fn on_shell_violation(p: &LrfMomentum, mass: f64) -> f64 {
        let p2 = p.px * p.px + p.py * p.py + p.pz * p.pz;

        (p.e * p.e - p2 - mass * mass).abs() / (p.e * p.e)
    }

    #[test]
    fn pion_samples_sit_on_mass_shell() {
        let mut rng = rng();
        let mut counters = SamplerCounters::default();

        for _ in 0..500 {
            let sample = sample_momentum(&mut rng, &mut counters, 0.14, -1.0, 0.15, 0.0);

            assert!(on_shell_violation(&sample.momentum, 0.14) < 1e-8);
            assert!(sample.feq > 0.0);
        }
    }

    #[test]
    fn nucleon_samples_sit_on_mass_shell() {
        let mut rng = rng();
        let mut counters = SamplerCounters::default();

        for _ in 0..500 {
            let sample = sample_momentum(&mut rng, &mut counters, 0.938, 1.0, 0.15, 0.0);

            assert!(on_shell_violation(&sample.momentum, 0.938) < 1e-8);
        }
    }

    #[test]
    fn pion_acceptance_rate_exceeds_twenty_percent() {
        let mut rng = rng();
        let mut counters = SamplerCounters::default();

        for _ in 0..20_000 {
            sample_momentum(&mut rng, &mut counters, 0.14, -1.0, 0.15, 0.0);
        }

        assert!(
            counters.efficiency() > 0.20,
            "pion efficiency = {}",
            counters.efficiency()
        );
    }

    #[test]
    fn nucleon_acceptance_rate_exceeds_eight_percent() {
        let mut rng = rng();
        let mut counters = SamplerCounters::default();

        for _ in 0..20_000 {
            sample_momentum(&mut rng, &mut counters, 0.938, 1.0, 0.15, 0.0);
        }

        assert!(
            counters.efficiency() > 0.08,
            "nucleon efficiency = {}",
            counters.efficiency()
        );
    }

    #[test]
    fn mean_pion_energy_matches_thermal_average() {
        // <E> from the sampler against the quadrature moment ratio
        let laguerre = crate::quadrature::GaussLaguerre::new(48).unwrap();
        let mbar = 0.14 / 0.15;
        let mbar2 = mbar * mbar;

        let (mut num, mut den) = (0.0, 0.0);
        for (pbar, w) in laguerre.nodes(1) {
            let ebar = (pbar * pbar + mbar2).sqrt();
            let f = 1.0 / (ebar.exp() - 1.0);
            num += w * pbar * pbar.exp() * ebar * f;
            den += w * pbar * pbar.exp() * f;
        }
        let expected = 0.15 * num / den;

        let mut rng = rng();
        let mut counters = SamplerCounters::default();
        let n = 200_000;
        let mut sum = 0.0;
        for _ in 0..n {
            sum += sample_momentum(&mut rng, &mut counters, 0.14, -1.0, 0.15, 0.0)
                .momentum
                .e;
        }
        let mean = sum / f64::from(n);

        // 3 sigma_mean tolerance, sigma(E) < 2 T is a safe bound here
        assert!(
            (mean - expected).abs() < 3.0 * 0.30 / f64::from(n).sqrt(),
            "mean = {mean}, expected = {expected}"
        );
    }

    #[test]
    fn weight_max_fit_is_above_one() {
        // the interior maximum of exp(p/T) f_eq exceeds the massless value
        for x in [0.2, 0.5, 0.8] {
            assert!(pion_thermal_weight_max(x, 0.0) > 1.0);
        }
    }

    #[test]
    fn identity_rescale_preserves_momentum() {
        let p = LrfMomentum {
            e: (0.14_f64 * 0.14 + 0.09).sqrt(),
            px: 0.1,
            py: -0.2,
            pz: 0.2,
        };
        let q = rescale_momentum(
            &p,
            0.14 * 0.14,
            0.0,
            &LrfShearTensor::default(),
            &LrfDiffusion::default(),
            0.0,
            1.0,
            0.0,
            0.0,
        );

        assert_approx_eq!(f64, q.px, p.px, ulps = 2);
        assert_approx_eq!(f64, q.py, p.py, ulps = 2);
        assert_approx_eq!(f64, q.pz, p.pz, ulps = 2);
        assert_approx_eq!(f64, q.e, p.e, ulps = 4);
    }

    #[test]
    fn rescaled_momentum_stays_on_shell() {
        let pi = LrfShearTensor {
            xx: 0.02,
            xy: 0.005,
            xz: -0.003,
            yy: -0.008,
            yz: 0.001,
            zz: -0.012,
        };
        let v = LrfDiffusion {
            x: 0.01,
            y: -0.02,
            z: 0.005,
        };
        let mass = 0.494;
        let p = LrfMomentum {
            e: (mass * mass + 0.35_f64).sqrt(),
            px: 0.3,
            py: -0.4,
            pz: 0.3,
        };
        let q = rescale_momentum(&p, mass * mass, 1.0, &pi, &v, 1.3, 0.95, 0.2, 0.1);

        let p2 = q.px * q.px + q.py * q.py + q.pz * q.pz;
        assert_approx_eq!(f64, q.e * q.e - p2, mass * mass, epsilon = 1e-12);
    }

    #[test]
    fn aniso_rescale_scales_axes() {
        let b = DeformationMatrix {
            xx: 1.2,
            xy: 0.0,
            xz: 0.0,
            yy: 1.2,
            yz: 0.0,
            zz: 0.7,
        };
        let mass = 0.14;
        let p = LrfMomentum {
            e: (mass * mass + 0.09_f64).sqrt(),
            px: 0.1,
            py: 0.2,
            pz: 0.2,
        };
        let q = rescale_momentum_aniso(&p, mass * mass, &b);

        assert_approx_eq!(f64, q.px, 0.12, ulps = 4);
        assert_approx_eq!(f64, q.py, 0.24, ulps = 4);
        assert_approx_eq!(f64, q.pz, 0.14, epsilon = 1e-15);
    }
}
