//! Reconstruction of the anisotropic variables (lambda, a_T, a_L) and the
//! residual deformation of the anisotropic scheme.
//!
//! The anisotropic ansatz `f_a(p) = f_iso(sqrt(p_T^2/a_T^2 + p_z^2/a_L^2
//! + m^2) / lambda)` has three free parameters fixed by matching the
//! macroscopic energy density and the longitudinal and transverse
//! pressures. The matching system is solved per cell with a damped Newton
//! iteration; the previous cell's solution serves as warm start.

use crate::basis::LrfShearTensor;
use crate::momentum::DeformationMatrix;
use crate::quadrature::{GaussLaguerre, GaussLegendre};
use crate::species::HadronSpecies;
use crate::TWO_PI2_HBARC3;

const NEWTON_MAX_ITER: u32 = 50;
const NEWTON_TOL: f64 = 1e-9;
const JACOBIAN_STEP: f64 = 1e-6;
const LINE_SEARCH_MAX_HALVINGS: u32 = 12;

/// The three parameters of the anisotropic ansatz.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnisoVariables {
    /// Effective temperature lambda (GeV).
    pub lambda: f64,
    /// Transverse momentum scale a_T.
    pub a_t: f64,
    /// Longitudinal momentum scale a_L.
    pub a_l: f64,
}

impl AnisoVariables {
    /// The equilibrium point (lambda = T, a_T = a_L = 1).
    #[must_use]
    pub const fn equilibrium(t: f64) -> Self {
        Self {
            lambda: t,
            a_t: 1.0,
            a_l: 1.0,
        }
    }
}

/// Macroscopic targets of the reconstruction.
#[derive(Clone, Copy, Debug)]
pub struct AnisoTargets {
    /// Energy density (GeV/fm^3).
    pub energy: f64,
    /// Longitudinal pressure P + Pi + pi_zz (GeV/fm^3).
    pub pl: f64,
    /// Transverse pressure P + Pi - pi_zz / 2 (GeV/fm^3).
    pub pt: f64,
}

/// Kinetic (energy, p_T, p_L) moments of the anisotropic distribution
/// summed over `species`.
#[must_use]
pub fn aniso_moments(
    vars: &AnisoVariables,
    species: &[HadronSpecies],
    laguerre: &GaussLaguerre,
    legendre: &GaussLegendre,
) -> (f64, f64, f64) {
    let lambda = vars.lambda;
    let (at, al) = (vars.a_t, vars.a_l);
    let at2 = at * at;
    let al2 = al * al;
    let det_a = at2 * al;

    // 1 / (4 pi^2 (hbar c)^3) with the full [-1, 1] angular range
    let prefactor = det_a * lambda.powi(4) / (2.0 * TWO_PI2_HBARC3);

    let (mut energy, mut pt, mut pl) = (0.0, 0.0, 0.0);

    for part in species {
        let mbar = part.mass / lambda;
        let mbar2 = mbar * mbar;
        let sign = part.statistics.sign();

        for (pbar, wp) in laguerre.nodes(2) {
            let pbar2 = pbar * pbar;
            let wbar = (pbar2 + mbar2).sqrt();
            let f = wp * pbar.exp() / (wbar.exp() + sign);

            for (z, wz) in legendre.nodes() {
                let z2 = z * z;
                let eb = (mbar2 + pbar2 * (at2 * (1.0 - z2) + al2 * z2)).sqrt();
                let common = part.degeneracy * f * wz;

                energy += common * eb;
                pt += common * at2 * pbar2 * (1.0 - z2) / (2.0 * eb);
                pl += common * al2 * pbar2 * z2 / eb;
            }
        }
    }

    (prefactor * energy, prefactor * pt, prefactor * pl)
}

/// Anisotropic number density of one species (fm^-3).
#[must_use]
pub fn aniso_density(
    part: &HadronSpecies,
    vars: &AnisoVariables,
    chem: f64,
    laguerre: &GaussLaguerre,
) -> f64 {
    let lambda = vars.lambda;
    let mbar = part.mass / lambda;
    let mbar2 = mbar * mbar;
    let sign = part.statistics.sign();
    let det_a = vars.a_t * vars.a_t * vars.a_l;
    let na_fact = lambda.powi(3) * det_a / TWO_PI2_HBARC3;

    let moment: f64 = laguerre
        .nodes(1)
        .map(|(pbar, w)| {
            let wbar = (pbar * pbar + mbar2).sqrt();
            w * pbar * pbar.exp() / ((wbar - chem).exp() + sign)
        })
        .sum();

    part.degeneracy * na_fact * moment
}

/// A converged reconstruction together with its iteration count.
#[derive(Clone, Copy, Debug)]
pub struct AnisoSolution {
    /// The reconstructed variables.
    pub variables: AnisoVariables,
    /// Newton iterations spent.
    pub iterations: u32,
}

fn residual(
    vars: &AnisoVariables,
    targets: &AnisoTargets,
    species: &[HadronSpecies],
    laguerre: &GaussLaguerre,
    legendre: &GaussLegendre,
) -> [f64; 3] {
    let (energy, pt, pl) = aniso_moments(vars, species, laguerre, legendre);

    [energy - targets.energy, pt - targets.pt, pl - targets.pl]
}

fn scaled_norm(f: &[f64; 3], scale: &[f64; 3]) -> f64 {
    f.iter()
        .zip(scale)
        .map(|(fi, si)| (fi / si).abs())
        .fold(0.0, f64::max)
}

/// Solves a 3x3 linear system by Gaussian elimination with partial
/// pivoting; `None` when the matrix is singular.
fn solve3(mut a: [[f64; 3]; 3], mut b: [f64; 3]) -> Option<[f64; 3]> {
    for col in 0..3 {
        let pivot = (col..3).max_by(|&i, &j| {
            a[i][col]
                .abs()
                .partial_cmp(&a[j][col].abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })?;

        if a[pivot][col].abs() < 1e-300 {
            return None;
        }

        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in col + 1..3 {
            let factor = a[row][col] / a[col][col];
            for k in col..3 {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = [0.0; 3];
    for row in (0..3).rev() {
        let mut sum = b[row];
        for k in row + 1..3 {
            sum -= a[row][k] * x[k];
        }
        x[row] = sum / a[row][row];
    }

    Some(x)
}

/// Newton solve of the (energy, p_T, p_L) matching system starting from
/// `guess`. `None` when the iteration stalls or leaves the positive
/// octant.
#[must_use]
pub fn find_anisotropic_variables(
    targets: &AnisoTargets,
    guess: AnisoVariables,
    species: &[HadronSpecies],
    laguerre: &GaussLaguerre,
    legendre: &GaussLegendre,
) -> Option<AnisoSolution> {
    let scale = [
        targets.energy.abs().max(1e-10),
        targets.pt.abs().max(1e-10),
        targets.pl.abs().max(1e-10),
    ];

    let mut x = [guess.lambda, guess.a_t, guess.a_l];

    for iteration in 0..NEWTON_MAX_ITER {
        let vars = AnisoVariables {
            lambda: x[0],
            a_t: x[1],
            a_l: x[2],
        };
        let f = residual(&vars, targets, species, laguerre, legendre);
        let f_norm = scaled_norm(&f, &scale);

        if f_norm < NEWTON_TOL {
            return Some(AnisoSolution {
                variables: vars,
                iterations: iteration,
            });
        }

        // forward-difference Jacobian
        let mut jacobian = [[0.0; 3]; 3];
        for k in 0..3 {
            let h = JACOBIAN_STEP * x[k];
            let mut xk = x;
            xk[k] += h;
            let fk = residual(
                &AnisoVariables {
                    lambda: xk[0],
                    a_t: xk[1],
                    a_l: xk[2],
                },
                targets,
                species,
                laguerre,
                legendre,
            );
            for row in 0..3 {
                jacobian[row][k] = (fk[row] - f[row]) / h;
            }
        }

        let dx = solve3(jacobian, [-f[0], -f[1], -f[2]])?;

        // backtrack until the step stays positive and reduces the residual
        let mut step = 1.0;
        let mut accepted = false;
        for _ in 0..LINE_SEARCH_MAX_HALVINGS {
            let trial = [x[0] + step * dx[0], x[1] + step * dx[1], x[2] + step * dx[2]];

            if trial.iter().all(|&v| v > 0.0) {
                let trial_norm = scaled_norm(
                    &residual(
                        &AnisoVariables {
                            lambda: trial[0],
                            a_t: trial[1],
                            a_l: trial[2],
                        },
                        targets,
                        species,
                        laguerre,
                        legendre,
                    ),
                    &scale,
                );

                if trial_norm < f_norm {
                    x = trial;
                    accepted = true;
                    break;
                }
            }

            step *= 0.5;
        }

        if !accepted {
            return None;
        }
    }

    None
}

/// Warm-start bookkeeping of the per-surface reconstruction sweep.
#[derive(Clone, Debug, Default)]
pub struct AnisoState {
    previous: Option<AnisoVariables>,
    /// Cells with nonpositive longitudinal or transverse pressure.
    pub plpt_negative: u64,
    /// Cells where both reconstruction attempts failed.
    pub reconstruction_failures: u64,
    /// Iterations spent by the most recent successful solve.
    pub last_iterations: u32,
}

impl AnisoState {
    /// Reconstructs the anisotropic variables of one cell.
    ///
    /// Warm-starts from the previous success; on failure retries once from
    /// the equilibrium guess; on a second failure resets the warm start,
    /// bumps the failure counter and returns `None` (the cell then samples
    /// the equilibrium distribution).
    pub fn reconstruct(
        &mut self,
        targets: &AnisoTargets,
        t: f64,
        species: &[HadronSpecies],
        laguerre: &GaussLaguerre,
        legendre: &GaussLegendre,
    ) -> Option<AnisoVariables> {
        if targets.pl <= 0.0 || targets.pt <= 0.0 {
            self.plpt_negative += 1;
            return None;
        }

        let warm = self.previous;
        let guess = warm.unwrap_or(AnisoVariables::equilibrium(t));

        let solution = find_anisotropic_variables(targets, guess, species, laguerre, legendre)
            .or_else(|| {
                // second attempt only helps when the first guess was warm
                warm.and_then(|_| {
                    find_anisotropic_variables(
                        targets,
                        AnisoVariables::equilibrium(t),
                        species,
                        laguerre,
                        legendre,
                    )
                })
            });

        match solution {
            Some(solution) => {
                self.previous = Some(solution.variables);
                self.last_iterations = solution.iterations;
                Some(solution.variables)
            }
            None => {
                self.previous = None;
                self.reconstruction_failures += 1;
                None
            }
        }
    }
}

/// Residual deformation coefficients of the anisotropic scheme.
#[derive(Clone, Copy, Debug)]
pub struct FamodCoefficients {
    /// Transverse shear modulus beta_pi_perp (GeV/fm^3).
    pub beta_pi_perp: f64,
    /// Longitudinal-transverse coupling beta_w_perp (GeV/fm^3).
    pub beta_w_perp: f64,
}

/// Computes the residual-deformation moduli as anisotropic `p^4 / E^2
/// f fbar` moments; both reduce to the isotropic shear modulus pattern at
/// a_T = a_L = 1.
#[must_use]
pub fn famod_coefficients(
    vars: &AnisoVariables,
    species: &[HadronSpecies],
    laguerre: &GaussLaguerre,
    legendre: &GaussLegendre,
) -> FamodCoefficients {
    let lambda = vars.lambda;
    let (at, al) = (vars.a_t, vars.a_l);
    let at2 = at * at;
    let al2 = al * al;
    let det_a = at2 * al;

    let prefactor = det_a * lambda.powi(4) / (2.0 * TWO_PI2_HBARC3);

    let (mut beta_pi_perp, mut beta_w_perp) = (0.0, 0.0);

    for part in species {
        let mbar = part.mass / lambda;
        let mbar2 = mbar * mbar;
        let sign = part.statistics.sign();

        for (pbar, wp) in laguerre.nodes(2) {
            let pbar2 = pbar * pbar;
            let pbar4 = pbar2 * pbar2;
            let wbar = (pbar2 + mbar2).sqrt();
            let f = 1.0 / (wbar.exp() + sign);
            let ffbar = wp * pbar.exp() * f * (1.0 - sign * f);

            for (z, wz) in legendre.nodes() {
                let z2 = z * z;
                let eb2 = mbar2 + pbar2 * (at2 * (1.0 - z2) + al2 * z2);
                let common = part.degeneracy * ffbar * wz * pbar4 / eb2;

                // transverse-traceless and longitudinal-transverse
                // projections of the quartic moment
                beta_pi_perp += common * at2 * at2 * (1.0 - z2) * (1.0 - z2) / 4.0;
                beta_w_perp += common * at2 * al2 * z2 * (1.0 - z2) / 2.0;
            }
        }
    }

    FamodCoefficients {
        beta_pi_perp: prefactor * beta_pi_perp,
        beta_w_perp: prefactor * beta_w_perp,
    }
}

/// Transverse-plane projections of the LRF shear stress feeding the
/// residual deformation.
#[derive(Clone, Copy, Debug, Default)]
pub struct ResidualShear {
    /// piperp_xx = (pi_xx - pi_yy) / 2.
    pub pi_t_xx: f64,
    /// piperp_xy = pi_xy.
    pub pi_t_xy: f64,
    /// Wperp_zx = pi_xz.
    pub w_zx: f64,
    /// Wperp_zy = pi_yz.
    pub w_zy: f64,
}

impl ResidualShear {
    /// Projects the boosted shear stress; zero when the shear correction
    /// is disabled.
    #[must_use]
    pub fn project(pi: &LrfShearTensor, include_shear: bool) -> Self {
        if include_shear {
            Self {
                pi_t_xx: (pi.xx - pi.yy) / 2.0,
                pi_t_xy: pi.xy,
                w_zx: pi.xz,
                w_zy: pi.yz,
            }
        } else {
            Self::default()
        }
    }
}

/// Builds the momentum transformation `B = C A` from the leading-order
/// diagonal deformation and the residual shear, returning the matrix and
/// det B = det C det A.
#[must_use]
pub fn build_deformation(
    vars: &AnisoVariables,
    famod: &FamodCoefficients,
    residual: &ResidualShear,
) -> (DeformationMatrix, f64) {
    let (at, al) = (vars.a_t, vars.a_l);
    let shear_coeff = 0.5 / famod.beta_pi_perp;
    let diff_coeff = 1.0 / famod.beta_w_perp;

    let det_a = at * at * al;

    let pi_t_yy = -residual.pi_t_xx;

    let cxx = 1.0 + shear_coeff * residual.pi_t_xx;
    let cxy = shear_coeff * residual.pi_t_xy;
    let cxz = diff_coeff * residual.w_zx * at / (at + al);
    let cyx = cxy;
    let cyy = 1.0 + shear_coeff * pi_t_yy;
    let cyz = diff_coeff * residual.w_zy * at / (at + al);
    let czx = diff_coeff * residual.w_zx * al / (at + al);
    let czy = diff_coeff * residual.w_zy * al / (at + al);
    let czz = 1.0;

    let det_c = cxx * (cyy * czz - cyz * czy) - cxy * (cyx * czz - cyz * czx)
        + cxz * (cyx * czy - cyy * czx);

    let b = DeformationMatrix {
        xx: at + at * shear_coeff * residual.pi_t_xx,
        xy: at * shear_coeff * residual.pi_t_xy,
        xz: diff_coeff * residual.w_zx * at * al / (at + al),
        yy: at + at * shear_coeff * pi_t_yy,
        yz: diff_coeff * residual.w_zy * at * al / (at + al),
        zz: al,
    };

    (b, det_c * det_a)
}

/// The lightest `cap` species, for the reconstruction's thermal integrals.
#[must_use]
pub fn truncate_by_mass(species: &[HadronSpecies], cap: usize) -> Vec<HadronSpecies> {
    let mut sorted: Vec<HadronSpecies> = species.to_vec();
    sorted.sort_by(|a, b| a.mass.partial_cmp(&b.mass).unwrap_or(std::cmp::Ordering::Equal));
    sorted.truncate(cap);

    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::species::Statistics;
    use float_cmp::assert_approx_eq;

    fn pion() -> HadronSpecies {
        HadronSpecies::new(111, 0.138, 1.0, 0.0, Statistics::BoseEinstein)
    }

    fn rules() -> (GaussLaguerre, GaussLegendre) {
        (GaussLaguerre::new(32).unwrap(), GaussLegendre::new(24).unwrap())
    }

    #[test]
    fn isotropic_moments_give_equal_pressures() {
        let (laguerre, legendre) = rules();
        let vars = AnisoVariables::equilibrium(0.15);
        let species = [pion()];
        let (energy, pt, pl) = aniso_moments(&vars, &species, &laguerre, &legendre);

        assert!(energy > 0.0);
        assert_approx_eq!(f64, pt, pl, epsilon = 1e-12);
        // relativistic gas: P < e / 3
        assert!(3.0 * pl < energy);
    }

    #[test]
    fn isotropic_density_matches_thermal_integral() {
        let (laguerre, _) = rules();
        let vars = AnisoVariables::equilibrium(0.15);
        let part = pion();
        let n_aniso = aniso_density(&part, &vars, 0.0, &laguerre);
        let n_thermal = crate::thermal::equilibrium_density(
            &laguerre, part.mass, part.degeneracy, 0.15, 0.0, -1.0,
        );

        assert_approx_eq!(f64, n_aniso, n_thermal, epsilon = 1e-12);
    }

    #[test]
    fn solver_recovers_equilibrium_state() {
        let (laguerre, legendre) = rules();
        let species = [pion()];
        let exact = AnisoVariables::equilibrium(0.15);
        let (energy, pt, pl) = aniso_moments(&exact, &species, &laguerre, &legendre);
        let targets = AnisoTargets { energy, pl, pt };

        let guess = AnisoVariables {
            lambda: 0.18,
            a_t: 0.8,
            a_l: 1.3,
        };
        let solution =
            find_anisotropic_variables(&targets, guess, &species, &laguerre, &legendre).unwrap();

        assert_approx_eq!(f64, solution.variables.lambda, 0.15, epsilon = 1e-5);
        assert_approx_eq!(f64, solution.variables.a_t, 1.0, epsilon = 1e-4);
        assert_approx_eq!(f64, solution.variables.a_l, 1.0, epsilon = 1e-4);
    }

    #[test]
    fn solver_recovers_anisotropic_state() {
        let (laguerre, legendre) = rules();
        let species = [pion()];
        let exact = AnisoVariables {
            lambda: 0.16,
            a_t: 1.1,
            a_l: 0.85,
        };
        let (energy, pt, pl) = aniso_moments(&exact, &species, &laguerre, &legendre);
        let targets = AnisoTargets { energy, pl, pt };

        let solution = find_anisotropic_variables(
            &targets,
            AnisoVariables::equilibrium(0.15),
            &species,
            &laguerre,
            &legendre,
        )
        .unwrap();

        assert_approx_eq!(f64, solution.variables.lambda, 0.16, epsilon = 1e-4);
        assert_approx_eq!(f64, solution.variables.a_t, 1.1, epsilon = 1e-3);
        assert_approx_eq!(f64, solution.variables.a_l, 0.85, epsilon = 1e-3);
    }

    #[test]
    fn warm_start_converges_within_two_iterations() {
        let (laguerre, legendre) = rules();
        let species = [pion()];
        let exact = AnisoVariables {
            lambda: 0.155,
            a_t: 1.05,
            a_l: 0.9,
        };
        let (energy, pt, pl) = aniso_moments(&exact, &species, &laguerre, &legendre);
        let targets = AnisoTargets { energy, pl, pt };

        let mut state = AnisoState::default();
        state
            .reconstruct(&targets, 0.15, &species, &laguerre, &legendre)
            .unwrap();
        state
            .reconstruct(&targets, 0.15, &species, &laguerre, &legendre)
            .unwrap();

        assert!(state.last_iterations <= 2, "iterations = {}", state.last_iterations);
    }

    #[test]
    fn negative_pressure_skips_reconstruction() {
        let (laguerre, legendre) = rules();
        let species = [pion()];
        let targets = AnisoTargets {
            energy: 0.4,
            pl: -0.01,
            pt: 0.05,
        };

        let mut state = AnisoState::default();
        let result = state.reconstruct(&targets, 0.15, &species, &laguerre, &legendre);

        assert!(result.is_none());
        assert_eq!(state.plpt_negative, 1);
        assert_eq!(state.reconstruction_failures, 0);
    }

    #[test]
    fn unreachable_targets_count_as_failure() {
        let (laguerre, legendre) = rules();
        let species = [pion()];
        // pressures wildly inconsistent with any positive-octant solution
        let targets = AnisoTargets {
            energy: 1e-12,
            pl: 10.0,
            pt: 10.0,
        };

        let mut state = AnisoState::default();
        let result = state.reconstruct(&targets, 0.15, &species, &laguerre, &legendre);

        assert!(result.is_none());
        assert_eq!(state.reconstruction_failures, 1);
    }

    #[test]
    fn deformation_without_residual_shear_is_diagonal() {
        let vars = AnisoVariables {
            lambda: 0.15,
            a_t: 1.2,
            a_l: 0.7,
        };
        let famod = FamodCoefficients {
            beta_pi_perp: 0.05,
            beta_w_perp: 0.03,
        };
        let (b, det_b) = build_deformation(&vars, &famod, &ResidualShear::default());

        assert_approx_eq!(f64, b.xx, 1.2, ulps = 2);
        assert_approx_eq!(f64, b.yy, 1.2, ulps = 2);
        assert_approx_eq!(f64, b.zz, 0.7, ulps = 2);
        assert_approx_eq!(f64, b.xy, 0.0, ulps = 2);
        assert_approx_eq!(f64, det_b, 1.2 * 1.2 * 0.7, epsilon = 1e-14);
    }

    #[test]
    fn famod_coefficients_are_positive() {
        let (laguerre, legendre) = rules();
        let vars = AnisoVariables {
            lambda: 0.15,
            a_t: 1.1,
            a_l: 0.9,
        };
        let famod = famod_coefficients(&vars, &[pion()], &laguerre, &legendre);

        assert!(famod.beta_pi_perp > 0.0);
        assert!(famod.beta_w_perp > 0.0);
    }

    #[test]
    fn truncation_keeps_lightest_species() {
        let species = vec![
            HadronSpecies::new(2212, 0.938, 2.0, 1.0, Statistics::FermiDirac),
            pion(),
            HadronSpecies::new(321, 0.494, 1.0, 0.0, Statistics::BoseEinstein),
        ];
        let kept = truncate_by_mass(&species, 2);

        assert_eq!(kept.len(), 2);
        assert_approx_eq!(f64, kept[0].mass, 0.138, ulps = 2);
        assert_approx_eq!(f64, kept[1].mass, 0.494, ulps = 2);
    }
}
