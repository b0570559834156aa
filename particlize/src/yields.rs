//! Mean hadron yields per cell and the oversampling event count.

use crate::averages::EnvAverages;
use crate::basis::LrfShearTensor;
use crate::cell::{DiffusionCurrent, FreezeoutCell, ShearTensor};
use crate::coefficients::{regulate_bulk_pressure, DfCoefficientSource, DfCoefficients};
use crate::config::{DfMode, SamplerConfig};
use crate::feqmod::{deformation_determinant, BreakdownCheck};
use crate::quadrature::GaussLaguerre;
use crate::species::HadronSpecies;
use crate::thermal::{j10_moment, j20_moment, neq_moment};
use crate::TWO_PI2_HBARC3;

use crate::basis::{FluidVelocity, LrfSurfaceElement, MilneBasis};

/// Mean number of one species emitted through a cell, from the
/// precomputed density tables.
#[must_use]
#[allow(clippy::too_many_arguments)]
pub fn mean_particle_number(
    part: &HadronSpecies,
    ds_time: f64,
    ds_space: f64,
    bulk_pi: f64,
    v_dsigma: f64,
    df: &DfCoefficients,
    breaks_down: bool,
    df_mode: DfMode,
) -> f64 {
    match df_mode {
        // the aniso scheme estimates its total yield the linear way
        DfMode::Grad14 | DfMode::ChapmanEnskog | DfMode::PtmModified | DfMode::PtmAniso => {
            ds_time * (part.equilibrium_density + bulk_pi * part.bulk_density)
                - ds_space * v_dsigma * part.diff_density
        }
        DfMode::PtbModified => {
            if breaks_down {
                ds_time * (1.0 + df.delta_z) * part.equilibrium_density
            } else {
                ds_time * df.z * part.equilibrium_density
            }
        }
    }
}

/// Per-cell max density of one species from the precomputed tables (FAST
/// mode); bounds the actual emission through the acceptance weights.
#[must_use]
pub fn fast_max_particle_number(
    part: &HadronSpecies,
    bulk_pi: f64,
    z: f64,
    breaks_down: bool,
    df_mode: DfMode,
) -> f64 {
    match df_mode {
        DfMode::Grad14 | DfMode::ChapmanEnskog | DfMode::PtmAniso => {
            2.0 * part.equilibrium_density
        }
        DfMode::PtmModified => {
            if breaks_down {
                2.0 * part.equilibrium_density
            } else {
                part.equilibrium_density + bulk_pi * part.bulk_density
            }
        }
        DfMode::PtbModified => {
            if breaks_down {
                2.0 * part.equilibrium_density
            } else {
                z * part.equilibrium_density
            }
        }
    }
}

/// Per-cell max density of one species from the Gauss-Laguerre thermal
/// integrals at the cell's own state.
#[must_use]
#[allow(clippy::too_many_arguments)]
pub fn max_particle_number(
    part: &HadronSpecies,
    t: f64,
    alpha_b: f64,
    bulk_pi: f64,
    df: &DfCoefficients,
    breaks_down: bool,
    laguerre: &GaussLaguerre,
    df_mode: DfMode,
    include_baryon: bool,
) -> f64 {
    let mbar = part.mass / t;
    let sign = part.statistics.sign();
    let chem = part.baryon * alpha_b;
    let neq_fact = t * t * t / TWO_PI2_HBARC3;
    let j20_fact = t * neq_fact;

    let density = match df_mode {
        DfMode::Grad14 | DfMode::ChapmanEnskog | DfMode::PtmAniso => {
            2.0 * neq_fact * part.degeneracy * neq_moment(laguerre, mbar, chem, sign)
        }
        DfMode::PtmModified => {
            let equilibrium =
                neq_fact * part.degeneracy * neq_moment(laguerre, mbar, chem, sign);

            if breaks_down {
                2.0 * equilibrium
            } else {
                let j10 = if include_baryon {
                    neq_fact * part.degeneracy * j10_moment(laguerre, mbar, chem, sign)
                } else {
                    0.0
                };
                let j20 = j20_fact * part.degeneracy * j20_moment(laguerre, mbar, chem, sign);
                let bulk_density = (equilibrium
                    + part.baryon * j10 * df.g
                    + j20 * df.f / (t * t))
                    / df.beta_bulk;

                equilibrium + bulk_pi * bulk_density
            }
        }
        DfMode::PtbModified => {
            // the PTB distribution ignores the chemical potential
            let equilibrium = neq_fact * part.degeneracy * neq_moment(laguerre, mbar, 0.0, sign);

            if breaks_down {
                2.0 * equilibrium
            } else {
                df.z * equilibrium
            }
        }
    };

    if density < 0.0 {
        tracing::warn!(mc_id = part.mc_id, density, "negative max particle density");
    }

    density
}

/// Event count reaching `min_num_hadrons` expected hadrons, capped at
/// `max_num_samples`.
#[must_use]
pub fn events_to_sample(total_yield: f64, min_num_hadrons: f64, max_num_samples: u64) -> u64 {
    if total_yield <= 0.0 {
        return 1;
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let wanted = (min_num_hadrons / total_yield).ceil().max(1.0) as u64;

    wanted.min(max_num_samples)
}

/// Estimates the mean total hadron yield of the surface (all species, all
/// cells, including the 2 y_max rapidity-volume factor).
#[must_use]
pub fn estimate_total_yield(
    surface: &[FreezeoutCell],
    species: &[HadronSpecies],
    source: &impl DfCoefficientSource,
    laguerre: &GaussLaguerre,
    config: &SamplerConfig,
    averages: &EnvAverages,
) -> f64 {
    let mut total = 0.0;

    for cell in surface {
        if cell.u_dot_dsigma() <= 0.0 {
            continue;
        }

        let tau2 = cell.tau * cell.tau;
        let u = FluidVelocity::of_cell(cell);
        let basis = MilneBasis::new(&u, cell.tau);
        let dsigma = LrfSurfaceElement::boost(cell, &u, &basis);

        let pimunu = if config.include_shear_deltaf {
            ShearTensor::reconstruct(cell)
        } else {
            ShearTensor::default()
        };
        let pi_lrf = LrfShearTensor::boost(&pimunu, &basis, tau2);

        let mut bulk_pi = if config.include_bulk_deltaf {
            cell.bulk_pi
        } else {
            0.0
        };

        let mut v_dsigma = 0.0;
        if config.include_baryon && config.include_baryondiff_deltaf {
            v_dsigma = DiffusionCurrent::reconstruct(cell).dot_dsigma(cell);
        }

        if config.df_mode == DfMode::PtbModified {
            bulk_pi = regulate_bulk_pressure(bulk_pi, cell.pressure, source.bulk_pi_over_peq_max()).0;
        }

        let df = source.evaluate(
            cell.temperature,
            cell.mub,
            cell.energy_density,
            cell.pressure,
            bulk_pi,
        );

        let (shear_mod, bulk_mod) = match config.df_mode {
            DfMode::PtmModified => (0.5 / df.beta_pi, bulk_pi / (3.0 * df.beta_bulk)),
            DfMode::PtbModified => (0.5 / df.beta_pi, df.lambda),
            _ => (0.0, 0.0),
        };
        let det_a = deformation_determinant(&pi_lrf, shear_mod, bulk_mod);

        let breaks_down = BreakdownCheck {
            df_mode: config.df_mode,
            mass_pion0: config.mass_pion0,
            temperature: cell.temperature,
            f: df.f,
            bulk_pi,
            beta_bulk: df.beta_bulk,
            det_a,
            det_a_min: config.deta_min,
            z: df.z,
            fast: config.fast.then_some(averages),
        }
        .breaks_down(laguerre);

        for part in species {
            total += mean_particle_number(
                part,
                dsigma.time,
                dsigma.space,
                bulk_pi,
                v_dsigma,
                &df,
                breaks_down,
                config.df_mode,
            );
        }
    }

    2.0 * config.y_max() * total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coefficients::ConstantCoefficients;
    use crate::config::RawConfig;
    use crate::species::Statistics;
    use float_cmp::assert_approx_eq;

    fn pion(neq: f64) -> HadronSpecies {
        HadronSpecies {
            equilibrium_density: neq,
            ..HadronSpecies::new(111, 0.138, 1.0, 0.0, Statistics::BoseEinstein)
        }
    }

    fn static_cell() -> FreezeoutCell {
        FreezeoutCell {
            tau: 1.0,
            dsigma_tau: 1.0,
            temperature: 0.15,
            pressure: 0.08,
            energy_density: 0.4,
            ..FreezeoutCell::default()
        }
    }

    #[test]
    fn linear_mean_is_time_projection() {
        let part = pion(0.05);
        let df = DfCoefficients::default();
        let mean =
            mean_particle_number(&part, 2.0, 0.3, 0.0, 0.0, &df, false, DfMode::ChapmanEnskog);

        assert_approx_eq!(f64, mean, 0.1, ulps = 2);
    }

    #[test]
    fn ptb_mean_scales_with_z() {
        let part = pion(0.05);
        let df = DfCoefficients {
            z: 1.2,
            delta_z: -0.1,
            ..DfCoefficients::default()
        };

        let healthy =
            mean_particle_number(&part, 2.0, 0.0, 0.0, 0.0, &df, false, DfMode::PtbModified);
        let broken =
            mean_particle_number(&part, 2.0, 0.0, 0.0, 0.0, &df, true, DfMode::PtbModified);

        assert_approx_eq!(f64, healthy, 0.12, ulps = 4);
        assert_approx_eq!(f64, broken, 0.09, epsilon = 1e-12);
    }

    #[test]
    fn exact_linear_density_doubles_equilibrium() {
        let laguerre = GaussLaguerre::new(48).unwrap();
        let part = pion(0.0);
        let df = DfCoefficients::default();
        let density = max_particle_number(
            &part,
            0.15,
            0.0,
            0.0,
            &df,
            false,
            &laguerre,
            DfMode::ChapmanEnskog,
            false,
        );
        let neq = crate::thermal::equilibrium_density(&laguerre, 0.138, 1.0, 0.15, 0.0, -1.0);

        assert_approx_eq!(f64, density, 2.0 * neq, epsilon = 1e-12);
    }

    #[test]
    fn event_count_clamps_to_max() {
        assert_eq!(events_to_sample(10.0, 1000.0, 50), 50);
        assert_eq!(events_to_sample(10.0, 1000.0, 1000), 100);
        assert_eq!(events_to_sample(0.0, 1000.0, 50), 1);
    }

    #[test]
    fn total_yield_of_single_static_cell() {
        let config = RawConfig::default().validate().unwrap();
        let laguerre = GaussLaguerre::new(48).unwrap();
        let source = ConstantCoefficients::default();
        let surface = vec![static_cell()];
        let species = vec![pion(0.05)];
        let averages = EnvAverages::from_surface(&surface, &source);

        let total =
            estimate_total_yield(&surface, &species, &source, &laguerre, &config, &averages);

        // dsigma_t = 1 fm^3, neq = 0.05 fm^-3, volume factor 2 y_cut = 10
        assert_approx_eq!(f64, total, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn inflowing_cells_do_not_contribute() {
        let config = RawConfig::default().validate().unwrap();
        let laguerre = GaussLaguerre::new(48).unwrap();
        let source = ConstantCoefficients::default();
        let mut cell = static_cell();
        cell.dsigma_tau = -1.0;
        let averages = EnvAverages::from_surface(std::slice::from_ref(&cell), &source);

        let total = estimate_total_yield(
            &[cell],
            &[pion(0.05)],
            &source,
            &laguerre,
            &config,
            &averages,
        );

        assert_approx_eq!(f64, total, 0.0, ulps = 2);
    }
}
