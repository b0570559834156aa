//! The per-cell emission loop: Poisson-distributed hadron counts,
//! species-discrete sampling, viscous and flux acceptance, and the boost
//! back to the lab frame.
//!
//! The loop is an outer iteration over freezeout cells. Cells are mutually
//! independent apart from the warm-start cache of the anisotropic
//! reconstruction, so the parallel driver partitions the surface into
//! chunks with per-chunk random streams and buffers that are merged at the
//! join; the sequential driver is byte-deterministic for a fixed seed.

use crate::aniso::{
    aniso_density, build_deformation, famod_coefficients, truncate_by_mass, AnisoState,
    AnisoTargets, AnisoVariables, ResidualShear,
};
use crate::averages::EnvAverages;
use crate::basis::{
    FluidVelocity, LabMomentum, LrfDiffusion, LrfShearTensor, LrfSurfaceElement, MilneBasis,
};
use crate::cell::{DiffusionCurrent, FreezeoutCell, ShearTensor};
use crate::coefficients::{regulate_bulk_pressure, DfCoefficientSource};
use crate::config::{DfMode, Dimension, SamplerConfig};
use crate::convert;
use crate::feqmod::{deformation_determinant, BreakdownCheck};
use crate::momentum::{
    rescale_momentum, rescale_momentum_aniso, sample_momentum, DeformationMatrix, LrfMomentum,
    SamplerCounters,
};
use crate::quadrature::{GaussLaguerre, GaussLegendre};
use crate::species::HadronSpecies;
use crate::yields::{fast_max_particle_number, max_particle_number};
use rand::distributions::{Distribution, WeightedIndex};
use rand::{Rng, SeedableRng};
use rand_distr::Poisson;
use rand_pcg::Pcg64;
use rayon::prelude::*;

/// Tolerance of the tetrad / shear invariant checks.
const INVARIANT_TOL: f64 = 1e-10;

/// Seed spacing of the four random streams.
const STREAM_SPACING: u64 = 10_000;

/// Seed spacing between parallel chunks; larger than any stream offset.
const CHUNK_SPACING: u64 = 100_000;

/// The four deterministic random streams of the sampler.
pub struct RngStreams {
    /// Hadron-count stream.
    pub poisson: Pcg64,
    /// Species-choice stream.
    pub species: Pcg64,
    /// Momentum and acceptance stream.
    pub momentum: Pcg64,
    /// Rapidity stream (2+1D).
    pub rapidity: Pcg64,
}

impl RngStreams {
    /// Streams seeded `master + k * 10000` for k in {0, 1, 2, 4}.
    #[must_use]
    pub fn new(master: u64) -> Self {
        Self {
            poisson: Pcg64::seed_from_u64(master),
            species: Pcg64::seed_from_u64(master.wrapping_add(STREAM_SPACING)),
            momentum: Pcg64::seed_from_u64(master.wrapping_add(2 * STREAM_SPACING)),
            rapidity: Pcg64::seed_from_u64(master.wrapping_add(4 * STREAM_SPACING)),
        }
    }

    /// Resolves the configured master seed; a negative value requests a
    /// wall-clock seed.
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub fn resolve_seed(sampler_seed: i64) -> u64 {
        if sampler_seed < 0 {
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map_or(0, |d| u64::from(d.subsec_nanos()) ^ d.as_secs())
        } else {
            sampler_seed as u64
        }
    }
}

/// One sampled hadron.
#[derive(Clone, Debug, PartialEq)]
pub struct SampledParticle {
    /// Index into the chosen species table.
    pub species_index: usize,
    /// Monte-Carlo PDG identifier.
    pub mc_id: i32,
    /// Production proper time (fm).
    pub tau: f64,
    /// Production coordinate x (fm).
    pub x: f64,
    /// Production coordinate y (fm).
    pub y: f64,
    /// Production spacetime rapidity.
    pub eta: f64,
    /// Production time t = tau cosh(eta) (fm).
    pub t: f64,
    /// Production coordinate z = tau sinh(eta) (fm).
    pub z: f64,
    /// Lab energy (GeV).
    pub e: f64,
    /// Lab momentum p_x (GeV).
    pub px: f64,
    /// Lab momentum p_y (GeV).
    pub py: f64,
    /// Lab momentum p_z (GeV).
    pub pz: f64,
    /// Rest mass (GeV).
    pub mass: f64,
}

/// Event-indexed, append-only particle storage. Each worker owns one
/// buffer; buffers merge at the join point.
#[derive(Clone, Debug, Default)]
pub struct EmissionBuffer {
    events: Vec<Vec<SampledParticle>>,
}

impl EmissionBuffer {
    /// Buffer for `n_events` events.
    #[must_use]
    pub fn new(n_events: usize) -> Self {
        Self {
            events: vec![Vec::new(); n_events],
        }
    }

    /// Appends a particle to one event.
    pub fn push(&mut self, event: usize, particle: SampledParticle) {
        self.events[event].push(particle);
    }

    /// Absorbs the events of another buffer of the same shape.
    pub fn merge(&mut self, other: Self) {
        if self.events.len() < other.events.len() {
            self.events.resize(other.events.len(), Vec::new());
        }

        for (mine, theirs) in self.events.iter_mut().zip(other.events) {
            mine.extend(theirs);
        }
    }

    /// The sampled events.
    #[must_use]
    pub fn events(&self) -> &[Vec<SampledParticle>] {
        &self.events
    }

    /// Total particle count across events.
    #[must_use]
    pub fn total(&self) -> usize {
        self.events.iter().map(Vec::len).sum()
    }
}

/// Counters emitted once per run.
#[derive(Clone, Copy, Debug, Default)]
pub struct SampleReport {
    /// Momentum-sampler acceptance bookkeeping.
    pub counters: SamplerCounters,
    /// Cells skipped for inflowing normal (u.dSigma <= 0).
    pub cells_skipped: u64,
    /// Cells where the modified reformulation broke down.
    pub feqmod_breakdowns: u64,
    /// Cells whose bulk pressure was clamped to the tabulated range.
    pub bulk_clamped_cells: u64,
    /// Cells failing an orthonormality / tracelessness check.
    pub invariant_warnings: u64,
    /// Aniso cells with nonpositive longitudinal or transverse pressure.
    pub plpt_negative: u64,
    /// Aniso cells where the reconstruction failed twice.
    pub reconstruction_failures: u64,
}

impl SampleReport {
    /// Accumulates another report.
    pub fn merge(&mut self, other: &Self) {
        self.counters.merge(&other.counters);
        self.cells_skipped += other.cells_skipped;
        self.feqmod_breakdowns += other.feqmod_breakdowns;
        self.bulk_clamped_cells += other.bulk_clamped_cells;
        self.invariant_warnings += other.invariant_warnings;
        self.plpt_negative += other.plpt_negative;
        self.reconstruction_failures += other.reconstruction_failures;
    }

    /// Logs the run summary once.
    pub fn emit(&self) {
        tracing::info!(
            efficiency = self.counters.efficiency(),
            samples = self.counters.samples,
            "momentum sampling efficiency"
        );

        if self.feqmod_breakdowns > 0 {
            tracing::info!(cells = self.feqmod_breakdowns, "feqmod breakdown cells");
        }
        if self.plpt_negative > 0 || self.reconstruction_failures > 0 {
            tracing::info!(
                plpt_negative = self.plpt_negative,
                failures = self.reconstruction_failures,
                "anisotropic reconstruction summary"
            );
        }
    }
}

/// Per-cell effective correction: the requested scheme with breakdowns
/// already resolved, so the per-hadron work dispatches exactly once.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum EffectiveMode {
    Grad14,
    ChapmanEnskog,
    PtmModified,
    Ptb { broken: bool },
}

impl EffectiveMode {
    fn resolve(requested: DfMode, breaks_down: bool) -> Self {
        match (requested, breaks_down) {
            (DfMode::Grad14, _) => Self::Grad14,
            (DfMode::ChapmanEnskog, _) | (DfMode::PtmModified, true) => Self::ChapmanEnskog,
            (DfMode::PtmModified, false) => Self::PtmModified,
            (DfMode::PtbModified, broken) => Self::Ptb { broken },
            (DfMode::PtmAniso, _) => unreachable!("aniso cells use the dedicated path"),
        }
    }
}

/// The particle sampling engine.
pub struct ParticleSampler<'a, S> {
    config: &'a SamplerConfig,
    species: &'a [HadronSpecies],
    df_source: &'a S,
    laguerre: &'a GaussLaguerre,
    legendre: &'a GaussLegendre,
    averages: &'a EnvAverages,
    aniso_species: Vec<HadronSpecies>,
}

impl<'a, S: DfCoefficientSource + Sync> ParticleSampler<'a, S> {
    /// Builds a sampler over the chosen `species`; `pdg_table` is the full
    /// resonance list feeding the anisotropic reconstruction (truncated to
    /// the configured cap, heaviest dropped).
    #[must_use]
    pub fn new(
        config: &'a SamplerConfig,
        species: &'a [HadronSpecies],
        pdg_table: &[HadronSpecies],
        df_source: &'a S,
        laguerre: &'a GaussLaguerre,
        legendre: &'a GaussLegendre,
        averages: &'a EnvAverages,
    ) -> Self {
        Self {
            config,
            species,
            df_source,
            laguerre,
            legendre,
            averages,
            aniso_species: truncate_by_mass(pdg_table, config.aniso_species_cap),
        }
    }

    /// Samples `n_events` independent events sequentially. Deterministic
    /// for a fixed nonnegative seed.
    #[must_use]
    pub fn sample(&self, surface: &[FreezeoutCell], n_events: u64) -> (EmissionBuffer, SampleReport) {
        let mut streams = RngStreams::new(RngStreams::resolve_seed(self.config.sampler_seed));
        let mut buffer = EmissionBuffer::new(usize::try_from(n_events).unwrap_or(usize::MAX));
        let mut report = SampleReport::default();
        let mut aniso_state = AnisoState::default();

        self.sample_cells(surface, n_events, &mut streams, &mut buffer, &mut report, &mut aniso_state);

        report.plpt_negative = aniso_state.plpt_negative;
        report.reconstruction_failures = aniso_state.reconstruction_failures;

        (buffer, report)
    }

    /// Samples with cell-range partitioning across the rayon pool. Each
    /// chunk owns its streams (offset from the master seed), its buffer
    /// and a fresh warm-start cache; results merge at the join, so runs
    /// need not be reproducible across thread counts.
    #[must_use]
    pub fn sample_parallel(
        &self,
        surface: &[FreezeoutCell],
        n_events: u64,
        chunk_size: usize,
    ) -> (EmissionBuffer, SampleReport) {
        let master = RngStreams::resolve_seed(self.config.sampler_seed);
        let n_buffer = usize::try_from(n_events).unwrap_or(usize::MAX);

        surface
            .par_chunks(chunk_size.max(1))
            .enumerate()
            .map(|(chunk, cells)| {
                let mut streams =
                    RngStreams::new(master.wrapping_add(chunk as u64 * CHUNK_SPACING));
                let mut buffer = EmissionBuffer::new(n_buffer);
                let mut report = SampleReport::default();
                let mut aniso_state = AnisoState::default();

                self.sample_cells(cells, n_events, &mut streams, &mut buffer, &mut report, &mut aniso_state);

                report.plpt_negative = aniso_state.plpt_negative;
                report.reconstruction_failures = aniso_state.reconstruction_failures;

                (buffer, report)
            })
            .reduce(
                || (EmissionBuffer::new(n_buffer), SampleReport::default()),
                |(mut buffer, mut report), (other_buffer, other_report)| {
                    buffer.merge(other_buffer);
                    report.merge(&other_report);
                    (buffer, report)
                },
            )
    }

    fn sample_cells(
        &self,
        cells: &[FreezeoutCell],
        n_events: u64,
        streams: &mut RngStreams,
        buffer: &mut EmissionBuffer,
        report: &mut SampleReport,
        aniso_state: &mut AnisoState,
    ) {
        for cell in cells {
            if cell.u_dot_dsigma() <= 0.0 {
                report.cells_skipped += 1;
                continue;
            }

            if self.config.df_mode == DfMode::PtmAniso {
                self.sample_cell_aniso(cell, n_events, streams, buffer, report, aniso_state);
            } else {
                self.sample_cell_viscous(cell, n_events, streams, buffer, report);
            }
        }
    }

    fn check_invariants(
        &self,
        cell: &FreezeoutCell,
        u: &FluidVelocity,
        basis: &MilneBasis,
        pimunu: &ShearTensor,
        pi_lrf: &LrfShearTensor,
        report: &mut SampleReport,
    ) {
        let tau2 = cell.tau * cell.tau;
        let basis_violation = basis.orthonormality_violation(u, tau2);
        let shear_violation = pimunu.constraint_violation(cell).max(pi_lrf.trace().abs());

        if basis_violation > INVARIANT_TOL || shear_violation > INVARIANT_TOL {
            report.invariant_warnings += 1;
            tracing::warn!(
                basis_violation,
                shear_violation,
                tau = cell.tau,
                "cell fails orthonormality / tracelessness check"
            );
        }
    }

    #[allow(clippy::too_many_lines)]
    fn sample_cell_viscous(
        &self,
        cell: &FreezeoutCell,
        n_events: u64,
        streams: &mut RngStreams,
        buffer: &mut EmissionBuffer,
        report: &mut SampleReport,
    ) {
        let config = self.config;
        let tau2 = cell.tau * cell.tau;
        let t = cell.temperature;
        let pressure = cell.pressure;
        let energy = cell.energy_density;

        let (mut alpha_b, mut baryon_enthalpy_ratio) = (0.0, 0.0);
        if config.include_baryon {
            alpha_b = cell.mub / t;
            baryon_enthalpy_ratio = cell.nb / (energy + pressure);
        }

        let pimunu = if config.include_shear_deltaf {
            ShearTensor::reconstruct(cell)
        } else {
            ShearTensor::default()
        };

        let vmu = if config.include_baryon && config.include_baryondiff_deltaf {
            DiffusionCurrent::reconstruct(cell)
        } else {
            DiffusionCurrent::default()
        };
        let v_dsigma = vmu.dot_dsigma(cell);

        let mut bulk_pi = if config.include_bulk_deltaf {
            cell.bulk_pi
        } else {
            0.0
        };

        // keep the PTB lookup inside its tabulated range
        if config.df_mode == DfMode::PtbModified {
            let (regulated, clamped) =
                regulate_bulk_pressure(bulk_pi, pressure, self.df_source.bulk_pi_over_peq_max());
            if clamped {
                if report.bulk_clamped_cells == 0 {
                    tracing::warn!(bulk_pi, pressure, "bulk pressure clamped to tabulated range");
                }
                report.bulk_clamped_cells += 1;
            }
            bulk_pi = regulated;
        }

        let df = self.df_source.evaluate(t, cell.mub, energy, pressure, bulk_pi);

        let u = FluidVelocity::of_cell(cell);
        let basis = MilneBasis::new(&u, cell.tau);
        let dsigma = LrfSurfaceElement::boost(cell, &u, &basis);
        let pi_lrf = LrfShearTensor::boost(&pimunu, &basis, tau2);
        let v_lrf = LrfDiffusion::boost(&vmu, &basis, tau2);

        self.check_invariants(cell, &u, &basis, &pimunu, &pi_lrf, report);

        // modified thermodynamic parameters and rescaling coefficients
        let (mut t_mod, mut alpha_b_mod) = (t, alpha_b);
        let (mut shear_mod, mut bulk_mod, mut diff_mod) = (0.0, 0.0, 0.0);

        match config.df_mode {
            DfMode::PtmModified => {
                t_mod = t + bulk_pi * df.f / df.beta_bulk;
                alpha_b_mod = alpha_b + bulk_pi * df.g / df.beta_bulk;
                shear_mod = 0.5 / df.beta_pi;
                bulk_mod = bulk_pi / (3.0 * df.beta_bulk);
                diff_mod = t / df.beta_v;
            }
            DfMode::PtbModified => {
                shear_mod = 0.5 / df.beta_pi;
                bulk_mod = df.lambda;
            }
            _ => {}
        }
        let isotropic_scale = 1.0 + bulk_mod;

        let det_a = deformation_determinant(&pi_lrf, shear_mod, bulk_mod);

        let breaks_down = BreakdownCheck {
            df_mode: config.df_mode,
            mass_pion0: config.mass_pion0,
            temperature: t,
            f: df.f,
            bulk_pi,
            beta_bulk: df.beta_bulk,
            det_a,
            det_a_min: config.deta_min,
            z: df.z,
            fast: config.fast.then_some(self.averages),
        }
        .breaks_down(self.laguerre);

        if breaks_down {
            report.feqmod_breakdowns += 1;
        }

        let mode = EffectiveMode::resolve(config.df_mode, breaks_down);

        // per-species max densities bounding the acceptance
        let dn_list: Vec<f64> = self
            .species
            .iter()
            .map(|part| {
                let dn = if config.fast {
                    fast_max_particle_number(part, bulk_pi, df.z, breaks_down, config.df_mode)
                } else {
                    max_particle_number(
                        part,
                        t,
                        alpha_b,
                        bulk_pi,
                        &df,
                        breaks_down,
                        self.laguerre,
                        config.df_mode,
                        config.include_baryon,
                    )
                };

                dn.max(0.0)
            })
            .collect();

        let dn_tot: f64 = dn_list.iter().sum();
        if dn_tot <= 0.0 {
            return;
        }

        let mean_hadrons = dn_tot * 2.0 * config.y_max() * dsigma.max_volume;

        let Ok(particle_type) = WeightedIndex::new(&dn_list) else {
            return;
        };
        let Ok(poisson) = Poisson::new(mean_hadrons) else {
            return;
        };

        for event in 0..n_events {
            let n_hadrons = convert::hadron_count_from_draw(poisson.sample(&mut streams.poisson));

            for _ in 0..n_hadrons {
                let index = particle_type.sample(&mut streams.species);
                let part = &self.species[index];

                let mass_squared = part.mass * part.mass;
                let sign = part.statistics.sign();
                let chem = part.baryon * alpha_b;
                let chem_mod = part.baryon * alpha_b_mod;

                let (p_lrf, w_visc) = match mode {
                    EffectiveMode::Grad14 => {
                        let sample = sample_momentum(
                            &mut streams.momentum,
                            &mut report.counters,
                            part.mass,
                            sign,
                            t,
                            chem,
                        );
                        let p = sample.momentum;

                        let feqbar = 1.0 - sign * sample.feq;
                        let pipp = pi_lrf.contract(&p);
                        let v_dot_p = v_lrf.contract(&p);

                        let df_shear = pipp / df.shear14;
                        let df_bulk = ((df.c0 - df.c2) * mass_squared
                            + (part.baryon * df.c1 + (4.0 * df.c2 - df.c0) * p.e) * p.e)
                            * bulk_pi;
                        let df_diff = (part.baryon * df.c3 + df.c4 * p.e) * v_dot_p;

                        let df_reg = (feqbar * (df_shear + df_bulk + df_diff)).clamp(-1.0, 1.0);

                        (p, (1.0 + df_reg) / 2.0)
                    }
                    EffectiveMode::ChapmanEnskog => {
                        let sample = sample_momentum(
                            &mut streams.momentum,
                            &mut report.counters,
                            part.mass,
                            sign,
                            t,
                            chem,
                        );
                        let p = sample.momentum;

                        let feqbar = 1.0 - sign * sample.feq;
                        let pipp = pi_lrf.contract(&p);
                        let v_dot_p = v_lrf.contract(&p);

                        let df_shear = pipp / (2.0 * df.beta_pi * t * p.e);
                        let df_bulk = (part.baryon * df.g
                            + df.f * p.e / (t * t)
                            + (p.e - mass_squared / p.e) / (3.0 * t))
                            * bulk_pi
                            / df.beta_bulk;
                        let df_diff =
                            (baryon_enthalpy_ratio - part.baryon / p.e) * v_dot_p / df.beta_v;

                        let df_reg = (feqbar * (df_shear + df_bulk + df_diff)).clamp(-1.0, 1.0);

                        (p, (1.0 + df_reg) / 2.0)
                    }
                    EffectiveMode::PtmModified => {
                        let sample = sample_momentum(
                            &mut streams.momentum,
                            &mut report.counters,
                            part.mass,
                            sign,
                            t_mod,
                            chem_mod,
                        );
                        let p = rescale_momentum(
                            &sample.momentum,
                            mass_squared,
                            part.baryon,
                            &pi_lrf,
                            &v_lrf,
                            shear_mod,
                            isotropic_scale,
                            diff_mod,
                            baryon_enthalpy_ratio,
                        );

                        (p, 1.0)
                    }
                    EffectiveMode::Ptb { broken } => {
                        // the PTB distribution carries no chemical potential
                        let sample = sample_momentum(
                            &mut streams.momentum,
                            &mut report.counters,
                            part.mass,
                            sign,
                            t,
                            0.0,
                        );

                        if broken {
                            let p = sample.momentum;
                            let feqbar = 1.0 - sign * sample.feq;
                            let pipp = pi_lrf.contract(&p);

                            let df_shear = feqbar * pipp / (2.0 * df.beta_pi * t * p.e);
                            let df_bulk = (df.delta_z - 3.0 * df.delta_lambda)
                                + feqbar * df.delta_lambda / t * (p.e - mass_squared / p.e);

                            let df_reg = (df_shear + df_bulk).clamp(-1.0, 1.0);

                            (p, (1.0 + df_reg) / 2.0)
                        } else {
                            let p = rescale_momentum(
                                &sample.momentum,
                                mass_squared,
                                0.0,
                                &pi_lrf,
                                &v_lrf,
                                shear_mod,
                                isotropic_scale,
                                0.0,
                                0.0,
                            );

                            (p, 1.0)
                        }
                    }
                };

                let w_flux = dsigma.flux(&p_lrf).max(0.0) / (p_lrf.e * dsigma.max_volume);

                if streams.momentum.gen::<f64>() < w_flux * w_visc {
                    let particle =
                        self.to_lab_particle(cell, &u, &basis, &p_lrf, part, index, streams);
                    buffer.push(usize::try_from(event).unwrap_or(usize::MAX), particle);
                }
            }
        }
    }

    fn sample_cell_aniso(
        &self,
        cell: &FreezeoutCell,
        n_events: u64,
        streams: &mut RngStreams,
        buffer: &mut EmissionBuffer,
        report: &mut SampleReport,
        aniso_state: &mut AnisoState,
    ) {
        let config = self.config;
        let tau2 = cell.tau * cell.tau;
        let t = cell.temperature;

        let alpha_b = if config.include_baryon {
            cell.mub / t
        } else {
            0.0
        };
        // the effective chemical potential is not reconstructed
        let upsilon_b = alpha_b;

        // the reconstruction always needs the full shear tensor
        let pimunu = ShearTensor::reconstruct(cell);

        let u = FluidVelocity::of_cell(cell);
        let basis = MilneBasis::new(&u, cell.tau);
        let dsigma = LrfSurfaceElement::boost(cell, &u, &basis);
        let pi_lrf = LrfShearTensor::boost(&pimunu, &basis, tau2);

        self.check_invariants(cell, &u, &basis, &pimunu, &pi_lrf, report);

        // boost first, then form the anisotropic pressures
        let targets = AnisoTargets {
            energy: cell.energy_density,
            pl: cell.pressure + cell.bulk_pi + pi_lrf.zz,
            pt: cell.pressure + cell.bulk_pi - pi_lrf.zz / 2.0,
        };

        let reconstructed = aniso_state.reconstruct(
            &targets,
            t,
            &self.aniso_species,
            self.laguerre,
            self.legendre,
        );
        let mut broken = reconstructed.is_none();
        let vars = reconstructed.unwrap_or(AnisoVariables::equilibrium(t));

        let famod = famod_coefficients(&vars, &self.aniso_species, self.laguerre, self.legendre);
        let residual = ResidualShear::project(&pi_lrf, config.include_shear_deltaf);
        let (mut deformation, det_b) = build_deformation(&vars, &famod, &residual);

        if det_b <= config.deta_min {
            broken = true;
        }

        if broken {
            deformation = DeformationMatrix::IDENTITY;
        }

        let dn_list: Vec<f64> = self
            .species
            .iter()
            .map(|part| {
                aniso_density(part, &vars, part.baryon * upsilon_b, self.laguerre).max(0.0)
            })
            .collect();

        let dn_tot: f64 = dn_list.iter().sum();
        if dn_tot <= 0.0 {
            return;
        }

        let mean_hadrons = dn_tot * 2.0 * config.y_max() * dsigma.max_volume;

        let Ok(particle_type) = WeightedIndex::new(&dn_list) else {
            return;
        };
        let Ok(poisson) = Poisson::new(mean_hadrons) else {
            return;
        };

        for event in 0..n_events {
            let n_hadrons = convert::hadron_count_from_draw(poisson.sample(&mut streams.poisson));

            for _ in 0..n_hadrons {
                let index = particle_type.sample(&mut streams.species);
                let part = &self.species[index];
                let mass_squared = part.mass * part.mass;

                let sample = sample_momentum(
                    &mut streams.momentum,
                    &mut report.counters,
                    part.mass,
                    part.statistics.sign(),
                    vars.lambda,
                    part.baryon * upsilon_b,
                );
                let p_lrf = rescale_momentum_aniso(&sample.momentum, mass_squared, &deformation);

                let w_flux = dsigma.flux(&p_lrf).max(0.0) / (p_lrf.e * dsigma.max_volume);

                if streams.momentum.gen::<f64>() < w_flux {
                    let particle =
                        self.to_lab_particle(cell, &u, &basis, &p_lrf, part, index, streams);
                    buffer.push(usize::try_from(event).unwrap_or(usize::MAX), particle);
                }
            }
        }
    }

    fn to_lab_particle(
        &self,
        cell: &FreezeoutCell,
        u: &FluidVelocity,
        basis: &MilneBasis,
        p_lrf: &LrfMomentum,
        part: &HadronSpecies,
        index: usize,
        streams: &mut RngStreams,
    ) -> SampledParticle {
        let lab = LabMomentum::boost(p_lrf, u, basis);
        let mass_squared = part.mass * part.mass;

        let (e, pz, eta) = match self.config.dimension {
            Dimension::TwoPlusOne => {
                // extend the boost-invariant cell by a uniformly sampled
                // rapidity, then recompute the longitudinal kinematics
                let y_max = self.config.y_max();
                let rapidity = y_max * (2.0 * streams.rapidity.gen::<f64>() - 1.0);

                let sinhy = rapidity.sinh();
                let coshy = (1.0 + sinhy * sinhy).sqrt();

                let tau_pn = cell.tau * lab.pn;
                let mt = (lab.ptau * lab.ptau - tau_pn * tau_pn).sqrt();

                let sinheta = (lab.ptau * sinhy - tau_pn * coshy) / mt;
                let eta = sinheta.asinh();

                (mt * coshy, mt * sinhy, eta)
            }
            Dimension::ThreePlusOne => {
                let sinheta = cell.eta.sinh();
                let cosheta = (1.0 + sinheta * sinheta).sqrt();

                let pz = cell.tau * lab.pn * cosheta + lab.ptau * sinheta;
                let e = (mass_squared + lab.px * lab.px + lab.py * lab.py + pz * pz).sqrt();

                (e, pz, cell.eta)
            }
        };

        let sinheta = eta.sinh();
        let cosheta = (1.0 + sinheta * sinheta).sqrt();

        SampledParticle {
            species_index: index,
            mc_id: part.mc_id,
            tau: cell.tau,
            x: cell.x,
            y: cell.y,
            eta,
            t: cell.tau * cosheta,
            z: cell.tau * sinheta,
            e,
            px: lab.px,
            py: lab.py,
            pz,
            mass: part.mass,
        }
    }
}
