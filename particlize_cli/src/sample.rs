use super::helpers;
use super::oscar;
use super::{GlobalConfiguration, Subcommand};
use anyhow::{bail, Result};
use clap::{Parser, ValueHint};
use particlize::averages::EnvAverages;
use particlize::emission::ParticleSampler;
use particlize::quadrature::{GaussLaguerre, GaussLegendre};
use particlize::yields::{estimate_total_yield, events_to_sample};
use std::path::PathBuf;
use std::process::ExitCode;

const LAGUERRE_POINTS: usize = 48;
const LEGENDRE_POINTS: usize = 24;

/// Samples particlization events and writes one OSCAR file per event.
#[derive(Parser)]
pub struct Opts {
    /// Path of the YAML parameter file.
    #[arg(value_hint = ValueHint::FilePath)]
    config: PathBuf,
    /// Path of the freezeout surface table.
    #[arg(value_hint = ValueHint::FilePath)]
    surface: PathBuf,
    /// Path of the chosen-species table.
    #[arg(value_hint = ValueHint::FilePath)]
    species: PathBuf,
    /// Directory receiving the per-event particle lists.
    #[arg(default_value = "results", long, short, value_hint = ValueHint::DirPath)]
    output: PathBuf,
}

impl Subcommand for Opts {
    fn run(&self, cfg: &GlobalConfiguration) -> Result<ExitCode> {
        let file_config = helpers::read_config(&self.config)?;

        if file_config.raw.operation != 2 {
            bail!(
                "operation {} is not supported by this tool, set operation: 2 (sampling)",
                file_config.raw.operation
            );
        }

        let config = file_config.raw.validate()?;
        let source = file_config.df;

        let surface = helpers::read_surface(&self.surface)?;
        let species = helpers::read_species(&self.species)?;

        tracing::info!(
            cells = surface.len(),
            species = species.len(),
            scheme = config.df_mode.description(),
            "starting particlization"
        );

        let laguerre = GaussLaguerre::new(LAGUERRE_POINTS)?;
        let legendre = GaussLegendre::new(LEGENDRE_POINTS)?;
        let averages = EnvAverages::from_surface(&surface, &source);

        let n_events = if config.oversample {
            let total =
                estimate_total_yield(&surface, &species, &source, &laguerre, &config, &averages);
            let n = events_to_sample(total, config.min_num_hadrons, config.max_num_samples);

            tracing::info!(estimated_yield = total, events = n, "oversampling");
            n
        } else {
            1
        };

        let sampler = ParticleSampler::new(
            &config, &species, &species, &source, &laguerre, &legendre, &averages,
        );

        let (buffer, report) = if cfg.chunk_size == 0 {
            sampler.sample(&surface, n_events)
        } else {
            sampler.sample_parallel(&surface, n_events, cfg.chunk_size)
        };

        report.emit();

        let paths = oscar::write_event_files(&self.output, &buffer)?;

        tracing::info!(
            particles = buffer.total(),
            events = paths.len(),
            output = %self.output.display(),
            "wrote particle lists"
        );

        Ok(ExitCode::SUCCESS)
    }
}
