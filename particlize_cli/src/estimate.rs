use super::helpers;
use super::{GlobalConfiguration, Subcommand};
use anyhow::{bail, Result};
use clap::{Parser, ValueHint};
use particlize::averages::EnvAverages;
use particlize::quadrature::GaussLaguerre;
use particlize::yields::{estimate_total_yield, events_to_sample};
use prettytable::{format, row, Table};
use std::path::PathBuf;
use std::process::ExitCode;

/// Estimates the mean hadron yield of a surface and the event count the
/// sampler would use.
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
    /// Set the number of fractional digits shown.
    #[arg(default_value_t = 4, long, value_name = "DIGITS")]
    digits: usize,
}

impl Subcommand for Opts {
    fn run(&self, _: &GlobalConfiguration) -> Result<ExitCode> {
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

        let laguerre = GaussLaguerre::new(48)?;
        let averages = EnvAverages::from_surface(&surface, &source);

        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_CLEAN);
        table.set_titles(row!["mcid", "mass [GeV]", "n_eq [fm^-3]", "mean yield"]);

        let mut total = 0.0;

        for part in &species {
            let yield_of_species = estimate_total_yield(
                &surface,
                std::slice::from_ref(part),
                &source,
                &laguerre,
                &config,
                &averages,
            );
            total += yield_of_species;

            table.add_row(row![
                part.mc_id,
                format!("{:.*}", self.digits, part.mass),
                format!("{:.*}", self.digits, part.equilibrium_density),
                format!("{:.*}", self.digits, yield_of_species),
            ]);
        }

        table.printstd();

        let events = events_to_sample(total, config.min_num_hadrons, config.max_num_samples);
        println!("total mean yield = {total:.4}");
        println!("events to sample = {events}");

        Ok(ExitCode::SUCCESS)
    }
}
