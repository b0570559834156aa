#![allow(missing_docs)]

use clap::Parser;
use particlize_cli::{Opts, Subcommand};
use std::process::{ExitCode, Termination};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let opts = Opts::parse();

    let default_filter = if opts.configuration.quiet {
        "warn"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .init();

    match opts.subcommand.run(&opts.configuration) {
        Ok(code) => code,
        result @ Err(_) => result.report(),
    }
}
