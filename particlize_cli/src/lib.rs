#![allow(clippy::missing_errors_doc)]
#![allow(missing_docs)]

mod estimate;
mod helpers;
mod oscar;
mod sample;

use anyhow::Result;
use clap::Parser;
use enum_dispatch::enum_dispatch;
use git_version::git_version;
use std::process::ExitCode;

#[derive(Parser)]
pub struct GlobalConfiguration {
    /// Only log warnings and errors.
    #[arg(long, short)]
    pub quiet: bool,
    /// Cells per worker chunk; 0 runs the deterministic sequential loop.
    #[arg(default_value_t = 0, long, value_name = "CELLS")]
    pub chunk_size: usize,
}

#[enum_dispatch]
pub trait Subcommand {
    fn run(&self, cfg: &GlobalConfiguration) -> Result<ExitCode>;
}

#[enum_dispatch(Subcommand)]
#[derive(Parser)]
pub enum SubcommandEnum {
    Estimate(estimate::Opts),
    Sample(sample::Opts),
}

#[derive(Parser)]
#[command(
    arg_required_else_help = true,
    author,
    about,
    disable_help_subcommand = true,
    name = "particlize",
    version = git_version!(
        args = ["--always", "--dirty", "--long", "--tags"],
        cargo_prefix = "",
        fallback = "unknown"
    )
)]
pub struct Opts {
    #[command(flatten)]
    pub configuration: GlobalConfiguration,
    #[command(subcommand)]
    pub subcommand: SubcommandEnum,
}
