use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::version_check::current_version;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "gpush",
    about = "Run your linters and tests in parallel, then git push if they pass.",
    disable_version_flag = true
)]
pub struct GpushCli {
    /// Simulate the commands without executing
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    /// Prints command output while running
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Specify a custom config file
    #[arg(long = "config-file", value_name = "FILE", global = true)]
    pub config_file: Option<PathBuf>,

    /// Show version
    #[arg(long = "version")]
    pub version: bool,

    #[command(subcommand)]
    pub command: Option<GpushCommand>,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum GpushCommand {
    /// Run one command from the parallel_run section, e.g. `gpush run unit tests`
    Run {
        #[arg(required = true, num_args = 1.., value_name = "NAME")]
        name: Vec<String>,
    },
    /// Run the commands from the fix section
    Fix,
}

impl GpushCommand {
    /// The words after `gpush run`, joined back into one name.
    pub fn run_query(&self) -> Option<String> {
        match self {
            GpushCommand::Run { name } => Some(name.join(" ")),
            GpushCommand::Fix => None,
        }
    }
}

pub fn parse_args<I, T>(argv: I) -> Result<GpushCli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    GpushCli::try_parse_from(argv)
}

pub fn version_line() -> String {
    format!("gpush {}", current_version())
}
