use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod version;
pub mod worker;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a worker: relay frames from --input through the user module to --output.
    Worker(WorkerArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Worker(args) => worker::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug, Default)]
pub struct WorkerArgs {
    /// User module: a unit library path or a registered name such as builtin:identity.
    /// Falls back to PUPILA_USER_MODULE, then the config file.
    #[arg(long, value_name = "PATH")]
    pub user_module: Option<String>,
    /// Socket to listen on for upstream frames (env: PUPILA_INPUT).
    #[arg(long, value_name = "SOCK")]
    pub input: Option<PathBuf>,
    /// Socket of the downstream stage (env: PUPILA_OUTPUT).
    #[arg(long, value_name = "SOCK")]
    pub output: Option<PathBuf>,
    /// Bounded wait per receive (e.g. 150ms, 2s).
    #[arg(long, value_name = "DURATION")]
    pub recv_timeout: Option<String>,
    /// JSON config file.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Include build and ABI details.
    #[arg(long)]
    pub extended: bool,
}
