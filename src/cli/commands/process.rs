//! CLI command for running saved processes

use std::path::PathBuf;

use crate::cli::commands::open_destination;
use crate::cli::error::CliError;
use crate::cli::output::{format_process_run, to_json};
use crate::config::LoaderConfig;
use crate::process::{ProcessConfig, run_process};

/// Arguments for the `run-process` command
pub struct RunProcessArgs {
    /// Process definition (`.toml` or `.json`)
    pub process: PathBuf,
    pub json: bool,
}

/// Handle the `run-process` command; a failed run is an error exit
pub fn handle_run_process(args: &RunProcessArgs, config: &LoaderConfig) -> Result<(), CliError> {
    let process = ProcessConfig::load(&args.process)?;
    let db = open_destination(config)?;
    let run = run_process(&db, &process, config);

    if args.json {
        println!("{}", to_json(&run)?);
    } else {
        print!("{}", format_process_run(&run));
    }

    if run.success {
        Ok(())
    } else {
        Err(CliError::ProcessFailed(run.process))
    }
}
