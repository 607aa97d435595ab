//! CLI entry point and dispatch, grounded on the teacher's `cli/run.rs`:
//! parse arguments, initialize logging, dispatch to a command, and handle
//! all error output here so `main.rs` only maps the exit code.

use clap::Parser;

use super::args::Cli;
use super::commands;
use crate::error;
use crate::logging;

/// Parses arguments, runs the requested subcommand, and prints any error.
///
/// Returns the process exit code: `0` on success, otherwise the code
/// [`error::exit_code_for`] derives from the failure.
#[must_use]
pub fn run() -> i32 {
    let cli = Cli::parse();
    logging::init_tracing(cli.verbose);

    match commands::dispatch(cli.command, cli.config, cli.profile) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("{}", error::render(&err));
            error::exit_code_for(&err)
        }
    }
}
