//! CLI entry point and dispatch logic
//!
//! This module owns the `run()` function which:
//! - Parses CLI arguments
//! - Initialises logging
//! - Builds `CliArgs` for configuration discovery
//! - Dispatches to command handlers
//! - Handles all error output

use clap::Parser;

use super::args::{Cli, Commands, flag_pair};
use super::commands;

use crate::error::ConfigError;
use crate::logging;
use crate::{CliArgs, ExitCode, SaveCheckError};

/// Main CLI execution function.
///
/// Handles ALL output including errors and returns `Err(ExitCode)` for every
/// non-zero exit. main.rs only calls `std::process::exit(code.as_i32())`.
pub fn run() -> Result<(), ExitCode> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version land here too
            let code = if e.use_stderr() {
                ExitCode::CLI_ARGS
            } else {
                ExitCode::SUCCESS
            };
            let _ = e.print();
            return if code == ExitCode::SUCCESS { Ok(()) } else { Err(code) };
        }
    };

    if let Err(e) = logging::init_tracing(cli.verbose) {
        eprintln!("warning: could not initialise logging: {e}");
    }

    let mut cli_args = CliArgs {
        config_path: cli.config.clone(),
        ..CliArgs::default()
    };

    let operation = cli.command.operation();

    let result = match cli.command {
        Commands::Check {
            file,
            mode,
            include_tests,
            no_include_tests,
            toolchain,
            cargo,
            json,
        } => {
            cli_args.mode = mode;
            cli_args.include_tests = flag_pair(include_tests, no_include_tests);
            cli_args.toolchain = toolchain;
            cli_args.cargo_binary = cargo;
            commands::execute_check_command(&file, json, &cli_args)
        }
        Commands::Targets { file, json } => {
            commands::execute_targets_command(&file, json, &cli_args).map(|()| ExitCode::SUCCESS)
        }
        Commands::Config { file, json } => {
            commands::execute_config_command(file.as_deref(), json, &cli_args)
                .map(|()| ExitCode::SUCCESS)
        }
    };

    match result {
        Ok(code) if code == ExitCode::SUCCESS => Ok(()),
        Ok(code) => Err(code),
        Err(error) => Err(report_error(error, operation)),
    }
}

/// Print an error for the user and pick the exit code.
fn report_error(error: anyhow::Error, operation: &str) -> ExitCode {
    let error = match error.downcast::<SaveCheckError>() {
        Ok(err) => err,
        Err(error) => match error.downcast::<ConfigError>() {
            Ok(err) => SaveCheckError::Config(err),
            Err(error) => {
                eprintln!("✗ Unexpected error during {operation}: {error:#}");
                eprintln!("\n  Run with --verbose for more detailed output");
                return ExitCode::INTERNAL;
            }
        },
    };

    tracing::debug!(operation, category = %crate::UserFriendlyError::category(&error), "command failed");
    eprint!("{}", error.display_for_user());
    error.to_exit_code()
}
