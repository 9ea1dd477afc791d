//! CLI argument definitions and parsing structures
//!
//! This module defines the command-line interface structure using clap,
//! including the main `Cli` struct and the subcommand enum.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::CheckMode;

/// savecheck - run cargo on save and collect its diagnostics
#[derive(Parser, Debug)]
#[command(name = "savecheck")]
#[command(about = "Check a saved Rust file with cargo across the targets that compile it")]
#[command(long_about = r#"
savecheck runs the cargo toolchain for a saved Rust source file. It finds the
package that owns the file, checks each build target that may compile it, and
stops as soon as the file itself has a diagnostic.

EXAMPLES:
  # Check a file with the configured mode
  savecheck check src/lib.rs

  # Use the unstable no-codegen rustc mode without test builds
  savecheck check src/main.rs --mode legacy-unstable --no-include-tests

  # Emit the run report and diagnostics as canonical JSON
  savecheck check src/lib.rs --json

  # Show which targets a file belongs to
  savecheck targets src/bin/tool.rs

  # Show effective configuration and where each value came from
  savecheck config

CONFIGURATION:
  Configuration is loaded with precedence: CLI flags > config file > defaults
  Config file is discovered by searching upward from the file for .savecheck/config.toml
  Use --config to specify an explicit config file path

MODES:
  check            cargo check, with --profile=test when tests are included
  legacy-unstable  cargo rustc -- -Zno-codegen -Zunstable-options
  lint-all         cargo clippy over the whole package
"#)]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run an on-save check for a file and print its diagnostics
    Check {
        /// The saved Rust source file
        file: PathBuf,

        /// Check mode (check, legacy-unstable, lint-all)
        #[arg(long)]
        mode: Option<CheckMode>,

        /// Build test code alongside the target
        #[arg(long, overrides_with = "no_include_tests")]
        include_tests: bool,

        /// Do not build test code
        #[arg(long, overrides_with = "include_tests")]
        no_include_tests: bool,

        /// rustup toolchain to run (e.g. stable, nightly)
        #[arg(long)]
        toolchain: Option<String>,

        /// cargo binary to run
        #[arg(long)]
        cargo: Option<String>,

        /// Output the report and diagnostics as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the build targets that may compile a file, in check order
    Targets {
        /// The Rust source file
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show effective configuration with value sources
    Config {
        /// Discover configuration as if this file had been saved
        #[arg(long)]
        file: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Commands {
    /// Operation name used in error reports.
    #[must_use]
    pub const fn operation(&self) -> &'static str {
        match self {
            Self::Check { .. } => "check",
            Self::Targets { .. } => "targets",
            Self::Config { .. } => "config",
        }
    }
}

/// Resolve a `--flag` / `--no-flag` pair into an optional override.
#[must_use]
pub const fn flag_pair(on: bool, off: bool) -> Option<bool> {
    if on {
        Some(true)
    } else if off {
        Some(false)
    } else {
        None
    }
}

/// Build the CLI command structure
///
/// Exposed for tests that inspect the argument definitions.
#[must_use]
pub fn build_cli() -> clap::Command {
    <Cli as clap::CommandFactory>::command()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        build_cli().debug_assert();
    }

    #[test]
    fn test_check_parses_mode_and_test_flags() {
        let cli = Cli::try_parse_from([
            "savecheck",
            "check",
            "src/lib.rs",
            "--mode",
            "no-trans",
            "--include-tests",
            "--no-include-tests",
        ])
        .unwrap();

        match cli.command {
            Commands::Check {
                mode,
                include_tests,
                no_include_tests,
                ..
            } => {
                assert_eq!(mode, Some(CheckMode::LegacyUnstable));
                assert_eq!(flag_pair(include_tests, no_include_tests), Some(false));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_mode_is_rejected() {
        let err = Cli::try_parse_from(["savecheck", "check", "a.rs", "--mode", "build"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["savecheck", "config", "--config", "x.toml", "-v"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
        assert_eq!(cli.command.operation(), "config");
    }

    #[test]
    fn test_flag_pair() {
        assert_eq!(flag_pair(false, false), None);
        assert_eq!(flag_pair(true, false), Some(true));
        assert_eq!(flag_pair(false, true), Some(false));
    }
}
