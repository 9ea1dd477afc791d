//! CLI command implementations.
//!
//! `run.rs` dispatches here; each command lives in its own module.

mod check;
mod common;
mod config;
mod targets;

pub use check::{execute_check_command, exit_code_for_report};
pub use config::execute_config_command;
pub use targets::execute_targets_command;
