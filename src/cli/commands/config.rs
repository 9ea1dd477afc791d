//! Config command implementation
//!
//! Handles `savecheck config`: prints the effective configuration and the
//! source of each value.

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

use super::common::absolute_file;

use crate::config::CONFIG_DIR;
use crate::{CliArgs, Config, emit_jcs};

#[derive(Serialize)]
struct ConfigValue<'a> {
    value: &'a str,
    source: &'a str,
}

/// Execute the config command
///
/// Discovery starts from `file`'s directory when given, otherwise from the
/// current directory.
pub fn execute_config_command(file: Option<&Path>, json: bool, cli_args: &CliArgs) -> Result<()> {
    let config = match file {
        Some(file) => {
            let file = absolute_file(file)?;
            let start = file.parent().unwrap_or(&file).to_path_buf();
            Config::discover_from(&start, cli_args)?
        }
        None => Config::discover(cli_args)?,
    };
    let effective = config.effective_config();

    if json {
        let values: BTreeMap<&str, ConfigValue<'_>> = effective
            .iter()
            .map(|(key, (value, source))| (key.as_str(), ConfigValue { value, source }))
            .collect();
        println!("{}", emit_jcs(&values).context("Failed to emit config JSON")?);
        return Ok(());
    }

    println!("Effective configuration:");
    let width = effective.keys().map(String::len).max().unwrap_or(0);
    for (key, (value, source)) in &effective {
        println!("  {key:<width$} = {value}  [{source}]");
    }

    if !effective.values().any(|(_, source)| source == "config") {
        println!("\nNo {CONFIG_DIR}/config.toml found; using defaults and CLI flags.");
    }
    Ok(())
}
