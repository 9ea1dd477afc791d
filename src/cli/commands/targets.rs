//! Targets command implementation
//!
//! Handles `savecheck targets <FILE>`: prints the build targets a check of
//! the file would run, in order.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

use super::common::{absolute_file, display_path};

use crate::manifest::{CargoManifestLocator, ManifestLocator};
use crate::targets::{CargoTargetResolver, TargetResolver};
use crate::{CheckMode, CliArgs, DiscoveredSettings, SaveCheckError, SettingsProvider, Target, emit_jcs};

#[derive(Serialize)]
struct TargetsOutput<'a> {
    manifest_dir: &'a Path,
    mode: CheckMode,
    targets: &'a [Target],
}

/// Execute the targets command
pub fn execute_targets_command(file: &Path, json: bool, cli_args: &CliArgs) -> Result<()> {
    let file = absolute_file(file)?;
    let config = DiscoveredSettings::new(cli_args.clone()).load(&file)?;

    let manifest_dir = CargoManifestLocator
        .locate(&file)
        .ok_or_else(|| SaveCheckError::ManifestNotFound { file: file.clone() })?;
    let targets = CargoTargetResolver.resolve_targets(&manifest_dir, &file, &config)?;

    if json {
        let output = TargetsOutput {
            manifest_dir: &manifest_dir,
            mode: config.mode(),
            targets: &targets,
        };
        println!("{}", emit_jcs(&output).context("Failed to emit targets JSON")?);
        return Ok(());
    }

    println!("Targets for {}:", display_path(&file));
    for (index, target) in targets.iter().enumerate() {
        println!("  {}. {}", index + 1, target);
    }
    if !config.mode().uses_targets() {
        println!("  (mode {} checks the whole package in one run)", config.mode());
    }
    Ok(())
}
