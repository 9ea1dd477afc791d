//! Per-run configuration snapshots.

use std::path::Path;

use crate::config::{CliArgs, Config};
use crate::error::{ConfigError, SaveCheckError};

/// Supplies the configuration a run uses from start to finish.
pub trait SettingsProvider: Send + Sync {
    /// Load the settings that apply to `file`.
    fn load(&self, file: &Path) -> Result<Config, SaveCheckError>;
}

/// Always hands out the same configuration.
#[derive(Debug, Clone, Default)]
pub struct FixedSettings(pub Config);

impl SettingsProvider for FixedSettings {
    fn load(&self, _file: &Path) -> Result<Config, SaveCheckError> {
        Ok(self.0.clone())
    }
}

/// Discovers `.savecheck/config.toml` upward from the saved file on every
/// load, applying fixed command-line overrides on top.
#[derive(Debug, Clone, Default)]
pub struct DiscoveredSettings {
    cli_args: CliArgs,
}

impl DiscoveredSettings {
    #[must_use]
    pub fn new(cli_args: CliArgs) -> Self {
        Self { cli_args }
    }
}

impl SettingsProvider for DiscoveredSettings {
    fn load(&self, file: &Path) -> Result<Config, SaveCheckError> {
        let start = file.parent().unwrap_or(file);
        Config::discover_from(start, &self.cli_args).map_err(into_config_error)
    }
}

fn into_config_error(e: anyhow::Error) -> SaveCheckError {
    let e = match e.downcast::<SaveCheckError>() {
        Ok(err) => return err,
        Err(e) => e,
    };
    match e.downcast::<ConfigError>() {
        Ok(err) => SaveCheckError::Config(err),
        Err(e) => SaveCheckError::Config(ConfigError::DiscoveryFailed {
            reason: format!("{e:#}"),
        }),
    }
}
