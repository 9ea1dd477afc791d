use std::collections::HashMap;

use savecheck_utils::error::SaveCheckError;

use super::{CargoConfig, CheckMode, CheckingConfig, Config, ConfigSource, ModeOverrides};

impl Config {
    /// Create a builder for programmatic configuration.
    ///
    /// # Example
    ///
    /// ```rust
    /// use savecheck_config::{CheckMode, Config};
    ///
    /// let config = Config::builder()
    ///     .mode(CheckMode::LintAll)
    ///     .include_tests(false)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.mode(), CheckMode::LintAll);
    /// ```
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }
}

/// Builder for `Config` that bypasses file discovery.
///
/// Values set here are attributed to `ConfigSource::Programmatic`; anything
/// left unset keeps its built-in default.
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    enabled: Option<bool>,
    mode: Option<CheckMode>,
    include_tests: Option<bool>,
    cargo_binary: Option<String>,
    toolchain: Option<String>,
    features: Vec<String>,
    extra_args: Vec<String>,
    env: Vec<(String, String)>,
    modes: Vec<(CheckMode, ModeOverrides)>,
}

impl ConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Turn on-save checking on or off.
    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    #[must_use]
    pub fn mode(mut self, mode: CheckMode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Check test code along with the target (`--profile=test` / `--test`).
    #[must_use]
    pub fn include_tests(mut self, include: bool) -> Self {
        self.include_tests = Some(include);
        self
    }

    #[must_use]
    pub fn cargo_binary(mut self, binary: impl Into<String>) -> Self {
        self.cargo_binary = Some(binary.into());
        self
    }

    #[must_use]
    pub fn toolchain(mut self, toolchain: impl Into<String>) -> Self {
        self.toolchain = Some(toolchain.into());
        self
    }

    #[must_use]
    pub fn feature(mut self, feature: impl Into<String>) -> Self {
        self.features.push(feature.into());
        self
    }

    #[must_use]
    pub fn extra_arg(mut self, arg: impl Into<String>) -> Self {
        self.extra_args.push(arg.into());
        self
    }

    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Replace the overrides for one mode.
    #[must_use]
    pub fn mode_overrides(mut self, mode: CheckMode, overrides: ModeOverrides) -> Self {
        self.modes.push((mode, overrides));
        self
    }

    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `SaveCheckError::Config` when a value fails validation.
    pub fn build(self) -> Result<Config, SaveCheckError> {
        let mut source_attribution = HashMap::new();
        let mut checking = CheckingConfig::default();
        let mut cargo = CargoConfig::default();

        for key in ["enabled", "mode", "include_tests", "cargo_binary"] {
            source_attribution.insert(key.to_string(), ConfigSource::Default);
        }

        let mut set = |key: &str| {
            source_attribution.insert(key.to_string(), ConfigSource::Programmatic);
        };

        if let Some(enabled) = self.enabled {
            checking.enabled = Some(enabled);
            set("enabled");
        }
        if let Some(mode) = self.mode {
            checking.mode = Some(mode);
            set("mode");
        }
        if let Some(include_tests) = self.include_tests {
            checking.include_tests = Some(include_tests);
            set("include_tests");
        }
        if let Some(binary) = self.cargo_binary {
            cargo.binary = Some(binary);
            set("cargo_binary");
        }
        if let Some(toolchain) = self.toolchain {
            cargo.toolchain = Some(toolchain);
            set("toolchain");
        }
        if !self.features.is_empty() {
            cargo.features = self.features;
            set("features");
        }
        if !self.extra_args.is_empty() {
            cargo.extra_args = self.extra_args;
            set("extra_args");
        }
        if !self.env.is_empty() {
            cargo.env = self.env.into_iter().collect();
            set("env");
        }

        let mut modes = std::collections::BTreeMap::new();
        for (mode, overrides) in self.modes {
            set(&format!("modes.{mode}"));
            modes.insert(mode, overrides);
        }

        let config = Config {
            checking,
            cargo,
            modes,
            source_attribution,
        };
        config.validate()?;
        Ok(config)
    }
}
