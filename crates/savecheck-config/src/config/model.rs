use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use savecheck_utils::error::ConfigError;
use savecheck_utils::types::ConfigSource;

/// Toolchain driver used for an on-save check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CheckMode {
    /// `cargo check` per target.
    #[default]
    Check,
    /// `cargo rustc -- -Zno-codegen` per target (nightly only).
    #[serde(alias = "no-trans")]
    LegacyUnstable,
    /// One `cargo clippy` run for the whole package.
    #[serde(alias = "clippy")]
    LintAll,
}

impl CheckMode {
    pub const ALL: [Self; 3] = [Self::Check, Self::LegacyUnstable, Self::LintAll];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Check => "check",
            Self::LegacyUnstable => "legacy-unstable",
            Self::LintAll => "lint-all",
        }
    }

    /// Whether this mode checks target by target.
    #[must_use]
    pub const fn uses_targets(self) -> bool {
        !matches!(self, Self::LintAll)
    }
}

impl fmt::Display for CheckMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CheckMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "check" => Ok(Self::Check),
            "legacy-unstable" | "no-trans" => Ok(Self::LegacyUnstable),
            "lint-all" | "clippy" => Ok(Self::LintAll),
            other => Err(ConfigError::InvalidValue {
                key: "mode".to_string(),
                value: format!("Unknown check mode: {other}"),
            }),
        }
    }
}

/// `[checking]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CheckingConfig {
    pub enabled: Option<bool>,
    pub mode: Option<CheckMode>,
    pub include_tests: Option<bool>,
}

impl Default for CheckingConfig {
    fn default() -> Self {
        Self {
            enabled: Some(true),
            mode: Some(CheckMode::Check),
            include_tests: Some(true),
        }
    }
}

/// `[cargo]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CargoConfig {
    /// Cargo executable; looked up on `PATH` when not absolute.
    pub binary: Option<String>,
    /// Rustup toolchain, passed as `+toolchain`.
    pub toolchain: Option<String>,
    #[serde(default)]
    pub features: Vec<String>,
    pub all_features: Option<bool>,
    pub no_default_features: Option<bool>,
    /// Appended after the target and feature arguments.
    #[serde(default)]
    pub extra_args: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl Default for CargoConfig {
    fn default() -> Self {
        Self {
            binary: Some("cargo".to_string()),
            toolchain: None,
            features: Vec::new(),
            all_features: Some(false),
            no_default_features: Some(false),
            extra_args: Vec::new(),
            env: BTreeMap::new(),
        }
    }
}

/// `[modes.<mode>]` overrides. Values here win over `[cargo]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ModeOverrides {
    pub toolchain: Option<String>,
    #[serde(default)]
    pub extra_args: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// Configuration snapshot for on-save checks.
///
/// Built with precedence CLI > config file > built-in defaults. A snapshot is
/// loaded once when a check starts and threaded through the whole run, so a
/// settings change mid-run only affects the next save.
///
/// # Example
///
/// ```rust,no_run
/// use savecheck_config::{CliArgs, Config};
/// use std::path::Path;
///
/// let config = Config::discover_from(Path::new("/work/project/src"), &CliArgs::default())?;
/// println!("mode: {}", config.mode());
/// # Ok::<(), anyhow::Error>(())
/// ```
///
/// # Configuration File Format
///
/// ```toml
/// [checking]
/// enabled = true
/// mode = "check"            # check | legacy-unstable | lint-all
/// include_tests = true
///
/// [cargo]
/// binary = "cargo"
/// toolchain = "stable"
/// features = ["serde"]
/// extra_args = ["--locked"]
///
/// [cargo.env]
/// CARGO_TARGET_DIR = "target/savecheck"
///
/// [modes.legacy-unstable]
/// toolchain = "nightly"
/// ```
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub checking: CheckingConfig,
    pub cargo: CargoConfig,
    pub modes: BTreeMap<CheckMode, ModeOverrides>,
    pub source_attribution: HashMap<String, ConfigSource>,
}
