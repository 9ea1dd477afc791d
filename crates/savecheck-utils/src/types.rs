use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Where a configuration value came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    /// Command-line flag
    Cli,
    /// Discovered or explicit config file
    #[serde(rename = "config")]
    ConfigFile(PathBuf),
    /// Set through `ConfigBuilder`
    Programmatic,
    /// Built-in default
    Default,
}

impl ConfigSource {
    /// Stable short label used in `savecheck config` output.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Cli => "cli",
            Self::ConfigFile(_) => "config",
            Self::Programmatic => "programmatic",
            Self::Default => "default",
        }
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigFile(path) => write!(f, "config ({})", path.display()),
            other => write!(f, "{}", other.label()),
        }
    }
}
