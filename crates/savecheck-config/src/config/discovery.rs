use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use savecheck_utils::error::ConfigError;

use super::{CargoConfig, CheckMode, CheckingConfig, CliArgs, Config, ConfigSource, ModeOverrides};

/// Directory holding the config file, searched upward from the saved file.
pub const CONFIG_DIR: &str = ".savecheck";
pub const CONFIG_FILE: &str = "config.toml";

/// TOML configuration file structure
#[derive(Debug, Default, Deserialize, Serialize)]
struct TomlConfig {
    checking: Option<CheckingConfig>,
    cargo: Option<CargoConfig>,
    modes: Option<BTreeMap<CheckMode, ModeOverrides>>,
}

/// Keys whose value is always present after defaults are applied.
const DEFAULTED_KEYS: &[&str] = &[
    "enabled",
    "mode",
    "include_tests",
    "cargo_binary",
    "all_features",
    "no_default_features",
];

impl Config {
    /// Discover and load configuration with precedence: CLI > file > defaults
    ///
    /// Discovery starts from the current directory when no explicit path is
    /// given in `cli_args`.
    pub fn discover(cli_args: &CliArgs) -> Result<Self> {
        let start_dir = std::env::current_dir().context("Failed to get current directory")?;
        Self::discover_from(&start_dir, cli_args)
    }

    /// Discover and load configuration starting from a specific directory.
    ///
    /// Hosts pass the saved file's directory so each project picks up its own
    /// `.savecheck/config.toml`.
    pub fn discover_from(start_dir: &Path, cli_args: &CliArgs) -> Result<Self> {
        let mut source_attribution: HashMap<String, ConfigSource> = DEFAULTED_KEYS
            .iter()
            .map(|key| ((*key).to_string(), ConfigSource::Default))
            .collect();

        let mut checking = CheckingConfig::default();
        let mut cargo = CargoConfig::default();
        let mut modes = BTreeMap::new();

        let config_path = match &cli_args.config_path {
            Some(explicit) => {
                if !explicit.is_file() {
                    return Err(ConfigError::NotFound {
                        path: explicit.display().to_string(),
                    }
                    .into());
                }
                Some(explicit.clone())
            }
            None => Self::discover_config_file_from(start_dir)?,
        };

        if let Some(path) = &config_path {
            let file_config = Self::load_config_file(path)
                .with_context(|| format!("Failed to load config file: {}", path.display()))?;
            tracing::debug!(path = %path.display(), "loaded config file");

            let config_source = ConfigSource::ConfigFile(path.clone());

            if let Some(file_checking) = file_config.checking {
                if file_checking.enabled.is_some() {
                    checking.enabled = file_checking.enabled;
                    source_attribution.insert("enabled".to_string(), config_source.clone());
                }
                if file_checking.mode.is_some() {
                    checking.mode = file_checking.mode;
                    source_attribution.insert("mode".to_string(), config_source.clone());
                }
                if file_checking.include_tests.is_some() {
                    checking.include_tests = file_checking.include_tests;
                    source_attribution.insert("include_tests".to_string(), config_source.clone());
                }
            }

            if let Some(file_cargo) = file_config.cargo {
                if file_cargo.binary.is_some() {
                    cargo.binary = file_cargo.binary;
                    source_attribution.insert("cargo_binary".to_string(), config_source.clone());
                }
                if file_cargo.toolchain.is_some() {
                    cargo.toolchain = file_cargo.toolchain;
                    source_attribution.insert("toolchain".to_string(), config_source.clone());
                }
                if !file_cargo.features.is_empty() {
                    cargo.features = file_cargo.features;
                    source_attribution.insert("features".to_string(), config_source.clone());
                }
                if file_cargo.all_features.is_some() {
                    cargo.all_features = file_cargo.all_features;
                    source_attribution.insert("all_features".to_string(), config_source.clone());
                }
                if file_cargo.no_default_features.is_some() {
                    cargo.no_default_features = file_cargo.no_default_features;
                    source_attribution
                        .insert("no_default_features".to_string(), config_source.clone());
                }
                if !file_cargo.extra_args.is_empty() {
                    cargo.extra_args = file_cargo.extra_args;
                    source_attribution.insert("extra_args".to_string(), config_source.clone());
                }
                if !file_cargo.env.is_empty() {
                    cargo.env = file_cargo.env;
                    source_attribution.insert("env".to_string(), config_source.clone());
                }
            }

            if let Some(file_modes) = file_config.modes {
                for mode in file_modes.keys() {
                    source_attribution.insert(format!("modes.{mode}"), config_source.clone());
                }
                modes = file_modes;
            }
        }

        // Apply CLI overrides (highest priority)
        if let Some(mode) = cli_args.mode {
            checking.mode = Some(mode);
            source_attribution.insert("mode".to_string(), ConfigSource::Cli);
        }
        if let Some(include_tests) = cli_args.include_tests {
            checking.include_tests = Some(include_tests);
            source_attribution.insert("include_tests".to_string(), ConfigSource::Cli);
        }
        if let Some(toolchain) = &cli_args.toolchain {
            cargo.toolchain = Some(toolchain.clone());
            source_attribution.insert("toolchain".to_string(), ConfigSource::Cli);
        }
        if let Some(binary) = &cli_args.cargo_binary {
            cargo.binary = Some(binary.clone());
            source_attribution.insert("cargo_binary".to_string(), ConfigSource::Cli);
        }

        let config = Self {
            checking,
            cargo,
            modes,
            source_attribution,
        };

        config.validate()?;

        Ok(config)
    }

    /// Discover config file by searching upward from a given directory
    ///
    /// Walks up the directory tree looking for `.savecheck/config.toml`,
    /// stopping at repository root markers (.git, .hg, .svn) or the
    /// filesystem root.
    pub fn discover_config_file_from(start_dir: &Path) -> Result<Option<PathBuf>> {
        let mut current_dir = start_dir;

        loop {
            let config_path = current_dir.join(CONFIG_DIR).join(CONFIG_FILE);
            if config_path.is_file() {
                return Ok(Some(config_path));
            }

            if current_dir.join(".git").exists()
                || current_dir.join(".hg").exists()
                || current_dir.join(".svn").exists()
            {
                break;
            }

            match current_dir.parent() {
                Some(parent) => current_dir = parent,
                None => break,
            }
        }

        Ok(None)
    }

    /// Load configuration from TOML file
    fn load_config_file(path: &Path) -> Result<TomlConfig> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: TomlConfig = toml::from_str(&content)
            .map_err(|e| ConfigError::InvalidFile(e.to_string()))
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_discover_config_file_stops_at_repo_root() {
        let temp = TempDir::new().unwrap();
        let outer = temp.path();
        fs::create_dir_all(outer.join(CONFIG_DIR)).unwrap();
        fs::write(outer.join(CONFIG_DIR).join(CONFIG_FILE), "").unwrap();

        let repo = outer.join("repo");
        fs::create_dir_all(repo.join(".git")).unwrap();
        fs::create_dir_all(repo.join("src")).unwrap();

        let found = Config::discover_config_file_from(&repo.join("src")).unwrap();
        assert_eq!(found, None);
    }

    #[test]
    fn test_discover_config_file_walks_up() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::create_dir_all(root.join(CONFIG_DIR)).unwrap();
        fs::write(root.join(CONFIG_DIR).join(CONFIG_FILE), "").unwrap();
        fs::create_dir_all(root.join("crates/a/src")).unwrap();

        let found = Config::discover_config_file_from(&root.join("crates/a/src")).unwrap();
        assert_eq!(found, Some(root.join(CONFIG_DIR).join(CONFIG_FILE)));
    }

    #[test]
    fn test_explicit_missing_config_is_not_found() {
        let temp = TempDir::new().unwrap();
        let cli_args = CliArgs {
            config_path: Some(temp.path().join("nope.toml")),
            ..Default::default()
        };

        let err = Config::discover_from(temp.path(), &cli_args).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::NotFound { .. })
        ));
    }
}
