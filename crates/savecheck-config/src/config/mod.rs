//! Configuration management for savecheck
//!
//! Hierarchical configuration with discovery and precedence CLI > file >
//! defaults. Files are TOML with `[checking]`, `[cargo]` and `[modes.<mode>]`
//! sections.

mod builder;
mod cli_args;
mod discovery;
mod model;
mod sources;
mod validation;

pub use builder::ConfigBuilder;
pub use cli_args::CliArgs;
pub use discovery::{CONFIG_DIR, CONFIG_FILE};
pub use model::*;
pub use savecheck_utils::types::ConfigSource;

use std::collections::BTreeMap;

impl Config {
    /// Whether on-save checking runs at all. Defaults to `true`.
    #[must_use]
    pub fn enabled(&self) -> bool {
        self.checking.enabled.unwrap_or(true)
    }

    #[must_use]
    pub fn mode(&self) -> CheckMode {
        self.checking.mode.unwrap_or_default()
    }

    #[must_use]
    pub fn include_tests(&self) -> bool {
        self.checking.include_tests.unwrap_or(true)
    }

    #[must_use]
    pub fn cargo_binary(&self) -> &str {
        self.cargo.binary.as_deref().unwrap_or("cargo")
    }

    /// Toolchain for a mode.
    ///
    /// Precedence (highest to lowest):
    /// 1. `[modes.<mode>].toolchain`
    /// 2. `[cargo].toolchain`
    /// 3. none (rustup default)
    #[must_use]
    pub fn toolchain_for(&self, mode: CheckMode) -> Option<&str> {
        self.modes
            .get(&mode)
            .and_then(|o| o.toolchain.as_deref())
            .or(self.cargo.toolchain.as_deref())
    }

    /// Extra cargo arguments for a mode; a non-empty mode list replaces the
    /// `[cargo]` list.
    #[must_use]
    pub fn extra_args_for(&self, mode: CheckMode) -> &[String] {
        match self.modes.get(&mode) {
            Some(o) if !o.extra_args.is_empty() => &o.extra_args,
            _ => &self.cargo.extra_args,
        }
    }

    /// `[cargo].env` merged with the mode's env; mode values win per key.
    #[must_use]
    pub fn env_for(&self, mode: CheckMode) -> BTreeMap<String, String> {
        let mut env = self.cargo.env.clone();
        if let Some(overrides) = self.modes.get(&mode) {
            env.extend(overrides.env.clone());
        }
        env
    }

    /// `--features`/`--all-features`/`--no-default-features` arguments.
    #[must_use]
    pub fn feature_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if self.cargo.all_features == Some(true) {
            args.push("--all-features".to_string());
        }
        if self.cargo.no_default_features == Some(true) {
            args.push("--no-default-features".to_string());
        }
        if !self.cargo.features.is_empty() {
            args.push("--features".to_string());
            args.push(self.cargo.features.join(","));
        }
        args
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl Config {
    /// Defaults with the given mode and include-tests flag.
    pub fn minimal_for_testing(mode: CheckMode, include_tests: bool) -> Self {
        let mut config = Self::default();
        config.checking.mode = Some(mode);
        config.checking.include_tests = Some(include_tests);
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use savecheck_utils::error::{ConfigError, SaveCheckError};
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn create_test_config_file(dir: &Path, content: &str) -> PathBuf {
        let config_dir = dir.join(CONFIG_DIR);
        fs::create_dir_all(&config_dir).unwrap();
        // Keep discovery inside the temp dir.
        fs::create_dir_all(dir.join(".git")).unwrap();

        let config_path = config_dir.join(CONFIG_FILE);
        fs::write(&config_path, content).unwrap();
        config_path
    }

    fn isolated_dir() -> TempDir {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join(".git")).unwrap();
        temp
    }

    #[test]
    fn test_default_config() {
        let temp = isolated_dir();
        let config = Config::discover_from(temp.path(), &CliArgs::default()).unwrap();

        assert!(config.enabled());
        assert_eq!(config.mode(), CheckMode::Check);
        assert!(config.include_tests());
        assert_eq!(config.cargo_binary(), "cargo");
        assert_eq!(config.toolchain_for(CheckMode::Check), None);
        assert!(config.feature_args().is_empty());
        assert_eq!(
            config.source_attribution.get("mode"),
            Some(&ConfigSource::Default)
        );
    }

    #[test]
    fn test_config_discovery_with_cli_override() {
        let temp = TempDir::new().unwrap();
        let config_path = create_test_config_file(
            temp.path(),
            r#"
[checking]
mode = "legacy-unstable"
include_tests = false

[cargo]
toolchain = "beta"
features = ["serde", "json"]
"#,
        );

        let cli_args = CliArgs {
            mode: Some(CheckMode::LintAll),
            ..Default::default()
        };
        let src = temp.path().join("src");
        fs::create_dir_all(&src).unwrap();

        let config = Config::discover_from(&src, &cli_args).unwrap();

        assert_eq!(config.mode(), CheckMode::LintAll);
        assert!(!config.include_tests());
        assert_eq!(config.toolchain_for(CheckMode::Check), Some("beta"));
        assert_eq!(
            config.feature_args(),
            vec!["--features".to_string(), "serde,json".to_string()]
        );

        assert_eq!(config.source_attribution.get("mode"), Some(&ConfigSource::Cli));
        assert_eq!(
            config.source_attribution.get("include_tests"),
            Some(&ConfigSource::ConfigFile(config_path))
        );
    }

    #[test]
    fn test_mode_aliases_in_file() {
        let temp = TempDir::new().unwrap();
        create_test_config_file(
            temp.path(),
            r#"
[checking]
mode = "no-trans"
"#,
        );
        let config = Config::discover_from(temp.path(), &CliArgs::default()).unwrap();
        assert_eq!(config.mode(), CheckMode::LegacyUnstable);

        assert_eq!("clippy".parse::<CheckMode>().unwrap(), CheckMode::LintAll);
        assert!("build".parse::<CheckMode>().is_err());
    }

    #[test]
    fn test_mode_overrides_take_precedence() {
        let temp = TempDir::new().unwrap();
        create_test_config_file(
            temp.path(),
            r#"
[cargo]
toolchain = "stable"
extra_args = ["--locked"]

[cargo.env]
CARGO_TARGET_DIR = "target/savecheck"
RUSTFLAGS = "-Dwarnings"

[modes.legacy-unstable]
toolchain = "nightly"
extra_args = ["--offline"]

[modes.legacy-unstable.env]
RUSTFLAGS = ""
"#,
        );

        let config = Config::discover_from(temp.path(), &CliArgs::default()).unwrap();

        assert_eq!(config.toolchain_for(CheckMode::LegacyUnstable), Some("nightly"));
        assert_eq!(config.toolchain_for(CheckMode::Check), Some("stable"));
        assert_eq!(config.extra_args_for(CheckMode::LegacyUnstable), ["--offline"]);
        assert_eq!(config.extra_args_for(CheckMode::LintAll), ["--locked"]);

        let env = config.env_for(CheckMode::LegacyUnstable);
        assert_eq!(env.get("RUSTFLAGS").map(String::as_str), Some(""));
        assert_eq!(
            env.get("CARGO_TARGET_DIR").map(String::as_str),
            Some("target/savecheck")
        );
    }

    #[test]
    fn test_invalid_toml_config() {
        let invalid_toml_cases = [
            "[[[ invalid brackets",
            "[checking\nmode = \"check\"",
            "[checking]\nmode = ",
            "[checking]\nmode = \"build\"",
            "[checking]\nenabled = \"yes\"",
            "[modes.turbo]\ntoolchain = \"nightly\"",
        ];

        for (i, invalid) in invalid_toml_cases.iter().enumerate() {
            let temp = TempDir::new().unwrap();
            let config_path = create_test_config_file(temp.path(), invalid);
            let cli_args = CliArgs {
                config_path: Some(config_path),
                ..Default::default()
            };

            let err = Config::discover_from(temp.path(), &cli_args).unwrap_err();
            assert!(
                matches!(
                    err.downcast_ref::<ConfigError>(),
                    Some(ConfigError::InvalidFile(_))
                ),
                "case {i} should be an invalid file: {invalid}"
            );
        }
    }

    #[test]
    fn test_config_with_unknown_fields() {
        let temp = TempDir::new().unwrap();
        create_test_config_file(
            temp.path(),
            r#"
[checking]
enabled = false
unknown_field = 1

[unknown_section]
key = "value"
"#,
        );

        let config = Config::discover_from(temp.path(), &CliArgs::default()).unwrap();
        assert!(!config.enabled());
    }

    #[test]
    fn test_config_validation_from_cli() {
        let temp = isolated_dir();
        let cli_args = CliArgs {
            toolchain: Some("+nightly".to_string()),
            ..Default::default()
        };

        let err = Config::discover_from(temp.path(), &cli_args).unwrap_err();
        match err.downcast_ref::<SaveCheckError>() {
            Some(SaveCheckError::Config(ConfigError::InvalidValue { key, .. })) => {
                assert_eq!(key, "toolchain");
            }
            other => panic!("expected InvalidValue for toolchain, got {other:?}"),
        }
    }

    #[test]
    fn test_effective_config() {
        let temp = TempDir::new().unwrap();
        create_test_config_file(
            temp.path(),
            r#"
[checking]
include_tests = false

[modes.lint-all]
extra_args = ["--", "-Wclippy::pedantic"]
"#,
        );

        let cli_args = CliArgs {
            toolchain: Some("nightly".to_string()),
            ..Default::default()
        };
        let config = Config::discover_from(temp.path(), &cli_args).unwrap();
        let effective = config.effective_config();

        assert_eq!(effective["include_tests"], ("false".to_string(), "config".to_string()));
        assert_eq!(effective["toolchain"], ("nightly".to_string(), "cli".to_string()));
        assert_eq!(effective["mode"], ("check".to_string(), "default".to_string()));
        assert_eq!(effective["modes.lint-all"].1, "config");
        assert!(!effective.contains_key("features"));
    }
}
