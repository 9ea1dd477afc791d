use savecheck_utils::error::{ConfigError, SaveCheckError};
use std::collections::BTreeMap;

use super::Config;

fn invalid(key: impl Into<String>, value: impl Into<String>) -> SaveCheckError {
    SaveCheckError::Config(ConfigError::InvalidValue {
        key: key.into(),
        value: value.into(),
    })
}

fn validate_toolchain(key: &str, toolchain: Option<&str>) -> Result<(), SaveCheckError> {
    let Some(toolchain) = toolchain else {
        return Ok(());
    };
    if toolchain.trim().is_empty() {
        return Err(invalid(key, "toolchain name must not be empty"));
    }
    if toolchain.starts_with('+') {
        return Err(invalid(key, format!("drop the leading '+' from '{toolchain}'")));
    }
    if toolchain.chars().any(char::is_whitespace) {
        return Err(invalid(key, format!("toolchain '{toolchain}' contains whitespace")));
    }
    Ok(())
}

fn validate_args(key: &str, args: &[String]) -> Result<(), SaveCheckError> {
    if args.iter().any(|a| a.is_empty()) {
        return Err(invalid(key, "arguments must not be empty strings"));
    }
    Ok(())
}

fn validate_env(key: &str, env: &BTreeMap<String, String>) -> Result<(), SaveCheckError> {
    for name in env.keys() {
        if name.is_empty() || name.contains('=') || name.contains('\0') {
            return Err(invalid(key, format!("invalid environment variable name '{name}'")));
        }
    }
    Ok(())
}

impl Config {
    /// Validate configuration values
    pub(crate) fn validate(&self) -> Result<(), SaveCheckError> {
        if let Some(binary) = &self.cargo.binary
            && binary.trim().is_empty()
        {
            return Err(invalid("cargo_binary", "must not be empty"));
        }

        validate_toolchain("toolchain", self.cargo.toolchain.as_deref())?;
        validate_args("extra_args", &self.cargo.extra_args)?;
        validate_env("env", &self.cargo.env)?;

        if self.cargo.features.iter().any(|f| f.trim().is_empty()) {
            return Err(invalid("features", "feature names must not be empty"));
        }

        if self.cargo.all_features == Some(true) && self.cargo.no_default_features == Some(true) {
            tracing::debug!("all_features and no_default_features both set; cargo enables all");
        }

        for (mode, overrides) in &self.modes {
            validate_toolchain(&format!("modes.{mode}.toolchain"), overrides.toolchain.as_deref())?;
            validate_args(&format!("modes.{mode}.extra_args"), &overrides.extra_args)?;
            validate_env(&format!("modes.{mode}.env"), &overrides.env)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CheckMode, ModeOverrides};

    fn key_of(err: SaveCheckError) -> String {
        match err {
            SaveCheckError::Config(ConfigError::InvalidValue { key, .. }) => key,
            other => panic!("expected InvalidValue, got {other:?}"),
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn test_rejects_empty_binary() {
        let mut config = Config::default();
        config.cargo.binary = Some("  ".to_string());
        assert_eq!(key_of(config.validate().unwrap_err()), "cargo_binary");
    }

    #[test]
    fn test_rejects_plus_prefixed_toolchain() {
        let mut config = Config::default();
        config.cargo.toolchain = Some("+nightly".to_string());
        assert_eq!(key_of(config.validate().unwrap_err()), "toolchain");
    }

    #[test]
    fn test_rejects_bad_mode_override() {
        let mut config = Config::default();
        config.modes.insert(
            CheckMode::LintAll,
            ModeOverrides {
                extra_args: vec![String::new()],
                ..Default::default()
            },
        );
        assert_eq!(
            key_of(config.validate().unwrap_err()),
            "modes.lint-all.extra_args"
        );
    }

    #[test]
    fn test_rejects_bad_env_name() {
        let mut config = Config::default();
        config.cargo.env.insert("A=B".to_string(), "x".to_string());
        assert_eq!(key_of(config.validate().unwrap_err()), "env");
    }
}
