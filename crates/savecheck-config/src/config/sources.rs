use std::collections::BTreeMap;

use super::{Config, ConfigSource};

fn source_label(source: Option<&ConfigSource>) -> String {
    source.unwrap_or(&ConfigSource::Default).label().to_string()
}

impl Config {
    /// Effective configuration as `key -> (value, source)`.
    ///
    /// Sorted by key so `savecheck config` output is stable.
    #[must_use]
    pub fn effective_config(&self) -> BTreeMap<String, (String, String)> {
        let mut config = BTreeMap::new();

        let mut add_config = |key: &str, value: Option<String>| {
            if let Some(val) = value {
                let source = source_label(self.source_attribution.get(key));
                config.insert(key.to_string(), (val, source));
            }
        };

        add_config("enabled", Some(self.enabled().to_string()));
        add_config("mode", Some(self.mode().to_string()));
        add_config("include_tests", Some(self.include_tests().to_string()));
        add_config("cargo_binary", Some(self.cargo_binary().to_string()));
        add_config("toolchain", self.cargo.toolchain.clone());
        add_config("all_features", self.cargo.all_features.map(|b| b.to_string()));
        add_config(
            "no_default_features",
            self.cargo.no_default_features.map(|b| b.to_string()),
        );

        if !self.cargo.features.is_empty() {
            add_config("features", Some(self.cargo.features.join(",")));
        }
        if !self.cargo.extra_args.is_empty() {
            add_config("extra_args", Some(self.cargo.extra_args.join(" ")));
        }
        if !self.cargo.env.is_empty() {
            let env = self
                .cargo
                .env
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join(" ");
            add_config("env", Some(env));
        }

        for (mode, overrides) in &self.modes {
            let mut parts = Vec::new();
            if let Some(toolchain) = &overrides.toolchain {
                parts.push(format!("toolchain={toolchain}"));
            }
            if !overrides.extra_args.is_empty() {
                parts.push(format!("extra_args=[{}]", overrides.extra_args.join(" ")));
            }
            if !overrides.env.is_empty() {
                parts.push(format!("env={}", overrides.env.len()));
            }
            add_config(&format!("modes.{mode}"), Some(parts.join(", ")));
        }

        config
    }
}
