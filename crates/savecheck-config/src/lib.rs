//! Configuration model, discovery and validation for savecheck.

pub mod config;

pub use config::{
    CargoConfig, CheckMode, CheckingConfig, CliArgs, Config, ConfigBuilder, ConfigSource,
    ModeOverrides, CONFIG_DIR, CONFIG_FILE,
};
