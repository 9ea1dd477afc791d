use std::path::PathBuf;

use super::CheckMode;

/// Overrides collected from the command line.
///
/// Every field is optional; `None` leaves the config-file or default value in
/// place.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    /// Explicit config file; disables upward discovery.
    pub config_path: Option<PathBuf>,
    pub mode: Option<CheckMode>,
    pub include_tests: Option<bool>,
    pub toolchain: Option<String>,
    pub cargo_binary: Option<String>,
}
