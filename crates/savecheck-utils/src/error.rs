use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub use savecheck_runner::RunnerError;

use crate::exit_codes::ExitCode;

/// Library-level error type with context and user-facing reporting.
///
/// # Error Categories
///
/// | Category | Variants |
/// |----------|----------|
/// | Configuration | `Config` |
/// | Project layout | `ManifestNotFound` |
/// | Toolchain | `Runner`, `TargetResolution` |
/// | Lifecycle | `WorkerPanicked` |
///
/// Inside a check run none of these escape to the code that started the run;
/// the orchestrator turns them into a `CheckOutcome`. They surface directly
/// only from synchronous APIs such as config discovery and the CLI.
#[derive(Error, Debug)]
pub enum SaveCheckError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Runner error: {0}")]
    Runner(#[from] RunnerError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No Cargo.toml found above {}", file.display())]
    ManifestNotFound { file: PathBuf },

    #[error("Target resolution failed: {reason}")]
    TargetResolution { reason: String },

    #[error("Check worker panicked: {reason}")]
    WorkerPanicked { reason: String },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration file: {0}")]
    InvalidFile(String),

    #[error("Invalid configuration value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found at {path}")]
    NotFound { path: String },

    #[error("Configuration discovery failed: {reason}")]
    DiscoveryFailed { reason: String },
}

/// Trait for providing user-friendly error reporting with context and suggestions
pub trait UserFriendlyError {
    /// Get a user-friendly error message
    fn user_message(&self) -> String;

    /// Get contextual information about the error
    fn context(&self) -> Option<String>;

    /// Get suggested actions to resolve the error
    fn suggestions(&self) -> Vec<String>;

    /// Get the error category for grouping similar errors
    fn category(&self) -> ErrorCategory;
}

/// Categories of errors for better organization and handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    ProjectLayout,
    Toolchain,
    Lifecycle,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "Configuration"),
            Self::ProjectLayout => write!(f, "Project Layout"),
            Self::Toolchain => write!(f, "Toolchain"),
            Self::Lifecycle => write!(f, "Lifecycle"),
        }
    }
}

impl UserFriendlyError for ConfigError {
    fn user_message(&self) -> String {
        match self {
            Self::InvalidFile(reason) => {
                format!("Configuration file has invalid format: {reason}")
            }
            Self::InvalidValue { key, value } => {
                format!("Configuration '{key}' has invalid value: {value}")
            }
            Self::NotFound { path } => format!("Configuration file not found: {path}"),
            Self::DiscoveryFailed { reason } => {
                format!("Could not discover configuration: {reason}")
            }
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::InvalidFile(_) | Self::InvalidValue { .. } => Some(
                "Configuration is read from .savecheck/config.toml, searched upward from the saved file"
                    .to_string(),
            ),
            Self::NotFound { .. } => {
                Some("An explicit --config path must point to an existing file".to_string())
            }
            Self::DiscoveryFailed { .. } => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::InvalidFile(_) => vec![
                "Check the TOML syntax of the configuration file".to_string(),
                "Ensure sections are named [checking], [cargo] or [modes.<mode>]".to_string(),
            ],
            Self::InvalidValue { key, .. } => match key.as_str() {
                "mode" => vec![
                    "Use one of 'check', 'legacy-unstable' or 'lint-all'".to_string(),
                ],
                "toolchain" => vec![
                    "Use a rustup toolchain name such as 'stable' or 'nightly'".to_string(),
                ],
                _ => vec!["Check the value against the documented configuration keys".to_string()],
            },
            Self::NotFound { .. } => vec![
                "Check the path passed to --config".to_string(),
                "Omit --config to use discovery".to_string(),
            ],
            Self::DiscoveryFailed { .. } => {
                vec!["Pass an explicit configuration path with --config".to_string()]
            }
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Configuration
    }
}

impl UserFriendlyError for SaveCheckError {
    fn user_message(&self) -> String {
        match self {
            Self::Config(err) => err.user_message(),
            Self::Runner(RunnerError::SpawnFailed { program, .. }) => {
                format!("Could not start '{program}'")
            }
            Self::Runner(err) => err.to_string(),
            Self::Io(err) => format!("I/O failure: {err}"),
            Self::ManifestNotFound { file } => {
                format!("{} is not inside a Cargo project", file.display())
            }
            Self::TargetResolution { reason } => {
                format!("Could not determine build targets: {reason}")
            }
            Self::WorkerPanicked { reason } => format!("The check worker crashed: {reason}"),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Config(err) => err.context(),
            Self::Runner(RunnerError::SpawnFailed { reason, .. }) => Some(reason.clone()),
            Self::ManifestNotFound { .. } => Some(
                "A Cargo.toml manifest is required in the saved file's directory or one of its parents"
                    .to_string(),
            ),
            _ => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Config(err) => err.suggestions(),
            Self::Runner(RunnerError::SpawnFailed { .. }) => vec![
                "Ensure cargo is installed and on PATH".to_string(),
                "Set [cargo].binary to the full path of cargo".to_string(),
            ],
            Self::ManifestNotFound { .. } => {
                vec!["Run 'cargo init' in the project directory".to_string()]
            }
            Self::TargetResolution { .. } => {
                vec!["Run 'cargo metadata --no-deps' to check the manifest parses".to_string()]
            }
            _ => Vec::new(),
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(_) => ErrorCategory::Configuration,
            Self::ManifestNotFound { .. } => ErrorCategory::ProjectLayout,
            Self::Runner(_) | Self::Io(_) | Self::TargetResolution { .. } => ErrorCategory::Toolchain,
            Self::WorkerPanicked { .. } => ErrorCategory::Lifecycle,
        }
    }
}

impl SaveCheckError {
    /// Whether this error is a cancellation rather than a failure.
    ///
    /// Only a terminated runner process counts as cancellation.
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Runner(err) if err.is_terminated())
    }

    /// Get a user-friendly error message with context and actionable suggestions.
    ///
    /// ```rust
    /// use savecheck_utils::error::SaveCheckError;
    /// use std::path::PathBuf;
    ///
    /// let err = SaveCheckError::ManifestNotFound { file: PathBuf::from("/tmp/x.rs") };
    /// let message = err.display_for_user();
    /// assert!(message.contains("Suggestions:"));
    /// ```
    #[must_use]
    pub fn display_for_user(&self) -> String {
        let mut output = format!("Error: {}\n", self.user_message());

        if let Some(ctx) = self.context() {
            output.push_str(&format!("\nContext: {ctx}\n"));
        }

        let suggestions = self.suggestions();
        if !suggestions.is_empty() {
            output.push_str("\nSuggestions:\n");
            for suggestion in suggestions {
                output.push_str(&format!("  • {suggestion}\n"));
            }
        }

        output
    }

    /// Map this error to the CLI exit code.
    #[must_use]
    pub fn to_exit_code(&self) -> ExitCode {
        crate::exit_codes::exit_code_for(self)
    }
}
