use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use savecheck_runner::CommandSpec;

use crate::config::CheckMode;

/// Identifier of a host window (one diagnostics scope, one status bar).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct WindowId(u64);

impl WindowId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for WindowId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "window-{}", self.0)
    }
}

/// A build target to check: its root source file and the cargo arguments
/// selecting it (`--lib`, `--bin NAME`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Target {
    pub src_path: PathBuf,
    pub args: Vec<String>,
}

impl Target {
    #[must_use]
    pub fn new(src_path: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            src_path: src_path.into(),
            args,
        }
    }

    /// Target with no selection arguments; cargo applies its own defaults.
    #[must_use]
    pub fn package_default(manifest_dir: &Path) -> Self {
        Self::new(manifest_dir, Vec::new())
    }

    #[must_use]
    pub fn has_arg(&self, arg: &str) -> bool {
        self.args.iter().any(|a| a == arg)
    }

    /// Whether cargo already builds this target with the test harness.
    #[must_use]
    pub fn is_harness_target(&self) -> bool {
        self.has_arg("--test") || self.has_arg("--bench")
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.args.is_empty() {
            write!(f, "{} (default)", self.src_path.display())
        } else {
            write!(f, "{} ({})", self.src_path.display(), self.args.join(" "))
        }
    }
}

/// A fully built toolchain command for one target.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub command: CommandSpec,
    /// `rustc --version` of the toolchain the command will use.
    pub toolchain_version: String,
    /// Base for relative paths in diagnostics.
    pub path_rewrite_base: PathBuf,
}

/// Why a run ended without finalizing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "kebab-case")]
pub enum AbortReason {
    /// No `Cargo.toml` at or above the saved file.
    NoManifest,
    /// Settings could not be loaded.
    InvalidConfig(String),
    /// Superseded by a newer run or cancelled by the host.
    Cancelled,
    /// The toolchain could not be run.
    ToolError(String),
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoManifest => write!(f, "no Cargo.toml found"),
            Self::InvalidConfig(reason) => write!(f, "invalid configuration: {reason}"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::ToolError(reason) => write!(f, "tool error: {reason}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum CheckOutcome {
    Completed,
    Aborted(AbortReason),
}

impl CheckOutcome {
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }

    #[must_use]
    pub const fn abort_reason(&self) -> Option<&AbortReason> {
        match self {
            Self::Completed => None,
            Self::Aborted(reason) => Some(reason),
        }
    }
}

/// Summary of one check run, returned by `CheckHandle::join`.
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub window: WindowId,
    pub file: PathBuf,
    pub mode: CheckMode,
    pub outcome: CheckOutcome,
    /// Target source paths in the order they were run.
    pub targets_run: Vec<PathBuf>,
    /// A diagnostic for the saved file ended the target loop early.
    pub stopped_early: bool,
    pub started_at: DateTime<Utc>,
    #[serde(with = "duration_ms")]
    pub duration: Duration,
}

mod duration_ms {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_harness_target_detection() {
        let lib = Target::new("/p/src/lib.rs", vec!["--lib".into()]);
        let test = Target::new("/p/tests/it.rs", vec!["--test".into(), "it".into()]);
        let bench = Target::new("/p/benches/b.rs", vec!["--bench".into(), "b".into()]);

        assert!(!lib.is_harness_target());
        assert!(test.is_harness_target());
        assert!(bench.is_harness_target());
        assert!(!Target::package_default(Path::new("/p")).is_harness_target());
    }

    #[test]
    fn test_outcome_serializes_with_reason() {
        let outcome = CheckOutcome::Aborted(AbortReason::ToolError("spawn failed".into()));
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "aborted");
        assert_eq!(json["reason"], "tool-error");
        assert_eq!(json["detail"], "spawn failed");

        let json = serde_json::to_value(CheckOutcome::Completed).unwrap();
        assert_eq!(json["status"], "completed");
    }
}
