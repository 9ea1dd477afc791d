//! savecheck - run cargo on save and collect its diagnostics
//!
//! When a Rust source file is saved, savecheck finds the package that owns it,
//! runs cargo for each build target that may compile the file, and routes the
//! JSON diagnostics cargo prints to a per-window diagnostic sink. A diagnostic
//! in the saved file ends the target loop early; a newer save for the same
//! window cancels the older run.
//!
//! savecheck can be used in two ways:
//! - **CLI**: `savecheck check <FILE>` runs one check to completion
//! - **Library**: hosts (editors, file watchers) drive a [`CheckOrchestrator`]
//!
//! # Quick Start (CLI)
//!
//! ```bash
//! # Check a file with the configured mode
//! savecheck check src/lib.rs
//!
//! # Which targets would be checked, and in what order
//! savecheck targets src/bin/tool.rs
//!
//! # Effective configuration and its sources
//! savecheck config
//! ```
//!
//! # Quick Start (Library)
//!
//! ```rust,no_run
//! use savecheck::{
//!     CheckOrchestrator, Collaborators, DiagnosticStore, DiscoveredSettings, WindowContext,
//! };
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! let store = Arc::new(DiagnosticStore::new());
//! let orchestrator = CheckOrchestrator::new(Collaborators::cargo(
//!     Arc::new(DiscoveredSettings::default()),
//!     store.clone(),
//! ));
//!
//! // Fire and forget from the host's save hook...
//! let handle = orchestrator.on_post_save(Path::new("src/lib.rs"), WindowContext::headless(1));
//!
//! // ...or wait for the report.
//! if let Some(handle) = handle {
//!     let report = handle.join().expect("check worker");
//!     println!("{:?}: {} diagnostics", report.outcome, store.all_diagnostics(report.window).len());
//! }
//! ```
//!
//! # Stable Public API
//!
//! - [`CheckOrchestrator`], [`CheckHandle`] and [`Collaborators`] - run control
//! - [`Config`] and [`ConfigBuilder`] - configuration management
//! - [`SaveCheckError`] - library error type
//! - [`ExitCode`] - CLI exit codes
//! - [`emit_jcs`] - JCS canonical JSON emission
//!
//! Internal modules are accessible via module paths but are marked `#[doc(hidden)]`
//! and are not covered by semver stability guarantees.

// ============================================================================
// Stable Public API - covered by semver guarantees for 1.x
// ============================================================================

pub use savecheck_engine::orchestrator::{
    CancellationToken, CheckHandle, CheckOrchestrator, Collaborators,
};

pub use savecheck_engine::types::{
    AbortReason, CheckOutcome, CheckReport, Invocation, Target, WindowId,
};

pub use savecheck_engine::window::{NoStatus, StatusIndicator, WindowContext};

pub use savecheck_engine::diagnostics::{Diagnostic, DiagnosticSink, DiagnosticStore, Level};

pub use savecheck_engine::settings::{DiscoveredSettings, FixedSettings, SettingsProvider};

/// Configuration for savecheck runs.
///
/// `Config` provides hierarchical configuration with discovery and precedence:
/// CLI arguments > config file > built-in defaults.
///
/// Use [`Config::discover_from()`] for per-file discovery or [`Config::builder()`]
/// for programmatic configuration in embedding scenarios.
pub use savecheck_config::Config;

/// Builder for programmatic configuration.
///
/// # Example
///
/// ```rust
/// use savecheck::{CheckMode, Config};
///
/// let config = Config::builder()
///     .mode(CheckMode::LintAll)
///     .toolchain("nightly")
///     .build()
///     .expect("valid config");
/// assert_eq!(config.mode(), CheckMode::LintAll);
/// ```
pub use savecheck_config::ConfigBuilder;

pub use savecheck_config::{CheckMode, CliArgs};

/// Library-level error type with user-facing reporting.
///
/// Library code returns `SaveCheckError` and does NOT call `std::process::exit()`.
pub use savecheck_utils::error::SaveCheckError;

/// Error categories for grouping similar errors.
pub use savecheck_utils::error::ErrorCategory;

/// Trait for providing user-friendly error reporting.
pub use savecheck_utils::error::UserFriendlyError;

/// Exit codes matching the documented exit code table.
///
/// The numeric values are part of the public API and will not change in 1.x
/// releases.
pub use savecheck_utils::exit_codes::ExitCode;

pub mod json;

/// JCS (RFC 8785) canonical JSON emission for CLI output.
pub use json::emit_jcs;

// ============================================================================
// Internal modules - accessible but not stable
// ============================================================================

#[doc(hidden)]
pub use savecheck_utils::{error, exit_codes, logging, paths, version};

#[doc(hidden)]
pub use savecheck_config as config;

#[doc(hidden)]
pub use savecheck_engine::{command, diagnostics, manifest, orchestrator, settings, targets};

#[cfg(any(test, feature = "test-utils"))]
#[doc(hidden)]
pub use savecheck_engine::test_support;

// CLI module - exported with #[doc(hidden)] to allow white-box testing of
// flag parsing; embedders should use CheckOrchestrator.
#[doc(hidden)]
pub mod cli;
