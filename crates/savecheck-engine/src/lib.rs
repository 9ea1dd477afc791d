//! On-save check orchestration for cargo projects.
//!
//! The engine drives `cargo` across the build targets that may compile a
//! saved file, collects the JSON diagnostics it prints and routes them to a
//! [`DiagnosticSink`] keyed by window and file. Host UI objects sit behind
//! [`StatusIndicator`] and [`DiagnosticSink`].

// Re-export shared crates to keep `crate::` paths short in engine modules.
pub use savecheck_config as config;

pub use savecheck_utils::error;
pub use savecheck_utils::exit_codes;
pub use savecheck_utils::logging;
pub use savecheck_utils::paths;
pub use savecheck_utils::version;

pub mod command;
pub mod diagnostics;
pub mod manifest;
pub mod orchestrator;
pub mod settings;
pub mod targets;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_support;
pub mod types;
pub mod window;

pub use command::{CargoCommandBuilder, CommandBuilder, CommandRequest};
pub use diagnostics::{Diagnostic, DiagnosticEvent, DiagnosticSink, DiagnosticStore, Level};
pub use manifest::{CargoManifestLocator, ManifestLocator};
pub use orchestrator::{
    CancellationToken, CheckHandle, CheckOrchestrator, Collaborators, TEST_PROFILE_MIN_RUSTC,
    augment_invocation,
};
pub use settings::{DiscoveredSettings, FixedSettings, SettingsProvider};
pub use targets::{CargoTargetResolver, TargetResolver};
pub use types::{AbortReason, CheckOutcome, CheckReport, Invocation, Target, WindowId};
pub use window::{NoStatus, StatusIndicator, WindowContext};
