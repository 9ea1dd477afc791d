//! Diagnostic aggregation per window.

mod message;
mod store;

pub use message::{Child, Diagnostic, Level, Region, parse_record};
pub use store::DiagnosticStore;

use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::types::WindowId;

/// A structured toolchain record plus where it came from.
#[derive(Debug, Clone)]
pub struct DiagnosticEvent {
    /// The JSON object exactly as the toolchain printed it.
    pub record: Value,
    /// Base for relative span paths.
    pub path_rewrite_base: PathBuf,
    /// Root source of the target being checked, if any.
    pub target: Option<PathBuf>,
}

/// Receives diagnostics for a window and answers whether a file has any.
///
/// Called from runner reader threads as well as the check worker, so every
/// method takes `&self`.
pub trait DiagnosticSink: Send + Sync {
    /// Drop everything recorded for the window.
    fn clear(&self, window: WindowId);

    fn add_diagnostic(&self, window: WindowId, event: DiagnosticEvent);

    /// Whether at least one diagnostic for the window is located in `file`.
    fn has_diagnostic_for(&self, window: WindowId, file: &Path) -> bool;

    /// Mark the window's diagnostics complete for presentation.
    fn finalize(&self, window: WindowId);
}
