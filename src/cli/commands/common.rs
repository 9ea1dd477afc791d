//! Helpers shared by CLI commands.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::{StatusIndicator, WindowId, paths};

/// The CLI checks one file at a time in a single pseudo-window.
pub const CLI_WINDOW: WindowId = WindowId::new(1);

/// Absolute form of a path given on the command line.
pub fn absolute_file(file: &Path) -> Result<PathBuf> {
    paths::absolutize(file).with_context(|| format!("Failed to resolve path: {}", file.display()))
}

/// `path` relative to the current directory when it lies below it.
pub fn display_path(path: &Path) -> String {
    std::env::current_dir()
        .ok()
        .and_then(|cwd| path.strip_prefix(cwd).ok().map(Path::to_path_buf))
        .unwrap_or_else(|| path.to_path_buf())
        .display()
        .to_string()
}

/// Status indicator that reports through the log.
#[derive(Debug, Default)]
pub struct LogStatus;

impl StatusIndicator for LogStatus {
    fn set_status(&self, key: &str, text: &str) {
        tracing::debug!(key, "{text}");
    }

    fn erase_status(&self, key: &str) {
        tracing::trace!(key, "status cleared");
    }
}
