//! Host window capabilities the orchestrator needs.

use std::fmt;
use std::sync::Arc;

use crate::types::WindowId;

/// Status-bar key owned by on-save checks.
pub const STATUS_KEY: &str = "savecheck";

/// Text shown while a check runs.
pub const STATUS_RUNNING: &str = "Rust check running...";

/// Keyed status messages, e.g. an editor status bar.
pub trait StatusIndicator: Send + Sync {
    fn set_status(&self, key: &str, text: &str);
    fn erase_status(&self, key: &str);
}

/// Status sink for hosts without a status bar.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoStatus;

impl StatusIndicator for NoStatus {
    fn set_status(&self, _key: &str, _text: &str) {}
    fn erase_status(&self, _key: &str) {}
}

/// The window a check reports into.
#[derive(Clone)]
pub struct WindowContext {
    pub id: WindowId,
    pub status: Arc<dyn StatusIndicator>,
}

impl WindowContext {
    pub fn new(id: impl Into<WindowId>, status: Arc<dyn StatusIndicator>) -> Self {
        Self {
            id: id.into(),
            status,
        }
    }

    /// Window with no status indicator.
    pub fn headless(id: impl Into<WindowId>) -> Self {
        Self::new(id, Arc::new(NoStatus))
    }
}

impl fmt::Debug for WindowContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WindowContext").field("id", &self.id).finish_non_exhaustive()
    }
}
