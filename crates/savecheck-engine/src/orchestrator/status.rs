use std::sync::Arc;

use crate::window::{STATUS_KEY, STATUS_RUNNING, StatusIndicator};

/// Shows the "running" status for as long as it lives.
///
/// Dropped on every exit path of a run, unwinding included.
pub(crate) struct StatusGuard {
    status: Arc<dyn StatusIndicator>,
}

impl StatusGuard {
    pub(crate) fn show(status: Arc<dyn StatusIndicator>) -> Self {
        status.set_status(STATUS_KEY, STATUS_RUNNING);
        Self { status }
    }
}

impl Drop for StatusGuard {
    fn drop(&mut self) {
        self.status.erase_status(STATUS_KEY);
    }
}
