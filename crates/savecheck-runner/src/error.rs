//! Error types for the runner crate

use thiserror::Error;

/// Process execution errors.
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Failed to spawn '{program}': {reason}")]
    SpawnFailed { program: String, reason: String },

    #[error("Failed to wait for '{program}': {reason}")]
    WaitFailed { program: String, reason: String },

    /// The process was killed through [`ProcessHandle::terminate`](crate::ProcessHandle::terminate).
    ///
    /// Callers treat this as cancellation rather than a tool failure.
    #[error("Process '{program}' was terminated")]
    Terminated { program: String },
}

impl RunnerError {
    /// Whether this error represents a deliberate termination.
    #[must_use]
    pub const fn is_terminated(&self) -> bool {
        matches!(self, Self::Terminated { .. })
    }
}
