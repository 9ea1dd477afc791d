use crate::error::RunnerError;
use std::sync::Arc;

use super::{CommandSpec, ProcessListener};

// ============================================================================
// ProcessRunner Trait - streaming process execution
// ============================================================================

/// Result of a process that ran to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessExit {
    /// Exit code from the process (None if killed by a foreign signal)
    pub exit_code: Option<i32>,
}

impl ProcessExit {
    #[must_use]
    pub const fn new(exit_code: Option<i32>) -> Self {
        Self { exit_code }
    }

    /// Check if the process exited successfully (exit code 0).
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// A spawned process.
///
/// `wait` is called by the thread that owns the run; `terminate` may be called
/// concurrently from any other thread while `wait` is blocked. Both take
/// `&self` so one handle can be shared through an `Arc`.
pub trait ProcessHandle: Send + Sync {
    /// Block until the process has exited and all of its output has been
    /// delivered to the listener.
    ///
    /// # Errors
    ///
    /// * `RunnerError::Terminated` - the process was killed via [`terminate`](Self::terminate)
    /// * `RunnerError::WaitFailed` - the OS wait call failed
    fn wait(&self) -> Result<ProcessExit, RunnerError>;

    /// Request forced termination. Idempotent; returns immediately.
    fn terminate(&self);

    /// OS process id, if any.
    fn pid(&self) -> Option<u32>;
}

/// Trait for spawning toolchain processes.
///
/// Implementations MUST use argv-style APIs only (no shell string
/// evaluation) and MUST deliver every stdout/stderr line to the listener
/// before [`ProcessHandle::wait`] returns. The orchestrator relies on the
/// latter to keep diagnostics of consecutive targets strictly ordered.
///
/// # Example
///
/// ```rust
/// use savecheck_runner::{
///     CommandSpec, ProcessExit, ProcessHandle, ProcessListener, ProcessRunner, RunnerError,
/// };
/// use std::sync::Arc;
///
/// struct Finished;
///
/// impl ProcessHandle for Finished {
///     fn wait(&self) -> Result<ProcessExit, RunnerError> {
///         Ok(ProcessExit::new(Some(0)))
///     }
///     fn terminate(&self) {}
///     fn pid(&self) -> Option<u32> {
///         None
///     }
/// }
///
/// struct NullRunner;
///
/// impl ProcessRunner for NullRunner {
///     fn spawn(
///         &self,
///         _cmd: &CommandSpec,
///         _listener: Arc<ProcessListener>,
///     ) -> Result<Arc<dyn ProcessHandle>, RunnerError> {
///         Ok(Arc::new(Finished))
///     }
/// }
///
/// let handle = NullRunner
///     .spawn(&CommandSpec::new("cargo"), Arc::new(ProcessListener::new()))
///     .unwrap();
/// assert!(handle.wait().unwrap().success());
/// ```
pub trait ProcessRunner: Send + Sync {
    /// Spawn `cmd`, streaming its events to `listener`.
    ///
    /// # Errors
    ///
    /// Returns `RunnerError::SpawnFailed` if the process could not be started.
    fn spawn(
        &self,
        cmd: &CommandSpec,
        listener: Arc<ProcessListener>,
    ) -> Result<Arc<dyn ProcessHandle>, RunnerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_exit_success() {
        assert!(ProcessExit::new(Some(0)).success());
        // cargo exits with 101 when compilation fails
        assert!(!ProcessExit::new(Some(101)).success());
        assert!(!ProcessExit::new(None).success());
    }

    #[test]
    fn test_runner_error_is_terminated() {
        let err = RunnerError::Terminated {
            program: "cargo".to_string(),
        };
        assert!(err.is_terminated());

        let err = RunnerError::SpawnFailed {
            program: "cargo".to_string(),
            reason: "not found".to_string(),
        };
        assert!(!err.is_terminated());
        assert_eq!(err.to_string(), "Failed to spawn 'cargo': not found");
    }
}
