//! Exit code constants and error mapping for savecheck.
//!
//! # Exit Code Table
//!
//! | Code | Constant | Description |
//! |------|----------|-------------|
//! | 0 | `SUCCESS` | Check completed, no error-level diagnostics |
//! | 1 | `INTERNAL` | General/internal failure |
//! | 2 | `CLI_ARGS` | Invalid CLI arguments or configuration |
//! | 3 | `NO_MANIFEST` | Saved file is not inside a Cargo project |
//! | 4 | `CANCELLED` | Check was cancelled before completion |
//! | 5 | `DIAGNOSTIC_ERRORS` | Check completed and reported errors |
//! | 70 | `TOOL_FAILURE` | cargo could not be run |

use crate::error::SaveCheckError;

/// Process exit code for the `savecheck` binary.
///
/// ```rust
/// use savecheck_utils::exit_codes::ExitCode;
///
/// assert_eq!(ExitCode::SUCCESS.as_i32(), 0);
/// assert_eq!(ExitCode::TOOL_FAILURE, ExitCode::from_i32(70));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);

    pub const INTERNAL: ExitCode = ExitCode(1);

    pub const CLI_ARGS: ExitCode = ExitCode(2);

    pub const NO_MANIFEST: ExitCode = ExitCode(3);

    pub const CANCELLED: ExitCode = ExitCode(4);

    /// The check ran and the toolchain reported at least one error
    pub const DIAGNOSTIC_ERRORS: ExitCode = ExitCode(5);

    /// cargo (or rustc) could not be started or waited on
    pub const TOOL_FAILURE: ExitCode = ExitCode(70);

    /// Get the numeric exit code value for `std::process::exit()`.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    #[must_use]
    pub const fn from_i32(code: i32) -> Self {
        ExitCode(code)
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code.0
    }
}

pub(crate) fn exit_code_for(error: &SaveCheckError) -> ExitCode {
    if error.is_cancellation() {
        return ExitCode::CANCELLED;
    }
    match error {
        SaveCheckError::Config(_) => ExitCode::CLI_ARGS,
        SaveCheckError::ManifestNotFound { .. } => ExitCode::NO_MANIFEST,
        SaveCheckError::Runner(_) | SaveCheckError::TargetResolution { .. } => ExitCode::TOOL_FAILURE,
        SaveCheckError::Io(_) | SaveCheckError::WorkerPanicked { .. } => ExitCode::INTERNAL,
    }
}
