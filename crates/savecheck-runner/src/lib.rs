//! Process execution for toolchain invocations
//!
//! Spawns one external process at a time, streams its stdout/stderr to a
//! [`ProcessListener`] line by line, and supports forced termination from
//! another thread while the owning thread is blocked in `wait`.
//!
//! # Security Model
//!
//! All process execution goes through [`CommandSpec`] to ensure argv-style
//! invocation. Arguments are passed as discrete elements rather than shell
//! strings.

pub mod command_spec;
pub mod error;
pub mod listener;
pub mod native;
pub mod process;

pub use command_spec::CommandSpec;
pub use error::RunnerError;
pub use listener::{ExitKind, ProcessInfo, ProcessListener};
pub use native::NativeRunner;
pub use process::{ProcessExit, ProcessHandle, ProcessRunner};
