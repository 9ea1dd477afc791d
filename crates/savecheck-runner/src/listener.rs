//! Lifecycle callbacks delivered while a process runs.
//!
//! A [`ProcessListener`] is a plain bundle of five independent handlers. The
//! runner invokes them from whatever thread it reads the process output on, so
//! every handler is `Send + Sync`. Unset handlers are no-ops.

use serde_json::Value;
use std::fmt;

/// Identity of the process an event belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInfo {
    /// OS process id, if the runner spawned a real process
    pub pid: Option<u32>,
    /// Program name, for log context
    pub program: String,
}

impl ProcessInfo {
    #[must_use]
    pub fn new(pid: Option<u32>, program: impl Into<String>) -> Self {
        Self {
            pid,
            program: program.into(),
        }
    }
}

impl fmt::Display for ProcessInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.pid {
            Some(pid) => write!(f, "{} (pid {pid})", self.program),
            None => write!(f, "{}", self.program),
        }
    }
}

/// How a process ended, as reported to [`ProcessListener::on_exit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitKind {
    /// The process exited on its own. `None` when killed by a foreign signal.
    Finished(Option<i32>),
    /// The process was killed through its handle.
    Terminated,
}

type BeginFn = Box<dyn Fn(&ProcessInfo) + Send + Sync>;
type TextFn = Box<dyn Fn(&ProcessInfo, &str) + Send + Sync>;
type JsonFn = Box<dyn Fn(&ProcessInfo, Value) + Send + Sync>;
type ExitFn = Box<dyn Fn(&ProcessInfo, ExitKind) + Send + Sync>;

/// Handlers for the events of one process run.
///
/// ```rust
/// use savecheck_runner::ProcessListener;
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// let seen = Arc::new(AtomicUsize::new(0));
/// let counter = Arc::clone(&seen);
/// let listener = ProcessListener::new().on_diagnostic(move |_, _| {
///     counter.fetch_add(1, Ordering::SeqCst);
/// });
/// # let _ = listener;
/// ```
#[derive(Default)]
pub struct ProcessListener {
    begin: Option<BeginFn>,
    data: Option<TextFn>,
    error: Option<TextFn>,
    diagnostic: Option<JsonFn>,
    exit: Option<ExitFn>,
}

impl ProcessListener {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Called once the process has been spawned.
    #[must_use]
    pub fn on_begin(mut self, f: impl Fn(&ProcessInfo) + Send + Sync + 'static) -> Self {
        self.begin = Some(Box::new(f));
        self
    }

    /// Called for each stdout line that is not a JSON object.
    #[must_use]
    pub fn on_data(mut self, f: impl Fn(&ProcessInfo, &str) + Send + Sync + 'static) -> Self {
        self.data = Some(Box::new(f));
        self
    }

    /// Called for each stderr line.
    #[must_use]
    pub fn on_error(mut self, f: impl Fn(&ProcessInfo, &str) + Send + Sync + 'static) -> Self {
        self.error = Some(Box::new(f));
        self
    }

    /// Called for each stdout line that parses as a JSON object.
    #[must_use]
    pub fn on_diagnostic(
        mut self,
        f: impl Fn(&ProcessInfo, Value) + Send + Sync + 'static,
    ) -> Self {
        self.diagnostic = Some(Box::new(f));
        self
    }

    /// Called once when the process has finished or been terminated.
    #[must_use]
    pub fn on_exit(mut self, f: impl Fn(&ProcessInfo, ExitKind) + Send + Sync + 'static) -> Self {
        self.exit = Some(Box::new(f));
        self
    }

    pub fn begin(&self, info: &ProcessInfo) {
        if let Some(f) = &self.begin {
            f(info);
        }
    }

    pub fn data(&self, info: &ProcessInfo, line: &str) {
        if let Some(f) = &self.data {
            f(info, line);
        }
    }

    pub fn error(&self, info: &ProcessInfo, message: &str) {
        if let Some(f) = &self.error {
            f(info, message);
        }
    }

    pub fn diagnostic(&self, info: &ProcessInfo, event: Value) {
        if let Some(f) = &self.diagnostic {
            f(info, event);
        }
    }

    pub fn exit(&self, info: &ProcessInfo, kind: ExitKind) {
        if let Some(f) = &self.exit {
            f(info, kind);
        }
    }

    /// Route one stdout line to `on_diagnostic` or `on_data`.
    ///
    /// Only lines holding a JSON object count as structured records; cargo
    /// prints plain progress text on the same stream in some configurations.
    pub fn dispatch_stdout_line(&self, info: &ProcessInfo, line: &str) {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return;
        }
        if trimmed.starts_with('{') {
            if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(trimmed) {
                self.diagnostic(info, value);
                return;
            }
        }
        self.data(info, line);
    }
}

impl fmt::Debug for ProcessListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessListener")
            .field("begin", &self.begin.is_some())
            .field("data", &self.data.is_some())
            .field("error", &self.error.is_some())
            .field("diagnostic", &self.diagnostic.is_some())
            .field("exit", &self.exit.is_some())
            .finish()
    }
}
