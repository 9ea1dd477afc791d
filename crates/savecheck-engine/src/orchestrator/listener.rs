use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use savecheck_runner::{ExitKind, ProcessListener};

use crate::diagnostics::{DiagnosticEvent, DiagnosticSink};
use crate::types::WindowId;

/// State shared between a run's worker and its process listeners.
#[derive(Debug, Default)]
pub(crate) struct RunState {
    found: AtomicBool,
}

impl RunState {
    /// A diagnostic has been recorded for the saved file.
    pub(crate) fn found(&self) -> bool {
        self.found.load(Ordering::SeqCst)
    }

    fn mark_found(&self) {
        if !self.found.swap(true, Ordering::SeqCst) {
            tracing::debug!("diagnostic found for saved file");
        }
    }
}

/// Where diagnostics from one process go.
pub(crate) struct ListenerContext {
    pub sink: Arc<dyn DiagnosticSink>,
    pub window: WindowId,
    pub file: PathBuf,
    pub path_rewrite_base: PathBuf,
    pub target: Option<PathBuf>,
    pub state: Arc<RunState>,
}

/// Listener for one target's process.
///
/// JSON records go to the sink tagged with the base and target; after each
/// one the found flag is updated, so it can flip while the process is still
/// running. stderr is logged, everything else is trace-only.
pub(crate) fn process_listener(ctx: ListenerContext) -> ProcessListener {
    ProcessListener::new()
        .on_begin(|info| tracing::trace!(process = %info, "toolchain started"))
        .on_data(|info, line| tracing::trace!(process = %info, line, "toolchain output"))
        .on_error(|info, message| tracing::warn!(process = %info, "{message}"))
        .on_diagnostic(move |_info, record| {
            ctx.sink.add_diagnostic(
                ctx.window,
                DiagnosticEvent {
                    record,
                    path_rewrite_base: ctx.path_rewrite_base.clone(),
                    target: ctx.target.clone(),
                },
            );
            if ctx.sink.has_diagnostic_for(ctx.window, &ctx.file) {
                ctx.state.mark_found();
            }
        })
        .on_exit(|info, kind| match kind {
            ExitKind::Finished(code) => tracing::trace!(process = %info, ?code, "toolchain exited"),
            ExitKind::Terminated => tracing::trace!(process = %info, "toolchain terminated"),
        })
}
