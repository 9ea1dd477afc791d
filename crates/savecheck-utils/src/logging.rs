//! Logging setup and structured log helpers
//!
//! savecheck logs through `tracing`. Binaries call [`init_tracing`] once;
//! library code only emits events and spans. Toolchain stderr, the
//! "no manifest" notice and run outcomes all go through here, which is the
//! console sink an editor host would otherwise print to.

use std::io::IsTerminal;
use tracing::{Level, info, span};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Check if colored output should be used.
///
/// Returns true only if stderr is a terminal and `NO_COLOR` is not set.
fn use_color() -> bool {
    std::io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none()
}

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` wins when set. Otherwise verbose mode enables debug output for
/// the savecheck crates and records span close events with timings.
///
/// # Errors
///
/// Fails if a global subscriber has already been installed.
pub fn init_tracing(verbose: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            if verbose {
                EnvFilter::try_new("savecheck=debug,savecheck_engine=debug,savecheck_runner=debug,info")
            } else {
                EnvFilter::try_new("warn,savecheck=info,savecheck_engine=info")
            }
        })
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if verbose {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(use_color())
                    .with_target(true)
                    .with_thread_names(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(use_color())
                    .with_target(false)
                    .without_time()
                    .compact(),
            )
            .try_init()?;
    }

    Ok(())
}

/// Span wrapping one check run.
pub fn check_span(window: &str, file: &str, mode: &str) -> tracing::Span {
    span!(
        Level::INFO,
        "check_run",
        window = %window,
        file = %file,
        mode = %mode,
    )
}

/// Span wrapping one target's toolchain process.
pub fn target_span(target: &str) -> tracing::Span {
    span!(Level::DEBUG, "check_target", target = %target)
}

pub fn log_check_start(file: &str, mode: &str) {
    info!(file = %file, mode = %mode, "Starting on-save check");
}

pub fn log_check_complete(file: &str, targets_run: usize, stopped_early: bool, duration_ms: u128) {
    info!(
        file = %file,
        targets_run,
        stopped_early,
        duration_ms = %duration_ms,
        "On-save check completed"
    );
}
