//! Check command implementation
//!
//! Handles `savecheck check <FILE>`: runs one on-save check to completion
//! against the real cargo toolchain and prints what it found.

use anyhow::{Context, Result};
use camino::Utf8Path;
use serde::Serialize;
use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

use super::common::{CLI_WINDOW, LogStatus, absolute_file, display_path};

use crate::diagnostics::{Child, Region};
use crate::{
    AbortReason, CheckOrchestrator, CheckOutcome, CheckReport, CliArgs, Collaborators, Diagnostic,
    DiagnosticStore, DiscoveredSettings, ExitCode, FixedSettings, Level, SettingsProvider,
    WindowContext, emit_jcs,
};

#[derive(Serialize)]
struct CheckOutput<'a> {
    report: &'a CheckReport,
    finalized: bool,
    diagnostics: &'a [Diagnostic],
}

/// Execute the check command and return the exit code for its outcome.
pub fn execute_check_command(file: &Path, json: bool, cli_args: &CliArgs) -> Result<ExitCode> {
    let file = absolute_file(file)?;

    // Load settings up front so configuration problems exit as such.
    let config = DiscoveredSettings::new(cli_args.clone()).load(&file)?;

    let store = Arc::new(DiagnosticStore::new());
    let orchestrator = CheckOrchestrator::new(Collaborators::cargo(
        Arc::new(FixedSettings(config)),
        store.clone(),
    ));

    let report = orchestrator
        .start_check(&file, WindowContext::new(CLI_WINDOW, Arc::new(LogStatus)))
        .join()?;

    let finalized = store.is_finalized(report.window);
    let diagnostics = if finalized {
        store.all_diagnostics(report.window)
    } else {
        Vec::new()
    };
    let errors = diagnostics.iter().filter(|d| d.level == Level::Error).count();

    if json {
        let output = CheckOutput {
            report: &report,
            finalized,
            diagnostics: &diagnostics,
        };
        println!("{}", emit_jcs(&output).context("Failed to emit check JSON")?);
    } else {
        for diagnostic in &diagnostics {
            print!("{}", render_diagnostic(diagnostic));
        }
        eprintln!("{}", summary_line(&report, &diagnostics));
    }

    Ok(exit_code_for_report(&report, errors))
}

/// Exit code for a finished run.
///
/// ```rust
/// use savecheck::cli::exit_code_for_report;
/// # use savecheck::{CheckMode, CheckOutcome, CheckReport, WindowId};
/// # let report = CheckReport {
/// #     window: WindowId::new(1),
/// #     file: "/p/src/lib.rs".into(),
/// #     mode: CheckMode::Check,
/// #     outcome: CheckOutcome::Completed,
/// #     targets_run: vec![],
/// #     stopped_early: false,
/// #     started_at: Default::default(),
/// #     duration: Default::default(),
/// # };
/// assert_eq!(exit_code_for_report(&report, 0).as_i32(), 0);
/// assert_eq!(exit_code_for_report(&report, 2).as_i32(), 5);
/// ```
#[must_use]
pub fn exit_code_for_report(report: &CheckReport, error_count: usize) -> ExitCode {
    match &report.outcome {
        CheckOutcome::Completed if error_count > 0 => ExitCode::DIAGNOSTIC_ERRORS,
        CheckOutcome::Completed => ExitCode::SUCCESS,
        CheckOutcome::Aborted(AbortReason::NoManifest) => ExitCode::NO_MANIFEST,
        CheckOutcome::Aborted(AbortReason::InvalidConfig(_)) => ExitCode::CLI_ARGS,
        CheckOutcome::Aborted(AbortReason::Cancelled) => ExitCode::CANCELLED,
        CheckOutcome::Aborted(AbortReason::ToolError(_)) => ExitCode::TOOL_FAILURE,
    }
}

fn location(file: Option<&Utf8Path>, region: Option<&Region>) -> String {
    match (file, region) {
        (Some(file), Some(r)) => format!(
            "{}:{}:{}: ",
            display_path(file.as_std_path()),
            r.line_start,
            r.column_start
        ),
        (Some(file), None) => format!("{}: ", display_path(file.as_std_path())),
        (None, _) => String::new(),
    }
}

fn render_diagnostic(d: &Diagnostic) -> String {
    let mut out = location(d.file.as_deref(), d.region.as_ref());
    out.push_str(d.level.as_str());
    if let Some(code) = &d.code {
        let _ = write!(out, "[{code}]");
    }
    let _ = writeln!(out, ": {}", d.message);
    for child in &d.children {
        out.push_str(&render_child(child));
    }
    out
}

fn render_child(child: &Child) -> String {
    let mut line = format!("  = {}: {}", child.level.as_str(), child.message);
    if let Some(suggestion) = &child.suggestion {
        let _ = write!(line, " `{suggestion}`");
    }
    if child.file.is_some() {
        let _ = write!(
            line,
            " ({})",
            location(child.file.as_deref(), child.region.as_ref()).trim_end_matches([':', ' '])
        );
    }
    line.push('\n');
    line
}

fn summary_line(report: &CheckReport, diagnostics: &[Diagnostic]) -> String {
    let count = |level| diagnostics.iter().filter(|d| d.level == level).count();
    match &report.outcome {
        CheckOutcome::Completed => {
            let mut line = format!(
                "✓ {} ({}): {} target(s) checked, {} error(s), {} warning(s)",
                display_path(&report.file),
                report.mode,
                report.targets_run.len(),
                count(Level::Error),
                count(Level::Warning),
            );
            if report.stopped_early {
                line.push_str(", stopped early");
            }
            line
        }
        CheckOutcome::Aborted(reason) => {
            format!("✗ {} ({}): {reason}", display_path(&report.file), report.mode)
        }
    }
}
