//! One check run, executed on its own worker thread.

use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use super::Collaborators;
use super::cancel::{CancellationToken, CompletionLatch, RunCompletion};
use super::listener::{ListenerContext, RunState, process_listener};
use super::status::StatusGuard;
use crate::command::CommandRequest;
use crate::config::{CheckMode, Config};
use crate::logging;
use crate::types::{AbortReason, CheckOutcome, CheckReport, Invocation, Target, WindowId};
use crate::version;
use crate::window::WindowContext;

/// Oldest toolchain whose `cargo check` accepts `--profile=test`.
pub const TEST_PROFILE_MIN_RUSTC: &str = ">=1.23.0";

/// Flags `legacy-unstable` always passes to rustc.
pub const NO_CODEGEN_FLAGS: [&str; 2] = ["-Zno-codegen", "-Zunstable-options"];

/// Add the mode- and version-gated flags to a freshly built invocation.
///
/// | mode | added |
/// |------|-------|
/// | `check` | `--profile=test` when `include_tests` and rustc satisfies [`TEST_PROFILE_MIN_RUSTC`] |
/// | `legacy-unstable` | `-- -Zno-codegen -Zunstable-options`, then `--test` when `include_tests` unless the target is a test or bench |
/// | `lint-all` | nothing |
#[must_use]
pub fn augment_invocation(
    mut invocation: Invocation,
    mode: CheckMode,
    include_tests: bool,
    target: Option<&Target>,
) -> Invocation {
    match mode {
        CheckMode::Check => {
            if include_tests
                && version::satisfies(&invocation.toolchain_version, TEST_PROFILE_MIN_RUSTC)
            {
                invocation.command.push_driver_arg("--profile=test");
            }
        }
        CheckMode::LegacyUnstable => {
            invocation.command.push_passthrough_args(NO_CODEGEN_FLAGS);
            if include_tests && !target.is_some_and(Target::is_harness_target) {
                invocation.command.push_passthrough_args(["--test"]);
            }
        }
        CheckMode::LintAll => {}
    }
    invocation
}

/// Everything a worker needs to execute a run.
pub(crate) struct RunRequest {
    pub file: PathBuf,
    pub window: WindowContext,
    /// Snapshot taken by the caller; loaded by the worker when absent.
    pub config: Option<Config>,
    pub token: CancellationToken,
    /// Superseded run to wait out before touching the window.
    pub predecessor: Option<CompletionLatch>,
    pub completion: RunCompletion,
}

enum Stop {
    Cancelled,
    Tool(String),
}

struct CheckRun<'a> {
    collab: &'a Collaborators,
    file: PathBuf,
    window: WindowId,
    token: CancellationToken,
    state: Arc<RunState>,
    targets_run: Vec<PathBuf>,
    stopped_early: bool,
}

/// Execute a run to completion on the calling thread.
pub(crate) fn execute(collab: &Collaborators, request: RunRequest) -> CheckReport {
    let RunRequest {
        file,
        window,
        config,
        token,
        predecessor,
        completion,
    } = request;
    let _completion = completion;

    let started_at = Utc::now();
    let clock = Instant::now();

    if let Some(latch) = predecessor {
        tracing::debug!(window = %window.id, "waiting for superseded check to stop");
        latch.wait();
    }

    let not_started = |file: PathBuf, mode: CheckMode, reason: AbortReason| CheckReport {
        window: window.id,
        file,
        mode,
        outcome: CheckOutcome::Aborted(reason),
        targets_run: Vec::new(),
        stopped_early: false,
        started_at,
        duration: clock.elapsed(),
    };

    // Superseded while waiting: never show status.
    if token.is_cancelled() {
        tracing::debug!(window = %window.id, "check cancelled before it started");
        let mode = config.as_ref().map_or_else(CheckMode::default, Config::mode);
        return not_started(file, mode, AbortReason::Cancelled);
    }

    let _status = StatusGuard::show(Arc::clone(&window.status));

    let config = match config.map_or_else(|| collab.settings.load(&file), Ok) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(file = %file.display(), error = %e, "could not load settings");
            let reason = AbortReason::InvalidConfig(e.to_string());
            return not_started(file, CheckMode::default(), reason);
        }
    };
    let mode = config.mode();

    let file_display = file.display().to_string();
    let span = logging::check_span(&window.id.to_string(), &file_display, mode.as_str());
    let _entered = span.enter();
    logging::log_check_start(&file_display, mode.as_str());

    let mut run = CheckRun {
        collab,
        file,
        window: window.id,
        token,
        state: Arc::new(RunState::default()),
        targets_run: Vec::new(),
        stopped_early: false,
    };
    let outcome = run.drive(&config, mode);

    let duration = clock.elapsed();
    match &outcome {
        CheckOutcome::Completed => logging::log_check_complete(
            &file_display,
            run.targets_run.len(),
            run.stopped_early,
            duration.as_millis(),
        ),
        CheckOutcome::Aborted(reason) => {
            tracing::info!(reason = %reason, targets_run = run.targets_run.len(), "On-save check aborted");
        }
    }

    CheckReport {
        window: run.window,
        file: run.file,
        mode,
        outcome,
        targets_run: run.targets_run,
        stopped_early: run.stopped_early,
        started_at,
        duration,
    }
}

impl CheckRun<'_> {
    fn drive(&mut self, config: &Config, mode: CheckMode) -> CheckOutcome {
        if self.token.is_cancelled() {
            return CheckOutcome::Aborted(AbortReason::Cancelled);
        }

        let Some(manifest_dir) = self.collab.manifests.locate(&self.file) else {
            tracing::info!(
                file = %self.file.display(),
                "skipping on-save check: no Cargo.toml found above the file"
            );
            return CheckOutcome::Aborted(AbortReason::NoManifest);
        };

        self.collab.sink.clear(self.window);

        let result = if mode.uses_targets() {
            self.check_targets(config, mode, &manifest_dir)
        } else {
            self.lint_package(config, &manifest_dir)
        };

        match result {
            Ok(()) => {
                self.collab.sink.finalize(self.window);
                CheckOutcome::Completed
            }
            Err(Stop::Cancelled) => CheckOutcome::Aborted(AbortReason::Cancelled),
            Err(Stop::Tool(reason)) => {
                tracing::error!(error = %reason, "toolchain failed");
                CheckOutcome::Aborted(AbortReason::ToolError(reason))
            }
        }
    }

    fn lint_package(&mut self, config: &Config, manifest_dir: &Path) -> Result<(), Stop> {
        let invocation = self.build(config, CheckMode::LintAll, manifest_dir, &[])?;
        self.run_invocation(&invocation, manifest_dir.to_path_buf(), None)
    }

    fn check_targets(
        &mut self,
        config: &Config,
        mode: CheckMode,
        manifest_dir: &Path,
    ) -> Result<(), Stop> {
        let targets = self
            .collab
            .targets
            .resolve_targets(manifest_dir, &self.file, config)
            .map_err(|e| Stop::Tool(e.to_string()))?;
        tracing::debug!(count = targets.len(), "resolved targets");

        for (index, target) in targets.iter().enumerate() {
            if self.token.is_cancelled() {
                return Err(Stop::Cancelled);
            }

            let span = logging::target_span(&target.to_string());
            let _entered = span.enter();

            let invocation = self.build(config, mode, manifest_dir, &target.args)?;
            let invocation = augment_invocation(invocation, mode, config.include_tests(), Some(target));
            self.run_invocation(&invocation, target.src_path.clone(), Some(target))?;

            if self.state.found() {
                let remaining = targets.len() - index - 1;
                if remaining > 0 {
                    tracing::debug!(remaining, "saved file has diagnostics, skipping remaining targets");
                    self.stopped_early = true;
                }
                break;
            }
        }
        Ok(())
    }

    fn build(
        &self,
        config: &Config,
        mode: CheckMode,
        manifest_dir: &Path,
        target_args: &[String],
    ) -> Result<Invocation, Stop> {
        self.collab
            .commands
            .build(&CommandRequest {
                mode,
                manifest_dir,
                target_args,
                config,
            })
            .map_err(|e| Stop::Tool(e.to_string()))
    }

    fn run_invocation(
        &mut self,
        invocation: &Invocation,
        ran: PathBuf,
        target: Option<&Target>,
    ) -> Result<(), Stop> {
        let listener = process_listener(ListenerContext {
            sink: Arc::clone(&self.collab.sink),
            window: self.window,
            file: self.file.clone(),
            path_rewrite_base: invocation.path_rewrite_base.clone(),
            target: target.map(|t| t.src_path.clone()),
            state: Arc::clone(&self.state),
        });

        tracing::debug!(command = %invocation.command.display(), "running toolchain");
        let handle = self
            .collab
            .runner
            .spawn(&invocation.command, Arc::new(listener))
            .map_err(|e| Stop::Tool(e.to_string()))?;
        self.targets_run.push(ran);

        self.token.attach(Arc::clone(&handle));
        let result = handle.wait();
        self.token.detach();

        match result {
            Ok(_) if self.token.is_cancelled() => Err(Stop::Cancelled),
            Ok(exit) => {
                if !exit.success() {
                    tracing::debug!(exit_code = ?exit.exit_code, "toolchain exited with failure");
                }
                Ok(())
            }
            Err(e) if e.is_terminated() || self.token.is_cancelled() => Err(Stop::Cancelled),
            Err(e) => Err(Stop::Tool(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use savecheck_runner::CommandSpec;

    fn invocation(version: &str, args: &[&str]) -> Invocation {
        Invocation {
            command: CommandSpec::new("cargo").args(args.iter().copied()),
            toolchain_version: version.to_string(),
            path_rewrite_base: PathBuf::from("/p"),
        }
    }

    fn rendered(inv: &Invocation) -> String {
        inv.command.display()
    }

    #[test]
    fn test_check_adds_test_profile_when_supported() {
        let inv = augment_invocation(
            invocation("1.75.0", &["check", "--lib"]),
            CheckMode::Check,
            true,
            None,
        );
        assert_eq!(rendered(&inv), "cargo check --lib --profile=test");
    }

    #[test]
    fn test_check_skips_test_profile_on_old_or_unknown_rustc() {
        for version in ["1.22.1", "unknown"] {
            let inv = augment_invocation(
                invocation(version, &["check", "--lib"]),
                CheckMode::Check,
                true,
                None,
            );
            assert_eq!(rendered(&inv), "cargo check --lib", "version {version}");
        }
    }

    #[test]
    fn test_check_without_include_tests_is_unchanged() {
        let inv = augment_invocation(
            invocation("1.80.0", &["check"]),
            CheckMode::Check,
            false,
            None,
        );
        assert_eq!(rendered(&inv), "cargo check");
    }

    #[test]
    fn test_legacy_adds_no_codegen_and_test_harness() {
        let lib = Target::new("/p/src/lib.rs", vec!["--lib".into()]);
        let inv = augment_invocation(
            invocation("1.20.0", &["rustc", "--lib"]),
            CheckMode::LegacyUnstable,
            true,
            Some(&lib),
        );
        assert_eq!(
            rendered(&inv),
            "cargo rustc --lib -- -Zno-codegen -Zunstable-options --test"
        );
    }

    #[test]
    fn test_legacy_never_adds_test_for_harness_targets() {
        let it = Target::new("/p/tests/it.rs", vec!["--test".into(), "it".into()]);
        let inv = augment_invocation(
            invocation("1.20.0", &["rustc", "--test", "it"]),
            CheckMode::LegacyUnstable,
            true,
            Some(&it),
        );
        assert_eq!(
            rendered(&inv),
            "cargo rustc --test it -- -Zno-codegen -Zunstable-options"
        );
    }

    #[test]
    fn test_lint_all_is_never_augmented() {
        let inv = augment_invocation(
            invocation("1.80.0", &["clippy"]),
            CheckMode::LintAll,
            true,
            None,
        );
        assert_eq!(rendered(&inv), "cargo clippy");
    }
}
