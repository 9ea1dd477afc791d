//! Orchestrator behaviour against scripted collaborators
//!
//! These tests drive full check runs without cargo: targets, command
//! construction and process output are all scripted, so each test pins one
//! property of the run loop (mode dispatch, early stop, version gating, ...).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use savecheck::config::{CheckMode, Config};
use savecheck::{
    AbortReason, CheckOrchestrator, CheckOutcome, Collaborators, DiagnosticStore, FixedSettings,
    WindowContext, WindowId,
};
use savecheck_engine::test_support::{
    FixedCommandBuilder, FixedManifest, ProcessScript, RecordingStatus, ScriptedRunner,
    StaticTargets, compiler_message,
};

const ROOT: &str = "/work/demo";
const WINDOW: WindowId = WindowId::new(7);

struct Harness {
    orchestrator: CheckOrchestrator,
    runner: Arc<ScriptedRunner>,
    store: Arc<DiagnosticStore>,
    status: Arc<RecordingStatus>,
}

impl Harness {
    fn new(config: Config, targets: StaticTargets, rustc: &str, scripts: Vec<ProcessScript>) -> Self {
        let runner = Arc::new(ScriptedRunner::new(scripts));
        let store = Arc::new(DiagnosticStore::new());
        let collab = Collaborators {
            settings: Arc::new(FixedSettings(config)),
            manifests: Arc::new(FixedManifest::at(ROOT)),
            targets: Arc::new(targets),
            commands: Arc::new(FixedCommandBuilder::new(rustc)),
            runner: runner.clone(),
            sink: store.clone(),
        };
        Self {
            orchestrator: CheckOrchestrator::new(collab),
            runner,
            store,
            status: Arc::new(RecordingStatus::default()),
        }
    }

    fn window(&self) -> WindowContext {
        WindowContext::new(WINDOW, self.status.clone())
    }

    fn check(&self, file: &str) -> savecheck::CheckReport {
        self.orchestrator
            .start_check(&src(file), self.window())
            .join()
            .expect("check worker")
    }
}

fn src(relative: &str) -> PathBuf {
    Path::new(ROOT).join(relative)
}

fn three_targets() -> StaticTargets {
    StaticTargets::new([
        ("/work/demo/src/lib.rs", &["--lib"][..]),
        ("/work/demo/src/main.rs", &["--bin", "demo"][..]),
        ("/work/demo/tests/it.rs", &["--test", "it"][..]),
    ])
}

fn warning_at(file: &str) -> ProcessScript {
    ProcessScript::success().json(&compiler_message("warning", "unused variable: `x`", file, 3))
}

#[test]
fn test_lint_all_runs_once_without_targets() {
    let h = Harness::new(
        Config::minimal_for_testing(CheckMode::LintAll, true),
        three_targets(),
        "1.80.0",
        vec![],
    );

    let report = h.check("src/main.rs");

    assert_eq!(report.outcome, CheckOutcome::Completed);
    assert_eq!(h.runner.spawned_lines(), ["cargo clippy --message-format=json"]);
    assert_eq!(report.targets_run, [PathBuf::from(ROOT)]);
    assert!(!report.stopped_early);
    assert_eq!(h.store.finalize_count(WINDOW), 1);
}

#[test]
fn test_early_stop_after_first_target_with_a_match() {
    let h = Harness::new(
        Config::minimal_for_testing(CheckMode::Check, false),
        three_targets(),
        "1.80.0",
        vec![warning_at("src/lib.rs")],
    );

    let report = h.check("src/lib.rs");

    assert_eq!(report.outcome, CheckOutcome::Completed);
    assert_eq!(
        h.runner.spawned_lines(),
        ["cargo check --message-format=json --lib"]
    );
    assert_eq!(report.targets_run, [src("src/lib.rs")]);
    assert!(report.stopped_early);
    assert_eq!(h.store.diagnostics_for(WINDOW, &src("src/lib.rs")).len(), 1);
    assert!(h.store.is_finalized(WINDOW));
}

#[test]
fn test_every_target_runs_in_order_without_a_match() {
    let h = Harness::new(
        Config::minimal_for_testing(CheckMode::Check, false),
        StaticTargets::new([
            ("/work/demo/src/lib.rs", &["--lib"][..]),
            ("/work/demo/src/main.rs", &["--bin", "demo"][..]),
        ]),
        "1.80.0",
        vec![warning_at("src/other.rs"), warning_at("src/main.rs")],
    );

    let report = h.check("src/util.rs");

    assert_eq!(report.outcome, CheckOutcome::Completed);
    assert_eq!(
        h.runner.spawned_lines(),
        [
            "cargo check --message-format=json --lib",
            "cargo check --message-format=json --bin demo",
        ]
    );
    assert!(!report.stopped_early);
    assert_eq!(h.store.all_diagnostics(WINDOW).len(), 2);
    assert_eq!(h.store.finalize_count(WINDOW), 1);
}

#[test]
fn test_match_on_last_target_is_not_an_early_stop() {
    let h = Harness::new(
        Config::minimal_for_testing(CheckMode::Check, false),
        StaticTargets::new([
            ("/work/demo/src/lib.rs", &["--lib"][..]),
            ("/work/demo/src/main.rs", &["--bin", "demo"][..]),
        ]),
        "1.80.0",
        vec![ProcessScript::success(), warning_at("src/main.rs")],
    );

    let report = h.check("src/main.rs");

    assert_eq!(report.targets_run.len(), 2);
    assert!(!report.stopped_early);
}

#[test]
fn test_test_profile_follows_rustc_version() {
    for (rustc, include_tests, expect_profile) in [
        ("1.23.0", true, true),
        ("1.75.0", true, true),
        ("1.22.1", true, false),
        ("unknown", true, false),
        ("1.75.0", false, false),
        ("1.22.1", false, false),
    ] {
        let h = Harness::new(
            Config::minimal_for_testing(CheckMode::Check, include_tests),
            StaticTargets::new([("/work/demo/src/lib.rs", &["--lib"][..])]),
            rustc,
            vec![],
        );
        h.check("src/lib.rs");

        let spawned = h.runner.spawned();
        assert_eq!(spawned.len(), 1);
        assert_eq!(
            spawned[0].has_arg("--profile=test"),
            expect_profile,
            "rustc {rustc}, include_tests {include_tests}"
        );
    }
}

#[test]
fn test_legacy_mode_adds_no_codegen_and_test_flags() {
    let h = Harness::new(
        Config::minimal_for_testing(CheckMode::LegacyUnstable, true),
        StaticTargets::new([
            ("/work/demo/src/lib.rs", &["--lib"][..]),
            ("/work/demo/tests/it.rs", &["--test", "it"][..]),
        ]),
        "1.10.0",
        vec![],
    );

    h.check("src/shared.rs");

    assert_eq!(
        h.runner.spawned_lines(),
        [
            "cargo rustc --message-format=json --lib -- -Zno-codegen -Zunstable-options --test",
            "cargo rustc --message-format=json --test it -- -Zno-codegen -Zunstable-options",
        ]
    );
}

#[test]
fn test_shared_file_in_two_binaries_is_reported_once() {
    let h = Harness::new(
        Config::minimal_for_testing(CheckMode::Check, false),
        StaticTargets::new([
            ("/work/demo/src/bin/a.rs", &["--bin", "a"][..]),
            ("/work/demo/src/bin/b.rs", &["--bin", "b"][..]),
        ]),
        "1.80.0",
        vec![warning_at("src/shared.rs"), warning_at("src/shared.rs")],
    );

    let report = h.check("src/shared.rs");

    assert_eq!(report.targets_run, [src("src/bin/a.rs")]);
    assert_eq!(h.runner.spawned().len(), 1);
    assert_eq!(h.store.diagnostics_for(WINDOW, &src("src/shared.rs")).len(), 1);
}

#[test]
fn test_missing_manifest_aborts_quietly() {
    let store = Arc::new(DiagnosticStore::new());
    let runner = Arc::new(ScriptedRunner::default());
    let status = Arc::new(RecordingStatus::default());
    let orchestrator = CheckOrchestrator::new(Collaborators {
        settings: Arc::new(FixedSettings::default()),
        manifests: Arc::new(FixedManifest::missing()),
        targets: Arc::new(three_targets()),
        commands: Arc::new(FixedCommandBuilder::new("1.80.0")),
        runner: runner.clone(),
        sink: store.clone(),
    });

    let report = orchestrator
        .start_check(Path::new("/tmp/loose.rs"), WindowContext::new(WINDOW, status.clone()))
        .join()
        .unwrap();

    assert_eq!(report.outcome, CheckOutcome::Aborted(AbortReason::NoManifest));
    assert!(runner.spawned().is_empty());
    assert_eq!(store.clear_count(WINDOW), 0);
    assert_eq!(store.finalize_count(WINDOW), 0);
    assert!(status.is_clear());
}

#[test]
fn test_spawn_failure_is_a_tool_error_without_finalize() {
    let h = Harness::new(
        Config::minimal_for_testing(CheckMode::Check, false),
        three_targets(),
        "1.80.0",
        vec![ProcessScript::spawn_failure()],
    );

    let report = h.check("src/lib.rs");

    match &report.outcome {
        CheckOutcome::Aborted(AbortReason::ToolError(reason)) => {
            assert!(reason.contains("scripted spawn failure"), "{reason}");
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(report.targets_run.is_empty());
    assert_eq!(h.store.clear_count(WINDOW), 1);
    assert!(!h.store.is_finalized(WINDOW));
    assert!(h.status.is_clear());
}

#[test]
fn test_failing_exit_code_and_stderr_do_not_abort() {
    let h = Harness::new(
        Config::minimal_for_testing(CheckMode::Check, false),
        StaticTargets::new([("/work/demo/src/lib.rs", &["--lib"][..])]),
        "1.80.0",
        vec![
            ProcessScript::success()
                .exit_code(101)
                .stdout_line("   Compiling demo v0.1.0")
                .json(&compiler_message("error", "mismatched types", "src/other.rs", 9))
                .json(&serde_json::json!({"reason": "build-finished", "success": false}))
                .stderr_line("error: could not compile `demo`"),
        ],
    );

    let report = h.check("src/lib.rs");

    assert_eq!(report.outcome, CheckOutcome::Completed);
    assert_eq!(h.store.all_diagnostics(WINDOW).len(), 1);
    assert!(h.store.is_finalized(WINDOW));
}

#[test]
fn test_status_brackets_a_completed_run() {
    let h = Harness::new(
        Config::minimal_for_testing(CheckMode::Check, false),
        three_targets(),
        "1.80.0",
        vec![],
    );

    h.check("src/lib.rs");

    assert_eq!(
        h.status.events(),
        ["set savecheck: Rust check running...", "erase savecheck"]
    );
}
