//! Checks against a real cargo workspace on disk.
//!
//! Cargo reports span paths relative to the workspace root, so diagnostics
//! for a member package must still land on the member's files.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use savecheck::{
    CheckMode, CheckOrchestrator, CheckOutcome, Collaborators, Config, DiagnosticStore,
    FixedSettings, WindowContext, WindowId,
};
use tempfile::TempDir;

const WINDOW: WindowId = WindowId::new(11);

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// `<root>/Cargo.toml` is a virtual workspace with one member package that
/// has a library and a binary sharing `src/util.rs`.
fn member_workspace() -> (TempDir, PathBuf) {
    let temp = TempDir::new().unwrap();
    let root = fs::canonicalize(temp.path()).unwrap();
    write(
        &root.join("Cargo.toml"),
        "[workspace]\nmembers = [\"member\"]\nresolver = \"2\"\n",
    );
    write(
        &root.join("member/Cargo.toml"),
        "[package]\nname = \"member\"\nversion = \"0.1.0\"\nedition = \"2021\"\n",
    );
    write(&root.join("member/src/lib.rs"), "mod util;\n\npub fn f() {\n    util::g();\n}\n");
    write(&root.join("member/src/main.rs"), "mod util;\n\nfn main() {\n    util::g();\n}\n");
    write(&root.join("member/src/util.rs"), "pub fn g() {\n    let x = 1;\n}\n");
    (temp, root)
}

fn cargo_config() -> Config {
    let mut builder = Config::builder().mode(CheckMode::Check).include_tests(false);
    if let Ok(cargo) = std::env::var("CARGO") {
        builder = builder.cargo_binary(cargo);
    }
    builder.build().unwrap()
}

#[test]
fn test_member_diagnostics_are_keyed_by_real_paths() {
    let (_temp, root) = member_workspace();
    let util = root.join("member/src/util.rs");
    let store = Arc::new(DiagnosticStore::new());
    let orchestrator = CheckOrchestrator::new(Collaborators::cargo(
        Arc::new(FixedSettings(cargo_config())),
        store.clone(),
    ));

    let report = orchestrator
        .start_check(&util, WindowContext::headless(WINDOW))
        .join()
        .unwrap();

    assert_eq!(report.outcome, CheckOutcome::Completed);
    let found = store.diagnostics_for(WINDOW, &util);
    assert_eq!(found.len(), 1, "stored under {:?}", store.files(WINDOW));
    assert!(found[0].message.contains("unused variable"));
    for file in store.files(WINDOW) {
        assert!(file.as_std_path().is_file(), "diagnostic stored under missing path {file}");
    }

    // The library already reported the shared module, so the binary is skipped.
    assert_eq!(report.targets_run, [root.join("member/src/lib.rs")]);
    assert!(report.stopped_early);
}
