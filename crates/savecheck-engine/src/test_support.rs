//! Scripted collaborators for exercising the orchestrator without cargo.
//!
//! Only compiled for tests or with the `test-utils` feature.

use serde_json::{Value, json};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use savecheck_runner::{
    CommandSpec, ExitKind, ProcessExit, ProcessHandle, ProcessInfo, ProcessListener,
    ProcessRunner, RunnerError,
};

use crate::command::{CommandBuilder, CommandRequest};
use crate::config::{CheckMode, Config};
use crate::error::SaveCheckError;
use crate::manifest::ManifestLocator;
use crate::targets::TargetResolver;
use crate::types::{Invocation, Target};
use crate::window::StatusIndicator;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A rustc JSON diagnostic with one primary span at `file:line`.
#[must_use]
pub fn rustc_diagnostic(level: &str, message: &str, file: &str, line: u64) -> Value {
    json!({
        "$message_type": "diagnostic",
        "message": message,
        "code": null,
        "level": level,
        "spans": [{
            "file_name": file,
            "byte_start": 0,
            "byte_end": 1,
            "line_start": line,
            "line_end": line,
            "column_start": 1,
            "column_end": 2,
            "is_primary": true,
            "text": [],
            "label": null,
            "suggested_replacement": null,
            "suggestion_applicability": null,
            "expansion": null
        }],
        "children": [],
        "rendered": format!("{level}: {message}\n")
    })
}

/// The same diagnostic wrapped in a cargo `compiler-message` record.
#[must_use]
pub fn compiler_message(level: &str, message: &str, file: &str, line: u64) -> Value {
    json!({
        "reason": "compiler-message",
        "package_id": "path+file:///p#demo@0.1.0",
        "manifest_path": "/p/Cargo.toml",
        "target": { "kind": ["lib"], "name": "demo", "src_path": "/p/src/lib.rs" },
        "message": rustc_diagnostic(level, message, file, line)
    })
}

/// What one scripted process does.
#[derive(Debug, Clone, Default)]
pub struct ProcessScript {
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
    pub exit_code: Option<i32>,
    /// After emitting output, block until terminated.
    pub hang: bool,
    /// Fail at spawn instead of running.
    pub fail_spawn: bool,
}

impl ProcessScript {
    /// Exits 0 with no output.
    #[must_use]
    pub fn success() -> Self {
        Self {
            exit_code: Some(0),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn exit_code(mut self, code: i32) -> Self {
        self.exit_code = Some(code);
        self
    }

    #[must_use]
    pub fn json(mut self, record: &Value) -> Self {
        self.stdout.push(record.to_string());
        self
    }

    #[must_use]
    pub fn stdout_line(mut self, line: impl Into<String>) -> Self {
        self.stdout.push(line.into());
        self
    }

    #[must_use]
    pub fn stderr_line(mut self, line: impl Into<String>) -> Self {
        self.stderr.push(line.into());
        self
    }

    /// Keep running until terminated.
    #[must_use]
    pub fn hang(mut self) -> Self {
        self.hang = true;
        self
    }

    #[must_use]
    pub fn spawn_failure() -> Self {
        Self {
            fail_spawn: true,
            ..Self::default()
        }
    }
}

#[derive(Default)]
struct RunnerState {
    scripts: VecDeque<ProcessScript>,
    spawned: Vec<CommandSpec>,
}

/// Process runner that plays back one [`ProcessScript`] per spawn, in order.
///
/// Spawns past the end of the script list exit 0 with no output. Every
/// spawned command is recorded.
#[derive(Default)]
pub struct ScriptedRunner {
    state: Mutex<RunnerState>,
    spawned_cv: Condvar,
}

impl ScriptedRunner {
    #[must_use]
    pub fn new(scripts: impl IntoIterator<Item = ProcessScript>) -> Self {
        Self {
            state: Mutex::new(RunnerState {
                scripts: scripts.into_iter().collect(),
                spawned: Vec::new(),
            }),
            spawned_cv: Condvar::new(),
        }
    }

    pub fn push_script(&self, script: ProcessScript) {
        lock(&self.state).scripts.push_back(script);
    }

    /// Commands spawned so far.
    #[must_use]
    pub fn spawned(&self) -> Vec<CommandSpec> {
        lock(&self.state).spawned.clone()
    }

    /// Spawned commands rendered as `program arg arg ...`.
    #[must_use]
    pub fn spawned_lines(&self) -> Vec<String> {
        self.spawned().iter().map(CommandSpec::display).collect()
    }

    /// Block until at least `count` spawns happened or `timeout` elapses.
    pub fn wait_for_spawns(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = lock(&self.state);
        while state.spawned.len() < count {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            state = self
                .spawned_cv
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        true
    }
}

impl ProcessRunner for ScriptedRunner {
    fn spawn(
        &self,
        cmd: &CommandSpec,
        listener: Arc<ProcessListener>,
    ) -> Result<Arc<dyn ProcessHandle>, RunnerError> {
        let script = {
            let mut state = lock(&self.state);
            let script = state.scripts.pop_front().unwrap_or_else(ProcessScript::success);
            if !script.fail_spawn {
                state.spawned.push(cmd.clone());
            }
            script
        };
        self.spawned_cv.notify_all();

        let program = cmd.program.to_string_lossy().into_owned();
        if script.fail_spawn {
            return Err(RunnerError::SpawnFailed {
                program,
                reason: "scripted spawn failure".to_string(),
            });
        }

        let info = ProcessInfo::new(None, program);
        listener.begin(&info);
        Ok(Arc::new(ScriptedProcess {
            info,
            script,
            listener,
            terminated: Mutex::new(false),
            terminated_cv: Condvar::new(),
        }))
    }
}

struct ScriptedProcess {
    info: ProcessInfo,
    script: ProcessScript,
    listener: Arc<ProcessListener>,
    terminated: Mutex<bool>,
    terminated_cv: Condvar,
}

impl ScriptedProcess {
    fn is_terminated(&self) -> bool {
        *lock(&self.terminated)
    }

    fn terminated_error(&self) -> RunnerError {
        self.listener.exit(&self.info, ExitKind::Terminated);
        RunnerError::Terminated {
            program: self.info.program.clone(),
        }
    }
}

impl ProcessHandle for ScriptedProcess {
    fn wait(&self) -> Result<ProcessExit, RunnerError> {
        for line in &self.script.stdout {
            if self.is_terminated() {
                return Err(self.terminated_error());
            }
            self.listener.dispatch_stdout_line(&self.info, line);
        }
        for line in &self.script.stderr {
            self.listener.error(&self.info, line);
        }

        if self.script.hang {
            let mut terminated = lock(&self.terminated);
            while !*terminated {
                terminated = self
                    .terminated_cv
                    .wait(terminated)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        }
        if self.is_terminated() {
            return Err(self.terminated_error());
        }

        self.listener
            .exit(&self.info, ExitKind::Finished(self.script.exit_code));
        Ok(ProcessExit::new(self.script.exit_code))
    }

    fn terminate(&self) {
        *lock(&self.terminated) = true;
        self.terminated_cv.notify_all();
    }

    fn pid(&self) -> Option<u32> {
        None
    }
}

/// Target resolver with a fixed answer.
#[derive(Debug, Clone, Default)]
pub struct StaticTargets(pub Vec<Target>);

impl StaticTargets {
    /// Targets from `(src_path, args)` pairs.
    #[must_use]
    pub fn new<'a>(targets: impl IntoIterator<Item = (&'a str, &'a [&'a str])>) -> Self {
        Self(
            targets
                .into_iter()
                .map(|(src, args)| Target::new(src, args.iter().map(|a| (*a).to_string()).collect()))
                .collect(),
        )
    }
}

impl TargetResolver for StaticTargets {
    fn resolve_targets(
        &self,
        _manifest_dir: &Path,
        _file: &Path,
        _config: &Config,
    ) -> Result<Vec<Target>, SaveCheckError> {
        Ok(self.0.clone())
    }
}

/// Command builder that reports a fixed toolchain version and never probes
/// rustc.
///
/// Produces `cargo <subcommand> --message-format=json <target args>`.
#[derive(Debug, Clone)]
pub struct FixedCommandBuilder {
    pub version: String,
}

impl FixedCommandBuilder {
    #[must_use]
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
        }
    }
}

impl CommandBuilder for FixedCommandBuilder {
    fn build(&self, request: &CommandRequest<'_>) -> Result<Invocation, SaveCheckError> {
        let subcommand = match request.mode {
            CheckMode::Check => "check",
            CheckMode::LegacyUnstable => "rustc",
            CheckMode::LintAll => "clippy",
        };
        let command = CommandSpec::new("cargo")
            .arg(subcommand)
            .arg("--message-format=json")
            .args(request.target_args.iter().map(String::as_str))
            .cwd(request.manifest_dir);
        Ok(Invocation {
            command,
            toolchain_version: self.version.clone(),
            path_rewrite_base: request.manifest_dir.to_path_buf(),
        })
    }
}

/// Manifest locator with a fixed answer.
#[derive(Debug, Clone, Default)]
pub struct FixedManifest(pub Option<PathBuf>);

impl FixedManifest {
    #[must_use]
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self(Some(dir.into()))
    }

    #[must_use]
    pub fn missing() -> Self {
        Self(None)
    }
}

impl ManifestLocator for FixedManifest {
    fn locate(&self, _file: &Path) -> Option<PathBuf> {
        self.0.clone()
    }
}

/// Records every status call and tracks what is currently shown.
#[derive(Debug, Default)]
pub struct RecordingStatus {
    events: Mutex<Vec<String>>,
    shown: Mutex<Vec<String>>,
}

impl RecordingStatus {
    /// `"set KEY: TEXT"` / `"erase KEY"` in call order.
    #[must_use]
    pub fn events(&self) -> Vec<String> {
        lock(&self.events).clone()
    }

    /// No key is currently shown.
    #[must_use]
    pub fn is_clear(&self) -> bool {
        lock(&self.shown).is_empty()
    }
}

impl StatusIndicator for RecordingStatus {
    fn set_status(&self, key: &str, text: &str) {
        lock(&self.events).push(format!("set {key}: {text}"));
        let mut shown = lock(&self.shown);
        if !shown.iter().any(|k| k == key) {
            shown.push(key.to_string());
        }
    }

    fn erase_status(&self, key: &str) {
        lock(&self.events).push(format!("erase {key}"));
        lock(&self.shown).retain(|k| k != key);
    }
}
