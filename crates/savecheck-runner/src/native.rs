use crate::error::RunnerError;
use std::io::{BufRead, BufReader, Read};
use std::process::{Child, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::{
    CommandSpec, ExitKind, ProcessExit, ProcessHandle, ProcessInfo, ProcessListener, ProcessRunner,
};

/// Default interval between exit polls while waiting on a child.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(20);

// ============================================================================
// NativeRunner - std::process based streaming runner
// ============================================================================

/// Native process runner using `std::process::Command`.
///
/// stdout and stderr are each drained line by line on a dedicated reader
/// thread and handed to the [`ProcessListener`] as they arrive. The waiting
/// thread keeps ownership of the `Child` and polls for exit, which lets a
/// concurrent [`ProcessHandle::terminate`] kill the process before it has been
/// reaped (so the pid cannot have been recycled).
///
/// On unix the child is placed in its own process group and termination
/// signals the whole group: cargo forks `rustc` and build scripts that must
/// die with it.
///
/// # Example
///
/// ```rust,no_run
/// use savecheck_runner::{CommandSpec, NativeRunner, ProcessListener, ProcessRunner};
/// use std::sync::Arc;
///
/// let listener = ProcessListener::new()
///     .on_diagnostic(|_, record| println!("{record}"))
///     .on_error(|_, line| eprintln!("{line}"));
///
/// let cmd = CommandSpec::new("cargo").args(["check", "--message-format=json"]);
/// let handle = NativeRunner::new().spawn(&cmd, Arc::new(listener)).unwrap();
/// let exit = handle.wait().unwrap();
/// println!("cargo exited with {:?}", exit.exit_code);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct NativeRunner {
    poll_interval: Duration,
}

impl Default for NativeRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeRunner {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Override how often the waiting thread checks for exit or termination.
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

impl ProcessRunner for NativeRunner {
    fn spawn(
        &self,
        cmd: &CommandSpec,
        listener: Arc<ProcessListener>,
    ) -> Result<Arc<dyn ProcessHandle>, RunnerError> {
        let program = cmd.program.to_string_lossy().into_owned();

        let mut command = cmd.to_command();
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let mut child = command.spawn().map_err(|e| RunnerError::SpawnFailed {
            program: program.clone(),
            reason: e.to_string(),
        })?;

        let info = ProcessInfo::new(Some(child.id()), program.clone());
        tracing::debug!(process = %info, command = %cmd.display(), "spawned process");
        listener.begin(&info);

        let mut readers = Vec::with_capacity(2);
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        if let Some(stdout) = stdout {
            let listener = Arc::clone(&listener);
            let info = info.clone();
            match spawn_reader("savecheck-stdout", stdout, move |line| {
                listener.dispatch_stdout_line(&info, line);
            }) {
                Ok(handle) => readers.push(handle),
                Err(e) => return Err(abort_spawn(&mut child, &program, &e)),
            }
        }

        if let Some(stderr) = stderr {
            let listener = Arc::clone(&listener);
            let info = info.clone();
            match spawn_reader("savecheck-stderr", stderr, move |line| {
                if !line.trim().is_empty() {
                    listener.error(&info, line);
                }
            }) {
                Ok(handle) => readers.push(handle),
                Err(e) => return Err(abort_spawn(&mut child, &program, &e)),
            }
        }

        Ok(Arc::new(NativeHandle {
            info,
            listener,
            poll_interval: self.poll_interval,
            terminate_requested: AtomicBool::new(false),
            state: Mutex::new(WaitState {
                child: Some(child),
                readers,
                outcome: None,
            }),
        }))
    }
}

fn abort_spawn(child: &mut Child, program: &str, err: &std::io::Error) -> RunnerError {
    let _ = child.kill();
    let _ = child.wait();
    RunnerError::SpawnFailed {
        program: program.to_string(),
        reason: format!("failed to start output reader: {err}"),
    }
}

/// Read `source` to EOF, invoking `on_line` per line (without the newline).
///
/// Invalid UTF-8 is replaced rather than aborting the stream; rustc output
/// can quote arbitrary source bytes.
fn spawn_reader<R, F>(name: &str, source: R, on_line: F) -> std::io::Result<JoinHandle<()>>
where
    R: Read + Send + 'static,
    F: Fn(&str) + Send + 'static,
{
    thread::Builder::new().name(name.to_string()).spawn(move || {
        let mut reader = BufReader::new(source);
        let mut buf = Vec::with_capacity(8192);
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf);
                    on_line(line.trim_end_matches(['\n', '\r']));
                }
                Err(e) => {
                    tracing::debug!(error = %e, "output pipe read failed");
                    break;
                }
            }
        }
    })
}

#[derive(Debug, Clone, Copy)]
enum Outcome {
    Finished(Option<i32>),
    Terminated,
}

struct WaitState {
    child: Option<Child>,
    readers: Vec<JoinHandle<()>>,
    outcome: Option<Outcome>,
}

struct NativeHandle {
    info: ProcessInfo,
    listener: Arc<ProcessListener>,
    poll_interval: Duration,
    terminate_requested: AtomicBool,
    state: Mutex<WaitState>,
}

impl NativeHandle {
    fn outcome_to_result(&self, outcome: Outcome) -> Result<ProcessExit, RunnerError> {
        match outcome {
            Outcome::Finished(code) => Ok(ProcessExit::new(code)),
            Outcome::Terminated => Err(RunnerError::Terminated {
                program: self.info.program.clone(),
            }),
        }
    }

    fn join_readers(readers: &mut Vec<JoinHandle<()>>) {
        for reader in readers.drain(..) {
            if reader.join().is_err() {
                tracing::warn!("output reader thread panicked");
            }
        }
    }
}

impl ProcessHandle for NativeHandle {
    fn wait(&self) -> Result<ProcessExit, RunnerError> {
        let mut state = self.state.lock().map_err(|_| RunnerError::WaitFailed {
            program: self.info.program.clone(),
            reason: "wait state poisoned".to_string(),
        })?;

        if let Some(outcome) = state.outcome {
            return self.outcome_to_result(outcome);
        }

        let Some(mut child) = state.child.take() else {
            return Err(RunnerError::WaitFailed {
                program: self.info.program.clone(),
                reason: "process handle has no child".to_string(),
            });
        };

        let outcome = loop {
            if self.terminate_requested.load(Ordering::SeqCst) {
                kill_process_tree(&mut child);
                let _ = child.wait();
                break Outcome::Terminated;
            }

            match child.try_wait() {
                Ok(Some(status)) => break Outcome::Finished(status.code()),
                Ok(None) => thread::sleep(self.poll_interval),
                Err(e) => {
                    kill_process_tree(&mut child);
                    let _ = child.wait();
                    Self::join_readers(&mut state.readers);
                    return Err(RunnerError::WaitFailed {
                        program: self.info.program.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        };

        // Every line must reach the listener before the caller moves on.
        Self::join_readers(&mut state.readers);
        state.outcome = Some(outcome);

        match outcome {
            Outcome::Finished(code) => {
                tracing::debug!(process = %self.info, exit_code = ?code, "process finished");
                self.listener.exit(&self.info, ExitKind::Finished(code));
            }
            Outcome::Terminated => {
                tracing::debug!(process = %self.info, "process terminated");
                self.listener.exit(&self.info, ExitKind::Terminated);
            }
        }

        self.outcome_to_result(outcome)
    }

    fn terminate(&self) {
        self.terminate_requested.store(true, Ordering::SeqCst);
    }

    fn pid(&self) -> Option<u32> {
        self.info.pid
    }
}

/// Kill the child and, on unix, its whole process group.
fn kill_process_tree(child: &mut Child) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{Signal, killpg};
        use nix::unistd::Pid;

        if let Ok(pid) = i32::try_from(child.id()) {
            // The child leads its own group (spawned with process_group(0)).
            let _ = killpg(Pid::from_raw(pid), Signal::SIGKILL);
        }
    }

    let _ = child.kill();
}
