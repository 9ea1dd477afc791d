//! On-save check orchestration.
//!
//! [`CheckOrchestrator`] turns save events into check runs. Each run executes
//! on its own worker thread: it resolves the manifest directory, walks the
//! targets that may compile the saved file, runs the toolchain once per
//! target and stops as soon as the saved file has a diagnostic.
//!
//! A new run for a window cancels the window's in-flight run and waits for it
//! to wind down before clearing, so two runs never write to the same window
//! at once.

mod cancel;
mod listener;
mod run;
mod status;

pub use cancel::CancellationToken;
pub use run::{NO_CODEGEN_FLAGS, TEST_PROFILE_MIN_RUSTC, augment_invocation};

use std::any::Any;
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use savecheck_runner::{NativeRunner, ProcessRunner};

use crate::command::{CargoCommandBuilder, CommandBuilder};
use crate::config::Config;
use crate::diagnostics::DiagnosticSink;
use crate::error::SaveCheckError;
use crate::manifest::{CargoManifestLocator, ManifestLocator};
use crate::paths;
use crate::settings::SettingsProvider;
use crate::targets::{CargoTargetResolver, TargetResolver};
use crate::types::{CheckReport, WindowId};
use crate::window::WindowContext;

use cancel::{RunCompletion, RunRegistry};
use run::RunRequest;

/// The services a run is wired to.
#[derive(Clone)]
pub struct Collaborators {
    pub settings: Arc<dyn SettingsProvider>,
    pub manifests: Arc<dyn ManifestLocator>,
    pub targets: Arc<dyn TargetResolver>,
    pub commands: Arc<dyn CommandBuilder>,
    pub runner: Arc<dyn ProcessRunner>,
    pub sink: Arc<dyn DiagnosticSink>,
}

impl Collaborators {
    /// Real cargo, rustc and process collaborators around the given settings
    /// and sink.
    pub fn cargo(settings: Arc<dyn SettingsProvider>, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            settings,
            manifests: Arc::new(CargoManifestLocator),
            targets: Arc::new(CargoTargetResolver),
            commands: Arc::new(CargoCommandBuilder::new()),
            runner: Arc::new(NativeRunner::new()),
            sink,
        }
    }
}

struct Inner {
    collab: Collaborators,
    registry: Arc<RunRegistry>,
}

/// Starts, supersedes and cancels on-save checks.
///
/// Cheap to clone; clones share the same runs.
#[derive(Clone)]
pub struct CheckOrchestrator {
    inner: Arc<Inner>,
}

impl CheckOrchestrator {
    #[must_use]
    pub fn new(collab: Collaborators) -> Self {
        Self {
            inner: Arc::new(Inner {
                collab,
                registry: Arc::new(RunRegistry::default()),
            }),
        }
    }

    #[must_use]
    pub fn collaborators(&self) -> &Collaborators {
        &self.inner.collab
    }

    /// Start checking `file` for `window` in the background.
    ///
    /// Never blocks. Settings are loaded by the worker. The returned handle
    /// may be dropped without affecting the run.
    pub fn start_check(&self, file: &Path, window: WindowContext) -> CheckHandle {
        self.spawn_run(file, window, None)
    }

    /// Host hook for "a file was saved".
    ///
    /// Starts a check when checking is enabled and `file` is Rust source.
    /// When checking is disabled the window's diagnostics are cleared.
    pub fn on_post_save(&self, file: &Path, window: WindowContext) -> Option<CheckHandle> {
        let config = match self.inner.collab.settings.load(file) {
            Ok(config) => Some(config),
            Err(e) => {
                // The worker reports the failure in its CheckReport.
                tracing::warn!(file = %file.display(), error = %e, "settings could not be loaded");
                None
            }
        };

        if config.as_ref().is_some_and(|c| !c.enabled()) {
            self.on_config_disabled(&window);
            return None;
        }
        if !paths::is_rust_source(file) {
            tracing::trace!(file = %file.display(), "not a Rust source file");
            return None;
        }
        Some(self.spawn_run(file, window, config))
    }

    /// Checking was switched off: stop any run and clear the window.
    pub fn on_config_disabled(&self, window: &WindowContext) {
        let id = window.id;
        let (run, previous) = self.inner.registry.register(id);
        let completion = RunCompletion::new(Arc::clone(&self.inner.registry), id, &run);

        let Some(previous) = previous else {
            self.inner.collab.sink.clear(id);
            drop(completion);
            return;
        };

        previous.token.cancel();
        let sink = Arc::clone(&self.inner.collab.sink);
        let spawned = thread::Builder::new()
            .name("savecheck-clear".into())
            .spawn(move || {
                let _completion = completion;
                previous.latch.wait();
                if !run.token.is_cancelled() {
                    sink.clear(id);
                }
            });
        if let Err(e) = spawned {
            tracing::error!(window = %id, error = %e, "could not start clear worker");
        }
    }

    /// Cancel the window's in-flight run. Returns whether there was one.
    pub fn cancel(&self, window: WindowId) -> bool {
        match self.inner.registry.current(window) {
            Some(run) => {
                run.token.cancel();
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn is_running(&self, window: WindowId) -> bool {
        self.inner.registry.current(window).is_some()
    }

    fn spawn_run(&self, file: &Path, window: WindowContext, config: Option<Config>) -> CheckHandle {
        let file = paths::absolutize(file).unwrap_or_else(|_| paths::normalize(file));
        let id = window.id;

        let (run, previous) = self.inner.registry.register(id);
        if let Some(previous) = &previous {
            tracing::debug!(window = %id, "superseding in-flight check");
            previous.token.cancel();
        }

        let token = run.token.clone();
        let request = RunRequest {
            file,
            window,
            config,
            token: run.token.clone(),
            predecessor: previous.map(|p| p.latch),
            completion: RunCompletion::new(Arc::clone(&self.inner.registry), id, &run),
        };

        let inner = Arc::clone(&self.inner);
        let worker = thread::Builder::new()
            .name("savecheck-check".into())
            .spawn(move || run::execute(&inner.collab, request));
        if let Err(e) = &worker {
            tracing::error!(window = %id, error = %e, "could not start check worker");
        }

        CheckHandle {
            window: id,
            token,
            worker,
        }
    }
}

/// Handle to a background run.
pub struct CheckHandle {
    window: WindowId,
    token: CancellationToken,
    worker: Result<JoinHandle<CheckReport>, io::Error>,
}

impl CheckHandle {
    #[must_use]
    pub fn window(&self) -> WindowId {
        self.window
    }

    /// Cancel this run only; a newer run for the window is unaffected.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        match &self.worker {
            Ok(handle) => handle.is_finished(),
            Err(_) => true,
        }
    }

    /// Block until the run ends and return its report.
    pub fn join(self) -> Result<CheckReport, SaveCheckError> {
        let handle = self.worker?;
        handle.join().map_err(|payload| SaveCheckError::WorkerPanicked {
            reason: panic_message(payload.as_ref()),
        })
    }
}

impl std::fmt::Debug for CheckHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckHandle")
            .field("window", &self.window)
            .field("cancelled", &self.token.is_cancelled())
            .field("finished", &self.is_finished())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
