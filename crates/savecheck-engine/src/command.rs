//! Building cargo invocations for each check mode.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use savecheck_runner::CommandSpec;

use crate::config::{CheckMode, Config};
use crate::error::SaveCheckError;
use crate::paths;
use crate::types::Invocation;
use crate::version::{self, UNKNOWN_VERSION};

/// Everything a builder needs for one target's command.
#[derive(Debug, Clone, Copy)]
pub struct CommandRequest<'a> {
    pub mode: CheckMode,
    /// Directory holding the package's `Cargo.toml`; becomes the working
    /// directory.
    pub manifest_dir: &'a Path,
    /// Target selection (`--bin NAME`); empty for `lint-all` and package defaults.
    pub target_args: &'a [String],
    pub config: &'a Config,
}

/// Produces the base command for a mode. Mode- and version-gated flags are
/// added afterwards by the orchestrator.
pub trait CommandBuilder: Send + Sync {
    fn build(&self, request: &CommandRequest<'_>) -> Result<Invocation, SaveCheckError>;
}

/// Builds `cargo check` / `cargo rustc` / `cargo clippy` commands with JSON
/// message output.
///
/// Cargo prints span paths relative to the workspace root, so that root (not
/// the member's manifest directory) is the invocation's path-rewrite base.
#[derive(Debug, Default)]
pub struct CargoCommandBuilder {
    rustc: Option<String>,
    versions: Mutex<HashMap<(Option<String>, PathBuf), String>>,
    workspace_roots: Mutex<HashMap<PathBuf, PathBuf>>,
}

impl CargoCommandBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Probe this `rustc` instead of the one on `PATH`.
    #[must_use]
    pub fn with_rustc(mut self, rustc: impl Into<String>) -> Self {
        self.rustc = Some(rustc.into());
        self
    }

    const fn subcommand(mode: CheckMode) -> &'static str {
        match mode {
            CheckMode::Check => "check",
            CheckMode::LegacyUnstable => "rustc",
            CheckMode::LintAll => "clippy",
        }
    }

    /// `rustc --version` for a toolchain, cached per toolchain and directory.
    ///
    /// Returns [`UNKNOWN_VERSION`] when rustc cannot be run; that value fails
    /// every version requirement.
    pub fn toolchain_version(&self, toolchain: Option<&str>, cwd: &Path) -> String {
        let key = (toolchain.map(str::to_string), cwd.to_path_buf());
        if let Ok(cache) = self.versions.lock()
            && let Some(v) = cache.get(&key)
        {
            return v.clone();
        }

        let version = self.probe_version(toolchain, cwd);
        if let Ok(mut cache) = self.versions.lock() {
            cache.insert(key, version.clone());
        }
        version
    }

    /// Root of the cargo workspace that `manifest_dir` belongs to.
    ///
    /// Asks `cargo locate-project --workspace` once per manifest directory.
    /// Falls back to `manifest_dir` when cargo cannot answer; failures are not
    /// cached.
    pub fn workspace_root(
        &self,
        config: &Config,
        toolchain: Option<&str>,
        manifest_dir: &Path,
    ) -> PathBuf {
        if let Ok(cache) = self.workspace_roots.lock()
            && let Some(root) = cache.get(manifest_dir)
        {
            return root.clone();
        }

        let mut cmd = CommandSpec::new(config.cargo_binary());
        if let Some(tc) = toolchain {
            cmd.push_arg(format!("+{tc}"));
        }
        let cmd = cmd
            .args(["locate-project", "--workspace", "--message-format", "plain"])
            .cwd(manifest_dir);

        let root = match cmd.to_command().stdin(std::process::Stdio::null()).output() {
            Ok(output) if output.status.success() => {
                parse_workspace_manifest(&String::from_utf8_lossy(&output.stdout))
            }
            Ok(output) => {
                tracing::debug!(
                    command = %cmd.display(),
                    stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                    "workspace lookup failed"
                );
                None
            }
            Err(e) => {
                tracing::debug!(command = %cmd.display(), error = %e, "could not run cargo");
                None
            }
        };

        match root {
            Some(root) => {
                if let Ok(mut cache) = self.workspace_roots.lock() {
                    cache.insert(manifest_dir.to_path_buf(), root.clone());
                }
                root
            }
            None => manifest_dir.to_path_buf(),
        }
    }

    fn probe_version(&self, toolchain: Option<&str>, cwd: &Path) -> String {
        let mut cmd = CommandSpec::new(self.rustc.as_deref().unwrap_or("rustc"));
        if let Some(tc) = toolchain {
            cmd.push_arg(format!("+{tc}"));
        }
        let cmd = cmd.arg("--version").cwd(cwd);

        let output = match cmd.to_command().stdin(std::process::Stdio::null()).output() {
            Ok(output) if output.status.success() => output,
            Ok(output) => {
                tracing::warn!(
                    command = %cmd.display(),
                    stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                    "rustc version probe failed"
                );
                return UNKNOWN_VERSION.to_string();
            }
            Err(e) => {
                tracing::warn!(command = %cmd.display(), error = %e, "could not run rustc");
                return UNKNOWN_VERSION.to_string();
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        version::parse_rustc_version(&stdout).unwrap_or_else(|| {
            tracing::warn!(output = %stdout.trim(), "unrecognised rustc version output");
            UNKNOWN_VERSION.to_string()
        })
    }
}

impl CommandBuilder for CargoCommandBuilder {
    fn build(&self, request: &CommandRequest<'_>) -> Result<Invocation, SaveCheckError> {
        let config = request.config;
        let toolchain = config.toolchain_for(request.mode);

        let mut cmd = CommandSpec::new(config.cargo_binary());
        if let Some(tc) = toolchain {
            cmd.push_arg(format!("+{tc}"));
        }
        let cmd = cmd
            .arg(Self::subcommand(request.mode))
            .arg("--message-format=json")
            .args(request.target_args.iter())
            .args(config.feature_args())
            .args(config.extra_args_for(request.mode).iter())
            .envs(config.env_for(request.mode))
            .cwd(request.manifest_dir);

        Ok(Invocation {
            command: cmd,
            toolchain_version: self.toolchain_version(toolchain, request.manifest_dir),
            path_rewrite_base: self.workspace_root(config, toolchain, request.manifest_dir),
        })
    }
}

/// Directory of the manifest path printed by `cargo locate-project`.
fn parse_workspace_manifest(stdout: &str) -> Option<PathBuf> {
    let manifest = Path::new(stdout.lines().next()?.trim());
    if !manifest.is_absolute() {
        return None;
    }
    manifest.parent().map(paths::normalize)
}
