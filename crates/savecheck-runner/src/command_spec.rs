use std::collections::HashMap;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Command;

// ============================================================================
// CommandSpec - argv-style process description
// ============================================================================

/// Specification for a command to execute.
///
/// Every toolchain invocation goes through this type so that arguments are
/// passed as discrete elements rather than shell strings. Target names and
/// feature lists come from manifests and user settings, so they must never be
/// re-tokenised by a shell.
///
/// # Example
///
/// ```rust
/// use savecheck_runner::CommandSpec;
/// use std::ffi::OsString;
///
/// let cmd = CommandSpec::new("cargo")
///     .arg("check")
///     .args(["--bin", "server"])
///     .arg("--message-format=json")
///     .cwd("/path/to/project");
///
/// assert_eq!(cmd.program, OsString::from("cargo"));
/// assert_eq!(cmd.args.len(), 4);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CommandSpec {
    /// The program to execute
    pub program: OsString,
    /// Arguments as discrete elements (NOT shell strings)
    pub args: Vec<OsString>,
    /// Optional working directory
    pub cwd: Option<PathBuf>,
    /// Optional environment overrides, layered on top of the inherited environment
    pub env: Option<HashMap<OsString, OsString>>,
}

impl CommandSpec {
    /// Create a new `CommandSpec` with the given program.
    #[must_use]
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: None,
        }
    }

    /// Add a single argument to the command.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments to the command.
    ///
    /// ```rust
    /// use savecheck_runner::CommandSpec;
    ///
    /// let cmd = CommandSpec::new("cargo").args(["clippy", "--message-format=json"]);
    /// assert_eq!(cmd.args.len(), 2);
    /// ```
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Append an argument in place.
    ///
    /// Used when an already-built invocation is augmented with mode-specific
    /// flags after the fact.
    pub fn push_arg(&mut self, arg: impl Into<OsString>) {
        self.args.push(arg.into());
    }

    /// Set the working directory for the command.
    #[must_use]
    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Set an environment variable for the command.
    #[must_use]
    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.env
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Set multiple environment variables for the command.
    #[must_use]
    pub fn envs<I, K, V>(mut self, envs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<OsString>,
        V: Into<OsString>,
    {
        let env_map = self.env.get_or_insert_with(HashMap::new);
        for (key, value) in envs {
            env_map.insert(key.into(), value.into());
        }
        self
    }

    /// Position of the first bare `--`, if any.
    #[must_use]
    pub fn separator_index(&self) -> Option<usize> {
        self.args.iter().position(|a| a == "--")
    }

    /// Add an argument for the driver itself, keeping it ahead of any `--`.
    pub fn push_driver_arg(&mut self, arg: impl Into<OsString>) {
        match self.separator_index() {
            Some(idx) => self.args.insert(idx, arg.into()),
            None => self.args.push(arg.into()),
        }
    }

    /// Add arguments for the tool behind the driver, after a single `--`.
    pub fn push_passthrough_args<I, S>(&mut self, args: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        if self.separator_index().is_none() {
            self.args.push(OsString::from("--"));
        }
        self.args.extend(args.into_iter().map(Into::into));
    }

    /// Returns true if any argument equals `needle`.
    #[must_use]
    pub fn has_arg(&self, needle: &str) -> bool {
        self.args.iter().any(|a| a == needle)
    }

    /// Human-readable command line for logs. Never fed back into a shell.
    #[must_use]
    pub fn display(&self) -> String {
        let mut out = self.program.to_string_lossy().into_owned();
        for arg in &self.args {
            out.push(' ');
            out.push_str(&arg.to_string_lossy());
        }
        out
    }

    /// Convert this `CommandSpec` into a `std::process::Command`.
    ///
    /// The resulting `Command` uses argv-style argument passing; stdio is left
    /// for the caller to configure.
    #[must_use]
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);

        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }

        if let Some(ref env) = self.env {
            for (key, value) in env {
                cmd.env(key, value);
            }
        }

        cmd
    }
}
