//! git::command
//!
//! External command execution for the git engine.
//!
//! Every working-copy mutation (clone, fetch, checkout, reset, add, commit,
//! tag, push) goes through [`GitRunner`]. Each invocation is bounded by a
//! timeout; when it expires the child process is killed and the call fails
//! with [`ExecError::Timeout`] instead of hanging.
//!
//! # Example
//!
//! ```no_run
//! use revstore::git::GitRunner;
//! use std::path::Path;
//! use std::time::Duration;
//!
//! # async fn demo() -> Result<(), revstore::git::ExecError> {
//! let runner = GitRunner::new("git", Duration::from_secs(60));
//! let out = runner
//!     .command("rev-parse")
//!     .current_dir(Path::new("/tmp/work/docs.work"))
//!     .args(["rev-parse", "HEAD"])
//!     .run()
//!     .await?;
//! println!("HEAD is {}", out.stdout.trim());
//! # Ok(())
//! # }
//! ```

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Errors from running an external git command.
#[derive(Debug, Error)]
pub enum ExecError {
    /// The process could not be started at all.
    #[error("failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    /// The process ran and exited unsuccessfully.
    #[error("`{command}` failed: {}", failure_detail(.status, .stderr))]
    Failed {
        command: String,
        /// Exit code, or `None` when killed by a signal
        status: Option<i32>,
        stdout: String,
        stderr: String,
    },

    /// The process exceeded its time bound and was killed.
    #[error("`{command}` timed out after {timeout:?}")]
    Timeout { command: String, timeout: Duration },
}

fn failure_detail(status: &Option<i32>, stderr: &str) -> String {
    let exit = match status {
        Some(code) => format!("exit code {code}"),
        None => "killed by signal".to_string(),
    };
    format!("{exit}: {}", stderr.trim())
}

impl ExecError {
    /// Whether the process ran and exited non-zero.
    pub fn is_exit_failure(&self) -> bool {
        matches!(self, ExecError::Failed { .. })
    }
}

/// Captured output of a successful invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Launches git invocations with a shared program path and default timeout.
#[derive(Debug, Clone)]
pub struct GitRunner {
    program: PathBuf,
    default_timeout: Duration,
}

impl GitRunner {
    pub fn new(program: impl Into<PathBuf>, default_timeout: Duration) -> Self {
        Self {
            program: program.into(),
            default_timeout,
        }
    }

    /// Start building an invocation labelled `operation` for logs and errors.
    pub fn command(&self, operation: &str) -> GitCommand {
        GitCommand {
            program: self.program.clone(),
            operation: operation.to_string(),
            args: Vec::new(),
            dir: None,
            envs: Vec::new(),
            timeout: self.default_timeout,
        }
    }
}

/// One pending git invocation.
#[derive(Debug)]
#[must_use = "a GitCommand does nothing until `run` is awaited"]
pub struct GitCommand {
    program: PathBuf,
    operation: String,
    args: Vec<OsString>,
    dir: Option<PathBuf>,
    envs: Vec<(OsString, OsString)>,
    timeout: Duration,
}

impl GitCommand {
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: &Path) -> Self {
        self.dir = Some(dir.to_path_buf());
        self
    }

    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Human-readable command line, used in logs and error messages.
    pub fn display(&self) -> String {
        let mut line = String::from("git");
        for arg in &self.args {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        line
    }

    /// Run to completion, capturing stdout and stderr.
    ///
    /// # Errors
    ///
    /// - [`ExecError::Spawn`] if the program cannot be started
    /// - [`ExecError::Failed`] on a non-zero exit
    /// - [`ExecError::Timeout`] if the bound expires (the child is killed)
    pub async fn run(self) -> Result<GitOutput, ExecError> {
        let command_line = self.display();
        debug!(
            operation = %self.operation,
            dir = ?self.dir,
            timeout = ?self.timeout,
            "{command_line}"
        );

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .envs(self.envs.iter().map(|(k, v)| (k, v)))
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.dir {
            cmd.current_dir(dir);
        }

        let child = cmd.spawn().map_err(|source| ExecError::Spawn {
            command: command_line.clone(),
            source,
        })?;

        // On timeout the wait future is dropped with the child inside it,
        // and kill_on_drop terminates the process.
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(source)) => {
                return Err(ExecError::Spawn {
                    command: command_line,
                    source,
                })
            }
            Err(_) => {
                return Err(ExecError::Timeout {
                    command: command_line,
                    timeout: self.timeout,
                })
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            return Err(ExecError::Failed {
                command: command_line,
                status: output.status.code(),
                stdout,
                stderr,
            });
        }

        Ok(GitOutput { stdout, stderr })
    }

    /// Run a query whose non-zero exit means "no" rather than failure
    /// (`show-ref --verify --quiet`, `rev-parse --verify --quiet`).
    pub async fn succeeds(self) -> Result<bool, ExecError> {
        match self.run().await {
            Ok(_) => Ok(true),
            Err(ExecError::Failed { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
