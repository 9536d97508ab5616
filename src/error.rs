//! error
//!
//! Error taxonomy for store operations.
//!
//! Lower layers have their own error types ([`ExecError`] for git
//! processes, [`GitError`] for origin reads, [`TypeError`] for input
//! validation). They convert into [`StoreError`] at the engine boundary,
//! and [`ResultExt::during`] wraps them with the operation and target that
//! failed as they propagate:
//!
//! ```text
//! save team/docs@drafts: align drafts: `git fetch --prune --tags origin` timed out after 60s
//! ```
//!
//! Classification helpers ([`StoreError::is_not_found`] and friends) look
//! through the context chain at the root cause.

use std::fmt::Display;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::core::types::{BranchName, RepoId, TagName, TypeError};
use crate::git::{ExecError, GitError};

/// Errors from document store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The branch already exists at the origin.
    #[error("branch '{0}' already exists")]
    BranchAlreadyExists(BranchName),

    /// Repository, revision, branch, tag or path does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// git exited unsuccessfully.
    #[error("`{command}` failed: {}", .stderr.trim())]
    ExternalProcessFailure {
        command: String,
        status: Option<i32>,
        stderr: String,
    },

    /// A bounded git invocation ran out of time.
    #[error("`{command}` timed out after {timeout:?}")]
    TimeoutExceeded { command: String, timeout: Duration },

    /// Local filesystem failure.
    #[error("I/O error at '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The tag exists and override was not requested.
    #[error("tag '{0}' already exists")]
    TagAlreadyExists(TagName),

    /// Init on a repository whose origin already exists.
    #[error("repository '{0}' already exists")]
    RepositoryExists(RepoId),

    /// Caller-supplied value rejected before any git work.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// libgit2 failure other than a missing object.
    #[error(transparent)]
    Git(GitError),

    /// A blocking read task panicked or was cancelled.
    #[error("background task failed: {0}")]
    Task(String),

    /// Any of the above, with the operation and target that failed.
    #[error("{operation} {target}: {source}")]
    Context {
        operation: &'static str,
        target: String,
        #[source]
        source: Box<StoreError>,
    },
}

impl StoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn not_found(what: impl Display) -> Self {
        StoreError::NotFound(what.to_string())
    }

    /// Wrap with operation and target identifiers.
    pub fn context(self, operation: &'static str, target: impl Display) -> Self {
        StoreError::Context {
            operation,
            target: target.to_string(),
            source: Box::new(self),
        }
    }

    /// The innermost error, skipping context layers.
    pub fn root(&self) -> &StoreError {
        let mut current = self;
        while let StoreError::Context { source, .. } = current {
            current = source.as_ref();
        }
        current
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.root(), StoreError::NotFound(_))
    }

    pub fn is_branch_already_exists(&self) -> bool {
        matches!(self.root(), StoreError::BranchAlreadyExists(_))
    }

    pub fn is_tag_already_exists(&self) -> bool {
        matches!(self.root(), StoreError::TagAlreadyExists(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self.root(), StoreError::TimeoutExceeded { .. })
    }
}

impl From<ExecError> for StoreError {
    fn from(err: ExecError) -> Self {
        match err {
            ExecError::Spawn { command, source } => StoreError::ExternalProcessFailure {
                command,
                status: None,
                stderr: source.to_string(),
            },
            ExecError::Failed {
                command,
                status,
                stderr,
                ..
            } => StoreError::ExternalProcessFailure {
                command,
                status,
                stderr,
            },
            ExecError::Timeout { command, timeout } => {
                StoreError::TimeoutExceeded { command, timeout }
            }
        }
    }
}

impl From<GitError> for StoreError {
    fn from(err: GitError) -> Self {
        match err {
            GitError::NotARepo { path } => {
                StoreError::NotFound(format!("repository at '{}'", path.display()))
            }
            GitError::RefNotFound { refname } => {
                StoreError::NotFound(format!("revision '{refname}'"))
            }
            GitError::PathNotFound { path, revision } => {
                StoreError::NotFound(format!("path '{path}' at {revision}"))
            }
            GitError::NotAFile { path } => {
                StoreError::InvalidInput(format!("'{path}' is a directory"))
            }
            other => StoreError::Git(other),
        }
    }
}

impl From<TypeError> for StoreError {
    fn from(err: TypeError) -> Self {
        StoreError::InvalidInput(err.to_string())
    }
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(err: tokio::task::JoinError) -> Self {
        StoreError::Task(err.to_string())
    }
}

/// Attach operation context to any error that converts into [`StoreError`].
pub trait ResultExt<T> {
    fn during(self, operation: &'static str, target: impl Display) -> Result<T, StoreError>;
}

impl<T, E: Into<StoreError>> ResultExt<T> for Result<T, E> {
    fn during(self, operation: &'static str, target: impl Display) -> Result<T, StoreError> {
        self.map_err(|e| e.into().context(operation, target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_sees_through_context() {
        let err = StoreError::not_found("tag 'v1'")
            .context("delete tag", "docs")
            .context("cli", "tag delete");
        assert!(err.is_not_found());
        assert!(!err.is_timeout());
        assert!(matches!(err.root(), StoreError::NotFound(_)));
    }

    #[test]
    fn context_renders_chain() {
        let err = StoreError::BranchAlreadyExists(BranchName::new("master").unwrap())
            .context("save", "docs@master");
        assert_eq!(err.to_string(), "save docs@master: branch 'master' already exists");
        assert!(err.is_branch_already_exists());
    }

    #[test]
    fn exec_errors_map_to_taxonomy() {
        let failed: StoreError = ExecError::Failed {
            command: "git push".into(),
            status: Some(1),
            stdout: String::new(),
            stderr: "rejected\n".into(),
        }
        .into();
        assert!(matches!(
            failed,
            StoreError::ExternalProcessFailure { status: Some(1), .. }
        ));
        assert_eq!(failed.to_string(), "`git push` failed: rejected");

        let timeout: StoreError = ExecError::Timeout {
            command: "git clone".into(),
            timeout: Duration::from_secs(60),
        }
        .into();
        assert!(timeout.is_timeout());
    }

    #[test]
    fn git_misses_become_not_found() {
        let err: StoreError = GitError::RefNotFound {
            refname: "refs/heads/nope".into(),
        }
        .into();
        assert!(err.is_not_found());

        let err: StoreError = GitError::NotAFile { path: "docs".into() }.into();
        assert!(matches!(err, StoreError::InvalidInput(_)));
    }

    #[test]
    fn during_wraps_results() {
        let result: Result<(), TypeError> = Err(TypeError::InvalidPath("..".into()));
        let err = result.during("save", "docs").unwrap_err();
        assert!(matches!(err.root(), StoreError::InvalidInput(_)));
        assert!(err.to_string().starts_with("save docs: invalid input"));
    }
}
