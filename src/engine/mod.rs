//! engine
//!
//! Synchronization, mutation and read logic for one repository.
//!
//! # Architecture
//!
//! Every engine function takes a [`RepoContext`]: the repository's origin
//! and working-copy paths plus the shared git runner, configuration and
//! exclusive access pool. The modules are layered:
//!
//! - [`sync`] - discard local drift and align a working copy with origin
//! - [`branch`] - create branches with origin-side collision checks
//! - [`save`] - write a file set and fold it into a durable revision
//! - [`tag`] - create, override and delete tags
//! - [`history`] - deduplicated, time-ordered revision listing
//! - [`reader`] - file, tree and metadata reads at a revision
//!
//! # Invariants
//!
//! - Mutations hold the repository's [`WorkingCopyGuard`] for their whole
//!   duration and align before touching working-copy files
//! - Reads go straight to the origin through git2 and take no lock
//! - Returned revision ids are read back from the origin after push
//!
//! # Example
//!
//! ```ignore
//! let ctx = store.context(&RepoId::new("docs")?);
//! let _guard = ctx.lock().await;
//! sync::align(&ctx, &branch).await?;
//! ```

pub mod branch;
pub mod history;
pub mod reader;
pub mod save;
pub mod sync;
pub mod tag;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::config::Config;
use crate::core::ops::lock::{ExclusiveAccessPool, WorkingCopyGuard};
use crate::core::paths::{is_bare_repository, path_exists};
use crate::core::types::{BranchName, RepoId};
use crate::error::StoreError;
use crate::git::{Git, GitCommand, GitError, GitRunner};

/// Remote name working copies use for their origin.
pub const ORIGIN_REMOTE: &str = "origin";

/// Everything engine functions need to act on one repository.
#[derive(Debug, Clone)]
pub struct RepoContext {
    id: RepoId,
    origin: PathBuf,
    work: PathBuf,
    config: Arc<Config>,
    runner: GitRunner,
    pool: ExclusiveAccessPool,
}

impl RepoContext {
    pub fn new(
        id: RepoId,
        config: Arc<Config>,
        runner: GitRunner,
        pool: ExclusiveAccessPool,
    ) -> Self {
        let paths = config.paths();
        Self {
            origin: paths.origin_path(&id),
            work: paths.work_path(&id),
            id,
            config,
            runner,
            pool,
        }
    }

    pub fn id(&self) -> &RepoId {
        &self.id
    }

    pub fn origin_path(&self) -> &Path {
        &self.origin
    }

    pub fn work_path(&self) -> &Path {
        &self.work
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn primary_branch(&self) -> &BranchName {
        self.config.primary_branch()
    }

    /// Whether the origin is a bare repository, not just a directory.
    pub fn origin_exists(&self) -> bool {
        is_bare_repository(&self.origin)
    }

    pub fn work_copy_exists(&self) -> bool {
        path_exists(&self.work)
    }

    /// Take the repository's exclusive lock for a mutation.
    pub async fn lock(&self) -> WorkingCopyGuard {
        WorkingCopyGuard::acquire(&self.pool, &self.origin, &self.work).await
    }

    /// A git invocation rooted in the working copy.
    pub fn git(&self, operation: &str) -> GitCommand {
        self.runner.command(operation).current_dir(&self.work)
    }

    /// A git invocation with no working directory of its own.
    pub fn git_global(&self, operation: &str) -> GitCommand {
        self.runner.command(operation)
    }

    /// Run a git2 query against the origin on the blocking pool.
    pub async fn read_origin<T, F>(&self, query: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Git) -> Result<T, GitError> + Send + 'static,
        T: Send + 'static,
    {
        let origin = self.origin.clone();
        let result = tokio::task::spawn_blocking(move || {
            let git = Git::open(&origin)?;
            query(&git)
        })
        .await?;
        Ok(result?)
    }

    /// Fail with `NotFound` unless the origin exists and has `branch`.
    pub async fn require_branch(&self, branch: &BranchName) -> Result<(), StoreError> {
        let name = branch.clone();
        let exists = self.read_origin(move |git| git.branch_exists(&name)).await?;
        if exists {
            Ok(())
        } else {
            Err(StoreError::not_found(format!(
                "branch '{}' in repository '{}'",
                branch, self.id
            )))
        }
    }
}
