//! store
//!
//! The document store: repository lifecycle plus per-repository handles.
//!
//! # Architecture
//!
//! A [`DocumentStore`] is built once from a resolved [`Config`] and owns
//! the single [`ExclusiveAccessPool`] and [`GitRunner`] every repository
//! handle shares. Nothing is global: two stores with different roots in one
//! process are fully independent.
//!
//! # Example
//!
//! ```no_run
//! use revstore::core::config::Config;
//! use revstore::core::types::{BranchName, FileChange, RepoId, Signature};
//! use revstore::store::{DocumentRepo, DocumentStore};
//!
//! # async fn demo() -> Result<(), revstore::error::StoreError> {
//! let store = DocumentStore::new(Config::load(None).unwrap());
//! let id = RepoId::new("team/handbook").unwrap();
//! let me = Signature::now("Ada", "ada@example.com");
//!
//! store.init(&id, &me, &[FileChange::new("readme.txt", "hello")]).await?;
//!
//! let repo = store.get_repository(&id).await?;
//! let master = BranchName::new("master").unwrap();
//! let rev = repo
//!     .save(&me, "edit", &master, &master, &[FileChange::new("readme.txt", "hi")])
//!     .await?;
//! assert_eq!(repo.get_file_at(rev.as_str(), "readme.txt").await?, "hi");
//! # Ok(())
//! # }
//! ```

mod repo;

pub use crate::engine::history::{accept_all, MessageFilter};
pub use repo::{DocumentRepo, Repository};

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use crate::core::config::Config;
use crate::core::ops::lock::ExclusiveAccessPool;
use crate::core::paths::{is_bare_repository, path_exists, StorePaths, ORIGIN_SUFFIX};
use crate::core::types::{FileChange, Oid, RepoId, Signature};
use crate::engine::{save, sync, RepoContext};
use crate::error::{ResultExt, StoreError};
use crate::git::GitRunner;

/// Entry point for repository lifecycle operations.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    config: Arc<Config>,
    runner: GitRunner,
    pool: ExclusiveAccessPool,
}

impl DocumentStore {
    pub fn new(config: Config) -> Self {
        let runner = GitRunner::new(config.git_program(), config.command_timeout());
        Self {
            config: Arc::new(config),
            runner,
            pool: ExclusiveAccessPool::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn context(&self, id: &RepoId) -> RepoContext {
        RepoContext::new(
            id.clone(),
            Arc::clone(&self.config),
            self.runner.clone(),
            self.pool.clone(),
        )
    }

    /// Create `id`'s origin with a first revision holding `files`.
    ///
    /// # Errors
    ///
    /// `RepositoryExists` if the origin is already there.
    pub async fn init(
        &self,
        id: &RepoId,
        committer: &Signature,
        files: &[FileChange],
    ) -> Result<Oid, StoreError> {
        let ctx = self.context(id);
        let _guard = ctx.lock().await;
        save::initialize(&ctx, committer, files).await
    }

    /// Whether `id` has an origin repository on disk.
    pub fn exists(&self, id: &RepoId) -> bool {
        is_bare_repository(&self.config.paths().origin_path(id))
    }

    /// Remove the origin and working copy of `id`.
    pub async fn delete(&self, id: &RepoId) -> Result<(), StoreError> {
        let ctx = self.context(id);
        let _guard = ctx.lock().await;

        if !ctx.origin_exists() {
            return Err(StoreError::not_found(format!("repository '{id}'")));
        }
        sync::remove_work_copy(&ctx).await.during("delete", id)?;
        tokio::fs::remove_dir_all(ctx.origin_path())
            .await
            .map_err(|e| StoreError::io(ctx.origin_path(), e))
            .during("delete", id)?;

        info!(repo = %id, "repository deleted");
        Ok(())
    }

    /// Handle on `id`, which must have an origin repository.
    pub async fn get_repository(&self, id: &RepoId) -> Result<Repository, StoreError> {
        let ctx = self.context(id);
        ctx.read_origin(|_| Ok(())).await?;
        Ok(Repository::new(ctx))
    }

    /// Every repository under the origin root, sorted by id.
    pub async fn list_repositories(&self) -> Result<Vec<RepoId>, StoreError> {
        let paths = self.config.paths();
        let mut ids = tokio::task::spawn_blocking(move || find_origins(&paths)).await??;
        ids.sort();
        Ok(ids)
    }
}

fn find_origins(paths: &StorePaths) -> Result<Vec<RepoId>, StoreError> {
    let mut found = Vec::new();
    if !path_exists(paths.origin_root()) {
        return Ok(found);
    }

    let mut pending: Vec<PathBuf> = vec![paths.origin_root().to_path_buf()];
    while let Some(dir) = pending.pop() {
        let entries = std::fs::read_dir(&dir).map_err(|e| StoreError::io(&dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(&dir, e))?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let is_origin = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.ends_with(ORIGIN_SUFFIX));
            if is_origin && is_bare_repository(&path) {
                if let Some(id) = paths.repo_id_for_origin(&path) {
                    found.push(id);
                }
            } else {
                pending.push(path);
            }
        }
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::StoreConfig;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> DocumentStore {
        let config = Config::from_file_config(
            StoreConfig {
                origin_root: Some(dir.path().join("origins")),
                work_root: Some(dir.path().join("work")),
                ..Default::default()
            },
            None,
        )
        .unwrap();
        DocumentStore::new(config)
    }

    fn me() -> Signature {
        Signature::now("Test", "test@example.com")
    }

    #[tokio::test]
    async fn lifecycle() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let id = RepoId::new("team/docs").unwrap();

        assert!(!store.exists(&id));
        assert!(store.get_repository(&id).await.unwrap_err().is_not_found());

        store.init(&id, &me(), &[]).await.unwrap();
        assert!(store.exists(&id));
        assert_eq!(store.get_repository(&id).await.unwrap().id(), &id);

        let err = store.init(&id, &me(), &[]).await.unwrap_err();
        assert!(matches!(err, StoreError::RepositoryExists(_)));

        store.delete(&id).await.unwrap();
        assert!(!store.exists(&id));
        assert!(store.delete(&id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn lists_nested_repositories() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        assert!(store.list_repositories().await.unwrap().is_empty());

        for id in ["b", "a", "a/one", "a/two"] {
            store.init(&RepoId::new(id).unwrap(), &me(), &[]).await.unwrap();
        }

        let ids: Vec<String> = store
            .list_repositories()
            .await
            .unwrap()
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(ids, vec!["a", "a/one", "a/two", "b"]);
    }

    #[tokio::test]
    async fn plain_directory_at_origin_path_is_not_a_repository() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let id = RepoId::new("team").unwrap();
        std::fs::create_dir_all(store.config().paths().origin_path(&id)).unwrap();

        assert!(!store.exists(&id));
        assert!(store.get_repository(&id).await.unwrap_err().is_not_found());
        assert!(store.delete(&id).await.unwrap_err().is_not_found());

        store.init(&id, &me(), &[]).await.unwrap();
        assert!(store.exists(&id));
    }

    #[tokio::test]
    async fn parent_id_is_independent_of_child() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let parent = RepoId::new("team").unwrap();
        let child = RepoId::new("team/docs").unwrap();

        store.init(&child, &me(), &[]).await.unwrap();
        assert!(!store.exists(&parent));
        assert!(store.get_repository(&parent).await.unwrap_err().is_not_found());

        store.init(&parent, &me(), &[]).await.unwrap();
        store.delete(&parent).await.unwrap();
        assert!(store.exists(&child));
        assert!(store.get_repository(&child).await.is_ok());
    }

    #[tokio::test]
    async fn failed_init_leaves_no_origin() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let id = RepoId::new("docs").unwrap();

        let err = store
            .init(&id, &me(), &[FileChange::new(".git/hooks/x", "x")])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidInput(_)));
        assert!(!store.exists(&id));
    }
}
