//! store::repo
//!
//! The per-repository operation surface.

use async_trait::async_trait;

use crate::core::types::{BranchName, FileChange, FileInfo, Oid, RepoId, Revision, Signature, TagName};
use crate::engine::history::MessageFilter;
use crate::engine::{branch, history, reader, save, sync, tag, RepoContext};
use crate::error::StoreError;

/// Operations on one document repository.
///
/// Mutations serialize per repository; reads run concurrently with them
/// and with each other. An empty revision argument means the primary
/// branch tip.
#[async_trait]
pub trait DocumentRepo: Send + Sync {
    /// Write `files` on `old`, or on new branch `new` forked from `old`.
    async fn save(
        &self,
        committer: &Signature,
        message: &str,
        old: &BranchName,
        new: &BranchName,
        files: &[FileChange],
    ) -> Result<Oid, StoreError>;

    /// Write `files` on new branch `new` forked from `revision`.
    async fn checkout_and_save(
        &self,
        committer: &Signature,
        message: &str,
        revision: &str,
        new: &BranchName,
        files: &[FileChange],
    ) -> Result<Oid, StoreError>;

    /// Replace the whole tree of `branch` with `files`.
    async fn clean_push(
        &self,
        committer: &Signature,
        message: &str,
        branch: &BranchName,
        files: &[FileChange],
    ) -> Result<Oid, StoreError>;

    async fn create_branch(&self, from: &BranchName, new: &BranchName) -> Result<Oid, StoreError>;

    /// Revisions of `branch` (every branch when `None`), newest first.
    async fn commits(
        &self,
        branch: Option<&BranchName>,
        filter: MessageFilter,
    ) -> Result<Vec<Revision>, StoreError>;

    async fn checkout(&self, reference: &str) -> Result<(), StoreError>;

    async fn push_tag(
        &self,
        tag: &TagName,
        from_revision: &str,
        override_existing: bool,
    ) -> Result<Oid, StoreError>;

    async fn delete_tag(&self, tag: &TagName) -> Result<(), StoreError>;

    async fn tag_exists(&self, tag: &TagName) -> Result<bool, StoreError>;

    async fn tag_list(&self) -> Result<Vec<TagName>, StoreError>;

    async fn branches(&self) -> Result<Vec<BranchName>, StoreError>;

    async fn get_revision(&self, revision: &str) -> Result<Revision, StoreError>;

    async fn get_file_at(&self, revision: &str, path: &str) -> Result<String, StoreError>;

    async fn get_file_data_at(&self, revision: &str, path: &str) -> Result<Vec<u8>, StoreError>;

    async fn list_files_at(&self, revision: &str) -> Result<Vec<FileInfo>, StoreError>;

    async fn stat_file_at(&self, revision: &str, path: &str) -> Result<FileInfo, StoreError>;
}

/// Handle on an existing repository, from
/// [`DocumentStore::get_repository`](super::DocumentStore::get_repository).
#[derive(Debug, Clone)]
pub struct Repository {
    ctx: RepoContext,
}

impl Repository {
    pub(crate) fn new(ctx: RepoContext) -> Self {
        Self { ctx }
    }

    pub fn id(&self) -> &RepoId {
        self.ctx.id()
    }

    pub fn context(&self) -> &RepoContext {
        &self.ctx
    }
}

#[async_trait]
impl DocumentRepo for Repository {
    async fn save(
        &self,
        committer: &Signature,
        message: &str,
        old: &BranchName,
        new: &BranchName,
        files: &[FileChange],
    ) -> Result<Oid, StoreError> {
        save::save(&self.ctx, committer, message, old, new, files).await
    }

    async fn checkout_and_save(
        &self,
        committer: &Signature,
        message: &str,
        revision: &str,
        new: &BranchName,
        files: &[FileChange],
    ) -> Result<Oid, StoreError> {
        save::checkout_and_save(&self.ctx, committer, message, revision, new, files).await
    }

    async fn clean_push(
        &self,
        committer: &Signature,
        message: &str,
        branch: &BranchName,
        files: &[FileChange],
    ) -> Result<Oid, StoreError> {
        save::clean_push(&self.ctx, committer, message, branch, files).await
    }

    async fn create_branch(&self, from: &BranchName, new: &BranchName) -> Result<Oid, StoreError> {
        branch::create_and_push(&self.ctx, from, new).await
    }

    async fn commits(
        &self,
        branch: Option<&BranchName>,
        filter: MessageFilter,
    ) -> Result<Vec<Revision>, StoreError> {
        history::commits(&self.ctx, branch, filter).await
    }

    async fn checkout(&self, reference: &str) -> Result<(), StoreError> {
        sync::checkout(&self.ctx, reference).await
    }

    async fn push_tag(
        &self,
        tag: &TagName,
        from_revision: &str,
        override_existing: bool,
    ) -> Result<Oid, StoreError> {
        tag::push_tag(&self.ctx, tag, from_revision, override_existing).await
    }

    async fn delete_tag(&self, tag: &TagName) -> Result<(), StoreError> {
        tag::delete_tag(&self.ctx, tag).await
    }

    async fn tag_exists(&self, tag: &TagName) -> Result<bool, StoreError> {
        tag::tag_exists(&self.ctx, tag).await
    }

    async fn tag_list(&self) -> Result<Vec<TagName>, StoreError> {
        tag::tag_list(&self.ctx).await
    }

    async fn branches(&self) -> Result<Vec<BranchName>, StoreError> {
        self.ctx.read_origin(|git| git.list_branches()).await
    }

    async fn get_revision(&self, revision: &str) -> Result<Revision, StoreError> {
        reader::get_revision(&self.ctx, revision).await
    }

    async fn get_file_at(&self, revision: &str, path: &str) -> Result<String, StoreError> {
        reader::get_file_at(&self.ctx, revision, path).await
    }

    async fn get_file_data_at(&self, revision: &str, path: &str) -> Result<Vec<u8>, StoreError> {
        reader::get_file_data_at(&self.ctx, revision, path).await
    }

    async fn list_files_at(&self, revision: &str) -> Result<Vec<FileInfo>, StoreError> {
        reader::list_files_at(&self.ctx, revision).await
    }

    async fn stat_file_at(&self, revision: &str, path: &str) -> Result<FileInfo, StoreError> {
        reader::stat_file_at(&self.ctx, revision, path).await
    }
}
