//! engine::reader
//!
//! File, tree and metadata reads at a revision.
//!
//! Every function resolves the revision at the origin first; an empty
//! revision means the primary branch tip. Paths may carry a leading `/`.
//! The root (`/` or empty) always exists as a directory, even in an empty
//! tree.

use super::RepoContext;
use crate::core::types::{BranchName, FileInfo, Oid, Revision};
use crate::error::StoreError;
use crate::git::{Git, GitError};

fn resolve(git: &Git, primary: &BranchName, rev: &str) -> Result<Oid, GitError> {
    if rev.is_empty() {
        git.branch_tip(primary)
    } else {
        git.resolve_revision(rev)
    }
}

fn normalize(path: &str) -> &str {
    path.trim_start_matches('/')
}

/// Run `read` against the resolved revision on the blocking pool.
async fn at_revision<T, F>(ctx: &RepoContext, rev: &str, read: F) -> Result<T, StoreError>
where
    F: FnOnce(&Git, &Oid) -> Result<T, GitError> + Send + 'static,
    T: Send + 'static,
{
    let primary = ctx.primary_branch().clone();
    let rev = rev.to_string();
    ctx.read_origin(move |git| {
        let oid = resolve(git, &primary, &rev)?;
        read(git, &oid)
    })
    .await
}

pub async fn get_revision(ctx: &RepoContext, rev: &str) -> Result<Revision, StoreError> {
    at_revision(ctx, rev, |git, oid| git.revision(oid)).await
}

/// File content at `rev` as UTF-8 text.
pub async fn get_file_at(ctx: &RepoContext, rev: &str, path: &str) -> Result<String, StoreError> {
    let path = normalize(path).to_string();
    at_revision(ctx, rev, move |git, oid| git.read_blob_as_string(oid, &path)).await
}

/// File content at `rev` as raw bytes.
pub async fn get_file_data_at(
    ctx: &RepoContext,
    rev: &str,
    path: &str,
) -> Result<Vec<u8>, StoreError> {
    let path = normalize(path).to_string();
    at_revision(ctx, rev, move |git, oid| git.read_blob(oid, &path)).await
}

/// Every entry of the tree at `rev`, directories included, in pre-order.
pub async fn list_files_at(ctx: &RepoContext, rev: &str) -> Result<Vec<FileInfo>, StoreError> {
    at_revision(ctx, rev, |git, oid| git.list_tree(oid)).await
}

pub async fn stat_file_at(ctx: &RepoContext, rev: &str, path: &str) -> Result<FileInfo, StoreError> {
    let path = normalize(path).to_string();
    at_revision(ctx, rev, move |git, oid| {
        if path.is_empty() {
            Ok(FileInfo::root())
        } else {
            git.stat(oid, &path)
        }
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::FileChange;
    use crate::engine::save;
    use crate::engine::test_support::{fixture, signature};

    #[tokio::test]
    async fn empty_revision_means_primary_tip() {
        let fx = fixture().await;
        let ctx = &fx.ctx;
        let tip = save::resolve_tip(ctx, ctx.primary_branch()).await.unwrap();
        assert_eq!(get_revision(ctx, "").await.unwrap().id, tip);
        assert_eq!(get_revision(ctx, tip.as_str()).await.unwrap().id, tip);
    }

    #[tokio::test]
    async fn reads_files_at_each_revision() {
        let fx = fixture().await;
        let ctx = &fx.ctx;
        let master = BranchName::new("master").unwrap();
        let first = save::resolve_tip(ctx, &master).await.unwrap();
        let second = save::save(
            ctx,
            &signature(1),
            "edit",
            &master,
            &master,
            &[FileChange::new("readme.txt", "changed"), FileChange::new("raw.bin", vec![0xff_u8, 0x00])],
        )
        .await
        .unwrap();

        assert_eq!(get_file_at(ctx, first.as_str(), "readme.txt").await.unwrap(), "hello");
        assert_eq!(get_file_at(ctx, second.as_str(), "/readme.txt").await.unwrap(), "changed");
        assert_eq!(
            get_file_data_at(ctx, "", "raw.bin").await.unwrap(),
            vec![0xff_u8, 0x00]
        );
        assert!(get_file_at(ctx, "", "raw.bin").await.is_err());
    }

    #[tokio::test]
    async fn missing_path_and_revision_are_not_found() {
        let fx = fixture().await;
        let ctx = &fx.ctx;
        assert!(get_file_data_at(ctx, "", "nope.txt").await.unwrap_err().is_not_found());
        assert!(get_revision(ctx, "deadbeef").await.unwrap_err().is_not_found());
        assert!(stat_file_at(ctx, "nope", "/").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn listing_and_stat() {
        let fx = fixture().await;
        let ctx = &fx.ctx;
        let master = BranchName::new("master").unwrap();
        save::save(ctx, &signature(1), "nested", &master, &master, &[FileChange::new("docs/a.md", "abc")])
            .await
            .unwrap();

        let listed = list_files_at(ctx, "").await.unwrap();
        let paths: Vec<_> = listed.iter().map(|f| f.path.as_str()).collect();
        assert!(paths.contains(&"docs"));
        assert!(paths.contains(&"docs/a.md"));

        let file = stat_file_at(ctx, "", "docs/a.md").await.unwrap();
        assert_eq!((file.name.as_str(), file.size, file.is_dir), ("a.md", 3, false));

        let dir = stat_file_at(ctx, "", "/docs").await.unwrap();
        assert!(dir.is_dir);

        for root in ["/", ""] {
            let info = stat_file_at(ctx, "", root).await.unwrap();
            assert_eq!(info, FileInfo::root());
        }

        let err = get_file_data_at(ctx, "", "docs").await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn empty_tree_still_has_root() {
        let fx = fixture().await;
        let ctx = &fx.ctx;
        let master = BranchName::new("master").unwrap();
        save::clean_push(ctx, &signature(1), "empty", &master, &[]).await.unwrap();

        assert!(list_files_at(ctx, "").await.unwrap().is_empty());
        assert!(stat_file_at(ctx, "", "/").await.unwrap().is_dir);
    }
}
