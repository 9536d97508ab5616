//! engine::save
//!
//! Fold a file set into a durable revision.
//!
//! # Protocol
//!
//! Every variant runs the same strictly sequential steps under the
//! repository's exclusive lock:
//!
//! ```text
//! check origin -> discard -> align -> [branch] -> write -> add -> commit -> push -> resolve
//! ```
//!
//! The returned id is read back from the origin after the push, never
//! taken from the working copy, so it always names a durable revision.
//!
//! # Variants
//!
//! - [`save`]: incremental edit of `old`, optionally as new branch `new`
//! - [`checkout_and_save`]: new branch from an arbitrary revision
//! - [`clean_push`]: replace the branch's whole tree with the file set
//! - [`initialize`]: create the origin with its first revision

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use super::{branch, sync, RepoContext, ORIGIN_REMOTE};
use crate::core::paths::path_exists;
use crate::core::types::{BranchName, FileChange, Oid, Signature};
use crate::error::{ResultExt, StoreError};

/// Message of the revision created by [`initialize`].
pub const INITIAL_COMMIT_MESSAGE: &str = "Initial commit";

/// Save `files` on `old`, or on a new branch `new` forked from it.
///
/// # Errors
///
/// - `NotFound` if the repository or `old` does not exist
/// - `BranchAlreadyExists` if `new != old` and the origin has `new`
/// - process, timeout and I/O failures from any step
pub async fn save(
    ctx: &RepoContext,
    committer: &Signature,
    message: &str,
    old: &BranchName,
    new: &BranchName,
    files: &[FileChange],
) -> Result<Oid, StoreError> {
    validate_paths(files)?;
    let _guard = ctx.lock().await;

    async {
        ctx.require_branch(old).await?;
        if old != new {
            branch::ensure_absent_at_origin(ctx, new).await?;
        }

        sync::discard_local_changes(ctx, old).await?;
        sync::align(ctx, old).await?;
        if old != new {
            branch::create_branch(ctx, old.as_str(), new).await?;
        }

        write_files(ctx.work_path(), files).await?;
        commit(ctx, ctx.work_path(), committer, message).await?;
        push_branch(ctx, ctx.work_path(), new).await?;
        resolve_tip(ctx, new).await
    }
    .await
    .during("save", format!("{}@{}", ctx.id(), new))
}

/// Save `files` on a new branch `new` forked from `revision`.
///
/// An empty `revision` means the primary branch tip.
pub async fn checkout_and_save(
    ctx: &RepoContext,
    committer: &Signature,
    message: &str,
    revision: &str,
    new: &BranchName,
    files: &[FileChange],
) -> Result<Oid, StoreError> {
    validate_paths(files)?;
    let _guard = ctx.lock().await;

    async {
        let start = resolve_start(ctx, revision).await?;
        branch::ensure_absent_at_origin(ctx, new).await?;

        let primary = ctx.primary_branch().clone();
        sync::discard_local_changes(ctx, &primary).await?;
        sync::align(ctx, &primary).await?;
        branch::create_branch(ctx, start.as_str(), new).await?;

        write_files(ctx.work_path(), files).await?;
        commit(ctx, ctx.work_path(), committer, message).await?;
        push_branch(ctx, ctx.work_path(), new).await?;
        resolve_tip(ctx, new).await
    }
    .await
    .during("checkout and save", format!("{}@{}", ctx.id(), new))
}

/// Replace everything on `branch` with exactly `files`.
pub async fn clean_push(
    ctx: &RepoContext,
    committer: &Signature,
    message: &str,
    branch: &BranchName,
    files: &[FileChange],
) -> Result<Oid, StoreError> {
    validate_paths(files)?;
    let _guard = ctx.lock().await;

    async {
        ctx.require_branch(branch).await?;
        sync::discard_local_changes(ctx, branch).await?;
        sync::align(ctx, branch).await?;

        ctx.git("rm")
            .args(["rm", "-r", "--quiet", "--ignore-unmatch", "--", "."])
            .run()
            .await?;

        write_files(ctx.work_path(), files).await?;
        commit(ctx, ctx.work_path(), committer, message).await?;
        push_branch(ctx, ctx.work_path(), branch).await?;
        resolve_tip(ctx, branch).await
    }
    .await
    .during("clean push", format!("{}@{}", ctx.id(), branch))
}

/// Create the bare origin and push its first revision on the primary branch.
///
/// The first revision holds `files` plus an empty `.gitignore` unless the
/// caller supplied one. On failure the half-created origin is removed.
/// Callers hold the repository's lock.
pub async fn initialize(
    ctx: &RepoContext,
    committer: &Signature,
    files: &[FileChange],
) -> Result<Oid, StoreError> {
    if ctx.origin_exists() {
        return Err(StoreError::RepositoryExists(ctx.id().clone()));
    }
    validate_paths(files)?;

    let created = !path_exists(ctx.origin_path());
    let result = initialize_inner(ctx, committer, files).await;
    if result.is_err() && created && path_exists(ctx.origin_path()) {
        if let Err(e) = tokio::fs::remove_dir_all(ctx.origin_path()).await {
            warn!(path = %ctx.origin_path().display(), error = %e, "failed to remove half-created origin");
        }
    }
    result.during("init", ctx.id())
}

async fn initialize_inner(
    ctx: &RepoContext,
    committer: &Signature,
    files: &[FileChange],
) -> Result<Oid, StoreError> {
    let origin = ctx.origin_path();
    let primary = ctx.primary_branch();

    tokio::fs::create_dir_all(origin)
        .await
        .map_err(|e| StoreError::io(origin, e))?;
    ctx.git_global("init")
        .args(["init", "--bare", "--quiet"])
        .arg(origin)
        .run()
        .await?;
    ctx.git_global("symbolic-ref")
        .current_dir(origin)
        .args(["symbolic-ref", "HEAD"])
        .arg(primary.local_ref())
        .run()
        .await?;

    let staging_root = ctx.config().paths().staging_dir();
    tokio::fs::create_dir_all(&staging_root)
        .await
        .map_err(|e| StoreError::io(&staging_root, e))?;
    let staging = tempfile::Builder::new()
        .prefix("init-")
        .tempdir_in(&staging_root)
        .map_err(|e| StoreError::io(&staging_root, e))?;
    let clone = staging.path().join("repo");

    ctx.git_global("clone")
        .args(["clone", "--quiet", "--"])
        .arg(origin)
        .arg(&clone)
        .timeout(ctx.config().clone_timeout())
        .run()
        .await?;
    ctx.git_global("symbolic-ref")
        .current_dir(&clone)
        .args(["symbolic-ref", "HEAD"])
        .arg(primary.local_ref())
        .run()
        .await?;

    write_files(&clone, files).await?;
    if !files.iter().any(|f| f.path == ".gitignore") {
        write_files(&clone, &[FileChange::new(".gitignore", Vec::new())]).await?;
    }
    commit(ctx, &clone, committer, INITIAL_COMMIT_MESSAGE).await?;
    push_branch(ctx, &clone, primary).await?;

    let tip = resolve_tip(ctx, primary).await?;
    info!(repo = %ctx.id(), revision = %tip.short(10), "repository initialized");
    Ok(tip)
}

// =============================================================================
// Steps
// =============================================================================

/// Resolve a caller-supplied start revision at the origin.
async fn resolve_start(ctx: &RepoContext, revision: &str) -> Result<Oid, StoreError> {
    let primary = ctx.primary_branch().clone();
    let revision = revision.to_string();
    ctx.read_origin(move |git| {
        if revision.is_empty() {
            git.branch_tip(&primary)
        } else {
            git.resolve_revision(&revision)
        }
    })
    .await
}

fn validate_paths(files: &[FileChange]) -> Result<(), StoreError> {
    for change in files {
        change.validated_path()?;
    }
    Ok(())
}

/// Map a validated slash path onto `root`.
fn destination(root: &Path, relative: &str) -> PathBuf {
    relative
        .split('/')
        .fold(root.to_path_buf(), |path, part| path.join(part))
}

/// Write every change under `root`, creating parent directories and
/// overwriting existing files.
pub(crate) async fn write_files(root: &Path, files: &[FileChange]) -> Result<(), StoreError> {
    for change in files {
        let dest = destination(root, change.validated_path()?);
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::io(parent, e))?;
        }
        tokio::fs::write(&dest, &change.data)
            .await
            .map_err(|e| StoreError::io(&dest, e))?;
    }
    Ok(())
}

/// Stage everything in `dir` and commit it as `committer`.
///
/// Always produces a revision, even when nothing changed.
pub(crate) async fn commit(
    ctx: &RepoContext,
    dir: &Path,
    committer: &Signature,
    message: &str,
) -> Result<(), StoreError> {
    ctx.git_global("add")
        .current_dir(dir)
        .args(["add", "--all"])
        .run()
        .await?;

    let mut commit = ctx
        .git_global("commit")
        .current_dir(dir)
        .args(["-c", "commit.gpgsign=false", "commit", "--quiet", "--no-verify"])
        .args(["--allow-empty", "--allow-empty-message", "-m", message]);
    for (key, value) in committer.git_env() {
        commit = commit.env(key, value);
    }
    commit.run().await?;
    Ok(())
}

/// Push the local `branch` in `dir` to the same name at origin.
pub(crate) async fn push_branch(
    ctx: &RepoContext,
    dir: &Path,
    branch: &BranchName,
) -> Result<(), StoreError> {
    ctx.git_global("push")
        .current_dir(dir)
        .args(["push", "--quiet", ORIGIN_REMOTE])
        .arg(format!("{0}:{0}", branch.local_ref()))
        .timeout(ctx.config().pull_timeout())
        .run()
        .await?;
    Ok(())
}

/// The origin's tip for `branch`.
pub(crate) async fn resolve_tip(ctx: &RepoContext, branch: &BranchName) -> Result<Oid, StoreError> {
    let name = branch.clone();
    let tip = ctx.read_origin(move |git| git.branch_tip(&name)).await?;
    info!(repo = %ctx.id(), branch = %branch, revision = %tip.short(10), "revision saved");
    Ok(tip)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::{fixture, signature};

    fn master() -> BranchName {
        BranchName::new("master").unwrap()
    }

    async fn file_at(ctx: &RepoContext, oid: &Oid, path: &'static str) -> String {
        let oid = oid.clone();
        ctx.read_origin(move |git| git.read_blob_as_string(&oid, path))
            .await
            .unwrap()
    }

    async fn parents(ctx: &RepoContext, oid: &Oid) -> Vec<Oid> {
        let oid = oid.clone();
        ctx.read_origin(move |git| git.revision(&oid))
            .await
            .unwrap()
            .parent_ids
    }

    mod initialize {
        use super::*;

        #[tokio::test]
        async fn writes_initial_revision_with_gitignore() {
            let fx = fixture().await;
            let ctx = &fx.ctx;
            let tip = resolve_tip(ctx, &master()).await.unwrap();

            assert_eq!(file_at(ctx, &tip, "readme.txt").await, "hello");
            assert_eq!(file_at(ctx, &tip, ".gitignore").await, "");
            let revision = {
                let tip = tip.clone();
                ctx.read_origin(move |git| git.revision(&tip)).await.unwrap()
            };
            assert_eq!(revision.message, INITIAL_COMMIT_MESSAGE);
            assert!(revision.parent_ids.is_empty());
        }

        #[tokio::test]
        async fn existing_origin_is_rejected() {
            let fx = fixture().await;
            let err = initialize(&fx.ctx, &signature(1), &[]).await.unwrap_err();
            assert!(matches!(err, StoreError::RepositoryExists(_)));
        }
    }

    mod save {
        use super::*;

        #[tokio::test]
        async fn successive_saves_chain() {
            let fx = fixture().await;
            let ctx = &fx.ctx;
            let files = |v: &str| vec![FileChange::new("a.txt", v.as_bytes().to_vec())];

            let first = save(ctx, &signature(1), "v1", &master(), &master(), &files("v1"))
                .await
                .unwrap();
            let second = save(ctx, &signature(2), "v2", &master(), &master(), &files("v2"))
                .await
                .unwrap();

            assert_eq!(parents(ctx, &second).await, vec![first.clone()]);
            assert_eq!(file_at(ctx, &first, "a.txt").await, "v1");
            assert_eq!(file_at(ctx, &second, "a.txt").await, "v2");
        }

        #[tokio::test]
        async fn unchanged_files_still_create_revision() {
            let fx = fixture().await;
            let ctx = &fx.ctx;
            let before = resolve_tip(ctx, &master()).await.unwrap();
            let after = save(ctx, &signature(1), "noop", &master(), &master(), &[])
                .await
                .unwrap();
            assert_ne!(before, after);
        }

        #[tokio::test]
        async fn new_branch_forks_from_old() {
            let fx = fixture().await;
            let ctx = &fx.ctx;
            let base = resolve_tip(ctx, &master()).await.unwrap();
            let drafts = BranchName::new("drafts").unwrap();

            let tip = save(
                ctx,
                &signature(1),
                "draft",
                &master(),
                &drafts,
                &[FileChange::new("notes/one.md", "1")],
            )
            .await
            .unwrap();

            assert_eq!(parents(ctx, &tip).await, vec![base.clone()]);
            assert_eq!(file_at(ctx, &tip, "notes/one.md").await, "1");
            assert_eq!(resolve_tip(ctx, &master()).await.unwrap(), base);
        }

        #[tokio::test]
        async fn existing_new_branch_is_rejected() {
            let fx = fixture().await;
            let ctx = &fx.ctx;
            let drafts = BranchName::new("drafts").unwrap();
            save(ctx, &signature(1), "a", &master(), &drafts, &[]).await.unwrap();

            let err = save(ctx, &signature(2), "b", &master(), &drafts, &[])
                .await
                .unwrap_err();
            assert!(err.is_branch_already_exists());
        }

        #[tokio::test]
        async fn missing_old_branch_is_not_found() {
            let fx = fixture().await;
            let ghost = BranchName::new("ghost").unwrap();
            let err = save(&fx.ctx, &signature(1), "x", &ghost, &ghost, &[])
                .await
                .unwrap_err();
            assert!(err.is_not_found());
        }

        #[tokio::test]
        async fn escaping_path_is_rejected_before_git() {
            let fx = fixture().await;
            let err = save(
                &fx.ctx,
                &signature(1),
                "x",
                &master(),
                &master(),
                &[FileChange::new("../outside", "x")],
            )
            .await
            .unwrap_err();
            assert!(matches!(err, StoreError::InvalidInput(_)));
            assert!(!fx.ctx.work_copy_exists());
        }
    }

    mod variants {
        use super::*;

        #[tokio::test]
        async fn checkout_and_save_from_old_revision() {
            let fx = fixture().await;
            let ctx = &fx.ctx;
            let base = resolve_tip(ctx, &master()).await.unwrap();
            save(ctx, &signature(1), "later", &master(), &master(), &[FileChange::new("later.txt", "x")])
                .await
                .unwrap();

            let fork = BranchName::new("fork").unwrap();
            let tip = checkout_and_save(
                ctx,
                &signature(2),
                "forked",
                base.as_str(),
                &fork,
                &[FileChange::new("fork.txt", "f")],
            )
            .await
            .unwrap();

            assert_eq!(parents(ctx, &tip).await, vec![base]);
            let fork_tip = tip.clone();
            let has_later = ctx
                .read_origin(move |git| Ok(git.stat(&fork_tip, "later.txt").is_ok()))
                .await
                .unwrap();
            assert!(!has_later);
        }

        #[tokio::test]
        async fn checkout_and_save_defaults_to_primary() {
            let fx = fixture().await;
            let ctx = &fx.ctx;
            let base = resolve_tip(ctx, &master()).await.unwrap();
            let fork = BranchName::new("fork").unwrap();

            let tip = checkout_and_save(ctx, &signature(1), "f", "", &fork, &[])
                .await
                .unwrap();
            assert_eq!(parents(ctx, &tip).await, vec![base]);
        }

        #[tokio::test]
        async fn clean_push_replaces_tree() {
            let fx = fixture().await;
            let ctx = &fx.ctx;
            let tip = clean_push(
                ctx,
                &signature(1),
                "snapshot",
                &master(),
                &[FileChange::new("only.txt", "1")],
            )
            .await
            .unwrap();

            let listed = ctx.read_origin(move |git| git.list_tree(&tip)).await.unwrap();
            let paths: Vec<_> = listed.into_iter().map(|e| e.path).collect();
            assert_eq!(paths, vec!["only.txt".to_string()]);
        }
    }
}
