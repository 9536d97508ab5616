//! engine::sync
//!
//! Bring a working copy into a known-good state relative to its origin.
//!
//! # Algorithm
//!
//! [`align`] has two cases:
//!
//! 1. **Absent copy**: clone the origin at the branch, bounded by the clone
//!    timeout. A failed clone leaves nothing behind.
//! 2. **Present copy**: fetch with pruning, force-checkout the branch at
//!    its tracking ref, hard-reset to it and remove untracked files. Local
//!    commits and edits are always discarded, never merged, so a
//!    force-pushed origin is handled the same way as ordinary drift.
//!
//! [`discard_local_changes`] runs first in every mutation. It is a no-op
//! when the copy or the branch does not exist yet.
//!
//! Neither function retries. A failure is returned with the operation,
//! repository and branch attached.

use tracing::{debug, warn};

use super::{RepoContext, ORIGIN_REMOTE};
use crate::core::paths::path_exists;
use crate::core::types::BranchName;
use crate::error::{ResultExt, StoreError};

/// Reset a local `branch` to its tracking ref if both exist.
pub async fn discard_local_changes(
    ctx: &RepoContext,
    branch: &BranchName,
) -> Result<(), StoreError> {
    discard_inner(ctx, branch)
        .await
        .during("discard local changes", target(ctx, branch))
}

async fn discard_inner(ctx: &RepoContext, branch: &BranchName) -> Result<(), StoreError> {
    if !ctx.work_copy_exists() || !has_git_dir(ctx) {
        return Ok(());
    }

    let tracking = branch.remote_ref(ORIGIN_REMOTE);
    if !ref_exists(ctx, &branch.local_ref()).await? || !ref_exists(ctx, &tracking).await? {
        debug!(repo = %ctx.id(), branch = %branch, "nothing to discard");
        return Ok(());
    }

    if current_branch(ctx).await?.as_deref() == Some(branch.as_str()) {
        ctx.git("reset")
            .args(["reset", "--hard", "--quiet"])
            .arg(&tracking)
            .run()
            .await?;
    } else {
        // Drop edits on whatever is checked out, then move the branch.
        ctx.git("reset")
            .args(["reset", "--hard", "--quiet"])
            .run()
            .await?;
        ctx.git("branch")
            .args(["branch", "--force", branch.as_str()])
            .arg(&tracking)
            .run()
            .await?;
    }
    Ok(())
}

/// Make the working copy exist with `branch` checked out at origin's tip.
pub async fn align(ctx: &RepoContext, branch: &BranchName) -> Result<(), StoreError> {
    align_inner(ctx, branch)
        .await
        .during("align", target(ctx, branch))
}

async fn align_inner(ctx: &RepoContext, branch: &BranchName) -> Result<(), StoreError> {
    if ctx.work_copy_exists() && !has_git_dir(ctx) {
        warn!(path = %ctx.work_path().display(), "working copy has no git directory, recloning");
        remove_work_copy(ctx).await?;
    }

    if !ctx.work_copy_exists() {
        return clone_work_copy(ctx, branch).await;
    }

    let pull_timeout = ctx.config().pull_timeout();
    let tracking = branch.remote_ref(ORIGIN_REMOTE);

    ctx.git("fetch")
        .args(["fetch", "--quiet", "--prune", "--tags", "--force", ORIGIN_REMOTE])
        .timeout(pull_timeout)
        .run()
        .await?;

    if !ref_exists(ctx, &tracking).await? {
        return Err(StoreError::not_found(format!("branch '{branch}' at origin")));
    }

    ctx.git("checkout")
        .args(["checkout", "--quiet", "--force", "-B", branch.as_str()])
        .arg(&tracking)
        .timeout(pull_timeout)
        .run()
        .await?;
    ctx.git("reset")
        .args(["reset", "--hard", "--quiet"])
        .arg(&tracking)
        .run()
        .await?;
    ctx.git("clean")
        .args(["clean", "-ffd", "--quiet"])
        .run()
        .await?;

    debug!(repo = %ctx.id(), branch = %branch, "working copy aligned");
    Ok(())
}

async fn clone_work_copy(ctx: &RepoContext, branch: &BranchName) -> Result<(), StoreError> {
    let work = ctx.work_path();
    if let Some(parent) = work.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| StoreError::io(parent, e))?;
    }

    let cloned = ctx
        .git_global("clone")
        .args(["clone", "--quiet", "--branch", branch.as_str(), "--"])
        .arg(ctx.origin_path())
        .arg(work)
        .timeout(ctx.config().clone_timeout())
        .run()
        .await;

    if let Err(e) = cloned {
        if path_exists(work) {
            if let Err(cleanup) = tokio::fs::remove_dir_all(work).await {
                warn!(path = %work.display(), error = %cleanup, "failed to remove partial clone");
            }
        }
        return Err(e.into());
    }

    debug!(repo = %ctx.id(), branch = %branch, "working copy cloned");
    Ok(())
}

/// Put the working copy at `reference`.
///
/// A branch name aligns that branch. Any other revision aligns the primary
/// branch and then detaches at the resolved revision.
pub async fn checkout(ctx: &RepoContext, reference: &str) -> Result<(), StoreError> {
    let _guard = ctx.lock().await;

    async {
        let candidate = BranchName::new(reference).ok();
        let probe = candidate.clone();
        let reference_owned = reference.to_string();
        let (is_branch, target) = ctx
            .read_origin(move |git| {
                if let Some(branch) = &probe {
                    if git.branch_exists(branch)? {
                        return Ok((true, None));
                    }
                }
                Ok((false, Some(git.resolve_revision(&reference_owned)?)))
            })
            .await?;

        match (candidate, is_branch, target) {
            (Some(branch), true, _) => {
                discard_local_changes(ctx, &branch).await?;
                align(ctx, &branch).await
            }
            (_, _, Some(oid)) => {
                let primary = ctx.primary_branch();
                discard_local_changes(ctx, primary).await?;
                align(ctx, primary).await?;
                ctx.git("checkout")
                    .args(["checkout", "--quiet", "--detach", oid.as_str()])
                    .timeout(ctx.config().pull_timeout())
                    .run()
                    .await?;
                debug!(repo = %ctx.id(), revision = %oid.short(10), "working copy detached");
                Ok(())
            }
            _ => Err(StoreError::not_found(format!("revision '{reference}'"))),
        }
    }
    .await
    .during("checkout", format!("{}@{}", ctx.id(), reference))
}

/// Delete the working copy. It holds nothing the origin does not.
pub async fn remove_work_copy(ctx: &RepoContext) -> Result<(), StoreError> {
    let work = ctx.work_path();
    if !path_exists(work) {
        return Ok(());
    }
    tokio::fs::remove_dir_all(work)
        .await
        .map_err(|e| StoreError::io(work, e))
}

/// Whether `refname` resolves in the working copy.
pub(crate) async fn ref_exists(ctx: &RepoContext, refname: &str) -> Result<bool, StoreError> {
    Ok(ctx
        .git("show-ref")
        .args(["show-ref", "--verify", "--quiet"])
        .arg(refname)
        .succeeds()
        .await?)
}

async fn current_branch(ctx: &RepoContext) -> Result<Option<String>, StoreError> {
    match ctx
        .git("symbolic-ref")
        .args(["symbolic-ref", "--quiet", "--short", "HEAD"])
        .run()
        .await
    {
        Ok(out) => Ok(Some(out.stdout.trim().to_string())),
        Err(e) if e.is_exit_failure() => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn has_git_dir(ctx: &RepoContext) -> bool {
    path_exists(&ctx.work_path().join(".git"))
}

fn target(ctx: &RepoContext, branch: &BranchName) -> String {
    format!("{}@{}", ctx.id(), branch)
}
