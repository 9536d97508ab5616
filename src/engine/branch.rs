//! engine::branch
//!
//! Branch creation with origin-side collision checks.
//!
//! A branch name is never reused at the origin. The check reads the origin
//! directly, so it is accurate even when the working copy's tracking refs
//! are stale. A local branch of the same name that the origin does not know
//! is left over from an earlier failed operation and is deleted.

use tracing::debug;

use super::{save, sync, RepoContext};
use crate::core::types::{BranchName, Oid};
use crate::error::{ResultExt, StoreError};

/// Fail with `BranchAlreadyExists` if the origin has `name`.
///
/// Touches nothing but the origin's refs, so it is safe to call before any
/// working-copy mutation.
pub async fn ensure_absent_at_origin(
    ctx: &RepoContext,
    name: &BranchName,
) -> Result<(), StoreError> {
    let probe = name.clone();
    if ctx.read_origin(move |git| git.branch_exists(&probe)).await? {
        return Err(StoreError::BranchAlreadyExists(name.clone()));
    }
    Ok(())
}

/// Check out a new branch `name` starting at `start_point` in the working copy.
///
/// `start_point` is any revision the working copy can resolve: the local
/// source branch after alignment, or a revision id.
pub async fn create_branch(
    ctx: &RepoContext,
    start_point: &str,
    name: &BranchName,
) -> Result<(), StoreError> {
    ensure_absent_at_origin(ctx, name).await?;

    if sync::ref_exists(ctx, &name.local_ref()).await? {
        debug!(repo = %ctx.id(), branch = %name, "deleting stale local branch");
        ctx.git("branch")
            .args(["branch", "-D", name.as_str()])
            .run()
            .await?;
    }

    ctx.git("checkout")
        .args(["checkout", "--quiet", "--no-track", "-b", name.as_str(), start_point])
        .timeout(ctx.config().pull_timeout())
        .run()
        .await?;

    debug!(repo = %ctx.id(), branch = %name, from = start_point, "branch created");
    Ok(())
}

/// Create `new` from `from` and publish it to the origin.
///
/// Returns the new branch's tip, which is `from`'s tip.
pub async fn create_and_push(
    ctx: &RepoContext,
    from: &BranchName,
    new: &BranchName,
) -> Result<Oid, StoreError> {
    let _guard = ctx.lock().await;

    async {
        ctx.require_branch(from).await?;
        ensure_absent_at_origin(ctx, new).await?;

        sync::discard_local_changes(ctx, from).await?;
        sync::align(ctx, from).await?;
        create_branch(ctx, from.as_str(), new).await?;

        save::push_branch(ctx, ctx.work_path(), new).await?;
        save::resolve_tip(ctx, new).await
    }
    .await
    .during("create branch", format!("{}@{}", ctx.id(), new))
}
