//! engine::tag
//!
//! Tags mirrored between working copy and origin.
//!
//! A tag is never moved in place. Override deletes the tag locally and at
//! the origin, then creates and pushes it again at the new target. Deleting
//! succeeds only when both the local delete and the origin delete do.

use tracing::{debug, info};

use super::{sync, RepoContext, ORIGIN_REMOTE};
use crate::core::types::{Oid, TagName};
use crate::error::{ResultExt, StoreError};

/// Point `tag` at `from_revision` (primary tip when empty) and push it.
///
/// # Errors
///
/// - `TagAlreadyExists` if the tag exists and `override_existing` is false
/// - `NotFound` if the repository or revision does not exist
pub async fn push_tag(
    ctx: &RepoContext,
    tag: &TagName,
    from_revision: &str,
    override_existing: bool,
) -> Result<Oid, StoreError> {
    let _guard = ctx.lock().await;

    async {
        let primary = ctx.primary_branch().clone();
        let revision = from_revision.to_string();
        let probe = tag.clone();
        let (target, exists) = ctx
            .read_origin(move |git| {
                let target = if revision.is_empty() {
                    git.branch_tip(&primary)?
                } else {
                    git.resolve_revision(&revision)?
                };
                Ok((target, git.tag_exists(&probe)?))
            })
            .await?;

        if exists && !override_existing {
            return Err(StoreError::TagAlreadyExists(tag.clone()));
        }

        let primary = ctx.primary_branch();
        sync::discard_local_changes(ctx, primary).await?;
        sync::align(ctx, primary).await?;

        if exists {
            debug!(repo = %ctx.id(), tag = %tag, "overriding existing tag");
            delete_local(ctx, tag).await?;
            delete_at_origin(ctx, tag).await?;
        } else {
            delete_local(ctx, tag).await?;
        }

        ctx.git("tag")
            .args(["tag", tag.as_str(), target.as_str()])
            .run()
            .await?;
        ctx.git("push")
            .args(["push", "--quiet", ORIGIN_REMOTE])
            .arg(format!("{0}:{0}", tag.tag_ref()))
            .timeout(ctx.config().pull_timeout())
            .run()
            .await?;

        info!(repo = %ctx.id(), tag = %tag, revision = %target.short(10), "tag pushed");
        Ok(target)
    }
    .await
    .during("push tag", format!("{}:{}", ctx.id(), tag))
}

/// Remove `tag` from the working copy and the origin.
pub async fn delete_tag(ctx: &RepoContext, tag: &TagName) -> Result<(), StoreError> {
    let _guard = ctx.lock().await;

    async {
        if !tag_exists(ctx, tag).await? {
            return Err(StoreError::not_found(format!("tag '{tag}'")));
        }

        let primary = ctx.primary_branch();
        sync::discard_local_changes(ctx, primary).await?;
        sync::align(ctx, primary).await?;

        delete_local(ctx, tag).await?;
        delete_at_origin(ctx, tag).await?;

        info!(repo = %ctx.id(), tag = %tag, "tag deleted");
        Ok(())
    }
    .await
    .during("delete tag", format!("{}:{}", ctx.id(), tag))
}

pub async fn tag_exists(ctx: &RepoContext, tag: &TagName) -> Result<bool, StoreError> {
    let probe = tag.clone();
    ctx.read_origin(move |git| git.tag_exists(&probe)).await
}

pub async fn tag_list(ctx: &RepoContext) -> Result<Vec<TagName>, StoreError> {
    ctx.read_origin(|git| git.list_tags()).await
}

async fn delete_local(ctx: &RepoContext, tag: &TagName) -> Result<(), StoreError> {
    if sync::ref_exists(ctx, &tag.tag_ref()).await? {
        ctx.git("tag")
            .args(["tag", "--delete", tag.as_str()])
            .run()
            .await?;
    }
    Ok(())
}

async fn delete_at_origin(ctx: &RepoContext, tag: &TagName) -> Result<(), StoreError> {
    ctx.git("push")
        .args(["push", "--quiet", "--delete", ORIGIN_REMOTE])
        .arg(tag.tag_ref())
        .timeout(ctx.config().pull_timeout())
        .run()
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{BranchName, FileChange};
    use crate::engine::save;
    use crate::engine::test_support::{fixture, signature};

    fn v1() -> TagName {
        TagName::new("v1").unwrap()
    }

    async fn target_of(ctx: &RepoContext, tag: &TagName) -> Oid {
        let tag = tag.clone();
        ctx.read_origin(move |git| git.tag_target(&tag)).await.unwrap()
    }

    #[tokio::test]
    async fn push_defaults_to_primary_tip() {
        let fx = fixture().await;
        let ctx = &fx.ctx;
        let tip = save::resolve_tip(ctx, ctx.primary_branch()).await.unwrap();

        let target = push_tag(ctx, &v1(), "", false).await.unwrap();
        assert_eq!(target, tip);
        assert!(tag_exists(ctx, &v1()).await.unwrap());
        assert_eq!(target_of(ctx, &v1()).await, tip);
    }

    #[tokio::test]
    async fn override_moves_tag() {
        let fx = fixture().await;
        let ctx = &fx.ctx;
        let master = BranchName::new("master").unwrap();
        let first = save::resolve_tip(ctx, &master).await.unwrap();
        push_tag(ctx, &v1(), first.as_str(), false).await.unwrap();

        let second = save::save(ctx, &signature(1), "next", &master, &master, &[FileChange::new("b", "b")])
            .await
            .unwrap();

        let err = push_tag(ctx, &v1(), second.as_str(), false).await.unwrap_err();
        assert!(err.is_tag_already_exists());

        push_tag(ctx, &v1(), second.as_str(), true).await.unwrap();
        assert_eq!(tag_list(ctx).await.unwrap(), vec![v1()]);
        assert_eq!(target_of(ctx, &v1()).await, second);
    }

    #[tokio::test]
    async fn delete_removes_everywhere() {
        let fx = fixture().await;
        let ctx = &fx.ctx;
        push_tag(ctx, &v1(), "", false).await.unwrap();

        delete_tag(ctx, &v1()).await.unwrap();
        assert!(!tag_exists(ctx, &v1()).await.unwrap());
        assert!(!sync::ref_exists(ctx, "refs/tags/v1").await.unwrap());
    }

    #[tokio::test]
    async fn delete_missing_is_not_found() {
        let fx = fixture().await;
        let err = delete_tag(&fx.ctx, &v1()).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn unknown_revision_is_not_found() {
        let fx = fixture().await;
        let err = push_tag(&fx.ctx, &v1(), "no-such-rev", false).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
