//! engine::history
//!
//! Deduplicated, time-ordered revision listing across branches.
//!
//! # Algorithm
//!
//! Depth-first walk from each branch tip over parent links, with one
//! visited set shared by every branch of the call. A revision reachable
//! from several branches is therefore reported once. The message filter
//! decides output only: a rejected revision's parents are still walked.
//! Merge revisions push all of their parents.
//!
//! Walk order carries no meaning. The result is sorted newest first, with
//! ties broken by revision id so equal timestamps list deterministically.

use std::collections::HashSet;
use std::sync::Arc;

use super::RepoContext;
use crate::core::types::{BranchName, Oid, Revision};
use crate::error::StoreError;
use crate::git::{Git, GitError};

/// Predicate over a revision message deciding whether it is listed.
pub type MessageFilter = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Filter that lists every revision.
pub fn accept_all() -> MessageFilter {
    Arc::new(|_| true)
}

/// List revisions reachable from `branch`, or from every branch when `None`.
pub async fn commits(
    ctx: &RepoContext,
    branch: Option<&BranchName>,
    filter: MessageFilter,
) -> Result<Vec<Revision>, StoreError> {
    let branch = branch.cloned();
    ctx.read_origin(move |git| walk(git, branch.as_ref(), filter.as_ref()))
        .await
}

/// The traversal itself, over an open origin.
pub fn walk(
    git: &Git,
    branch: Option<&BranchName>,
    filter: &(dyn Fn(&str) -> bool + Send + Sync),
) -> Result<Vec<Revision>, GitError> {
    let branches = match branch {
        Some(name) => vec![name.clone()],
        None => git.list_branches()?,
    };

    let mut seen: HashSet<Oid> = HashSet::new();
    let mut listed = Vec::new();

    for name in &branches {
        let mut pending = vec![git.branch_tip(name)?];
        while let Some(id) = pending.pop() {
            if !seen.insert(id.clone()) {
                continue;
            }
            let revision = git.revision(&id)?;
            pending.extend(revision.parent_ids.iter().cloned());
            if filter(&revision.message) {
                listed.push(revision);
            }
        }
    }

    listed.sort_by(|a, b| {
        b.timestamp
            .cmp(&a.timestamp)
            .then_with(|| a.id.cmp(&b.id))
    });
    Ok(listed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::FileChange;
    use crate::engine::save::{self, INITIAL_COMMIT_MESSAGE};
    use crate::engine::test_support::{fixture, signature};

    fn name(s: &str) -> BranchName {
        BranchName::new(s).unwrap()
    }

    /// master: init -> m1 -> m2, feature: init -> m1 -> f1
    async fn forked(ctx: &RepoContext) -> (Oid, Oid) {
        let master = name("master");
        let feature = name("feature");
        let m1 = save::save(ctx, &signature(10), "m1", &master, &master, &[FileChange::new("m", "1")])
            .await
            .unwrap();
        save::save(ctx, &signature(20), "f1", &master, &feature, &[FileChange::new("f", "1")])
            .await
            .unwrap();
        let m2 = save::save(ctx, &signature(30), "m2", &master, &master, &[FileChange::new("m", "2")])
            .await
            .unwrap();
        (m1, m2)
    }

    fn messages(revisions: &[Revision]) -> Vec<&str> {
        revisions.iter().map(|r| r.message.as_str()).collect()
    }

    #[tokio::test]
    async fn all_branches_deduplicated_and_sorted() {
        let fx = fixture().await;
        let ctx = &fx.ctx;
        forked(ctx).await;

        let listed = commits(ctx, None, accept_all()).await.unwrap();
        assert_eq!(messages(&listed), vec!["m2", "f1", "m1", INITIAL_COMMIT_MESSAGE]);

        let unique: HashSet<_> = listed.iter().map(|r| r.id.clone()).collect();
        assert_eq!(unique.len(), listed.len());
        assert!(listed.windows(2).all(|w| w[0].timestamp > w[1].timestamp));
    }

    #[tokio::test]
    async fn single_branch_excludes_other_branches() {
        let fx = fixture().await;
        let ctx = &fx.ctx;
        forked(ctx).await;

        let listed = commits(ctx, Some(&name("feature")), accept_all()).await.unwrap();
        assert_eq!(messages(&listed), vec!["f1", "m1", INITIAL_COMMIT_MESSAGE]);
    }

    #[tokio::test]
    async fn filter_hides_output_but_not_ancestors() {
        let fx = fixture().await;
        let ctx = &fx.ctx;
        forked(ctx).await;

        let filter: MessageFilter = Arc::new(|m| !m.starts_with('m'));
        let listed = commits(ctx, Some(&name("master")), filter).await.unwrap();
        assert_eq!(messages(&listed), vec![INITIAL_COMMIT_MESSAGE]);
    }

    #[tokio::test]
    async fn merge_parents_are_all_walked() {
        let fx = fixture().await;
        let ctx = &fx.ctx;
        forked(ctx).await;

        // Merge feature into master directly in the working copy and push.
        save::save(ctx, &signature(40), "touch", &name("master"), &name("master"), &[])
            .await
            .unwrap();
        ctx.git("merge")
            .args(["-c", "commit.gpgsign=false", "merge", "--no-ff", "--quiet", "-m", "merge"])
            .arg("refs/remotes/origin/feature")
            .env("GIT_AUTHOR_NAME", "T")
            .env("GIT_AUTHOR_EMAIL", "t@t")
            .env("GIT_AUTHOR_DATE", "1700000050 +0000")
            .env("GIT_COMMITTER_NAME", "T")
            .env("GIT_COMMITTER_EMAIL", "t@t")
            .env("GIT_COMMITTER_DATE", "1700000050 +0000")
            .run()
            .await
            .unwrap();
        ctx.git("push")
            .args(["push", "--quiet", "origin", "master"])
            .run()
            .await
            .unwrap();

        let listed = commits(ctx, Some(&name("master")), accept_all()).await.unwrap();
        assert_eq!(listed[0].message, "merge");
        assert_eq!(listed[0].parent_ids.len(), 2);
        assert!(messages(&listed).contains(&"f1"));
    }

    #[tokio::test]
    async fn unknown_branch_is_not_found() {
        let fx = fixture().await;
        let err = commits(&fx.ctx, Some(&name("ghost")), accept_all())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
