//! Saving commands: save, save-as, replace.

use anyhow::Result;
use serde_json::json;

use super::{branch_name, read_files, Context};
use crate::cli::args::{AuthorArgs, FileArg};
use crate::core::types::{BranchName, Oid};
use crate::store::DocumentRepo;
use crate::ui::output;

pub async fn save(
    ctx: &Context,
    repo: &str,
    message: &str,
    branch: Option<&str>,
    new_branch: Option<&str>,
    files: &[FileArg],
    author: &AuthorArgs,
) -> Result<()> {
    let handle = ctx.repository(repo).await?;
    let old = ctx.branch_or_primary(branch)?;
    let new = match new_branch {
        Some(name) => branch_name(name)?,
        None => old.clone(),
    };
    let files = read_files(files).await?;
    let committer = author.signature(ctx.store.config());

    let rev = handle.save(&committer, message, &old, &new, &files).await?;
    report(ctx, &new, &rev)
}

pub async fn save_as(
    ctx: &Context,
    repo: &str,
    branch: &str,
    from: &str,
    message: &str,
    files: &[FileArg],
    author: &AuthorArgs,
) -> Result<()> {
    let handle = ctx.repository(repo).await?;
    let new = branch_name(branch)?;
    let files = read_files(files).await?;
    let committer = author.signature(ctx.store.config());

    let rev = handle
        .checkout_and_save(&committer, message, from, &new, &files)
        .await?;
    report(ctx, &new, &rev)
}

pub async fn replace(
    ctx: &Context,
    repo: &str,
    message: &str,
    branch: Option<&str>,
    files: &[FileArg],
    author: &AuthorArgs,
) -> Result<()> {
    let handle = ctx.repository(repo).await?;
    let branch = ctx.branch_or_primary(branch)?;
    let files = read_files(files).await?;
    let committer = author.signature(ctx.store.config());

    let rev = handle.clean_push(&committer, message, &branch, &files).await?;
    report(ctx, &branch, &rev)
}

fn report(ctx: &Context, branch: &BranchName, rev: &Oid) -> Result<()> {
    if ctx.json {
        return output::json(&json!({ "branch": branch, "revision": rev }));
    }
    output::print(
        format!("Saved {} on '{}'", rev.short(10), branch),
        ctx.verbosity,
    );
    Ok(())
}
