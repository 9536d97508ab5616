//! Repository lifecycle commands: init, exists, delete, list.

use anyhow::Result;
use serde_json::json;

use super::{read_files, repo_id, Context};
use crate::cli::args::{AuthorArgs, FileArg};
use crate::ui::output;

/// Create a repository with an initial revision.
pub async fn init(ctx: &Context, repo: &str, files: &[FileArg], author: &AuthorArgs) -> Result<()> {
    let id = repo_id(repo)?;
    let files = read_files(files).await?;
    let committer = author.signature(ctx.store.config());

    let rev = ctx.store.init(&id, &committer, &files).await?;

    if ctx.json {
        return output::json(&json!({ "repository": id, "revision": rev }));
    }
    output::print(
        format!("Initialized '{}' at {}", id, rev.short(10)),
        ctx.verbosity,
    );
    Ok(())
}

/// Print `true` or `false`. The exit status is 0 either way.
pub fn exists(ctx: &Context, repo: &str) -> Result<()> {
    let id = repo_id(repo)?;
    let exists = ctx.store.exists(&id);
    if ctx.json {
        return output::json(&json!({ "repository": id, "exists": exists }));
    }
    println!("{}", exists);
    Ok(())
}

pub async fn delete(ctx: &Context, repo: &str) -> Result<()> {
    let id = repo_id(repo)?;
    ctx.store.delete(&id).await?;
    if ctx.json {
        return output::json(&json!({ "repository": id, "deleted": true }));
    }
    output::print(format!("Deleted '{}'", id), ctx.verbosity);
    Ok(())
}

pub async fn list(ctx: &Context) -> Result<()> {
    let ids = ctx.store.list_repositories().await?;
    if ctx.json {
        return output::json(&ids);
    }
    if ids.is_empty() {
        output::print("No repositories.", ctx.verbosity);
        return Ok(());
    }
    println!("{}", output::format_list(&ids, ""));
    Ok(())
}
