//! tag command - Create, delete, probe and list tags

use anyhow::Result;
use serde_json::json;

use super::{tag_name, Context};
use crate::store::DocumentRepo;
use crate::ui::output;

pub async fn push(ctx: &Context, repo: &str, name: &str, from: &str, force: bool) -> Result<()> {
    let handle = ctx.repository(repo).await?;
    let tag = tag_name(name)?;

    let target = handle.push_tag(&tag, from, force).await?;

    if ctx.json {
        return output::json(&json!({ "tag": tag, "revision": target }));
    }
    output::print(
        format!("Tagged {} as '{}'", target.short(10), tag),
        ctx.verbosity,
    );
    Ok(())
}

pub async fn delete(ctx: &Context, repo: &str, name: &str) -> Result<()> {
    let handle = ctx.repository(repo).await?;
    let tag = tag_name(name)?;
    handle.delete_tag(&tag).await?;

    if ctx.json {
        return output::json(&json!({ "tag": tag, "deleted": true }));
    }
    output::print(format!("Deleted tag '{}'", tag), ctx.verbosity);
    Ok(())
}

pub async fn exists(ctx: &Context, repo: &str, name: &str) -> Result<()> {
    let handle = ctx.repository(repo).await?;
    let tag = tag_name(name)?;
    let exists = handle.tag_exists(&tag).await?;

    if ctx.json {
        return output::json(&json!({ "tag": tag, "exists": exists }));
    }
    println!("{}", exists);
    Ok(())
}

pub async fn list(ctx: &Context, repo: &str) -> Result<()> {
    let handle = ctx.repository(repo).await?;
    let tags = handle.tag_list().await?;
    if ctx.json {
        return output::json(&tags);
    }
    println!("{}", output::format_list(&tags, ""));
    Ok(())
}
