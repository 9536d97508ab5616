//! Read-only commands: log, show, cat, ls, stat.
//!
//! None of these take the repository lock; they read the origin directly.

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context as _, Result};

use super::{branch_name, Context};
use crate::store::{accept_all, DocumentRepo, MessageFilter};
use crate::ui::output;

/// List revisions newest first, optionally narrowed to a branch and a
/// message substring.
pub async fn log(ctx: &Context, repo: &str, branch: Option<&str>, grep: Option<String>) -> Result<()> {
    let handle = ctx.repository(repo).await?;
    let branch = branch.map(branch_name).transpose()?;
    let filter: MessageFilter = match grep {
        Some(needle) => Arc::new(move |message: &str| message.contains(needle.as_str())),
        None => accept_all(),
    };

    let revisions = handle.commits(branch.as_ref(), filter).await?;

    if ctx.json {
        return output::json(&revisions);
    }
    for rev in &revisions {
        println!("{}", output::format_revision(rev));
    }
    Ok(())
}

pub async fn show(ctx: &Context, repo: &str, revision: &str) -> Result<()> {
    let handle = ctx.repository(repo).await?;
    let rev = handle.get_revision(revision).await?;
    if ctx.json {
        return output::json(&rev);
    }
    println!("{}", output::format_revision_long(&rev));
    Ok(())
}

/// Write the raw file bytes to stdout. `--json` wraps UTF-8 content only.
pub async fn cat(ctx: &Context, repo: &str, path: &str, rev: &str) -> Result<()> {
    let handle = ctx.repository(repo).await?;

    if ctx.json {
        let content = handle.get_file_at(rev, path).await?;
        return output::json(&serde_json::json!({ "path": path, "content": content }));
    }

    let data = handle.get_file_data_at(rev, path).await?;
    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(&data)
        .and_then(|_| stdout.flush())
        .context("failed to write file to stdout")?;
    Ok(())
}

pub async fn ls(ctx: &Context, repo: &str, rev: &str) -> Result<()> {
    let handle = ctx.repository(repo).await?;
    let files = handle.list_files_at(rev).await?;
    if ctx.json {
        return output::json(&files);
    }
    for info in &files {
        println!("{}", output::format_file_info(info));
    }
    Ok(())
}

pub async fn stat(ctx: &Context, repo: &str, path: &str, rev: &str) -> Result<()> {
    let handle = ctx.repository(repo).await?;
    let info = handle.stat_file_at(rev, path).await?;
    if ctx.json {
        return output::json(&info);
    }
    println!("{}", output::format_file_info(&info));
    Ok(())
}
