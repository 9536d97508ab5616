//! Branch commands: branch, branches, checkout.

use anyhow::Result;
use serde_json::json;

use super::{branch_name, Context};
use crate::store::DocumentRepo;
use crate::ui::output;

/// Create `name` at the tip of `from` and push it.
pub async fn create(ctx: &Context, repo: &str, name: &str, from: Option<&str>) -> Result<()> {
    let handle = ctx.repository(repo).await?;
    let from = ctx.branch_or_primary(from)?;
    let name = branch_name(name)?;

    let tip = handle.create_branch(&from, &name).await?;

    if ctx.json {
        return output::json(&json!({ "branch": name, "from": from, "revision": tip }));
    }
    output::print(
        format!("Created '{}' from '{}' at {}", name, from, tip.short(10)),
        ctx.verbosity,
    );
    Ok(())
}

pub async fn list(ctx: &Context, repo: &str) -> Result<()> {
    let handle = ctx.repository(repo).await?;
    let branches = handle.branches().await?;
    if ctx.json {
        return output::json(&branches);
    }

    let primary = ctx.store.config().primary_branch();
    for branch in &branches {
        let marker = if branch == primary { "* " } else { "  " };
        println!("{}{}", marker, branch);
    }
    Ok(())
}

pub async fn checkout(ctx: &Context, repo: &str, reference: &str) -> Result<()> {
    let handle = ctx.repository(repo).await?;
    handle.checkout(reference).await?;

    let work = handle.context().work_path().display().to_string();
    if ctx.json {
        return output::json(&json!({ "reference": reference, "working_copy": work }));
    }
    output::print(
        format!("Working copy at '{}' ({})", reference, work),
        ctx.verbosity,
    );
    Ok(())
}
