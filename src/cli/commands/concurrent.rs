//! concurrent-save command - Concurrent saves and history listings
//!
//! Every task returns a `Result`; the handler collects all of them before
//! deciding the exit status, so one failing task never hides the others.

use anyhow::{bail, Result};
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::warn;

use super::Context;
use crate::cli::args::AuthorArgs;
use crate::core::types::FileChange;
use crate::store::{accept_all, DocumentRepo};
use crate::ui::output;

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Outcome {
    Saved { task: usize, revision: String },
    Listed { task: usize, revisions: usize },
    Failed { task: String, error: String },
}

#[derive(Debug, Default, Serialize)]
struct Summary {
    saved: usize,
    listed: usize,
    failed: usize,
    outcomes: Vec<Outcome>,
}

impl Summary {
    fn record(&mut self, outcome: Outcome) {
        match &outcome {
            Outcome::Saved { .. } => self.saved += 1,
            Outcome::Listed { .. } => self.listed += 1,
            Outcome::Failed { task, error } => {
                warn!(task = %task, error = %error, "concurrent task failed");
                self.failed += 1;
            }
        }
        self.outcomes.push(outcome);
    }
}

pub async fn concurrent_save(
    ctx: &Context,
    repo: &str,
    count: usize,
    branch: Option<&str>,
    author: &AuthorArgs,
) -> Result<()> {
    let handle = ctx.repository(repo).await?;
    let branch = ctx.branch_or_primary(branch)?;
    let committer = author.signature(ctx.store.config());

    let mut tasks = JoinSet::new();
    for task in 0..count {
        let repo = handle.clone();
        let branch = branch.clone();
        let committer = committer.clone();
        tasks.spawn(async move {
            let file = FileChange::new(
                format!("concurrent/task-{task}.txt"),
                format!("written by task {task}\n"),
            );
            let message = format!("Concurrent save {task}");
            match repo.save(&committer, &message, &branch, &branch, &[file]).await {
                Ok(rev) => Outcome::Saved {
                    task,
                    revision: rev.to_string(),
                },
                Err(e) => Outcome::Failed {
                    task: format!("save {task}"),
                    error: e.to_string(),
                },
            }
        });

        let repo = handle.clone();
        tasks.spawn(async move {
            match repo.commits(None, accept_all()).await {
                Ok(revs) => Outcome::Listed {
                    task,
                    revisions: revs.len(),
                },
                Err(e) => Outcome::Failed {
                    task: format!("list {task}"),
                    error: e.to_string(),
                },
            }
        });
    }

    let mut summary = Summary::default();
    while let Some(joined) = tasks.join_next().await {
        let outcome = joined.unwrap_or_else(|e| Outcome::Failed {
            task: "unknown".to_string(),
            error: e.to_string(),
        });
        summary.record(outcome);
    }

    if ctx.json {
        output::json(&summary)?;
    } else {
        for outcome in &summary.outcomes {
            if let Outcome::Failed { task, error } = outcome {
                output::warn(format!("{task}: {error}"), ctx.verbosity);
            }
        }
        output::print(
            format!(
                "{} saved, {} listed, {} failed",
                summary.saved, summary.listed, summary.failed
            ),
            ctx.verbosity,
        );
    }

    if summary.failed > 0 {
        bail!("{} of {} concurrent tasks failed", summary.failed, count * 2);
    }
    Ok(())
}
