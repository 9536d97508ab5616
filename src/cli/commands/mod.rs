//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Validates command-specific arguments into typed names
//! 2. Calls the store to execute the command
//! 3. Formats and displays output (text or JSON)
//!
//! # Async Commands
//!
//! The store API is async. [`dispatch`] owns one tokio runtime for the
//! whole invocation and blocks on the selected handler.

mod branch;
mod completion;
mod concurrent;
mod read;
mod repos;
mod save;
mod tag;

pub use completion::completion;

use std::path::Path;

use anyhow::{Context as _, Result};

use crate::cli::args::{Command, FileArg, TagAction};
use crate::core::types::{BranchName, FileChange, RepoId, TagName};
use crate::store::{DocumentStore, Repository};
use crate::ui::output::Verbosity;

/// Everything a handler needs besides its own arguments.
#[derive(Debug)]
pub struct Context {
    pub store: DocumentStore,
    pub verbosity: Verbosity,
    pub json: bool,
}

impl Context {
    /// Handle on an existing repository.
    pub async fn repository(&self, id: &str) -> Result<Repository> {
        let id = repo_id(id)?;
        Ok(self.store.get_repository(&id).await?)
    }

    /// `name`, or the configured primary branch.
    pub fn branch_or_primary(&self, name: Option<&str>) -> Result<BranchName> {
        match name {
            Some(name) => branch_name(name),
            None => Ok(self.store.config().primary_branch().clone()),
        }
    }
}

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(dispatch_async(command, ctx))
}

async fn dispatch_async(command: Command, ctx: &Context) -> Result<()> {
    match command {
        // Repositories
        Command::Init {
            repo,
            files,
            author,
        } => repos::init(ctx, &repo, &files, &author).await,
        Command::Exists { repo } => repos::exists(ctx, &repo),
        Command::Delete { repo } => repos::delete(ctx, &repo).await,
        Command::List => repos::list(ctx).await,

        // Saving
        Command::Save {
            repo,
            message,
            branch,
            new_branch,
            files,
            author,
        } => {
            save::save(
                ctx,
                &repo,
                &message,
                branch.as_deref(),
                new_branch.as_deref(),
                &files,
                &author,
            )
            .await
        }
        Command::SaveAs {
            repo,
            branch,
            from,
            message,
            files,
            author,
        } => save::save_as(ctx, &repo, &branch, &from, &message, &files, &author).await,
        Command::Replace {
            repo,
            message,
            branch,
            files,
            author,
        } => save::replace(ctx, &repo, &message, branch.as_deref(), &files, &author).await,
        Command::ConcurrentSave {
            repo,
            count,
            branch,
            author,
        } => concurrent::concurrent_save(ctx, &repo, count, branch.as_deref(), &author).await,

        // Branches
        Command::Branch { repo, name, from } => {
            branch::create(ctx, &repo, &name, from.as_deref()).await
        }
        Command::Branches { repo } => branch::list(ctx, &repo).await,
        Command::Checkout { repo, reference } => branch::checkout(ctx, &repo, &reference).await,

        // History and reads
        Command::Log { repo, branch, grep } => {
            read::log(ctx, &repo, branch.as_deref(), grep).await
        }
        Command::Show { repo, revision } => read::show(ctx, &repo, &revision).await,
        Command::Cat { repo, path, rev } => read::cat(ctx, &repo, &path, &rev).await,
        Command::Ls { repo, rev } => read::ls(ctx, &repo, &rev).await,
        Command::Stat { repo, path, rev } => read::stat(ctx, &repo, &path, &rev).await,

        // Tags
        Command::Tag { action } => match action {
            TagAction::Push {
                repo,
                name,
                from,
                force,
            } => tag::push(ctx, &repo, &name, &from, force).await,
            TagAction::Delete { repo, name } => tag::delete(ctx, &repo, &name).await,
            TagAction::Exists { repo, name } => tag::exists(ctx, &repo, &name).await,
            TagAction::List { repo } => tag::list(ctx, &repo).await,
        },

        Command::Completion { shell } => completion::completion(shell),
    }
}

// =============================================================================
// Argument helpers
// =============================================================================

pub(crate) fn repo_id(id: &str) -> Result<RepoId> {
    RepoId::new(id).with_context(|| format!("invalid repository id '{id}'"))
}

pub(crate) fn branch_name(name: &str) -> Result<BranchName> {
    BranchName::new(name).with_context(|| format!("invalid branch name '{name}'"))
}

pub(crate) fn tag_name(name: &str) -> Result<TagName> {
    TagName::new(name).with_context(|| format!("invalid tag name '{name}'"))
}

/// Read every `--file` source from local disk.
pub(crate) async fn read_files(files: &[FileArg]) -> Result<Vec<FileChange>> {
    let mut changes = Vec::with_capacity(files.len());
    for file in files {
        let data = read_source(&file.source).await?;
        changes.push(FileChange::new(file.dest.clone(), data));
    }
    Ok(changes)
}

async fn read_source(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read '{}'", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn typed_argument_errors_name_the_input() {
        let err = branch_name("bad..name").unwrap_err();
        assert!(err.to_string().contains("bad..name"));
        assert!(repo_id("../escape").is_err());
        assert!(tag_name("v1.0").is_ok());
    }

    #[tokio::test]
    async fn reads_sources_into_destinations() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("local.md");
        std::fs::write(&source, "body").unwrap();

        let files = vec![FileArg {
            dest: "docs/remote.md".into(),
            source,
        }];
        let changes = read_files(&files).await.unwrap();
        assert_eq!(changes, vec![FileChange::new("docs/remote.md", "body")]);

        let missing = vec![FileArg {
            dest: "x".into(),
            source: dir.path().join("absent"),
        }];
        let err = read_files(&missing).await.unwrap_err();
        assert!(err.to_string().contains("absent"));
    }
}
