//! git
//!
//! The version-control engine, in two halves.
//!
//! # Architecture
//!
//! - [`command`] runs the `git` executable for every working-copy mutation
//!   (clone, fetch, checkout, reset, clean, add, commit, tag, push). Each
//!   invocation is bounded by a timeout.
//! - [`interface`] opens origin repositories with `git2` for reads: branch
//!   and tag listing, revision records, trees and blobs.
//!
//! No other module spawns git or imports `git2`.
//!
//! # Invariants
//!
//! - Origins are only ever written through `git push` from a working copy
//!   (and `git init --bare` at creation)
//! - Reads never touch a working copy
//!
//! # Example
//!
//! ```ignore
//! use revstore::git::{Git, GitRunner};
//!
//! let origin = Git::open(&origin_path)?;
//! let tip = origin.branch_tip(&branch)?;
//!
//! runner
//!     .command("fetch")
//!     .current_dir(&work_path)
//!     .args(["fetch", "--prune", "--tags", "origin"])
//!     .run()
//!     .await?;
//! ```

pub mod command;
mod interface;

pub use command::{ExecError, GitCommand, GitOutput, GitRunner};
pub use interface::{Git, GitError};
