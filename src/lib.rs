//! revstore - versioned document repositories on top of git
//!
//! Each repository has a durable bare origin and a disposable working
//! copy. Saves materialize a file set in the working copy and fold it back
//! into the origin as one revision; reads go straight to the origin.
//!
//! # Architecture
//!
//! The codebase is layered:
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to store)
//! - [`store`] - Repository lifecycle and the per-repository operation surface
//! - [`engine`] - Synchronization, save, branch, tag, history and read logic
//! - [`core`] - Domain types, configuration, paths and locking
//! - [`git`] - The git executable for mutations, git2 for origin reads
//! - [`error`] - Error taxonomy shared by every operation
//! - [`ui`] - Output formatting
//!
//! # Correctness Invariants
//!
//! 1. At most one mutating operation runs per repository at a time
//! 2. Every mutation starts from a working copy reset to the origin's tip
//! 3. A branch name is never reused at the origin
//! 4. Returned revision ids name revisions already durable at the origin
//! 5. Tags are replaced by delete-then-recreate, never moved in place

pub mod cli;
pub mod core;
pub mod engine;
pub mod error;
pub mod git;
pub mod store;
pub mod ui;
