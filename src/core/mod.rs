//! core
//!
//! Domain types, configuration, path routing and locking.
//!
//! # Modules
//!
//! - [`types`] - Strong types: RepoId, BranchName, TagName, Oid, Revision
//! - [`config`] - Configuration schema and loading
//! - [`paths`] - Origin and working-copy path routing
//! - [`ops`] - Per-repository exclusive access
//!
//! # Design Principles
//!
//! - Strong typing rejects invalid names before any git process runs
//! - Configuration is an explicit value, never ambient state
//! - Nothing here spawns git or opens a repository

pub mod config;
pub mod ops;
pub mod paths;
pub mod types;
