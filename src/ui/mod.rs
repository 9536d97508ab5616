//! ui
//!
//! User-facing output.
//!
//! # Modules
//!
//! - [`output`] - Output formatting and display
//!
//! All CLI output goes through this module so the quiet and JSON modes
//! behave the same for every command.

pub mod output;
