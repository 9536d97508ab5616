//! ui::output
//!
//! Output formatting and display.
//!
//! # Design
//!
//! Output is formatted consistently and respects the quiet flag.
//! When `--json` is enabled, results are printed as pretty JSON on stdout
//! and nothing else goes to stdout.

use std::fmt::Display;

use serde::Serialize;

use crate::core::types::{FileInfo, Revision};

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Quiet mode - minimal output
    Quiet,
    /// Normal mode - standard output
    Normal,
    /// Debug mode - verbose output
    Debug,
}

impl Verbosity {
    /// Create verbosity from flags.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }
}

/// Print a message (respects quiet mode).
pub fn print(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
}

/// Print an error message (always shown).
pub fn error(message: impl Display) {
    eprintln!("error: {}", message);
}

/// Print a warning message (respects quiet mode).
pub fn warn(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        eprintln!("warning: {}", message);
    }
}

/// Print `value` as pretty JSON.
pub fn json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// One-line summary: short id, date, author, first message line.
pub fn format_revision(rev: &Revision) -> String {
    let subject = rev.message.lines().next().unwrap_or_default();
    format!(
        "{}  {}  {:<16}  {}",
        rev.id.short(10),
        rev.timestamp.format("%Y-%m-%d %H:%M"),
        rev.author_name,
        subject
    )
}

/// Multi-line detail view of a revision.
pub fn format_revision_long(rev: &Revision) -> String {
    let mut out = format!("revision {}\n", rev.id);
    for parent in &rev.parent_ids {
        out.push_str(&format!("parent   {}\n", parent));
    }
    out.push_str(&format!(
        "author   {} <{}>\ndate     {}\n\n",
        rev.author_name,
        rev.author_email,
        rev.timestamp.to_rfc3339()
    ));
    for line in rev.message.lines() {
        out.push_str(&format!("    {}\n", line));
    }
    out.trim_end().to_string()
}

/// `d`/`f` marker, octal mode, size and path.
pub fn format_file_info(info: &FileInfo) -> String {
    let kind = if info.is_dir { 'd' } else { 'f' };
    let path = if info.path.is_empty() { "/" } else { info.path.as_str() };
    format!("{} {:06o} {:>8}  {}", kind, info.mode, info.size, path)
}

/// Format a list of items.
pub fn format_list<T: Display>(items: &[T], prefix: &str) -> String {
    items
        .iter()
        .map(|item| format!("{}{}", prefix, item))
        .collect::<Vec<_>>()
        .join("\n")
}
