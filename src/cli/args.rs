//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--config <path>`: Read this config file instead of the default locations
//! - `--origin-root <dir>` / `--work-root <dir>`: Override the storage roots
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output
//! - `--json`: Machine-readable output

use std::path::PathBuf;
use std::str::FromStr;

use clap::{Args, Parser, Subcommand};

use crate::core::config::Config;
use crate::core::types::Signature;

/// revstore - versioned document repositories on top of git
#[derive(Parser, Debug)]
#[command(name = "revstore")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file to use instead of the default search path
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory holding origin repositories
    #[arg(long, global = true, value_name = "DIR")]
    pub origin_root: Option<PathBuf>,

    /// Directory holding working copies
    #[arg(long, global = true, value_name = "DIR")]
    pub work_root: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// A file to write: `DEST=SOURCE` reads SOURCE from local disk and stores
/// it at DEST; a bare `DEST` reads DEST itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileArg {
    pub dest: String,
    pub source: PathBuf,
}

impl FromStr for FileArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (dest, source) = match s.split_once('=') {
            Some((dest, source)) => (dest, source),
            None => (s, s),
        };
        if dest.is_empty() || source.is_empty() {
            return Err(format!("expected DEST or DEST=SOURCE, got '{s}'"));
        }
        Ok(Self {
            dest: dest.trim_start_matches('/').to_string(),
            source: PathBuf::from(source),
        })
    }
}

/// Committer identity overrides.
#[derive(Args, Debug, Clone, Default)]
pub struct AuthorArgs {
    /// Committer name (default: configured identity)
    #[arg(long)]
    pub author_name: Option<String>,

    /// Committer email (default: configured identity)
    #[arg(long)]
    pub author_email: Option<String>,
}

impl AuthorArgs {
    /// Configured identity with any overrides applied, stamped now.
    pub fn signature(&self, config: &Config) -> Signature {
        let mut signature = config.default_signature();
        if let Some(name) = &self.author_name {
            signature.name = name.clone();
        }
        if let Some(email) = &self.author_email {
            signature.email = email.clone();
        }
        signature
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    // ========== Repositories ==========
    /// Create a repository with an initial revision
    #[command(
        name = "init",
        long_about = "Create a repository with an initial revision.\n\n\
            Creates the bare origin, then commits the given files plus an empty \
            .gitignore on the primary branch with the message \"Initial commit\".",
        after_help = "\
EXAMPLES:
    revstore init team/handbook --file readme.txt
    revstore init notes --file index.md=./drafts/index.md"
    )]
    Init {
        /// Repository id (slash-separated, e.g. team/docs)
        repo: String,

        /// File to include, as DEST or DEST=SOURCE
        #[arg(long = "file", value_name = "DEST[=SOURCE]")]
        files: Vec<FileArg>,

        #[command(flatten)]
        author: AuthorArgs,
    },

    /// Check whether a repository exists
    Exists {
        repo: String,
    },

    /// Delete a repository's origin and working copy
    Delete {
        repo: String,
    },

    /// List repositories under the origin root
    List,

    // ========== Saving ==========
    /// Save files as a new revision
    #[command(
        name = "save",
        long_about = "Save files as a new revision.\n\n\
            The working copy is reset to the origin's tip of --branch, the files are \
            written, committed and pushed. With --new-branch the revision lands on a \
            new branch forked from --branch; the new name must not exist yet.",
        after_help = "\
EXAMPLES:
    revstore save docs -m \"Fix typo\" --file guide.md
    revstore save docs -m \"Draft\" --new-branch drafts/intro --file intro.md"
    )]
    Save {
        repo: String,

        /// Commit message
        #[arg(short, long)]
        message: String,

        /// Branch to start from (default: primary branch)
        #[arg(long)]
        branch: Option<String>,

        /// Save onto this new branch instead
        #[arg(long)]
        new_branch: Option<String>,

        /// File to write, as DEST or DEST=SOURCE
        #[arg(long = "file", value_name = "DEST[=SOURCE]")]
        files: Vec<FileArg>,

        #[command(flatten)]
        author: AuthorArgs,
    },

    /// Save files on a new branch forked from any revision
    #[command(name = "save-as")]
    SaveAs {
        repo: String,

        /// New branch name
        branch: String,

        /// Revision to fork from (default: primary branch tip)
        #[arg(long, default_value = "")]
        from: String,

        #[arg(short, long)]
        message: String,

        #[arg(long = "file", value_name = "DEST[=SOURCE]")]
        files: Vec<FileArg>,

        #[command(flatten)]
        author: AuthorArgs,
    },

    /// Replace a branch's entire tree with the given files
    Replace {
        repo: String,

        #[arg(short, long)]
        message: String,

        /// Branch to replace (default: primary branch)
        #[arg(long)]
        branch: Option<String>,

        #[arg(long = "file", value_name = "DEST[=SOURCE]")]
        files: Vec<FileArg>,

        #[command(flatten)]
        author: AuthorArgs,
    },

    /// Run concurrent saves and history listings against one repository
    #[command(
        name = "concurrent-save",
        long_about = "Run concurrent saves and history listings against one repository.\n\n\
            Launches --count saves (each writing its own file) and --count history \
            listings at once. Saves are serialized by the repository lock. Every \
            task's result is collected; the command fails if any task failed."
    )]
    ConcurrentSave {
        repo: String,

        /// Number of saves (and of listings)
        #[arg(long, default_value_t = 4)]
        count: usize,

        /// Branch to save on (default: primary branch)
        #[arg(long)]
        branch: Option<String>,

        #[command(flatten)]
        author: AuthorArgs,
    },

    // ========== Branches ==========
    /// Create a branch at another branch's tip
    Branch {
        repo: String,

        /// New branch name
        name: String,

        /// Branch to start from (default: primary branch)
        #[arg(long)]
        from: Option<String>,
    },

    /// List branches
    Branches {
        repo: String,
    },

    /// Put the working copy at a branch or revision
    Checkout {
        repo: String,

        /// Branch name or revision
        reference: String,
    },

    // ========== History and reads ==========
    /// List revisions, newest first
    #[command(
        name = "log",
        after_help = "\
EXAMPLES:
    # Every branch, shared history listed once
    revstore log docs

    # One branch, only messages containing \"fix\"
    revstore log docs --branch master --grep fix"
    )]
    Log {
        repo: String,

        /// Only this branch (default: every branch)
        #[arg(long)]
        branch: Option<String>,

        /// Only revisions whose message contains this text
        #[arg(long)]
        grep: Option<String>,
    },

    /// Show one revision
    Show {
        repo: String,

        /// Revision (default: primary branch tip)
        #[arg(default_value = "")]
        revision: String,
    },

    /// Print a file at a revision
    Cat {
        repo: String,

        path: String,

        /// Revision (default: primary branch tip)
        #[arg(long, default_value = "")]
        rev: String,
    },

    /// List every file and directory at a revision
    Ls {
        repo: String,

        #[arg(long, default_value = "")]
        rev: String,
    },

    /// Show metadata for a path at a revision
    Stat {
        repo: String,

        path: String,

        #[arg(long, default_value = "")]
        rev: String,
    },

    // ========== Tags ==========
    /// Manage tags
    Tag {
        #[command(subcommand)]
        action: TagAction,
    },

    /// Generate shell completion scripts
    Completion {
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Tag subcommands.
#[derive(Subcommand, Debug)]
pub enum TagAction {
    /// Create a tag and push it
    Push {
        repo: String,
        name: String,

        /// Revision to tag (default: primary branch tip)
        #[arg(long, default_value = "")]
        from: String,

        /// Replace the tag if it exists
        #[arg(long)]
        force: bool,
    },

    /// Delete a tag locally and at the origin
    Delete { repo: String, name: String },

    /// Check whether a tag exists
    Exists { repo: String, name: String },

    /// List tags
    List { repo: String },
}

/// Shells supported by `completion`.
#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn file_arg_forms() {
        let bare: FileArg = "docs/a.md".parse().unwrap();
        assert_eq!(bare.dest, "docs/a.md");
        assert_eq!(bare.source, PathBuf::from("docs/a.md"));

        let mapped: FileArg = "/a.md=./local/b.md".parse().unwrap();
        assert_eq!(mapped.dest, "a.md");
        assert_eq!(mapped.source, PathBuf::from("./local/b.md"));

        assert!("=x".parse::<FileArg>().is_err());
        assert!("x=".parse::<FileArg>().is_err());
    }

    #[test]
    fn parses_save_with_globals() {
        let cli = Cli::try_parse_from([
            "revstore", "--json", "save", "docs", "-m", "msg", "--file", "a.txt", "--new-branch",
            "drafts",
        ])
        .unwrap();
        assert!(cli.json);
        match cli.command {
            Command::Save {
                repo,
                message,
                new_branch,
                files,
                ..
            } => {
                assert_eq!(repo, "docs");
                assert_eq!(message, "msg");
                assert_eq!(new_branch.as_deref(), Some("drafts"));
                assert_eq!(files.len(), 1);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn author_overrides() {
        let config = Config::from_file_config(Default::default(), None).unwrap();
        let args = AuthorArgs {
            author_name: Some("Ada".into()),
            author_email: None,
        };
        let sig = args.signature(&config);
        assert_eq!(sig.name, "Ada");
        assert_eq!(sig.email, "revstore@localhost");
    }
}
