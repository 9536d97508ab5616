//! cli
//!
//! Command-line interface layer for revstore.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Set up logging and resolve configuration
//! - Delegate to command handlers
//!
//! # Architecture
//!
//! The CLI layer is thin. It parses arguments via clap and dispatches to
//! the [`crate::store`] API. Every repository change goes through a
//! [`DocumentStore`](crate::store::DocumentStore), never through git directly.

pub mod args;
pub mod commands;

pub use args::{Cli, Shell};

use anyhow::{Context as _, Result};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::core::config::Config;
use crate::store::DocumentStore;
use crate::ui::output::Verbosity;

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();
    init_tracing(cli.debug, cli.quiet);

    // Completion needs no store and must work without a config.
    if let args::Command::Completion { shell } = cli.command {
        return commands::completion(shell);
    }

    let config = load_config(&cli)?;
    let ctx = commands::Context {
        store: DocumentStore::new(config),
        verbosity: Verbosity::from_flags(cli.quiet, cli.debug),
        json: cli.json,
    };

    commands::dispatch(cli.command, &ctx)
}

/// Log to stderr. `RUST_LOG` wins over the flags.
fn init_tracing(debug: bool, quiet: bool) {
    let default = if debug {
        "revstore=debug"
    } else if quiet {
        "warn"
    } else {
        "revstore=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // A second init (tests driving `run` twice) is harmless.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(root) = &cli.origin_root {
        config = config.with_origin_root(root.clone());
    }
    if let Some(root) = &cli.work_root {
        config = config.with_work_root(root.clone());
    }
    match config.source() {
        Some(path) => debug!(path = %path.display(), "configuration loaded"),
        None => debug!("no configuration file, using defaults"),
    }
    Ok(config)
}
