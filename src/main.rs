//! revstore binary entry point.
//!
//! A thin wrapper around [`revstore::cli::run`]: every error is printed
//! once, with its context chain, and turns into exit status 1.

use revstore::ui::output;

fn main() {
    if let Err(e) = revstore::cli::run() {
        output::error(format!("{e:#}"));
        std::process::exit(1);
    }
}
