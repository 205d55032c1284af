//! release-docs CLI entry point
//!
//! Parses arguments, runs the command and reports errors:
//! - `render` - Render a template or a directory of templates
//! - `example-config` - Print an example release-docs.toml

use clap::Parser;
use release_docs::cli;

fn main() {
    let cli = cli::Cli::parse();

    // Set up colored output for Windows
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    if let Err(e) = cli.execute() {
        cli::display_error(&e);
        std::process::exit(1);
    }
}
