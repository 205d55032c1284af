//! Command-line interface for release-docs.
//!
//! The CLI is a thin wrapper around [`TemplateEnvironment`](crate::templating::TemplateEnvironment):
//! it opens the repository, reads `release-docs.toml`, renders the requested
//! template and writes the results.
//!
//! ```bash
//! # Render the builtin changelog to stdout
//! release-docs render changelog.base.md
//!
//! # Render a directory of templates into dist/
//! release-docs render release --template-dir docs/templates --output dist
//!
//! # Print an example configuration
//! release-docs example-config > release-docs.toml
//! ```
//!
//! # Global Options
//!
//! - `--verbose` - Debug logging
//! - `--quiet` - Errors only
//!
//! `RUST_LOG` overrides both.

mod render;

pub use render::RenderCommand;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use crate::config::EXAMPLE_CONFIG;
use crate::templating::TemplateError;

/// Generate release documents from templates and repository history.
#[derive(Parser)]
#[command(name = "release-docs", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only report errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a template, or every template in a directory
    Render(RenderCommand),

    /// Print an example release-docs.toml
    ExampleConfig,
}

impl Cli {
    /// Set up logging and run the selected command.
    pub fn execute(self) -> Result<()> {
        self.init_logging();

        match self.command {
            Commands::Render(cmd) => cmd.execute(self.quiet),
            Commands::ExampleConfig => {
                print!("{EXAMPLE_CONFIG}");
                Ok(())
            }
        }
    }

    fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "info"
        }
    }

    fn init_logging(&self) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("release_docs={}", self.log_level())));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .without_time()
            .try_init();
    }
}

/// Print `error` to stderr.
///
/// Template errors are shown with their full context; anything else is shown
/// with its chain of causes.
pub fn display_error(error: &anyhow::Error) {
    if let Some(template_error) = error.downcast_ref::<TemplateError>() {
        eprintln!("{}: {}", "error".red().bold(), template_error.format_with_context());
        return;
    }

    eprintln!("{}: {}", "error".red().bold(), error);
    for cause in error.chain().skip(1) {
        eprintln!("  {}: {}", "caused by".yellow(), cause);
    }
}
