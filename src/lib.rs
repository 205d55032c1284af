//! release-docs - release documents from templates and repository history
//!
//! Changelogs, release notes and version files are written as Tera templates
//! that can query the Git object graph. A template name resolves to a single
//! file, a builtin resource or a whole directory of templates; rendering it
//! yields one document per template, keyed by output path.
//!
//! # Core Modules
//!
//! - [`templating`] - Loading, front-matter extraction, rendering and the filter library
//! - [`markdown`] - Front-matter splitting and markdown to HTML
//! - [`git`] - Read-only repository interface and its `git` CLI implementation
//! - [`aliases`] - Contributor alias maps
//!
//! ## Supporting Modules
//!
//! - [`config`] - `release-docs.toml`
//! - [`cli`] - Command-line front end
//! - [`constants`] - Shared names and defaults
//!
//! # Example
//!
//! ```rust,no_run
//! use release_docs::git::SystemGitRepository;
//! use release_docs::templating::TemplateEnvironment;
//! use std::sync::Arc;
//!
//! # fn example() -> anyhow::Result<()> {
//! let repository = SystemGitRepository::open(".")?;
//! let environment = TemplateEnvironment::builder(Arc::new(repository))
//!     .search_root("docs/templates")
//!     .notes_ref("refs/notes/release")
//!     .build()?;
//!
//! let mut context = tera::Context::new();
//! context.insert("revision", "v2.0.0");
//! for (path, document) in environment.render_templates("release", &context)? {
//!     if let Some(text) = document {
//!         println!("{path}:\n{text}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Template Example
//!
//! ```markdown
//! ---
//! title: Changelog
//! ---
//! # {{ headers.title }}
//!
//! {% for commit in revision | rev_parse | commits %}
//! {% set contact = commit.author.name ~ " <" ~ commit.author.email ~ ">" -%}
//! - {{ commit.summary }} by {{ contact | alias(platform="github") | default(value=contact) }}
//! {% endfor %}
//! ```

pub mod aliases;
pub mod cli;
pub mod config;
pub mod constants;
pub mod git;
pub mod markdown;
pub mod templating;

// Test utilities (only available in test builds or with the test-utils feature)
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
