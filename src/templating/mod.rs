//! Template loading and rendering for release documents.
//!
//! A render call takes a template name and produces every document that name
//! stands for:
//!
//! - a builtin resource (`changelog.base.md`) or a single file renders to one
//!   entry keyed by the requested name
//! - a directory renders to one entry per file, keyed by the file's path
//!   relative to that directory
//!
//! ```text
//! release/                          render_templates("release", ..)
//! ├── CHANGELOG.template.md    ->   "CHANGELOG.md"   => Some(rendered)
//! ├── VERSION.template         ->   "VERSION"        => Some(rendered)
//! └── assets/logo.png          ->   "assets/logo.png" => None
//! ```
//!
//! Files without the `template` marker are passthrough entries: they map to
//! `None` and the caller decides whether to copy them.
//!
//! # Template Context
//!
//! Each template sees the caller's context. Markdown templates may open with
//! a YAML front-matter block, which is removed from the body and exposed as
//! `headers` unless the caller already defines `headers`:
//!
//! ```markdown
//! ---
//! title: Release Notes
//! ---
//! # {{ headers.title }}
//!
//! {% set head = "HEAD" | rev_parse %}
//! {% for commit in head | commits %}
//! - {{ commit.summary }} ({{ commit.oid | prefix(n=7) }})
//! {% endfor %}
//! ```
//!
//! # Filters
//!
//! Besides Tera's own filters, templates can query the repository, dates and
//! contributor aliases. See [`filters`] for the full list.
//!
//! # Errors
//!
//! Rendering is all-or-nothing. The first entry that fails to load, compile or
//! render aborts the call with a [`TemplateError`] naming that entry.

pub mod builtin;
pub mod error;
pub mod filters;
pub mod interval;
pub mod loader;
pub mod renderer;
pub mod value;

pub use error::{FilterError, TemplateError};
pub use filters::{DateFormatter, FilterLibrary};
pub use loader::{RawEntry, TemplateLoader, TemplateSource};
pub use renderer::TemplateRenderer;
pub use value::{Subscriptable, TemplateValue};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tera::Context as TeraContext;

use crate::aliases::AliasResolver;
use crate::config::RenderConfig;
use crate::constants::{DEFAULT_DATE_FORMAT, HEADERS_KEY};
use crate::git::Repository;
use crate::markdown::{is_markdown_key, split_front_matter};

/// Rendered documents keyed by output path. Passthrough files map to `None`.
pub type RenderedTemplates = BTreeMap<String, Option<String>>;

/// Loads templates and renders them against one repository.
#[derive(Debug, Clone)]
pub struct TemplateEnvironment {
    loader: TemplateLoader,
    renderer: TemplateRenderer,
}

impl TemplateEnvironment {
    pub fn builder(repository: Arc<dyn Repository>) -> TemplateEnvironmentBuilder {
        TemplateEnvironmentBuilder::new(repository)
    }

    /// Build an environment from configuration.
    ///
    /// Relative template directories are resolved against `base_dir`.
    pub fn from_config(
        repository: Arc<dyn Repository>,
        config: &RenderConfig,
        base_dir: &Path,
    ) -> Result<Self, TemplateError> {
        let mut builder = Self::builder(repository)
            .search_roots(config.template_dirs_relative_to(base_dir))
            .date_format(config.date_format.clone());
        if let Some(notes_ref) = &config.notes_ref {
            builder = builder.notes_ref(notes_ref.clone());
        }
        builder.build()
    }

    pub fn loader(&self) -> &TemplateLoader {
        &self.loader
    }

    pub fn filters(&self) -> &FilterLibrary {
        self.renderer.filters()
    }

    /// Render every entry `name` resolves to.
    ///
    /// Entries are rendered in key order under the keys the loader assigned;
    /// passthrough entries keep the file's own name.
    ///
    /// # Errors
    ///
    /// Fails with the first [`TemplateError`]; nothing is returned for the
    /// entries that did render.
    pub fn render_templates(
        &self,
        name: &str,
        context: &TeraContext,
    ) -> Result<RenderedTemplates, TemplateError> {
        let (source, entries) = self.loader.load(name)?;
        tracing::debug!("Rendering {} entries for '{}' from {:?}", entries.len(), name, source);

        let mut rendered = RenderedTemplates::new();
        for (key, entry) in entries {
            let output = match entry {
                RawEntry::Text(text) => Some(self.render_str(&key, &text, context)?),
                RawEntry::Passthrough => None,
            };
            rendered.insert(key, output);
        }
        Ok(rendered)
    }

    /// Render one in-memory template stored under `key`.
    ///
    /// Markdown keys get front-matter extraction first; the parsed mapping is
    /// added to a copy of `context` as `headers` when the caller has not set
    /// that key.
    pub fn render_str(
        &self,
        key: &str,
        text: &str,
        context: &TeraContext,
    ) -> Result<String, TemplateError> {
        let (body, headers) = split_front_matter(text, is_markdown_key(key));

        let mut context = context.clone();
        if let Some(headers) = headers {
            if context.contains_key(HEADERS_KEY) {
                tracing::debug!("Context defines '{}', ignoring front matter of '{}'", HEADERS_KEY, key);
            } else {
                context.insert(HEADERS_KEY, &headers);
            }
        }

        self.renderer.render(key, &body, &context)
    }
}

/// Builder for [`TemplateEnvironment`].
pub struct TemplateEnvironmentBuilder {
    repository: Arc<dyn Repository>,
    search_roots: Vec<PathBuf>,
    notes_ref: Option<String>,
    date_format: String,
    alias_resolver: Option<Arc<dyn AliasResolver>>,
}

impl TemplateEnvironmentBuilder {
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self {
            repository,
            search_roots: Vec::new(),
            notes_ref: None,
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            alias_resolver: None,
        }
    }

    /// Append a template directory. Earlier roots take precedence.
    pub fn search_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.search_roots.push(root.into());
        self
    }

    pub fn search_roots<I, P>(mut self, roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.search_roots.extend(roots.into_iter().map(Into::into));
        self
    }

    /// Notes ref consulted by the `attrs` filter.
    pub fn notes_ref(mut self, notes_ref: impl Into<String>) -> Self {
        self.notes_ref = Some(notes_ref.into());
        self
    }

    /// Default strftime pattern of `format_date` and `parse_date`.
    pub fn date_format(mut self, pattern: impl Into<String>) -> Self {
        self.date_format = pattern.into();
        self
    }

    /// Resolve contributor aliases with `resolver` instead of the repository's map.
    pub fn alias_resolver(mut self, resolver: Arc<dyn AliasResolver>) -> Self {
        self.alias_resolver = Some(resolver);
        self
    }

    /// # Errors
    ///
    /// [`TemplateError::InvalidDateFormat`] if the date format does not parse.
    pub fn build(self) -> Result<TemplateEnvironment, TemplateError> {
        let dates = DateFormatter::new(self.date_format).map_err(|message| {
            TemplateError::InvalidDateFormat {
                message,
            }
        })?;

        let mut library = FilterLibrary::new(self.repository, self.notes_ref, dates);
        if let Some(resolver) = self.alias_resolver {
            library = library.with_alias_resolver(resolver);
        }

        Ok(TemplateEnvironment {
            loader: TemplateLoader::new(self.search_roots),
            renderer: TemplateRenderer::new(Arc::new(library)),
        })
    }
}
