//! The `render` command.

use anyhow::{Context, Result, bail};
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tera::Context as TeraContext;

use crate::config::RenderConfig;
use crate::git::SystemGitRepository;
use crate::templating::{RenderedTemplates, TemplateEnvironment, TemplateSource};

/// Render a template, or every template in a directory.
///
/// With `--output`, rendered files are written under the output directory and
/// non-template files of a rendered directory are copied next to them.
/// Without it, a single rendered document is printed to stdout.
#[derive(Args)]
pub struct RenderCommand {
    /// Template file or directory name, e.g. `release` or `changelog.base.md`
    pub name: String,

    /// Repository to document
    #[arg(long, default_value = ".")]
    pub repo: PathBuf,

    /// Template directory searched before the configured ones (repeatable)
    #[arg(short = 't', long = "template-dir")]
    pub template_dirs: Vec<PathBuf>,

    /// YAML or JSON file with extra template variables
    #[arg(short, long)]
    pub context: Option<PathBuf>,

    /// Directory to write rendered files to
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Configuration file (default: release-docs.toml in the repository root)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl RenderCommand {
    pub fn execute(self, quiet: bool) -> Result<()> {
        let repository = SystemGitRepository::open(&self.repo)
            .with_context(|| format!("Failed to open repository at {}", self.repo.display()))?;
        let root = repository.work_tree().to_path_buf();

        let mut config = match &self.config {
            Some(path) => RenderConfig::load(path)?,
            None => RenderConfig::discover(&root)?,
        };
        let cwd = std::env::current_dir().context("Failed to read current directory")?;
        config.template_dirs.splice(0..0, self.template_dirs.iter().map(|dir| cwd.join(dir)));

        let repository = repository.with_alias_file(config.alias_file.clone());
        let environment = TemplateEnvironment::from_config(Arc::new(repository), &config, &root)?;

        let context = load_context(self.context.as_deref())?;
        let rendered = environment.render_templates(&self.name, &context)?;

        match &self.output {
            Some(output) => {
                let source = environment.loader().resolve(&self.name)?;
                let written = write_rendered(output, &rendered, &source)?;
                if !quiet {
                    println!(
                        "{} Rendered {} file(s) to {}",
                        "✓".green(),
                        written,
                        output.display()
                    );
                }
            }
            None => print!("{}", single_document(&self.name, &rendered)?),
        }
        Ok(())
    }
}

/// Read extra template variables. A missing or empty file gives an empty context.
fn load_context(path: Option<&Path>) -> Result<TeraContext> {
    let Some(path) = path else {
        return Ok(TeraContext::new());
    };

    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read context file: {}", path.display()))?;
    // YAML is a superset of JSON, so one parser covers both
    let value: serde_json::Value = serde_yaml::from_str(&text)
        .with_context(|| format!("Failed to parse context file: {}", path.display()))?;

    match value {
        serde_json::Value::Null => Ok(TeraContext::new()),
        serde_json::Value::Object(_) => TeraContext::from_value(value)
            .with_context(|| format!("Invalid context file: {}", path.display())),
        _ => bail!("Context file {} must contain a mapping", path.display()),
    }
}

fn single_document<'a>(name: &str, rendered: &'a RenderedTemplates) -> Result<&'a str> {
    let mut documents = rendered.values();
    match (documents.next(), documents.next()) {
        (Some(Some(text)), None) => Ok(text),
        (Some(None), None) => bail!("'{}' is not a template", name),
        _ => bail!("'{}' renders {} files; pass --output to write them", name, rendered.len()),
    }
}

/// Write rendered entries under `output` and copy passthrough files from
/// the rendered directory. Returns the number of files written.
fn write_rendered(
    output: &Path,
    rendered: &RenderedTemplates,
    source: &TemplateSource,
) -> Result<usize> {
    for (key, document) in rendered {
        let target = output.join(key);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        match (document, source) {
            (Some(text), _) => fs::write(&target, text)
                .with_context(|| format!("Failed to write {}", target.display()))?,
            (None, TemplateSource::Directory(dir)) => {
                let from = dir.join(key);
                fs::copy(&from, &target).with_context(|| {
                    format!("Failed to copy {} to {}", from.display(), target.display())
                })?;
            }
            (None, _) => bail!("No source file for '{}'", key),
        }
        tracing::debug!("Wrote {}", target.display());
    }
    Ok(rendered.len())
}
