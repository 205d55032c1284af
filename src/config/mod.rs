//! Render configuration.
//!
//! Settings are read from `release-docs.toml`, either passed explicitly or
//! found at the root of the repository being documented. Every key is
//! optional:
//!
//! ```toml
//! # Searched in order; relative paths are resolved against the repository root
//! template_dirs = [".release-docs/templates"]
//!
//! # Notes ref read by the `attrs` filter
//! notes_ref = "refs/notes/release"
//!
//! # Default pattern of `format_date` and `parse_date`
//! date_format = "%Y-%m-%d"
//!
//! # Contributor alias map, relative to the repository root
//! alias_file = ".release-docs/aliases.yml"
//! ```
//!
//! The configuration is handed to
//! [`TemplateEnvironment::from_config`](crate::templating::TemplateEnvironment::from_config);
//! nothing reads it from global state.

mod parser;

pub use parser::parse_config;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::constants::{CONFIG_FILE_NAME, DEFAULT_ALIAS_FILE, DEFAULT_DATE_FORMAT};

/// The example configuration printed by `release-docs example-config`.
pub const EXAMPLE_CONFIG: &str = include_str!("../../resources/release-docs.example.toml");

fn default_date_format() -> String {
    DEFAULT_DATE_FORMAT.to_string()
}

fn default_alias_file() -> PathBuf {
    PathBuf::from(DEFAULT_ALIAS_FILE)
}

/// Settings for rendering release documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RenderConfig {
    /// Template directories, searched in order
    #[serde(default)]
    pub template_dirs: Vec<PathBuf>,

    /// Notes ref read by the `attrs` filter; `attrs` yields nothing without one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes_ref: Option<String>,

    /// Default strftime pattern for date filters
    #[serde(default = "default_date_format")]
    pub date_format: String,

    /// Contributor alias map, relative to the repository root
    #[serde(default = "default_alias_file")]
    pub alias_file: PathBuf,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            template_dirs: Vec::new(),
            notes_ref: None,
            date_format: default_date_format(),
            alias_file: default_alias_file(),
        }
    }
}

impl RenderConfig {
    /// Load the configuration at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        parse_config(path)
    }

    /// Load `release-docs.toml` from `root`, or the defaults if there is none.
    pub fn discover(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE_NAME);
        if path.is_file() {
            tracing::debug!("Using configuration from {}", path.display());
            Self::load(&path)
        } else {
            tracing::debug!("No {} in {}, using defaults", CONFIG_FILE_NAME, root.display());
            Ok(Self::default())
        }
    }

    /// Template directories with relative entries resolved against `base`.
    pub fn template_dirs_relative_to(&self, base: &Path) -> Vec<PathBuf> {
        self.template_dirs.iter().map(|dir| base.join(dir)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config: RenderConfig = toml::from_str("").unwrap();
        assert_eq!(config, RenderConfig::default());
        assert_eq!(config.date_format, DEFAULT_DATE_FORMAT);
        assert_eq!(config.alias_file, PathBuf::from(DEFAULT_ALIAS_FILE));
    }

    #[test]
    fn test_example_config_parses() {
        let config: RenderConfig = toml::from_str(EXAMPLE_CONFIG).unwrap();
        assert!(!config.template_dirs.is_empty());
        assert!(config.notes_ref.is_some());
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(toml::from_str::<RenderConfig>("template_dir = \"x\"").is_err());
    }

    #[test]
    fn test_discover() {
        let dir = TempDir::new().unwrap();
        assert_eq!(RenderConfig::discover(dir.path()).unwrap(), RenderConfig::default());

        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "notes_ref = \"attrs\"\n").unwrap();
        let config = RenderConfig::discover(dir.path()).unwrap();
        assert_eq!(config.notes_ref.as_deref(), Some("attrs"));
    }

    #[test]
    fn test_relative_template_dirs() {
        let config = RenderConfig {
            template_dirs: vec![PathBuf::from("docs"), PathBuf::from("/abs/templates")],
            ..RenderConfig::default()
        };
        assert_eq!(
            config.template_dirs_relative_to(Path::new("/repo")),
            vec![PathBuf::from("/repo/docs"), PathBuf::from("/abs/templates")]
        );
    }
}
