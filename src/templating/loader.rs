//! Locating template resources and walking template directories.
//!
//! A template name is looked up in two places:
//!
//! 1. The builtin bundle, for names carrying the `base` marker
//!    (`changelog.base.md` asks for the builtin `changelog.md`).
//! 2. The search roots, in declared order. The first root where
//!    `root.join(name)` exists wins, whether it is a file or a directory.
//!
//! Directories are walked recursively. Files whose name carries the
//! `template` marker (`notes.template.md`, `VERSION.template`) are loaded as
//! template text under their name with the marker removed; every other file is
//! a passthrough entry that renders to nothing and is left for the caller to
//! copy.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::builtin::builtin_template;
use super::error::TemplateError;
use crate::constants::{BASE_MARKER, TEMPLATE_MARKER};

/// Where a resolved template lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    /// A resource compiled into the binary
    Builtin {
        name: String,
        contents: &'static str,
    },
    /// A single file under a search root
    File(PathBuf),
    /// A directory under a search root
    Directory(PathBuf),
}

/// A loaded entry, before rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawEntry {
    /// Template text to compile
    Text(String),
    /// A file that is not a template
    Passthrough,
}

/// Resolves template names against the builtin bundle and search roots.
#[derive(Debug, Clone, Default)]
pub struct TemplateLoader {
    search_roots: Vec<PathBuf>,
}

impl TemplateLoader {
    pub fn new(search_roots: Vec<PathBuf>) -> Self {
        Self {
            search_roots,
        }
    }

    pub fn search_roots(&self) -> &[PathBuf] {
        &self.search_roots
    }

    fn not_found(&self, name: &str) -> TemplateError {
        TemplateError::NotFound {
            name: name.to_string(),
            search_roots: self.search_roots.clone(),
        }
    }

    /// Find the resource called `name`.
    ///
    /// # Errors
    ///
    /// [`TemplateError::NotFound`] when neither the bundle nor any root has it.
    pub fn resolve(&self, name: &str) -> Result<TemplateSource, TemplateError> {
        if let Some(builtin_name) = strip_base_marker(name) {
            if let Some(contents) = builtin_template(&builtin_name) {
                tracing::debug!("Resolved '{}' to builtin '{}'", name, builtin_name);
                return Ok(TemplateSource::Builtin {
                    name: builtin_name,
                    contents,
                });
            }
            tracing::debug!("No builtin '{}', searching template directories", builtin_name);
        }

        for root in &self.search_roots {
            let candidate = root.join(name);
            if candidate.is_dir() {
                tracing::debug!("Resolved '{}' to directory {}", name, candidate.display());
                return Ok(TemplateSource::Directory(candidate));
            }
            if candidate.is_file() {
                tracing::debug!("Resolved '{}' to file {}", name, candidate.display());
                return Ok(TemplateSource::File(candidate));
            }
        }

        Err(self.not_found(name))
    }

    /// Resolve `name` and load every entry it contains.
    ///
    /// A single file or builtin resource is one [`RawEntry::Text`] keyed by
    /// `name` without its `template` marker; a directory is walked with
    /// [`walk_directory`].
    pub fn load(
        &self,
        name: &str,
    ) -> Result<(TemplateSource, BTreeMap<String, RawEntry>), TemplateError> {
        let source = self.resolve(name)?;
        let entries = match &source {
            TemplateSource::Builtin {
                contents,
                ..
            } => BTreeMap::from([(template_key(name), RawEntry::Text((*contents).to_string()))]),
            TemplateSource::File(path) => {
                let text = read_text(path).ok_or_else(|| self.not_found(name))?;
                BTreeMap::from([(template_key(name), RawEntry::Text(text))])
            }
            TemplateSource::Directory(path) => walk_directory(path)?,
        };
        Ok((source, entries))
    }
}

fn read_text(path: &Path) -> Option<String> {
    match fs::read(path) {
        Ok(bytes) => match String::from_utf8(bytes) {
            Ok(text) => Some(text),
            Err(_) => {
                tracing::warn!("{} is not valid UTF-8", path.display());
                None
            }
        },
        Err(e) => {
            tracing::warn!("Failed to read {}: {}", path.display(), e);
            None
        }
    }
}

/// Remove the last occurrence of extension segment `marker` from a file name.
///
/// Returns `None` when the name does not carry the marker. A leading dot
/// belongs to the stem, so `.env.template` becomes `.env`.
pub fn strip_marker(file_name: &str, marker: &str) -> Option<String> {
    let mut parts: Vec<&str> = file_name.split('.').collect();
    let first_extension = if parts.first().is_some_and(|stem| stem.is_empty()) {
        2
    } else {
        1
    };
    if parts.len() <= first_extension {
        return None;
    }

    let index = parts[first_extension..].iter().rposition(|part| *part == marker)?;
    parts.remove(first_extension + index);
    Some(parts.join("."))
}

/// Remove `marker` from the last segment of a `/`-separated name.
fn strip_marker_in_path(name: &str, marker: &str) -> Option<String> {
    let (parent, file_name) = match name.rsplit_once('/') {
        Some((parent, file_name)) => (Some(parent), file_name),
        None => (None, name),
    };
    let stripped = strip_marker(file_name, marker)?;
    Some(match parent {
        Some(parent) => format!("{parent}/{stripped}"),
        None => stripped,
    })
}

/// The builtin name requested by a `base`-marked template name, if any.
fn strip_base_marker(name: &str) -> Option<String> {
    strip_marker_in_path(name, BASE_MARKER)
}

/// Output key for a template loaded by name, without its `template` marker.
pub fn template_key(name: &str) -> String {
    strip_marker_in_path(name, TEMPLATE_MARKER).unwrap_or_else(|| name.to_string())
}

fn relative_key(root: &Path, path: &Path, file_name: &str) -> String {
    let mut components: Vec<String> = path
        .strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|component| component.as_os_str().to_string_lossy().into_owned())
        .collect();
    if let Some(last) = components.last_mut() {
        *last = file_name.to_string();
    }
    components.join("/")
}

/// Load every file under `root`, keyed by its `/`-separated relative path.
///
/// Entries are visited in file-name order and symlinks are not followed, so
/// repeated walks of an unchanged tree produce identical maps.
///
/// # Errors
///
/// [`TemplateError::Io`] when a directory cannot be read.
pub fn walk_directory(root: &Path) -> Result<BTreeMap<String, RawEntry>, TemplateError> {
    let mut entries = BTreeMap::new();

    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(|e| TemplateError::Io {
            path: e.path().unwrap_or(root).to_path_buf(),
            source: e.into(),
        })?;

        if entry.file_type().is_dir() {
            continue;
        }
        if entry.file_type().is_symlink() {
            tracing::warn!("Skipping symlink {}", entry.path().display());
            continue;
        }

        let file_name = entry.file_name().to_string_lossy();
        let (key, raw) = match strip_marker(&file_name, TEMPLATE_MARKER) {
            Some(stripped) => match read_text(entry.path()) {
                Some(text) => (relative_key(root, entry.path(), &stripped), RawEntry::Text(text)),
                None => (relative_key(root, entry.path(), &file_name), RawEntry::Passthrough),
            },
            None => (relative_key(root, entry.path(), &file_name), RawEntry::Passthrough),
        };

        insert_entry(&mut entries, key, raw);
    }

    tracing::debug!("Loaded {} entries from {}", entries.len(), root.display());
    Ok(entries)
}

fn insert_entry(entries: &mut BTreeMap<String, RawEntry>, key: String, raw: RawEntry) {
    match entries.entry(key) {
        Entry::Vacant(slot) => {
            slot.insert(raw);
        }
        Entry::Occupied(mut slot) => {
            let template_wins =
                matches!(slot.get(), RawEntry::Passthrough) && matches!(raw, RawEntry::Text(_));
            tracing::warn!(
                "Two files map to '{}'; keeping the {}",
                slot.key(),
                if template_wins || matches!(slot.get(), RawEntry::Text(_)) {
                    "template"
                } else {
                    "first file"
                }
            );
            if template_wins {
                slot.insert(raw);
            }
        }
    }
}
