//! Error types for template loading and rendering.

use std::path::PathBuf;
use thiserror::Error;

/// A filter was called with a value or arguments outside its contract.
///
/// Absence (an unknown revision, a missing note, an unmatched key) is never a
/// `FilterError`; filters report it as nil or false.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("'{filter}' {message}")]
pub struct FilterError {
    /// Name of the filter as used in templates
    pub filter: &'static str,
    /// What the filter expected
    pub message: String,
}

impl FilterError {
    pub fn new(filter: &'static str, message: impl Into<String>) -> Self {
        Self {
            filter,
            message: message.into(),
        }
    }
}

/// Errors from [`TemplateEnvironment`](super::TemplateEnvironment) calls.
///
/// A render call is all-or-nothing: the first of these aborts it.
#[derive(Debug)]
pub enum TemplateError {
    /// Neither the builtin bundle nor any search root has the resource
    NotFound {
        name: String,
        search_roots: Vec<PathBuf>,
    },

    /// A filter rejected its input
    ContractViolation {
        template: String,
        source: FilterError,
    },

    /// The template could not be compiled
    Syntax {
        template: String,
        message: String,
    },

    /// The template compiled but failed while rendering
    Render {
        template: String,
        message: String,
    },

    /// A template directory could not be walked
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The configured default date format is not a strftime pattern
    InvalidDateFormat {
        message: String,
    },
}

impl std::fmt::Display for TemplateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TemplateError::NotFound {
                name,
                ..
            } => write!(f, "Template '{}' not found", name),
            TemplateError::ContractViolation {
                template,
                source,
            } => write!(f, "Filter {} (in '{}')", source, template),
            TemplateError::Syntax {
                template,
                message,
            } => write!(f, "Template syntax error in '{}': {}", template, message),
            TemplateError::Render {
                template,
                message,
            } => write!(f, "Failed to render '{}': {}", template, message),
            TemplateError::Io {
                path,
                source,
            } => write!(f, "Failed to read templates under {}: {}", path.display(), source),
            TemplateError::InvalidDateFormat {
                message,
            } => write!(f, "Invalid default date format: {}", message),
        }
    }
}

impl std::error::Error for TemplateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TemplateError::ContractViolation {
                source,
                ..
            } => Some(source),
            TemplateError::Io {
                source,
                ..
            } => Some(source),
            _ => None,
        }
    }
}

impl TemplateError {
    /// The template the error occurred in, if any.
    pub fn template(&self) -> Option<&str> {
        match self {
            TemplateError::ContractViolation {
                template,
                ..
            }
            | TemplateError::Syntax {
                template,
                ..
            }
            | TemplateError::Render {
                template,
                ..
            } => Some(template),
            _ => None,
        }
    }

    /// Multi-line, user-facing description of the error.
    pub fn format_with_context(&self) -> String {
        match self {
            TemplateError::NotFound {
                name,
                search_roots,
            } => {
                let mut msg = format!("Template '{}' not found\n", name);
                if search_roots.is_empty() {
                    msg.push_str("\nNo template directories are configured.\n");
                } else {
                    msg.push_str("\nSearched:\n");
                    for root in search_roots {
                        msg.push_str(&format!("  - {}\n", root.display()));
                    }
                }
                msg.push_str(
                    "\nAdd a directory with --template-dir or `template_dirs` in release-docs.toml.",
                );
                msg
            }
            TemplateError::ContractViolation {
                template,
                source,
            } => format!(
                "Invalid use of filter '{}' in '{}'\n\n  {}",
                source.filter, template, source.message
            ),
            TemplateError::Syntax {
                template,
                message,
            } => format!("Template syntax error in '{}'\n\n  {}", template, message),
            TemplateError::Render {
                template,
                message,
            } => format!("Failed to render '{}'\n\n  {}", template, message),
            TemplateError::Io {
                ..
            }
            | TemplateError::InvalidDateFormat {
                ..
            } => self.to_string(),
        }
    }
}
