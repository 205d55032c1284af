//! Front-matter extraction for markdown templates.
//!
//! A markdown template may open with a YAML header fenced by `---` lines:
//!
//! ```text
//! ---
//! title: Release Notes
//! audience: [customers]
//! ---
//! # {{ headers.title }}
//! ```
//!
//! The header is parsed before the body is compiled and handed to the template
//! under `headers`. Only the first block counts, and only when the very first
//! line of the file is the opening fence.

use serde_json::{Map, Value};
use std::ops::Range;

/// Parsed front matter, in declaration order.
pub type FrontMatter = Map<String, Value>;

/// Byte boundaries of a front-matter block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontmatterBoundaries {
    /// Header text strictly between the opening and closing fences.
    pub header: Range<usize>,

    /// Byte position just past the closing fence line, where the body starts.
    pub end: usize,
}

/// Locate the front-matter block of `text`, if it has one.
///
/// The text must start with `---` and a line break; the block closes at the
/// next line consisting of exactly `---`, terminated by a line break or the
/// end of input.
pub fn frontmatter_boundaries(text: &str) -> Option<FrontmatterBoundaries> {
    let header_start = if text.starts_with("---\n") {
        4
    } else if text.starts_with("---\r\n") {
        5
    } else {
        return None;
    };

    let mut pos = header_start;
    while pos < text.len() {
        let rest = &text[pos..];
        let (line, next) = match rest.find('\n') {
            Some(i) => (&rest[..i], pos + i + 1),
            None => (rest, text.len()),
        };

        if line.strip_suffix('\r').unwrap_or(line) == "---" {
            return Some(FrontmatterBoundaries {
                header: header_start..pos,
                end: next,
            });
        }
        pos = next;
    }

    None
}

/// Split `text` into its body and front matter.
///
/// Non-markdown text and text without a complete block are returned
/// unchanged. A block whose header is not a YAML mapping is still removed
/// from the body, but yields no front matter.
pub fn split_front_matter(text: &str, is_markdown: bool) -> (String, Option<FrontMatter>) {
    if !is_markdown {
        return (text.to_string(), None);
    }

    let Some(boundaries) = frontmatter_boundaries(text) else {
        return (text.to_string(), None);
    };

    let body = text[boundaries.end..].to_string();
    (body, parse_header(&text[boundaries.header]))
}

fn parse_header(header: &str) -> Option<FrontMatter> {
    if header.trim().is_empty() {
        return Some(Map::new());
    }

    match serde_yaml::from_str::<Value>(header) {
        Ok(Value::Object(map)) => Some(map),
        Ok(Value::Null) => Some(Map::new()),
        Ok(other) => {
            tracing::warn!(
                "Ignoring front matter: expected a mapping, found {}",
                json_kind(&other)
            );
            None
        }
        Err(e) => {
            tracing::warn!("Ignoring front matter that is not valid YAML: {e}");
            None
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}
