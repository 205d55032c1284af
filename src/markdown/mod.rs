//! Markdown helpers: front matter and HTML rendering.
//!
//! Only templates whose key ends in `.md` get front-matter extraction; every
//! other template is compiled exactly as written.

pub mod frontmatter;

pub use frontmatter::{FrontMatter, split_front_matter};

use comrak::{Options, markdown_to_html};

use crate::constants::TEMPLATE_MARKER;

/// Whether `key` names a markdown document.
///
/// A trailing `.template` marker is ignored, so both `notes.md` and
/// `notes.md.template` qualify.
///
/// ```
/// use release_docs::markdown::is_markdown_key;
///
/// assert!(is_markdown_key("docs/CHANGELOG.md"));
/// assert!(is_markdown_key("notes.MD.template"));
/// assert!(!is_markdown_key("version.txt"));
/// ```
#[must_use]
pub fn is_markdown_key(key: &str) -> bool {
    let file_name = key.rsplit('/').next().unwrap_or(key);
    let suffix = format!(".{TEMPLATE_MARKER}");
    let file_name = file_name.strip_suffix(suffix.as_str()).unwrap_or(file_name);

    file_name
        .rsplit_once('.')
        .is_some_and(|(stem, ext)| !stem.is_empty() && ext.eq_ignore_ascii_case("md"))
}

/// Render CommonMark (with tables and strikethrough) to HTML.
pub fn render_html(markdown: &str) -> String {
    let mut options = Options::default();
    options.extension.table = true;
    options.extension.strikethrough = true;
    markdown_to_html(markdown, &options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markdown_keys() {
        assert!(is_markdown_key("CHANGELOG.md"));
        assert!(is_markdown_key("nested/dir/notes.md"));
        assert!(is_markdown_key("notes.md.template"));
        assert!(!is_markdown_key("notes.markdown"));
        assert!(!is_markdown_key("md"));
        assert!(!is_markdown_key(".md"));
        assert!(!is_markdown_key("dir.md/version.txt"));
    }

    #[test]
    fn test_render_html() {
        assert_eq!(render_html("Hello **world**"), "<p>Hello <strong>world</strong></p>\n");
        assert!(render_html("~~gone~~").contains("<del>gone</del>"));
    }
}
