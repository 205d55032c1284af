//! Templates compiled into the binary.
//!
//! These back `base`-marked names: `changelog.base.md` resolves to the
//! builtin `changelog.md` regardless of what the search roots contain.

use include_dir::{Dir, include_dir};

/// Embedded default templates.
static TEMPLATES: Dir = include_dir!("$CARGO_MANIFEST_DIR/resources/templates");

/// Contents of the builtin template `name`, if there is one.
pub fn builtin_template(name: &str) -> Option<&'static str> {
    TEMPLATES.get_file(name).and_then(|file| file.contents_utf8())
}

/// Names of all builtin templates, sorted.
pub fn builtin_names() -> Vec<&'static str> {
    let mut names: Vec<_> =
        TEMPLATES.files().filter_map(|file| file.path().to_str()).collect();
    names.sort_unstable();
    names
}
