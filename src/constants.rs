//! Names and defaults shared across modules.

/// File-name extension segment marking a file as a template (`notes.template.md`).
pub const TEMPLATE_MARKER: &str = "template";

/// Extension segment requesting the builtin fallback resource (`changelog.base.md`).
pub const BASE_MARKER: &str = "base";

/// Context key front matter is exposed under.
pub const HEADERS_KEY: &str = "headers";

/// Git's default date format, used by `format_date` when no pattern is given.
pub const DEFAULT_DATE_FORMAT: &str = "%a %b %-d %H:%M:%S %Y %z";

/// Alias map location, relative to the repository work tree.
pub const DEFAULT_ALIAS_FILE: &str = ".release-docs/aliases.yml";

/// Configuration file picked up from the repository root when present.
pub const CONFIG_FILE_NAME: &str = "release-docs.toml";

/// Git commands slower than this are logged at debug level.
pub const SLOW_GIT_COMMAND_MS: u128 = 100;
