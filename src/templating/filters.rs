//! The filter library available to every template.
//!
//! | Filter | Arguments | Result |
//! |--------|-----------|--------|
//! | `get` | `key` | field of a map or Git object, or first matching element of a sequence |
//! | `contains` | `key` | whether a collection or object has `key` |
//! | `attrs` | `key`? | the annotation note of an object, or one of its trailers |
//! | `older_than` | `interval` | whether an object or date is older than e.g. `9d3h` |
//! | `rev_parse` | | the object a revision or id names |
//! | `object_type` | | `commit`, `tag`, `tree` or `blob` |
//! | `commits` | | ancestors of a commit or tagged commit, newest first |
//! | `alias` | `platform`? | canonical identity or platform handle of `Name <email>` |
//! | `random` | | a random element of a collection |
//! | `prefix` | `n` = 1 | first `n` characters, elements or entries |
//! | `replace` | `old`, `new` | string with every `old` replaced |
//! | `format_date` | `format`?, `gmt`? | date formatted with a strftime pattern |
//! | `parse_date` | `format`? | date parsed with a strftime pattern |
//! | `format_markdown` | | markdown rendered to HTML |
//!
//! # Absence and Misuse
//!
//! Filters distinguish between a value that is simply not there and a call
//! that makes no sense. Unknown revisions, missing notes, unmatched keys and
//! the like produce nil (or `false` for predicates), so templates can test for
//! them with `{% if %}`. Calling a filter on the wrong kind of value or with
//! malformed arguments is a [`FilterError`], which aborts the render.
//!
//! ```markdown
//! {% set release = "v2.1.0" | rev_parse %}
//! {% if release and release | older_than(interval="2w") %}
//! This release is more than two weeks old.
//! {% endif %}
//! ```

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use indexmap::IndexMap;
use std::fmt::Write as _;
use std::sync::{Arc, OnceLock};

use super::error::FilterError;
use super::interval::parse_interval;
use super::value::{Subscriptable, TemplateValue};
use crate::aliases::AliasResolver;
use crate::git::{GitObject, ObjectId, Repository, parse_trailers};
use crate::markdown::render_html;

/// Formats and parses dates with strftime patterns.
#[derive(Debug, Clone)]
pub struct DateFormatter {
    default_pattern: String,
}

impl DateFormatter {
    /// Create a formatter whose default pattern is `pattern`.
    ///
    /// # Errors
    ///
    /// Fails if `pattern` is not a valid strftime pattern.
    pub fn new(pattern: impl Into<String>) -> Result<Self, String> {
        let default_pattern = pattern.into();
        validate_pattern(&default_pattern)?;
        Ok(Self {
            default_pattern,
        })
    }

    pub fn default_pattern(&self) -> &str {
        &self.default_pattern
    }

    /// Format `date` in UTC when `gmt` is set, local time otherwise.
    pub fn format(
        &self,
        date: &DateTime<FixedOffset>,
        pattern: Option<&str>,
        gmt: bool,
    ) -> Result<String, String> {
        let pattern = pattern.unwrap_or(&self.default_pattern);
        validate_pattern(pattern)?;

        let items = StrftimeItems::new(pattern);
        let mut out = String::new();
        let written = if gmt {
            write!(out, "{}", date.with_timezone(&Utc).format_with_items(items))
        } else {
            write!(out, "{}", date.with_timezone(&Local).format_with_items(items))
        };
        written.map_err(|_| format!("cannot format date with pattern '{pattern}'"))?;
        Ok(out)
    }

    /// Parse `text` with `pattern`.
    ///
    /// Patterns with an offset (`%z`) yield that offset. Patterns without one
    /// are read as local time; date-only patterns give local midnight.
    pub fn parse(&self, text: &str, pattern: Option<&str>) -> Option<DateTime<FixedOffset>> {
        let pattern = pattern.unwrap_or(&self.default_pattern);

        if let Ok(date) = DateTime::parse_from_str(text, pattern) {
            return Some(date);
        }

        let naive = NaiveDateTime::parse_from_str(text, pattern).ok().or_else(|| {
            NaiveDate::parse_from_str(text, pattern).ok()?.and_hms_opt(0, 0, 0)
        })?;
        Local.from_local_datetime(&naive).earliest().map(|local| local.fixed_offset())
    }
}

fn validate_pattern(pattern: &str) -> Result<(), String> {
    if StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error)) {
        Err(format!("'{pattern}' is not a valid date format"))
    } else {
        Ok(())
    }
}

fn violation(filter: &'static str, message: impl Into<String>) -> FilterError {
    FilterError::new(filter, message)
}

fn at_most(
    filter: &'static str,
    args: &[TemplateValue],
    max: usize,
    usage: &str,
) -> Result<(), FilterError> {
    if args.len() > max {
        return Err(violation(filter, usage));
    }
    Ok(())
}

/// Filters backed by one repository.
///
/// The date formatter is built once at construction. The alias resolver is
/// loaded from the repository the first time `alias` needs it and reused for
/// the rest of the library's life.
pub struct FilterLibrary {
    repository: Arc<dyn Repository>,
    notes_ref: Option<String>,
    dates: DateFormatter,
    aliases: OnceLock<Option<Arc<dyn AliasResolver>>>,
}

impl std::fmt::Debug for FilterLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterLibrary")
            .field("notes_ref", &self.notes_ref)
            .field("dates", &self.dates)
            .field("aliases_loaded", &self.aliases.get().is_some())
            .finish_non_exhaustive()
    }
}

impl FilterLibrary {
    pub fn new(
        repository: Arc<dyn Repository>,
        notes_ref: Option<String>,
        dates: DateFormatter,
    ) -> Self {
        Self {
            repository,
            notes_ref,
            dates,
            aliases: OnceLock::new(),
        }
    }

    /// Use `resolver` instead of asking the repository for its alias map.
    pub fn with_alias_resolver(mut self, resolver: Arc<dyn AliasResolver>) -> Self {
        self.aliases = OnceLock::from(Some(resolver));
        self
    }

    pub fn notes_ref(&self) -> Option<&str> {
        self.notes_ref.as_deref()
    }

    pub fn date_formatter(&self) -> &DateFormatter {
        &self.dates
    }

    /// The alias resolver, loading it from the repository on first use.
    ///
    /// A repository without an alias map, or one whose map fails to load,
    /// has no resolver; the failure is logged once.
    pub fn alias_resolver(&self) -> Option<&Arc<dyn AliasResolver>> {
        self.aliases
            .get_or_init(|| match self.repository.alias_map() {
                Ok(resolver) => resolver,
                Err(e) => {
                    tracing::warn!("Contributor aliases unavailable: {}", e);
                    None
                }
            })
            .as_ref()
    }

    fn resolve_string(&self, text: &str) -> Option<GitObject> {
        match ObjectId::parse(text) {
            Some(oid) => self.repository.object(&oid).ok(),
            None => self.repository.object_parsing(text).ok(),
        }
    }

    /// `get(key)`
    pub fn get(
        &self,
        value: &TemplateValue,
        args: &[TemplateValue],
    ) -> Result<TemplateValue, FilterError> {
        let [TemplateValue::String(key)] = args else {
            return Err(violation("get", "requires one argument, which must be a string key"));
        };

        Ok(match value {
            TemplateValue::Map(_) | TemplateValue::Object(_) => value.lookup(key),
            TemplateValue::Sequence(items) => {
                // The matching element itself, not its field
                items.iter().find(|item| item.lookup(key).is_some()).cloned()
            }
            _ => None,
        }
        .unwrap_or(TemplateValue::Nil))
    }

    /// `contains(key)`
    pub fn contains(
        &self,
        value: &TemplateValue,
        args: &[TemplateValue],
    ) -> Result<TemplateValue, FilterError> {
        let [TemplateValue::String(key)] = args else {
            return Err(violation(
                "contains",
                "requires one argument, which must be a key in a map or an element of a sequence",
            ));
        };

        let found = match value {
            TemplateValue::Nil => false,
            TemplateValue::Sequence(items) => items
                .iter()
                .any(|item| item.as_str() == Some(key.as_str()) || item.lookup(key).is_some()),
            TemplateValue::Map(map) => map.contains_key(key.as_str()),
            TemplateValue::Object(object) => {
                object.subscript(key).is_some_and(|field| !field.is_nil())
            }
            other => {
                return Err(violation("contains", format!("cannot look into a {}", other.kind())));
            }
        };
        Ok(found.into())
    }

    /// `attrs(key)`: the note attached under the configured notes ref.
    pub fn attrs(
        &self,
        value: &TemplateValue,
        args: &[TemplateValue],
    ) -> Result<TemplateValue, FilterError> {
        const USAGE: &str = "allows one argument, which must be a string";
        at_most("attrs", args, 1, USAGE)?;
        let key = match args.first() {
            None => None,
            Some(TemplateValue::Nil) => return Ok(TemplateValue::Nil),
            Some(TemplateValue::String(key)) => Some(key),
            Some(_) => return Err(violation("attrs", USAGE)),
        };

        let Some(notes_ref) = self.notes_ref.as_deref() else {
            return Ok(TemplateValue::Nil);
        };

        let oid = match value {
            TemplateValue::Object(GitObject::Note(note)) => Some(note.target.clone()),
            TemplateValue::Object(object) => Some(object.oid().clone()),
            TemplateValue::String(text) => match ObjectId::parse(text) {
                Some(oid) => Some(oid),
                None => self.repository.object_parsing(text).ok().map(|o| o.oid().clone()),
            },
            _ => None,
        };
        let Some(note) = oid.and_then(|oid| self.repository.note(&oid, notes_ref).ok()) else {
            return Ok(TemplateValue::Nil);
        };

        Ok(match key {
            None => GitObject::Note(note).into(),
            Some(key) => parse_trailers(&note.message)
                .into_iter()
                .find(|trailer| &trailer.key == key)
                .map(|trailer| trailer.value)
                .into(),
        })
    }

    /// `older_than(interval)`
    pub fn older_than(
        &self,
        value: &TemplateValue,
        args: &[TemplateValue],
    ) -> Result<TemplateValue, FilterError> {
        let interval = match args {
            [TemplateValue::String(text)] => parse_interval(text),
            _ => None,
        }
        .ok_or_else(|| {
            violation(
                "older_than",
                "requires one argument, which must be a time interval such as \"9d\", \"9d3h\" or \"7w2d30\"",
            )
        })?;

        let time = match value {
            TemplateValue::Nil => return Ok(false.into()),
            TemplateValue::Object(GitObject::Tag(tag)) => tag.tagger.as_ref().map(|t| t.time),
            TemplateValue::Object(GitObject::Commit(commit)) => Some(commit.date()),
            TemplateValue::Object(GitObject::Note(note)) => Some(note.committer.time),
            TemplateValue::Object(GitObject::Pointer(_)) => None,
            other => other.as_date(),
        };

        Ok(match time {
            Some(time) => (Utc::now().signed_duration_since(time.with_timezone(&Utc)) > interval).into(),
            None => TemplateValue::Nil,
        })
    }

    /// `rev_parse`
    pub fn rev_parse(
        &self,
        value: &TemplateValue,
        args: &[TemplateValue],
    ) -> Result<TemplateValue, FilterError> {
        at_most("rev_parse", args, 0, "takes no arguments")?;
        let object = match value {
            TemplateValue::String(text) => self.resolve_string(text),
            TemplateValue::Object(object) => self.repository.object(object.oid()).ok(),
            _ => {
                return Err(violation("rev_parse", "requires a string value or object ID"));
            }
        };
        Ok(object.into())
    }

    /// `object_type`
    pub fn object_type(
        &self,
        value: &TemplateValue,
        args: &[TemplateValue],
    ) -> Result<TemplateValue, FilterError> {
        at_most("object_type", args, 0, "takes no arguments")?;
        let oid = match value {
            TemplateValue::String(text) => ObjectId::parse(text)
                .ok_or_else(|| violation("object_type", format!("'{text}' is not a valid object ID")))?,
            TemplateValue::Object(object) => object.oid().clone(),
            _ => {
                return Err(violation(
                    "object_type",
                    "requires a value, which must be either a string or an object ID",
                ));
            }
        };

        Ok(self.repository.object(&oid).ok().map(|object| object.type_name()).into())
    }

    /// `commits`: ancestors of a commit, or of the commit a tag points at.
    pub fn commits(
        &self,
        value: &TemplateValue,
        args: &[TemplateValue],
    ) -> Result<TemplateValue, FilterError> {
        at_most("commits", args, 0, "takes no arguments")?;
        let TemplateValue::Object(object) = value else {
            return Err(violation("commits", "requires a value, which must be a Git object"));
        };

        let resolved;
        let object = match object {
            GitObject::Pointer(pointer) => match self.repository.object(&pointer.oid) {
                Ok(found) => {
                    resolved = found;
                    &resolved
                }
                Err(_) => return Ok(TemplateValue::Nil),
            },
            object => object,
        };

        let from = match object {
            GitObject::Tag(tag) => &tag.target.oid,
            GitObject::Commit(commit) => &commit.oid,
            _ => return Ok(TemplateValue::Nil),
        };

        let commits = match self.repository.commits(from) {
            Ok(iter) => iter.collect::<Result<Vec<_>, _>>(),
            Err(e) => Err(e),
        };
        match commits {
            Ok(commits) => Ok(commits.into_iter().map(GitObject::Commit).collect::<Vec<_>>().into()),
            Err(e) => {
                tracing::debug!("No commits from {}: {}", from, e);
                Ok(TemplateValue::Nil)
            }
        }
    }

    /// `alias(platform)`
    pub fn alias(
        &self,
        value: &TemplateValue,
        args: &[TemplateValue],
    ) -> Result<TemplateValue, FilterError> {
        const USAGE: &str = "allows one argument, which must be a platform like 'gitlab' or 'slack'";
        let contact = value.as_str().and_then(split_contact).ok_or_else(|| {
            violation(
                "alias",
                "requires one value, which must be a name and email in the format 'Jane Doe <jdoe@example.org>'",
            )
        })?;
        at_most("alias", args, 1, USAGE)?;
        let platform = match args.first() {
            None | Some(TemplateValue::Nil) => None,
            Some(TemplateValue::String(platform)) => Some(platform.as_str()),
            Some(_) => return Err(violation("alias", USAGE)),
        };

        let (name, email) = contact;
        let Some(resolver) = self.alias_resolver() else {
            return Ok(TemplateValue::Nil);
        };
        Ok(match platform {
            Some(platform) => resolver.alias(name, email, platform),
            None => resolver.resolve(name, email),
        }
        .into())
    }

    /// `random`
    pub fn random(
        &self,
        value: &TemplateValue,
        args: &[TemplateValue],
    ) -> Result<TemplateValue, FilterError> {
        at_most("random", args, 0, "takes no arguments")?;
        Ok(match value {
            TemplateValue::Sequence(items) => fastrand::choice(items).cloned(),
            TemplateValue::String(text) => {
                let chars: Vec<char> = text.chars().collect();
                fastrand::choice(chars).map(|c| TemplateValue::String(c.to_string()))
            }
            TemplateValue::Map(map) => fastrand::choice(map.iter()).map(|(key, value)| {
                TemplateValue::Sequence(vec![key.as_str().into(), value.clone()])
            }),
            other => {
                return Err(violation(
                    "random",
                    format!("takes one value, which must be a collection, not a {}", other.kind()),
                ));
            }
        }
        .unwrap_or(TemplateValue::Nil))
    }

    /// `prefix(n)`
    pub fn prefix(
        &self,
        value: &TemplateValue,
        args: &[TemplateValue],
    ) -> Result<TemplateValue, FilterError> {
        const USAGE: &str = "allows one argument, which must be a non-negative integer";
        at_most("prefix", args, 1, USAGE)?;
        let n = match args.first() {
            None | Some(TemplateValue::Nil) => 1,
            Some(TemplateValue::Integer(n)) => {
                usize::try_from(*n).map_err(|_| violation("prefix", USAGE))?
            }
            Some(_) => return Err(violation("prefix", USAGE)),
        };

        Ok(match value {
            TemplateValue::Nil => TemplateValue::String(String::new()),
            TemplateValue::String(text) => TemplateValue::String(text.chars().take(n).collect()),
            TemplateValue::Sequence(items) => {
                TemplateValue::Sequence(items.iter().take(n).cloned().collect())
            }
            TemplateValue::Map(map) => TemplateValue::Map(
                map.iter()
                    .take(n)
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect::<IndexMap<_, _>>(),
            ),
            other => TemplateValue::String(other.to_display_string().chars().take(n).collect()),
        })
    }

    /// `replace(old, new)`
    pub fn replace(
        &self,
        value: &TemplateValue,
        args: &[TemplateValue],
    ) -> Result<TemplateValue, FilterError> {
        let [TemplateValue::String(old), TemplateValue::String(new)] = args else {
            return Err(violation("replace", "requires two arguments, which must be strings"));
        };
        let TemplateValue::String(text) = value else {
            return Err(violation("replace", "takes one value, which must be a string"));
        };

        if old.is_empty() {
            return Ok(value.clone());
        }
        Ok(text.replace(old.as_str(), new).into())
    }

    /// `format_date(format, gmt)`
    pub fn format_date(
        &self,
        value: &TemplateValue,
        args: &[TemplateValue],
    ) -> Result<TemplateValue, FilterError> {
        at_most("format_date", args, 2, "allows two arguments, a format string and a bool")?;
        let pattern = match args.first() {
            None | Some(TemplateValue::Nil) => None,
            Some(TemplateValue::String(pattern)) => Some(pattern.as_str()),
            Some(_) => return Err(violation("format_date", "format must be a string")),
        };
        let gmt = match args.get(1) {
            None | Some(TemplateValue::Nil) => false,
            Some(TemplateValue::Bool(gmt)) => *gmt,
            Some(_) => return Err(violation("format_date", "gmt must be a bool")),
        };
        let date = value
            .as_date()
            .ok_or_else(|| violation("format_date", "takes one value, which must be a date"))?;

        self.dates
            .format(&date, pattern, gmt)
            .map(TemplateValue::String)
            .map_err(|message| violation("format_date", message))
    }

    /// `parse_date(format)`
    pub fn parse_date(
        &self,
        value: &TemplateValue,
        args: &[TemplateValue],
    ) -> Result<TemplateValue, FilterError> {
        const USAGE: &str = "allows one argument, which must be a string";
        at_most("parse_date", args, 1, USAGE)?;
        let pattern = match args.first() {
            None | Some(TemplateValue::Nil) => None,
            Some(TemplateValue::String(pattern)) => Some(pattern.as_str()),
            Some(_) => return Err(violation("parse_date", USAGE)),
        };
        let TemplateValue::String(text) = value else {
            return Err(violation("parse_date", "takes one value, which must be a string"));
        };

        Ok(self.dates.parse(text, pattern).into())
    }

    /// `format_markdown`
    pub fn format_markdown(
        &self,
        value: &TemplateValue,
        args: &[TemplateValue],
    ) -> Result<TemplateValue, FilterError> {
        at_most("format_markdown", args, 0, "takes no arguments")?;
        let TemplateValue::String(text) = value else {
            return Err(violation("format_markdown", "takes one value, which must be a string"));
        };
        Ok(render_html(text).into())
    }
}

/// Split `Jane Doe <jdoe@example.org>` into name and email.
fn split_contact(contact: &str) -> Option<(&str, &str)> {
    let (name, rest) = contact.split_once(" <")?;
    let email = rest.strip_suffix('>')?;
    if email.contains(" <") {
        return None;
    }
    Some((name.trim(), email))
}
