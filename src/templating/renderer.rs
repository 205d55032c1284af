//! Template rendering engine with Tera.
//!
//! Every template is compiled in a fresh Tera instance with the filter library
//! registered and autoescaping disabled (release documents are markdown and
//! plain text, not HTML). Tera calls filters with named arguments; the bridge
//! maps them onto each filter's positional parameters:
//!
//! ```text
//! {{ commit.oid | prefix(n=7) }}              -> prefix(oid, [7])
//! {{ date | format_date(gmt=true) }}          -> format_date(date, [nil, true])
//! ```
//!
//! Errors raised by a filter travel through Tera as the source of its error
//! and are recovered here, so callers see a typed contract violation rather
//! than a formatted string.

use regex::Regex;
use std::collections::HashMap;
use std::error::Error as StdError;
use std::sync::{Arc, OnceLock};
use strsim::levenshtein;
use tera::{Context as TeraContext, Tera, Value};

use super::error::{FilterError, TemplateError};
use super::filters::FilterLibrary;
use super::value::TemplateValue;

/// Maximum allowed Levenshtein distance as a percentage of the name's length
/// for "did you mean" suggestions.
const SIMILARITY_THRESHOLD_PERCENT: usize = 50;

type FilterFn =
    fn(&FilterLibrary, &TemplateValue, &[TemplateValue]) -> Result<TemplateValue, FilterError>;

/// A filter and the names of its positional parameters.
#[derive(Clone, Copy)]
struct FilterSpec {
    name: &'static str,
    params: &'static [&'static str],
    call: FilterFn,
}

const FILTERS: &[FilterSpec] = &[
    FilterSpec {
        name: "get",
        params: &["key"],
        call: FilterLibrary::get,
    },
    FilterSpec {
        name: "contains",
        params: &["key"],
        call: FilterLibrary::contains,
    },
    FilterSpec {
        name: "attrs",
        params: &["key"],
        call: FilterLibrary::attrs,
    },
    FilterSpec {
        name: "older_than",
        params: &["interval"],
        call: FilterLibrary::older_than,
    },
    FilterSpec {
        name: "rev_parse",
        params: &[],
        call: FilterLibrary::rev_parse,
    },
    FilterSpec {
        name: "object_type",
        params: &[],
        call: FilterLibrary::object_type,
    },
    FilterSpec {
        name: "commits",
        params: &[],
        call: FilterLibrary::commits,
    },
    FilterSpec {
        name: "alias",
        params: &["platform"],
        call: FilterLibrary::alias,
    },
    FilterSpec {
        name: "random",
        params: &[],
        call: FilterLibrary::random,
    },
    FilterSpec {
        name: "prefix",
        params: &["n"],
        call: FilterLibrary::prefix,
    },
    FilterSpec {
        name: "replace",
        params: &["old", "new"],
        call: FilterLibrary::replace,
    },
    FilterSpec {
        name: "format_date",
        params: &["format", "gmt"],
        call: FilterLibrary::format_date,
    },
    FilterSpec {
        name: "parse_date",
        params: &["format"],
        call: FilterLibrary::parse_date,
    },
    FilterSpec {
        name: "format_markdown",
        params: &[],
        call: FilterLibrary::format_markdown,
    },
];

/// Tera's own filters that stay available next to the library.
const TERA_FILTERS: &[&str] = &[
    "abs", "addslashes", "as_str", "capitalize", "concat", "date", "default", "escape",
    "escape_xml", "filesizeformat", "filter", "first", "float", "group_by", "indent", "int",
    "join", "json_encode", "last", "length", "linebreaksbr", "lower", "map", "nth", "pluralize",
    "reverse", "round", "safe", "slice", "slugify", "sort", "spaceless", "split", "striptags",
    "title", "trim", "trim_end", "trim_end_matches", "trim_start", "trim_start_matches",
    "truncate", "unique", "upper", "urlencode", "urlencode_strict", "wordcount",
];

/// Names of the filters this crate registers.
pub fn filter_names() -> impl Iterator<Item = &'static str> {
    FILTERS.iter().map(|spec| spec.name)
}

/// Map Tera's named arguments onto the filter's positional parameters.
///
/// Arguments up to the last one supplied are passed; gaps become nil.
fn positional_args(
    spec: &FilterSpec,
    named: &HashMap<String, Value>,
) -> Result<Vec<TemplateValue>, FilterError> {
    if let Some(unknown) = named.keys().find(|key| !spec.params.contains(&key.as_str())) {
        let expected = if spec.params.is_empty() {
            "takes no arguments".to_string()
        } else {
            format!("accepts {}", spec.params.join(", "))
        };
        return Err(FilterError::new(
            spec.name,
            format!("has no argument '{unknown}'; it {expected}"),
        ));
    }

    let supplied = spec.params.iter().rposition(|param| named.contains_key(*param));
    Ok(match supplied {
        Some(last) => spec.params[..=last]
            .iter()
            .map(|param| named.get(*param).map_or(TemplateValue::Nil, TemplateValue::from_json))
            .collect(),
        None => Vec::new(),
    })
}

fn filter_failed(name: &str, error: FilterError) -> tera::Error {
    tera::Error::chain(format!("Filter '{}' failed", name), error)
}

/// Register every library filter on `tera`.
pub fn register_filters(tera: &mut Tera, library: &Arc<FilterLibrary>) {
    for spec in FILTERS.iter().copied() {
        let library = Arc::clone(library);
        tera.register_filter(
            spec.name,
            move |value: &Value, args: &HashMap<String, Value>| -> tera::Result<Value> {
                let positional =
                    positional_args(&spec, args).map_err(|e| filter_failed(spec.name, e))?;
                let subject = TemplateValue::from_json(value);
                (spec.call)(&library, &subject, &positional)
                    .map(|result| result.to_json())
                    .map_err(|e| filter_failed(spec.name, e))
            },
        );
    }
}

/// Compiles and renders templates with the filter library.
#[derive(Debug, Clone)]
pub struct TemplateRenderer {
    filters: Arc<FilterLibrary>,
}

impl TemplateRenderer {
    pub fn new(filters: Arc<FilterLibrary>) -> Self {
        Self {
            filters,
        }
    }

    pub fn filters(&self) -> &FilterLibrary {
        &self.filters
    }

    /// Render `body` as the template stored under `key`.
    ///
    /// The Tera template is named after the last path segment of `key`;
    /// errors report the full key.
    pub fn render(
        &self,
        key: &str,
        body: &str,
        context: &TeraContext,
    ) -> Result<String, TemplateError> {
        let name = key.rsplit('/').next().unwrap_or(key);

        // Fresh instance per template so nothing leaks between entries
        let mut tera = Tera::default();
        tera.autoescape_on(vec![]);
        register_filters(&mut tera, &self.filters);

        tera.add_raw_template(name, body).map_err(|e| TemplateError::Syntax {
            template: key.to_string(),
            message: Self::describe(&e),
        })?;

        tracing::debug!("Rendering '{}'", key);
        tera.render(name, context).map_err(|e| Self::classify_render_error(key, &e))
    }

    fn classify_render_error(key: &str, error: &tera::Error) -> TemplateError {
        if let Some(filter_error) = find_filter_error(error) {
            return TemplateError::ContractViolation {
                template: key.to_string(),
                source: filter_error.clone(),
            };
        }

        TemplateError::Render {
            template: key.to_string(),
            message: Self::describe(error),
        }
    }

    fn describe(error: &tera::Error) -> String {
        let mut message = Self::format_tera_error(error);
        if let Some(suggestion) = Self::suggest_filter(&message) {
            message.push_str(&format!("\n  Did you mean '{}'?", suggestion));
        }
        message
    }

    /// Closest known filter name to the unknown one mentioned in `message`.
    fn suggest_filter(message: &str) -> Option<&'static str> {
        static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
        let pattern = PATTERN.get_or_init(|| Regex::new(r"Filter '([^']+)' not found").ok());
        let unknown = pattern.as_ref()?.captures(message)?.get(1)?.as_str();

        filter_names()
            .chain(TERA_FILTERS.iter().copied())
            .map(|candidate| (candidate, levenshtein(unknown, candidate)))
            .filter(|(_, distance)| *distance <= unknown.len() * SIMILARITY_THRESHOLD_PERCENT / 100)
            .min_by_key(|(_, distance)| *distance)
            .map(|(candidate, _)| candidate)
    }

    /// Format a Tera error, walking its whole source chain.
    ///
    /// Tera nests the useful message (an unknown variable, a failing filter)
    /// several levels down; each distinct message is kept, outermost first.
    pub fn format_tera_error(error: &tera::Error) -> String {
        let mut messages: Vec<String> = Vec::new();
        let mut current: Option<&(dyn StdError + 'static)> = Some(error);
        while let Some(err) = current {
            let cleaned = err.to_string().trim().to_string();
            if !cleaned.is_empty() && !messages.contains(&cleaned) {
                messages.push(cleaned);
            }
            current = err.source();
        }

        if messages.is_empty() {
            "Template error (no details available)".to_string()
        } else {
            messages.join("\n  → ")
        }
    }
}

/// The filter error at the root of a Tera error, if a filter raised it.
pub fn find_filter_error(error: &tera::Error) -> Option<&FilterError> {
    let mut current: Option<&(dyn StdError + 'static)> = Some(error);
    while let Some(err) = current {
        if let Some(filter_error) = err.downcast_ref::<FilterError>() {
            return Some(filter_error);
        }
        current = err.source();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEFAULT_DATE_FORMAT;
    use crate::templating::filters::DateFormatter;
    use crate::test_utils::MemoryRepository;

    fn renderer() -> TemplateRenderer {
        let library = FilterLibrary::new(
            Arc::new(MemoryRepository::new()),
            None,
            DateFormatter::new(DEFAULT_DATE_FORMAT).unwrap(),
        );
        TemplateRenderer::new(Arc::new(library))
    }

    fn spec(name: &str) -> FilterSpec {
        *FILTERS.iter().find(|spec| spec.name == name).unwrap()
    }

    #[test]
    fn test_positional_args_fill_gaps() {
        let named = HashMap::from([("gmt".to_string(), Value::Bool(true))]);
        let args = positional_args(&spec("format_date"), &named).unwrap();
        assert_eq!(args, vec![TemplateValue::Nil, TemplateValue::Bool(true)]);
    }

    #[test]
    fn test_positional_args_stop_at_last_supplied() {
        let named = HashMap::from([("format".to_string(), Value::from("%Y"))]);
        let args = positional_args(&spec("format_date"), &named).unwrap();
        assert_eq!(args, vec![TemplateValue::from("%Y")]);
        assert!(positional_args(&spec("rev_parse"), &HashMap::new()).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_named_argument() {
        let named = HashMap::from([("count".to_string(), Value::from(2))]);
        let err = positional_args(&spec("prefix"), &named).unwrap_err();
        assert_eq!(err.filter, "prefix");
        assert!(err.message.contains("'count'"));
    }

    #[test]
    fn test_render_with_filters() {
        let mut context = TeraContext::new();
        context.insert("name", "a-b-a");
        let out = renderer()
            .render("out.txt", "{{ name | replace(old=\"a\", new=\"x\") | prefix(n=3) }}", &context)
            .unwrap();
        assert_eq!(out, "x-b");
    }

    #[test]
    fn test_autoescape_disabled() {
        let mut context = TeraContext::new();
        context.insert("html", "<b>&</b>");
        let out = renderer().render("page.html", "{{ html }}", &context).unwrap();
        assert_eq!(out, "<b>&</b>");
    }

    #[test]
    fn test_filter_error_is_recovered() {
        let err = renderer()
            .render("docs/notes.md", "{{ 5 | replace(old=\"a\", new=\"b\") }}", &TeraContext::new())
            .unwrap_err();
        match err {
            TemplateError::ContractViolation {
                template,
                source,
            } => {
                assert_eq!(template, "docs/notes.md");
                assert_eq!(source.filter, "replace");
            }
            other => panic!("expected a contract violation, got {other:?}"),
        }
    }

    #[test]
    fn test_syntax_error() {
        let err = renderer().render("bad.md", "{% if %}", &TeraContext::new()).unwrap_err();
        assert!(matches!(err, TemplateError::Syntax { ref template, .. } if template == "bad.md"));
    }

    #[test]
    fn test_unknown_filter_suggestion() {
        let err = renderer().render("x.md", "{{ 'abc' | prefx }}", &TeraContext::new()).unwrap_err();
        assert!(err.to_string().contains("Did you mean 'prefix'?"), "{err}");
    }

    #[test]
    fn test_suggest_filter() {
        assert_eq!(TemplateRenderer::suggest_filter("Filter 'rev_prase' not found"), Some("rev_parse"));
        assert_eq!(TemplateRenderer::suggest_filter("Filter 'zzzzzzzz' not found"), None);
        assert_eq!(TemplateRenderer::suggest_filter("Variable `x` not found"), None);
    }
}
