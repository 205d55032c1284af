//! Values flowing through the filter library.
//!
//! Tera hands filters plain JSON. Before a filter runs, its subject and
//! arguments are lifted into [`TemplateValue`], which restores the two kinds
//! JSON cannot express directly: Git objects (maps carrying `type` and `oid`)
//! and dates. Results are lowered back to JSON on the way out, so an object
//! returned by `rev_parse` can be fed to `commits` or `attrs` further down the
//! pipeline.

use chrono::{DateTime, FixedOffset};
use indexmap::IndexMap;
use serde_json::Value as Json;

use crate::git::{Commit, GitObject, Note, ObjectId, Pointer, Signature, Tag};

/// A dynamically typed template value.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateValue {
    Nil,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Date(DateTime<FixedOffset>),
    Sequence(Vec<TemplateValue>),
    Map(IndexMap<String, TemplateValue>),
    Object(GitObject),
}

impl TemplateValue {
    /// Lift a JSON value, recognizing encoded Git objects.
    ///
    /// Strings are never reinterpreted as dates here; date-typed filters
    /// coerce them on demand through [`TemplateValue::as_date`].
    pub fn from_json(value: &Json) -> Self {
        match value {
            Json::Null => Self::Nil,
            Json::Bool(b) => Self::Bool(*b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Self::Integer(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => Self::String(s.clone()),
            Json::Array(items) => Self::Sequence(items.iter().map(Self::from_json).collect()),
            Json::Object(map) => match GitObject::from_json(value) {
                Some(object) => Self::Object(object),
                None => Self::Map(
                    map.iter().map(|(key, value)| (key.clone(), Self::from_json(value))).collect(),
                ),
            },
        }
    }

    /// Lower to JSON. Dates become RFC 3339 strings.
    pub fn to_json(&self) -> Json {
        match self {
            Self::Nil => Json::Null,
            Self::Bool(b) => Json::Bool(*b),
            Self::Integer(i) => Json::from(*i),
            Self::Float(f) => serde_json::Number::from_f64(*f).map_or(Json::Null, Json::Number),
            Self::String(s) => Json::String(s.clone()),
            Self::Date(date) => Json::String(date.to_rfc3339()),
            Self::Sequence(items) => Json::Array(items.iter().map(Self::to_json).collect()),
            Self::Map(map) => {
                Json::Object(map.iter().map(|(key, value)| (key.clone(), value.to_json())).collect())
            }
            Self::Object(object) => object.to_json(),
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Coerce to a date: dates, RFC 3339 strings and Unix timestamps qualify.
    pub fn as_date(&self) -> Option<DateTime<FixedOffset>> {
        match self {
            Self::Date(date) => Some(*date),
            Self::String(s) => DateTime::parse_from_rfc3339(s).ok(),
            Self::Integer(timestamp) => {
                DateTime::from_timestamp(*timestamp, 0).map(|utc| utc.fixed_offset())
            }
            _ => None,
        }
    }

    /// Short name of the value's kind, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Nil => "nil",
            Self::Bool(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Date(_) => "date",
            Self::Sequence(_) => "sequence",
            Self::Map(_) => "map",
            Self::Object(object) => object.type_name(),
        }
    }

    /// Plain-text rendering used when a scalar has to be treated as text.
    pub fn to_display_string(&self) -> String {
        match self {
            Self::Nil => String::new(),
            Self::Bool(b) => b.to_string(),
            Self::Integer(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::String(s) => s.clone(),
            Self::Date(date) => date.to_rfc3339(),
            other => other.to_json().to_string(),
        }
    }

    /// Named lookup on maps and Git objects; `None` for everything else.
    pub fn lookup(&self, key: &str) -> Option<TemplateValue> {
        match self {
            Self::Map(map) => map.get(key).filter(|value| !value.is_nil()).cloned(),
            Self::Object(object) => object.subscript(key).filter(|value| !value.is_nil()),
            _ => None,
        }
    }
}

impl From<&str> for TemplateValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for TemplateValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for TemplateValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for TemplateValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<DateTime<FixedOffset>> for TemplateValue {
    fn from(value: DateTime<FixedOffset>) -> Self {
        Self::Date(value)
    }
}

impl From<GitObject> for TemplateValue {
    fn from(value: GitObject) -> Self {
        Self::Object(value)
    }
}

impl<T: Into<TemplateValue>> From<Option<T>> for TemplateValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Nil, Into::into)
    }
}

impl<T: Into<TemplateValue>> From<Vec<T>> for TemplateValue {
    fn from(values: Vec<T>) -> Self {
        Self::Sequence(values.into_iter().map(Into::into).collect())
    }
}

impl From<&ObjectId> for TemplateValue {
    fn from(oid: &ObjectId) -> Self {
        Self::String(oid.to_string())
    }
}

/// Values that support named field lookup from templates.
pub trait Subscriptable {
    /// The value of field `key`, or `None` if there is no such field.
    fn subscript(&self, key: &str) -> Option<TemplateValue>;
}

impl Subscriptable for Signature {
    fn subscript(&self, key: &str) -> Option<TemplateValue> {
        match key {
            "name" => Some(self.name.as_str().into()),
            "email" => Some(self.email.as_str().into()),
            "time" => Some(self.time.into()),
            _ => None,
        }
    }
}

fn signature_value(signature: &Signature) -> TemplateValue {
    let fields = ["name", "email", "time"];
    TemplateValue::Map(
        fields
            .into_iter()
            .filter_map(|key| Some((key.to_string(), signature.subscript(key)?)))
            .collect(),
    )
}

impl Subscriptable for Pointer {
    fn subscript(&self, key: &str) -> Option<TemplateValue> {
        match key {
            "oid" => Some((&self.oid).into()),
            "type" => Some(self.kind.as_str().into()),
            _ => None,
        }
    }
}

impl Subscriptable for Commit {
    fn subscript(&self, key: &str) -> Option<TemplateValue> {
        match key {
            "oid" => Some((&self.oid).into()),
            "type" => Some("commit".into()),
            "tree" => Some(self.tree.as_ref().map(TemplateValue::from).into()),
            "parents" => Some(self.parents.iter().map(TemplateValue::from).collect::<Vec<_>>().into()),
            "author" => Some(signature_value(&self.author)),
            "committer" => Some(signature_value(&self.committer)),
            "date" => Some(self.date().into()),
            "summary" => Some(self.summary.as_str().into()),
            "message" => Some(self.message.as_str().into()),
            _ => None,
        }
    }
}

impl Subscriptable for Tag {
    fn subscript(&self, key: &str) -> Option<TemplateValue> {
        match key {
            "oid" => Some((&self.oid).into()),
            "type" => Some("tag".into()),
            "name" => Some(self.name.as_str().into()),
            "target" => Some(GitObject::Pointer(self.target.clone()).into()),
            "tagger" => Some(self.tagger.as_ref().map_or(TemplateValue::Nil, signature_value)),
            "message" => Some(self.message.as_str().into()),
            _ => None,
        }
    }
}

impl Subscriptable for Note {
    fn subscript(&self, key: &str) -> Option<TemplateValue> {
        match key {
            "oid" => Some((&self.oid).into()),
            "type" => Some("note".into()),
            "target" => Some((&self.target).into()),
            "committer" => Some(signature_value(&self.committer)),
            "message" => Some(self.message.as_str().into()),
            _ => None,
        }
    }
}

impl Subscriptable for GitObject {
    fn subscript(&self, key: &str) -> Option<TemplateValue> {
        match self {
            GitObject::Commit(commit) => commit.subscript(key),
            GitObject::Tag(tag) => tag.subscript(key),
            GitObject::Note(note) => note.subscript(key),
            GitObject::Pointer(pointer) => pointer.subscript(key),
        }
    }
}
