//! Read-only Git object model and the repository interface used by templates.
//!
//! Templates never talk to Git directly. Filters such as `rev_parse`,
//! `commits` and `attrs` go through the [`Repository`] trait, which answers a
//! handful of questions about the object graph:
//!
//! - resolve an object by id or by revision string
//! - walk the ancestors of a commit
//! - read an annotation record (a note) attached to an object under a notes ref
//! - load the contributor alias map shipped with the repository
//!
//! [`SystemGitRepository`] implements the trait on top of the `git` executable.
//! Tests use the in-memory implementation in `test_utils`.
//!
//! # Object Model
//!
//! | Type | Template fields |
//! |------|-----------------|
//! | [`Commit`] | `oid`, `tree`, `parents`, `author`, `committer`, `summary`, `message` |
//! | [`Tag`] | `oid`, `name`, `target`, `tagger`, `message` |
//! | [`Note`] | `oid`, `target`, `committer`, `message` |
//! | [`Pointer`] | `oid`, `type` |
//!
//! Every object is exposed to templates as a map carrying a `type` key, so
//! `{{ commit.author.name }}` and `{{ tag.target.oid }}` work as expected.

pub mod command_builder;
pub mod system;
pub mod trailers;


use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

use crate::aliases::AliasResolver;

pub use system::SystemGitRepository;
pub use trailers::{Trailer, parse_trailers};

/// Errors raised by repository implementations.
///
/// Filters translate every one of these into "absent" (nil) except where a
/// malformed argument makes the call itself invalid.
#[derive(Error, Debug)]
pub enum GitError {
    /// The string is not a hexadecimal object id of a supported length
    #[error("'{0}' is not a valid object ID")]
    InvalidObjectId(String),

    /// The revision string cannot be passed to git safely
    #[error("Invalid revision '{0}'")]
    InvalidRevision(String),

    /// No object with this id or revision exists
    #[error("Object '{0}' not found")]
    ObjectNotFound(String),

    /// The object carries no note under the requested notes ref
    #[error("No note for '{oid}' under '{notes_ref}'")]
    NoteNotFound {
        /// Object the note was looked up for
        oid: String,
        /// Notes reference that was searched
        notes_ref: String,
    },

    /// A git command exited unsuccessfully
    #[error("Git command failed: {command}")]
    CommandFailed {
        /// The command line that was run
        command: String,
        /// Standard error of the command
        stderr: String,
    },

    /// Git produced output that could not be understood
    #[error("Failed to parse git output: {0}")]
    Parse(String),

    /// The alias map could not be loaded
    #[error("Failed to load alias map from {path}: {reason}")]
    Alias {
        /// Path of the alias file
        path: PathBuf,
        /// Why loading failed
        reason: String,
    },

    /// Spawning git or reading its output failed
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A validated, lowercase hexadecimal object id (SHA-1 or SHA-256).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectId(String);

impl ObjectId {
    /// Parse an object id, returning `None` if the string is not one.
    ///
    /// Only full-length ids are accepted; abbreviated ids are revisions and
    /// must go through [`Repository::object_parsing`].
    pub fn parse(value: &str) -> Option<Self> {
        let is_hex = value.chars().all(|c| c.is_ascii_hexdigit());
        if is_hex && (value.len() == 40 || value.len() == 64) {
            Some(Self(value.to_ascii_lowercase()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ObjectId {
    type Err = GitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| GitError::InvalidObjectId(s.to_string()))
    }
}

impl TryFrom<String> for ObjectId {
    type Error = GitError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ObjectId> for String {
    fn from(oid: ObjectId) -> Self {
        oid.0
    }
}

/// The four kinds of objects stored in a Git object database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Commit,
    Tag,
    Tree,
    Blob,
}

impl ObjectKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Commit => "commit",
            Self::Tag => "tag",
            Self::Tree => "tree",
            Self::Blob => "blob",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectKind {
    type Err = GitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "commit" => Ok(Self::Commit),
            "tag" => Ok(Self::Tag),
            "tree" => Ok(Self::Tree),
            "blob" => Ok(Self::Blob),
            other => Err(GitError::Parse(format!("unknown object type '{other}'"))),
        }
    }
}

/// A typed reference to an object: its id and kind, nothing else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pointer {
    pub oid: ObjectId,
    #[serde(rename = "type")]
    pub kind: ObjectKind,
}

/// Identity and timestamp recorded on commits, tags and notes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub name: String,
    pub email: String,
    pub time: DateTime<FixedOffset>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub oid: ObjectId,
    #[serde(default)]
    pub tree: Option<ObjectId>,
    #[serde(default)]
    pub parents: Vec<ObjectId>,
    pub author: Signature,
    pub committer: Signature,
    /// First line of the message
    #[serde(default)]
    pub summary: String,
    pub message: String,
}

impl Commit {
    /// The commit's timestamp, i.e. the committer time.
    pub fn date(&self) -> DateTime<FixedOffset> {
        self.committer.time
    }
}

/// An annotated tag object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub oid: ObjectId,
    pub name: String,
    pub target: Pointer,
    #[serde(default)]
    pub tagger: Option<Signature>,
    pub message: String,
}

/// An annotation record attached to another object under a notes ref.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Id of the blob holding the note body
    pub oid: ObjectId,
    /// Object the note annotates
    pub target: ObjectId,
    /// Author of the notes commit that last touched this note
    pub committer: Signature,
    pub message: String,
}

/// Any object a template can hold.
///
/// Trees and blobs carry no fields templates care about, so they are
/// represented by their [`Pointer`].
#[derive(Debug, Clone, PartialEq)]
pub enum GitObject {
    Commit(Commit),
    Tag(Tag),
    Note(Note),
    Pointer(Pointer),
}

impl GitObject {
    /// The id of the object itself.
    pub fn oid(&self) -> &ObjectId {
        match self {
            Self::Commit(commit) => &commit.oid,
            Self::Tag(tag) => &tag.oid,
            Self::Note(note) => &note.oid,
            Self::Pointer(pointer) => &pointer.oid,
        }
    }

    /// Name of the object's type as exposed to templates.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Commit(_) => "commit",
            Self::Tag(_) => "tag",
            Self::Note(_) => "note",
            Self::Pointer(pointer) => pointer.kind.as_str(),
        }
    }

    /// Encode as a JSON map with a `type` discriminator. Commits also carry
    /// their `date`.
    pub fn to_json(&self) -> serde_json::Value {
        let encoded = match self {
            Self::Commit(commit) => serde_json::to_value(commit),
            Self::Tag(tag) => serde_json::to_value(tag),
            Self::Note(note) => serde_json::to_value(note),
            Self::Pointer(pointer) => return serde_json::to_value(pointer).unwrap_or_default(),
        };

        let mut value = encoded.unwrap_or_default();
        if let serde_json::Value::Object(map) = &mut value {
            map.insert("type".to_string(), self.type_name().into());
            if let Self::Commit(commit) = self {
                map.insert("date".to_string(), commit.date().to_rfc3339().into());
            }
        }
        value
    }

    /// Decode a map produced by [`GitObject::to_json`].
    ///
    /// Returns `None` for maps that do not describe an object; maps that carry
    /// a valid `type`/`oid` pair but are otherwise incomplete decode as a
    /// [`Pointer`] when the type is an object kind.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        let map = value.as_object()?;
        let type_name = map.get("type")?.as_str()?;
        let oid = ObjectId::parse(map.get("oid")?.as_str()?)?;

        let decoded = match type_name {
            "commit" => serde_json::from_value(value.clone()).ok().map(Self::Commit),
            "tag" => serde_json::from_value(value.clone()).ok().map(Self::Tag),
            "note" => return serde_json::from_value(value.clone()).ok().map(Self::Note),
            _ => None,
        };

        decoded.or_else(|| {
            let kind = type_name.parse().ok()?;
            Some(Self::Pointer(Pointer {
                oid,
                kind,
            }))
        })
    }
}

/// Lazy, finite, non-restartable sequence of ancestor commits.
pub type CommitIter<'a> = Box<dyn Iterator<Item = Result<Commit, GitError>> + 'a>;

/// Read-only access to a repository's object graph.
///
/// Implementations must be `Send + Sync` because filters are registered on a
/// Tera instance, which requires thread-safe closures. They are still only
/// called from one thread at a time by a given environment.
pub trait Repository: Send + Sync {
    /// Look up an object by its full id.
    fn object(&self, oid: &ObjectId) -> Result<GitObject, GitError>;

    /// Resolve a revision string (`HEAD~2`, `v1.0.0`, an abbreviated id...)
    /// to an object.
    fn object_parsing(&self, revision: &str) -> Result<GitObject, GitError>;

    /// Ancestors of `from`, starting with `from` itself.
    fn commits(&self, from: &ObjectId) -> Result<CommitIter<'_>, GitError>;

    /// The note attached to `oid` under `notes_ref`.
    fn note(&self, oid: &ObjectId, notes_ref: &str) -> Result<Note, GitError>;

    /// The contributor alias map for this repository, if it has one.
    fn alias_map(&self) -> Result<Option<Arc<dyn AliasResolver>>, GitError> {
        Ok(None)
    }
}

/// Expand a short notes ref name (`attrs`) to a full ref (`refs/notes/attrs`).
pub fn qualify_notes_ref(notes_ref: &str) -> String {
    if notes_ref.starts_with("refs/") {
        notes_ref.to_string()
    } else {
        format!("refs/notes/{notes_ref}")
    }
}
