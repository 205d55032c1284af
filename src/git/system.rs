//! [`Repository`] implementation backed by the system `git` executable.
//!
//! Uses plumbing commands only (`cat-file`, `rev-parse`, `rev-list`,
//! `notes`), parsing their raw output into the object model.

use chrono::{DateTime, FixedOffset};
use regex::Regex;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout};
use std::sync::{Arc, OnceLock};

use super::command_builder::GitCommand;
use super::{
    Commit, CommitIter, GitError, GitObject, Note, ObjectId, ObjectKind, Pointer, Repository,
    Signature, Tag, qualify_notes_ref,
};
use crate::aliases::{AliasMap, AliasResolver};
use crate::constants::DEFAULT_ALIAS_FILE;

/// A repository on disk, queried through `git`.
#[derive(Debug, Clone)]
pub struct SystemGitRepository {
    work_tree: PathBuf,
    alias_file: PathBuf,
}

impl SystemGitRepository {
    /// Open the repository containing `path`.
    ///
    /// # Errors
    ///
    /// Fails if `path` is not inside a Git work tree or git cannot be run.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, GitError> {
        let path = path.as_ref();
        let stdout = GitCommand::new()
            .current_dir(path)
            .args(["rev-parse", "--show-toplevel"])
            .with_context("open repository")
            .execute_stdout()?;

        let work_tree = PathBuf::from(stdout.trim());
        tracing::debug!("Opened repository at {}", work_tree.display());

        Ok(Self {
            work_tree,
            alias_file: PathBuf::from(DEFAULT_ALIAS_FILE),
        })
    }

    /// Use a different alias map file, relative to the work tree.
    pub fn with_alias_file(mut self, alias_file: impl Into<PathBuf>) -> Self {
        self.alias_file = alias_file.into();
        self
    }

    pub fn work_tree(&self) -> &Path {
        &self.work_tree
    }

    fn git(&self, command: GitCommand) -> GitCommand {
        command.current_dir(&self.work_tree)
    }

    fn object_kind(&self, oid: &ObjectId) -> Result<ObjectKind, GitError> {
        let stdout = self
            .git(GitCommand::object_type(oid.as_str()))
            .execute_stdout()
            .map_err(|_| GitError::ObjectNotFound(oid.to_string()))?;
        stdout.trim().parse()
    }

    fn commit(&self, oid: &ObjectId) -> Result<Commit, GitError> {
        let raw = self.git(GitCommand::cat_file("commit", oid.as_str())).execute_stdout()?;
        parse_commit(oid.clone(), &raw)
    }

    fn tag(&self, oid: &ObjectId) -> Result<Tag, GitError> {
        let raw = self.git(GitCommand::cat_file("tag", oid.as_str())).execute_stdout()?;
        parse_tag(oid.clone(), &raw)
    }

    fn notes_committer(&self, notes_ref: &str, oid: &ObjectId) -> Result<Signature, GitError> {
        let fanout = format!("{}/{}", &oid.as_str()[..2], &oid.as_str()[2..]);
        let stdout = self
            .git(GitCommand::notes_committer(notes_ref).args(["--", oid.as_str(), fanout.as_str()]))
            .execute_stdout()?;

        // Notes trees deeper than one fanout level fall back to the ref tip
        let stdout = if stdout.trim().is_empty() {
            self.git(GitCommand::notes_committer(notes_ref)).execute_stdout()?
        } else {
            stdout
        };

        let mut fields = stdout.trim().splitn(3, '\u{1f}');
        let (Some(name), Some(email), Some(time)) = (fields.next(), fields.next(), fields.next())
        else {
            return Err(GitError::Parse(format!("unexpected notes log output '{}'", stdout.trim())));
        };

        let time = DateTime::parse_from_rfc3339(time)
            .map_err(|e| GitError::Parse(format!("invalid notes commit time '{time}': {e}")))?;

        Ok(Signature {
            name: name.to_string(),
            email: email.to_string(),
            time,
        })
    }
}

impl Repository for SystemGitRepository {
    fn object(&self, oid: &ObjectId) -> Result<GitObject, GitError> {
        match self.object_kind(oid)? {
            ObjectKind::Commit => self.commit(oid).map(GitObject::Commit),
            ObjectKind::Tag => self.tag(oid).map(GitObject::Tag),
            kind => Ok(GitObject::Pointer(Pointer {
                oid: oid.clone(),
                kind,
            })),
        }
    }

    fn object_parsing(&self, revision: &str) -> Result<GitObject, GitError> {
        if revision.is_empty() || revision.starts_with('-') {
            return Err(GitError::InvalidRevision(revision.to_string()));
        }

        let stdout = self
            .git(GitCommand::rev_parse_verify(revision))
            .execute_stdout()
            .map_err(|_| GitError::ObjectNotFound(revision.to_string()))?;
        let oid: ObjectId = stdout.trim().parse()?;
        self.object(&oid)
    }

    fn commits(&self, from: &ObjectId) -> Result<CommitIter<'_>, GitError> {
        if self.object_kind(from)? != ObjectKind::Commit {
            return Err(GitError::ObjectNotFound(from.to_string()));
        }

        let mut child = self.git(GitCommand::rev_list(from.as_str())).spawn_stdout()?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| GitError::Parse("rev-list produced no output stream".to_string()))?;

        Ok(Box::new(AncestorCommits {
            repository: self,
            child,
            lines: BufReader::new(stdout).lines(),
        }))
    }

    fn note(&self, oid: &ObjectId, notes_ref: &str) -> Result<Note, GitError> {
        let notes_ref = qualify_notes_ref(notes_ref);
        let not_found = || GitError::NoteNotFound {
            oid: oid.to_string(),
            notes_ref: notes_ref.clone(),
        };

        let blob = self
            .git(GitCommand::notes_list(&notes_ref, oid.as_str()))
            .execute_stdout()
            .map_err(|_| not_found())?;
        let message = self
            .git(GitCommand::notes_show(&notes_ref, oid.as_str()))
            .execute_stdout()
            .map_err(|_| not_found())?;

        Ok(Note {
            oid: blob.trim().parse()?,
            target: oid.clone(),
            committer: self.notes_committer(&notes_ref, oid)?,
            message,
        })
    }

    fn alias_map(&self) -> Result<Option<Arc<dyn AliasResolver>>, GitError> {
        let path = self.work_tree.join(&self.alias_file);
        if !path.is_file() {
            tracing::debug!("No alias map at {}", path.display());
            return Ok(None);
        }

        let map = AliasMap::load(&path).map_err(|e| GitError::Alias {
            path: path.clone(),
            reason: format!("{e:#}"),
        })?;
        Ok(Some(Arc::new(map)))
    }
}

/// Streams `git rev-list` output, loading each commit on demand.
struct AncestorCommits<'a> {
    repository: &'a SystemGitRepository,
    child: Child,
    lines: Lines<BufReader<ChildStdout>>,
}

impl Iterator for AncestorCommits<'_> {
    type Item = Result<Commit, GitError>;

    fn next(&mut self) -> Option<Self::Item> {
        let line = match self.lines.next()? {
            Ok(line) => line,
            Err(e) => return Some(Err(e.into())),
        };

        Some(line.trim().parse().and_then(|oid| self.repository.commit(&oid)))
    }
}

impl Drop for AncestorCommits<'_> {
    fn drop(&mut self) {
        // Stop rev-list if the caller did not drain the iterator
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn signature_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^(.*?)\s*<([^>]*)>\s+(-?\d+)\s+([+-])(\d{2})(\d{2})$").ok())
        .as_ref()
}

/// Parse `Name <email> 1700000000 +0200` as written in raw objects.
pub(crate) fn parse_signature(raw: &str) -> Result<Signature, GitError> {
    let caps = signature_pattern()
        .and_then(|pattern| pattern.captures(raw.trim()))
        .ok_or_else(|| GitError::Parse(format!("invalid signature '{raw}'")))?;

    let timestamp: i64 =
        caps[3].parse().map_err(|_| GitError::Parse(format!("invalid timestamp in '{raw}'")))?;
    let hours: i32 = caps[5].parse().unwrap_or(0);
    let minutes: i32 = caps[6].parse().unwrap_or(0);
    let mut seconds = hours * 3600 + minutes * 60;
    if &caps[4] == "-" {
        seconds = -seconds;
    }

    let offset = FixedOffset::east_opt(seconds)
        .ok_or_else(|| GitError::Parse(format!("invalid timezone in '{raw}'")))?;
    let time = DateTime::from_timestamp(timestamp, 0)
        .ok_or_else(|| GitError::Parse(format!("timestamp out of range in '{raw}'")))?
        .with_timezone(&offset);

    Ok(Signature {
        name: caps[1].to_string(),
        email: caps[2].to_string(),
        time,
    })
}

/// Split a raw object into header fields and message.
///
/// Continuation lines (multi-line headers such as `gpgsig`) are dropped.
fn split_raw_object(raw: &str) -> (Vec<(&str, &str)>, String) {
    let (header, message) = raw.split_once("\n\n").unwrap_or((raw, ""));
    let fields = header
        .lines()
        .filter(|line| !line.starts_with(' '))
        .filter_map(|line| line.split_once(' '))
        .collect();
    (fields, message.to_string())
}

pub(crate) fn parse_commit(oid: ObjectId, raw: &str) -> Result<Commit, GitError> {
    let (fields, message) = split_raw_object(raw);

    let mut tree = None;
    let mut parents = Vec::new();
    let mut author = None;
    let mut committer = None;
    for (key, value) in fields {
        match key {
            "tree" => tree = Some(value.parse()?),
            "parent" => parents.push(value.parse()?),
            "author" => author = Some(parse_signature(value)?),
            "committer" => committer = Some(parse_signature(value)?),
            _ => {}
        }
    }

    let missing = |field: &str| GitError::Parse(format!("commit {oid} has no {field}"));
    let author = author.ok_or_else(|| missing("author"))?;
    let committer = committer.ok_or_else(|| missing("committer"))?;

    Ok(Commit {
        summary: message.lines().next().unwrap_or_default().to_string(),
        oid,
        tree,
        parents,
        author,
        committer,
        message,
    })
}

pub(crate) fn parse_tag(oid: ObjectId, raw: &str) -> Result<Tag, GitError> {
    let (fields, message) = split_raw_object(raw);

    let mut target = None;
    let mut kind = None;
    let mut name = None;
    let mut tagger = None;
    for (key, value) in fields {
        match key {
            "object" => target = Some(value.parse()?),
            "type" => kind = Some(value.parse()?),
            "tag" => name = Some(value.to_string()),
            "tagger" => tagger = Some(parse_signature(value)?),
            _ => {}
        }
    }

    let missing = |field: &str| GitError::Parse(format!("tag {oid} has no {field}"));
    Ok(Tag {
        target: Pointer {
            oid: target.ok_or_else(|| missing("object"))?,
            kind: kind.ok_or_else(|| missing("type"))?,
        },
        name: name.ok_or_else(|| missing("name"))?,
        oid,
        tagger,
        message,
    })
}
