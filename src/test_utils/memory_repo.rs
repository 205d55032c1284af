//! In-memory repository for filter and rendering tests.
//!
//! Objects get sequential 40-hex ids, so tests never depend on hashing.
//! Every commit has the same author and committer; only the time varies.

use chrono::{DateTime, FixedOffset};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::aliases::{AliasMap, AliasResolver};
use crate::git::{
    Commit, CommitIter, GitError, GitObject, Note, ObjectId, ObjectKind, Pointer, Repository,
    Signature, Tag, qualify_notes_ref,
};

const EMPTY_TREE: &str = "4b825dc642cb6eb9a060e54bf8d69288fbee4904";

/// A [`Repository`] backed by hash maps.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    next_id: u64,
    objects: HashMap<ObjectId, GitObject>,
    refs: HashMap<String, ObjectId>,
    notes: HashMap<(String, ObjectId), Note>,
    aliases: Option<Arc<AliasMap>>,
    alias_map_requests: Arc<AtomicUsize>,
}

fn signature(time: DateTime<FixedOffset>) -> Signature {
    Signature {
        name: "Test User".to_string(),
        email: "test@release-docs.example".to_string(),
        time,
    }
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `aliases` from [`Repository::alias_map`].
    pub fn with_alias_map(mut self, aliases: AliasMap) -> Self {
        self.aliases = Some(Arc::new(aliases));
        self
    }

    /// Counter of [`Repository::alias_map`] calls.
    pub fn alias_map_requests(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.alias_map_requests)
    }

    fn next_oid(&mut self) -> ObjectId {
        self.next_id += 1;
        // Always 40 lowercase hex digits
        ObjectId::parse(&format!("{:040x}", self.next_id))
            .unwrap_or_else(|| panic!("generated id {} is not an object id", self.next_id))
    }

    /// Add a commit whose message is `summary`.
    pub fn commit(
        &mut self,
        summary: &str,
        time: DateTime<FixedOffset>,
        parents: &[&ObjectId],
    ) -> Commit {
        let commit = Commit {
            oid: self.next_oid(),
            tree: ObjectId::parse(EMPTY_TREE),
            parents: parents.iter().map(|&oid| oid.clone()).collect(),
            author: signature(time),
            committer: signature(time),
            summary: summary.to_string(),
            message: format!("{summary}\n"),
        };
        self.objects.insert(commit.oid.clone(), GitObject::Commit(commit.clone()));
        commit
    }

    /// Add an annotated tag on the commit `target`, reachable as `name`.
    ///
    /// Without a tagger time the tag has no tagger.
    pub fn tag(
        &mut self,
        name: &str,
        target: &ObjectId,
        tagger_time: Option<DateTime<FixedOffset>>,
    ) -> Tag {
        let tag = Tag {
            oid: self.next_oid(),
            name: name.to_string(),
            target: Pointer {
                oid: target.clone(),
                kind: ObjectKind::Commit,
            },
            tagger: tagger_time.map(signature),
            message: format!("Release {name}\n"),
        };
        self.objects.insert(tag.oid.clone(), GitObject::Tag(tag.clone()));
        self.refs.insert(name.to_string(), tag.oid.clone());
        tag
    }

    /// Attach a note to `target`. Short notes refs are qualified.
    pub fn add_note(
        &mut self,
        target: &ObjectId,
        notes_ref: &str,
        message: &str,
        time: DateTime<FixedOffset>,
    ) -> Note {
        let note = Note {
            oid: self.next_oid(),
            target: target.clone(),
            committer: signature(time),
            message: message.to_string(),
        };
        self.notes.insert((qualify_notes_ref(notes_ref), target.clone()), note.clone());
        note
    }

    /// Make the revision `name` resolve to `oid`.
    pub fn add_ref(&mut self, name: &str, oid: &ObjectId) {
        self.refs.insert(name.to_string(), oid.clone());
    }

    fn find_commit(&self, oid: &ObjectId) -> Option<Commit> {
        match self.objects.get(oid) {
            Some(GitObject::Commit(commit)) => Some(commit.clone()),
            _ => None,
        }
    }
}

impl Repository for MemoryRepository {
    fn object(&self, oid: &ObjectId) -> Result<GitObject, GitError> {
        self.objects.get(oid).cloned().ok_or_else(|| GitError::ObjectNotFound(oid.to_string()))
    }

    fn object_parsing(&self, revision: &str) -> Result<GitObject, GitError> {
        if revision.is_empty() || revision.starts_with('-') {
            return Err(GitError::InvalidRevision(revision.to_string()));
        }
        if let Some(oid) = self.refs.get(revision) {
            return self.object(oid);
        }
        match ObjectId::parse(revision) {
            Some(oid) => self.object(&oid),
            None => Err(GitError::ObjectNotFound(revision.to_string())),
        }
    }

    fn commits(&self, from: &ObjectId) -> Result<CommitIter<'_>, GitError> {
        let first = self.find_commit(from).ok_or_else(|| GitError::ObjectNotFound(from.to_string()))?;
        let ancestors = std::iter::successors(Some(first), move |commit| {
            commit.parents.first().and_then(|parent| self.find_commit(parent))
        });
        Ok(Box::new(ancestors.map(Ok)))
    }

    fn note(&self, oid: &ObjectId, notes_ref: &str) -> Result<Note, GitError> {
        let notes_ref = qualify_notes_ref(notes_ref);
        self.notes.get(&(notes_ref.clone(), oid.clone())).cloned().ok_or_else(|| {
            GitError::NoteNotFound {
                oid: oid.to_string(),
                notes_ref,
            }
        })
    }

    fn alias_map(&self) -> Result<Option<Arc<dyn AliasResolver>>, GitError> {
        self.alias_map_requests.fetch_add(1, Ordering::SeqCst);
        Ok(self.aliases.clone().map(|aliases| aliases as Arc<dyn AliasResolver>))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn time() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2024-01-01T00:00:00+00:00").unwrap()
    }

    #[test]
    fn test_first_parent_walk() {
        let mut repo = MemoryRepository::new();
        let a = repo.commit("a", time(), &[]);
        let b = repo.commit("b", time(), &[&a.oid]);
        let c = repo.commit("c", time(), &[&b.oid]);

        let summaries: Vec<String> =
            repo.commits(&c.oid).unwrap().map(|commit| commit.unwrap().summary).collect();
        assert_eq!(summaries, ["c", "b", "a"]);
    }

    #[test]
    fn test_revisions() {
        let mut repo = MemoryRepository::new();
        let a = repo.commit("a", time(), &[]);
        let tag = repo.tag("v1", &a.oid, None);
        repo.add_ref("HEAD", &a.oid);

        assert_eq!(repo.object_parsing("HEAD").unwrap().oid(), &a.oid);
        assert_eq!(repo.object_parsing("v1").unwrap().oid(), &tag.oid);
        assert!(matches!(repo.object_parsing("--all"), Err(GitError::InvalidRevision(_))));
        assert!(repo.commits(&tag.oid).is_err());
    }

    #[test]
    fn test_notes_refs_are_qualified() {
        let mut repo = MemoryRepository::new();
        let a = repo.commit("a", time(), &[]);
        repo.add_note(&a.oid, "attrs", "k: v", time());
        assert_eq!(repo.note(&a.oid, "refs/notes/attrs").unwrap().message, "k: v");
        assert!(repo.note(&a.oid, "other").is_err());
    }
}
