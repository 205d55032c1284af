//! Repository queries and builtin templates against real Git repositories.

use anyhow::Result;
use chrono::DateTime;
use std::sync::Arc;
use tera::Context;

use release_docs::git::{GitError, GitObject, ObjectId, ObjectKind, Repository, SystemGitRepository};
use release_docs::templating::TemplateEnvironment;
use release_docs::test_utils::{TEST_COMMIT_DATE, init_test_logging};

use crate::common::GitFixture;

/// Two commits, an annotated tag on the second, and a note on the second
/// under `refs/notes/release`.
fn release_fixture() -> Result<(GitFixture, String, String)> {
    let fixture = GitFixture::new()?;
    let first = fixture.git.commit_file("src/lib.rs", "// one\n", "Initial import")?;
    let second = fixture.git.commit_file("src/lib.rs", "// two\n", "Fix crash on empty input")?;
    fixture.git.annotated_tag("v1.0.0", "Release 1.0.0")?;
    fixture.git.add_note("release", &second, "Reviewed by QA\n\nRelease-Channel: beta")?;
    Ok((fixture, first, second))
}

#[test]
fn objects_and_ancestors() -> Result<()> {
    init_test_logging(None);
    let (fixture, first, second) = release_fixture()?;
    let repo = SystemGitRepository::open(fixture.path())?;

    let GitObject::Commit(head) = repo.object_parsing("HEAD")? else {
        panic!("HEAD should be a commit");
    };
    assert_eq!(head.oid.as_str(), second);
    assert_eq!(head.summary, "Fix crash on empty input");
    assert_eq!(head.parents, vec![ObjectId::parse(&first).unwrap()]);
    assert_eq!(head.author.email, "test@release-docs.example");
    assert_eq!(head.date(), DateTime::parse_from_rfc3339(TEST_COMMIT_DATE)?);

    let summaries: Vec<String> =
        repo.commits(&head.oid)?.map(|commit| commit.map(|c| c.summary)).collect::<Result<_, _>>()?;
    assert_eq!(summaries, ["Fix crash on empty input", "Initial import"]);

    // Dropping a partially consumed walk stops rev-list
    let newest = repo.commits(&head.oid)?.next().unwrap()?;
    assert_eq!(newest.oid, head.oid);

    let tree = head.tree.clone().unwrap();
    assert!(matches!(
        repo.object(&tree)?,
        GitObject::Pointer(pointer) if pointer.kind == ObjectKind::Tree
    ));
    Ok(())
}

#[test]
fn tags_notes_and_bad_revisions() -> Result<()> {
    let (fixture, first, second) = release_fixture()?;
    let repo = SystemGitRepository::open(fixture.path())?;

    let GitObject::Tag(tag) = repo.object_parsing("v1.0.0")? else {
        panic!("v1.0.0 should be an annotated tag");
    };
    assert_eq!(tag.name, "v1.0.0");
    assert_eq!(tag.target.oid.as_str(), second);
    assert_eq!(tag.target.kind, ObjectKind::Commit);
    assert_eq!(tag.message.trim(), "Release 1.0.0");
    assert!(tag.tagger.is_some());

    let second = ObjectId::parse(&second).unwrap();
    let note = repo.note(&second, "release")?;
    assert_eq!(note.target, second);
    assert!(note.message.contains("Release-Channel: beta"));
    assert_eq!(note.committer.time, DateTime::parse_from_rfc3339(TEST_COMMIT_DATE)?);

    let first = ObjectId::parse(&first).unwrap();
    assert!(matches!(repo.note(&first, "release"), Err(GitError::NoteNotFound { .. })));
    assert!(matches!(repo.object_parsing("--all"), Err(GitError::InvalidRevision(_))));
    assert!(matches!(repo.object_parsing("no-such-branch"), Err(GitError::ObjectNotFound(_))));
    assert!(repo.alias_map()?.is_none());
    Ok(())
}

#[test]
fn builtin_release_notes() -> Result<()> {
    let (fixture, _, _) = release_fixture()?;
    let repo = SystemGitRepository::open(fixture.path())?;
    let env = TemplateEnvironment::builder(Arc::new(repo)).notes_ref("release").build()?;

    let mut context = Context::new();
    context.insert("revision", "v1.0.0");
    let rendered = env.render_templates("release-notes.base.md", &context)?;
    let notes = rendered["release-notes.base.md"].as_deref().unwrap_or_default();

    assert!(notes.starts_with("# Release Notes for v1.0.0\n"), "got {notes:?}");
    assert!(notes.contains("_Released "), "got {notes:?}");
    assert!(notes.contains("* Fix crash on empty input [beta]\n"), "got {notes:?}");
    assert!(notes.contains("* Initial import\n"), "got {notes:?}");
    Ok(())
}

#[test]
fn attrs_and_aliases_from_the_work_tree() -> Result<()> {
    let (fixture, _, _) = release_fixture()?;
    fixture.write(
        ".release-docs/aliases.yml",
        "- name: Tess Tester\n  email: tess@example.org\n  emails: [test@release-docs.example]\n  platforms:\n    github: \"@tess\"\n",
    )?;
    let repo = SystemGitRepository::open(fixture.path())?;
    let env = TemplateEnvironment::builder(Arc::new(repo)).notes_ref("refs/notes/release").build()?;

    let template = "{{ \"HEAD\" | attrs(key=\"Release-Channel\") }}|\
                    {% set head = \"HEAD\" | rev_parse %}\
                    {% for c in head | commits %}\
                    {% set contact = c.author.name ~ \" <\" ~ c.author.email ~ \">\" %}\
                    {{ contact | alias }}/{{ contact | alias(platform=\"github\") }};\
                    {% endfor %}";
    let out = env.render_str("who.txt", template, &Context::new())?;
    assert_eq!(out, "beta|Tess Tester <tess@example.org>/@tess;Tess Tester <tess@example.org>/@tess;");
    Ok(())
}
