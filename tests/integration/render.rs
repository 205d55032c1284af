//! Rendering through `TemplateEnvironment` with an in-memory repository.

use anyhow::Result;
use chrono::DateTime;
use std::sync::Arc;
use tera::Context;

use release_docs::templating::{TemplateEnvironment, TemplateError, builtin::builtin_template};
use release_docs::test_utils::{MemoryRepository, init_test_logging};

use crate::common::TemplateTree;

fn environment(tree: &TemplateTree, repo: MemoryRepository) -> Result<TemplateEnvironment> {
    Ok(TemplateEnvironment::builder(Arc::new(repo)).search_root(tree.path()).build()?)
}

/// A `base` name always means the builtin resource, even when a search root
/// holds a file with the same name; search roots are only consulted when the
/// bundle has no such resource.
#[test]
fn base_templates_prefer_builtin_resources() -> Result<()> {
    init_test_logging(None);

    let tree = TemplateTree::new()?;
    tree.write("changelog.base.md", "local changelog")?;
    tree.write("changelog.md", "local changelog")?;
    tree.write("notes.base.md", "local notes")?;
    let env = environment(&tree, MemoryRepository::new())?;

    let rendered = env.render_templates("changelog.base.md", &Context::new())?;
    let changelog = rendered["changelog.base.md"].as_deref().unwrap_or_default();
    assert!(changelog.starts_with("# Changelog"), "got {changelog:?}");
    assert!(builtin_template("changelog.md").is_some());

    let rendered = env.render_templates("changelog.md", &Context::new())?;
    assert_eq!(rendered["changelog.md"].as_deref(), Some("local changelog"));

    let rendered = env.render_templates("notes.base.md", &Context::new())?;
    assert_eq!(rendered["notes.base.md"].as_deref(), Some("local notes"));
    Ok(())
}

#[test]
fn first_search_root_wins() -> Result<()> {
    let first = TemplateTree::new()?;
    let second = TemplateTree::new()?;
    first.write("VERSION.template", "first")?;
    second.write("VERSION.template", "second")?;
    second.write("only-second.txt", "x")?;

    let env = TemplateEnvironment::builder(Arc::new(MemoryRepository::new()))
        .search_root(first.path())
        .search_root(second.path())
        .build()?;

    assert_eq!(env.render_templates("VERSION.template", &Context::new())?["VERSION"].as_deref(), Some("first"));
    assert!(env.render_templates("only-second.txt", &Context::new()).is_ok());
    Ok(())
}

#[test]
fn directory_with_template_and_plain_file() -> Result<()> {
    let tree = TemplateTree::new()?;
    tree.write("release/notes.template.md", "---\ntitle: Notes\n---\n# {{ headers.title }}")?;
    tree.write("release/README.txt", "{{ not rendered }}")?;
    let env = environment(&tree, MemoryRepository::new())?;

    let rendered = env.render_templates("release", &Context::new())?;
    assert_eq!(rendered.len(), 2);
    assert_eq!(rendered["notes.md"].as_deref(), Some("# Notes"));
    assert_eq!(rendered["README.txt"], None);
    Ok(())
}

#[test]
fn single_template_key_drops_the_marker() -> Result<()> {
    let tree = TemplateTree::new()?;
    tree.write("notes.template.md", "---\ntitle: Notes\n---\n# {{ headers.title }}")?;
    tree.write("release/notes.template.md", "---\ntitle: Notes\n---\n# {{ headers.title }}")?;
    let env = environment(&tree, MemoryRepository::new())?;

    let single = env.render_templates("notes.template.md", &Context::new())?;
    let keys: Vec<&str> = single.keys().map(String::as_str).collect();
    assert_eq!(keys, ["notes.md"]);
    assert_eq!(single["notes.md"].as_deref(), Some("# Notes"));

    let walked = env.render_templates("release", &Context::new())?;
    assert_eq!(walked, single);
    Ok(())
}

#[test]
fn unreadable_template_keeps_its_file_name() -> Result<()> {
    let tree = TemplateTree::new()?;
    tree.write("release/blob.template", [0xffu8, 0xfe, 0x00])?;
    tree.write("release/VERSION.template", "1.0")?;
    let env = environment(&tree, MemoryRepository::new())?;

    let rendered = env.render_templates("release", &Context::new())?;
    let keys: Vec<&str> = rendered.keys().map(String::as_str).collect();
    assert_eq!(keys, ["VERSION", "blob.template"]);
    assert_eq!(rendered["blob.template"], None);
    assert!(tree.path().join("release").join("blob.template").is_file());
    Ok(())
}

#[test]
fn nested_keys_are_relative_to_the_requested_directory() -> Result<()> {
    let tree = TemplateTree::new()?;
    tree.write("release/docs/CHANGES.template.md", "changes")?;
    tree.write("release/docs/img/logo.png", [0u8, 159, 146, 150])?;
    tree.write("release/VERSION.template", "{{ version }}")?;
    let env = environment(&tree, MemoryRepository::new())?;

    let mut context = Context::new();
    context.insert("version", "3.1.4");
    let rendered = env.render_templates("release", &context)?;

    let keys: Vec<&str> = rendered.keys().map(String::as_str).collect();
    assert_eq!(keys, ["VERSION", "docs/CHANGES.md", "docs/img/logo.png"]);
    assert_eq!(rendered["VERSION"].as_deref(), Some("3.1.4"));
    assert_eq!(rendered["docs/img/logo.png"], None);

    // Rendering is deterministic for an unchanged tree
    assert_eq!(env.render_templates("release", &context)?, rendered);
    Ok(())
}

#[test]
fn one_bad_template_fails_the_whole_render() -> Result<()> {
    let tree = TemplateTree::new()?;
    tree.write("release/a.template.md", "fine")?;
    tree.write("release/b.template.md", "{% if %}")?;
    tree.write("release/c.template.md", "also fine")?;
    let env = environment(&tree, MemoryRepository::new())?;

    let err = env.render_templates("release", &Context::new()).unwrap_err();
    assert!(matches!(err, TemplateError::Syntax { .. }), "got {err:?}");
    assert_eq!(err.template(), Some("b.md"));
    Ok(())
}

#[test]
fn filter_misuse_is_a_contract_violation() -> Result<()> {
    let tree = TemplateTree::new()?;
    tree.write("bad.md", "{{ 42 | format_markdown }}")?;
    let env = environment(&tree, MemoryRepository::new())?;

    match env.render_templates("bad.md", &Context::new()).unwrap_err() {
        TemplateError::ContractViolation {
            template,
            source,
        } => {
            assert_eq!(template, "bad.md");
            assert_eq!(source.filter, "format_markdown");
        }
        other => panic!("expected a contract violation, got {other:?}"),
    }
    Ok(())
}

#[test]
fn caller_headers_win_over_front_matter() -> Result<()> {
    let tree = TemplateTree::new()?;
    tree.write("notes.md", "---\ntitle: From file\n---\n{{ headers.title }}")?;
    let env = environment(&tree, MemoryRepository::new())?;

    let rendered = env.render_templates("notes.md", &Context::new())?;
    assert_eq!(rendered["notes.md"].as_deref(), Some("From file"));

    let mut context = Context::new();
    context.insert("headers", &serde_json::json!({"title": "From caller"}));
    let rendered = env.render_templates("notes.md", &context)?;
    assert_eq!(rendered["notes.md"].as_deref(), Some("From caller"));
    Ok(())
}

#[test]
fn missing_template_lists_search_roots() -> Result<()> {
    let tree = TemplateTree::new()?;
    let env = environment(&tree, MemoryRepository::new())?;

    let err = env.render_templates("missing", &Context::new()).unwrap_err();
    let TemplateError::NotFound {
        search_roots,
        ..
    } = &err
    else {
        panic!("expected not found, got {err:?}");
    };
    assert_eq!(search_roots.as_slice(), [tree.path().to_path_buf()]);
    Ok(())
}

#[test]
fn repository_filters_in_templates() -> Result<()> {
    let time = DateTime::parse_from_rfc3339("2024-03-01T12:00:00+00:00")?;
    let mut repo = MemoryRepository::new();
    let first = repo.commit("Initial import", time, &[]);
    let second = repo.commit("Fix crash on empty input", time, &[&first.oid]);
    repo.tag("v1.0.0", &second.oid, Some(time));

    let tree = TemplateTree::new()?;
    tree.write(
        "summary.txt.template",
        "{% set release = \"v1.0.0\" | rev_parse %}\
         {{ release.name }} {{ release | object_type }} {{ release.target.oid | prefix(n=8) }}\n\
         {% for commit in release | commits %}{{ commit.summary | replace(old=\" \", new=\"_\") }};{% endfor %}\n\
         {{ release.tagger.time | format_date(format=\"%Y\", gmt=true) }}",
    )?;
    let env = environment(&tree, repo)?;

    let rendered = env.render_templates("summary.txt.template", &Context::new())?;
    let expected_prefix = &second.oid.as_str()[..8];
    assert_eq!(
        rendered["summary.txt"].as_deref(),
        Some(
            format!(
                "v1.0.0 tag {expected_prefix}\nFix_crash_on_empty_input;Initial_import;\n2024"
            )
            .as_str()
        )
    );
    Ok(())
}

#[test]
fn commit_date_by_field_and_by_get() -> Result<()> {
    let time = DateTime::parse_from_rfc3339("2024-03-01T12:00:00+02:00")?;
    let mut repo = MemoryRepository::new();
    let commit = repo.commit("Initial import", time, &[]);
    repo.add_ref("HEAD", &commit.oid);
    let env = environment(&TemplateTree::new()?, repo)?;

    let out = env.render_str(
        "dates.txt",
        "{% set head = \"HEAD\" | rev_parse %}\
         {{ head.date | format_date(format=\"%F %H:%M\", gmt=true) }}|\
         {{ head | get(key=\"date\") | format_date(format=\"%F %H:%M\", gmt=true) }}",
        &Context::new(),
    )?;
    assert_eq!(out, "2024-03-01 10:00|2024-03-01 10:00");
    Ok(())
}
