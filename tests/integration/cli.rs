//! The `release-docs` binary.

use anyhow::Result;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

use crate::common::GitFixture;

fn release_docs() -> Result<Command> {
    Ok(Command::cargo_bin("release-docs")?)
}

#[test]
fn example_config_prints_builtin_example() -> Result<()> {
    release_docs()?
        .arg("example-config")
        .assert()
        .success()
        .stdout(predicate::str::contains("template_dirs"))
        .stdout(predicate::str::contains("notes_ref"));
    Ok(())
}

#[test]
fn render_builtin_changelog_to_stdout() -> Result<()> {
    let fixture = GitFixture::new()?;
    fixture.git.commit_file("README.md", "hello\n", "Initial import")?;
    fixture.git.commit_file("README.md", "hello again\n", "Document usage")?;

    release_docs()?
        .args(["render", "changelog.base.md", "--repo"])
        .arg(fixture.path())
        .assert()
        .success()
        .stdout(predicate::str::starts_with("# Changelog"))
        .stdout(predicate::str::contains("- Document usage (`"))
        .stdout(predicate::str::contains("- Initial import (`"));
    Ok(())
}

#[test]
fn render_directory_with_config_and_context() -> Result<()> {
    let fixture = GitFixture::new()?;
    fixture.git.commit_file("README.md", "hello\n", "Initial import")?;
    fixture.write(
        "release-docs.toml",
        "template_dirs = [\"docs/templates\"]\ndate_format = \"%Y-%m-%d\"\n",
    )?;
    fixture.write("docs/templates/release/VERSION.template", "{{ version }}\n")?;
    fixture.write(
        "docs/templates/release/notes.template.md",
        "---\ntitle: Notes\n---\n# {{ headers.title }} {{ version }}\n",
    )?;
    fixture.write("docs/templates/release/assets/logo.svg", "<svg/>")?;
    fixture.write("context.yml", "version: 2.0.0\n")?;

    let output = fixture.path().join("dist");
    release_docs()?
        .current_dir(fixture.path())
        .args(["render", "release", "--context", "context.yml", "--output"])
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("Rendered 3 file(s)"));

    assert_eq!(fs::read_to_string(output.join("VERSION"))?, "2.0.0\n");
    assert_eq!(fs::read_to_string(output.join("notes.md"))?, "# Notes 2.0.0\n");
    assert_eq!(fs::read_to_string(output.join("assets/logo.svg"))?, "<svg/>");
    Ok(())
}

#[test]
fn output_names_match_the_files_they_come_from() -> Result<()> {
    let fixture = GitFixture::new()?;
    fixture.git.commit("Initial import")?;
    fixture.write("templates/notes.template.md", "# Notes\n")?;
    fixture.write("templates/release/VERSION.template", "1.0\n")?;
    fs::write(fixture.path().join("templates/release/blob.template"), [0xffu8, 0xfe, 0x00])?;

    let output = fixture.path().join("dist");
    release_docs()?
        .current_dir(fixture.path())
        .args(["render", "notes.template.md", "--template-dir", "templates", "--output"])
        .arg(&output)
        .assert()
        .success();
    assert_eq!(fs::read_to_string(output.join("notes.md"))?, "# Notes\n");
    assert!(!output.join("notes.template.md").exists());

    release_docs()?
        .current_dir(fixture.path())
        .args(["render", "release", "--template-dir", "templates", "--output"])
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("Rendered 2 file(s)"));
    assert_eq!(fs::read(output.join("blob.template"))?, [0xffu8, 0xfe, 0x00]);
    Ok(())
}

#[test]
fn directory_without_output_is_an_error() -> Result<()> {
    let fixture = GitFixture::new()?;
    fixture.git.commit("Initial import")?;
    fixture.write("templates/release/a.template", "a")?;
    fixture.write("templates/release/b.template", "b")?;

    release_docs()?
        .current_dir(fixture.path())
        .args(["render", "release", "--template-dir", "templates"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("pass --output"));
    Ok(())
}

#[test]
fn template_errors_are_reported() -> Result<()> {
    let fixture = GitFixture::new()?;
    fixture.git.commit("Initial import")?;
    fixture.write("templates/broken.md", "{{ 'x' | prefx(n=1) }}")?;

    release_docs()?
        .current_dir(fixture.path())
        .args(["--quiet", "render", "broken.md", "--template-dir", "templates"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("broken.md"))
        .stderr(predicate::str::contains("Did you mean 'prefix'?"));
    Ok(())
}

#[test]
fn missing_template_is_reported() -> Result<()> {
    let fixture = GitFixture::new()?;
    fixture.git.commit("Initial import")?;

    release_docs()?
        .current_dir(fixture.path())
        .args(["render", "nothing-here.md"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Template 'nothing-here.md' not found"));
    Ok(())
}
