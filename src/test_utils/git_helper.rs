//! Git test helper utilities
//!
//! Builds real repositories for tests that exercise [`SystemGitRepository`](crate::git::SystemGitRepository).

use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Git command runner for tests
///
/// Commits are made with fixed dates so object timestamps are predictable.
pub struct TestGit {
    repo_path: PathBuf,
}

/// Author and committer date of every commit made through [`TestGit`].
pub const TEST_COMMIT_DATE: &str = "2024-03-01T12:00:00+00:00";

impl TestGit {
    fn run_git_command(&self, args: &[&str], action: &str) -> Result<std::process::Output> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.repo_path)
            .env("GIT_CONFIG_NOSYSTEM", "1")
            .env("GIT_AUTHOR_DATE", TEST_COMMIT_DATE)
            .env("GIT_COMMITTER_DATE", TEST_COMMIT_DATE)
            .output()
            .with_context(|| action.to_string())?;

        if !output.status.success() {
            bail!("{} failed: {}", action, String::from_utf8_lossy(&output.stderr));
        }

        Ok(output)
    }

    /// Create a new TestGit instance for the given repository path
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Self {
            repo_path: repo_path.into(),
        }
    }

    /// Initialize a repository with a test identity
    pub fn init(&self) -> Result<()> {
        self.run_git_command(&["init", "--quiet"], "Failed to initialize git repository")?;
        self.config_user()
    }

    /// Configure git user for tests
    pub fn config_user(&self) -> Result<()> {
        self.run_git_command(
            &["config", "user.email", "test@release-docs.example"],
            "Failed to configure git user email",
        )?;
        self.run_git_command(
            &["config", "user.name", "Test User"],
            "Failed to configure git user name",
        )?;
        self.run_git_command(
            &["config", "commit.gpgsign", "false"],
            "Failed to disable commit signing",
        )?;
        self.run_git_command(&["config", "tag.gpgsign", "false"], "Failed to disable tag signing")?;
        Ok(())
    }

    /// Write `contents` to `path` and commit it with `message`
    pub fn commit_file(&self, path: &str, contents: &str, message: &str) -> Result<String> {
        let file = self.repo_path.join(path);
        if let Some(parent) = file.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(&file, contents)
            .with_context(|| format!("Failed to write {}", file.display()))?;
        self.run_git_command(&["add", path], "Failed to add file to git")?;
        self.commit(message)
    }

    /// Create a commit with the given message, returning its id
    pub fn commit(&self, message: &str) -> Result<String> {
        self.run_git_command(
            &["commit", "--quiet", "--allow-empty", "-m", message],
            "Failed to create git commit",
        )?;
        self.rev_parse("HEAD")
    }

    /// Create an annotated tag on HEAD, returning the tag object's id
    pub fn annotated_tag(&self, tag_name: &str, message: &str) -> Result<String> {
        self.run_git_command(
            &["tag", "-a", tag_name, "-m", message],
            &format!("Failed to create tag: {}", tag_name),
        )?;
        self.rev_parse(tag_name)
    }

    /// Attach a note to `revision` under `notes_ref`
    pub fn add_note(&self, notes_ref: &str, revision: &str, message: &str) -> Result<()> {
        self.run_git_command(
            &["notes", "--ref", notes_ref, "add", "-f", "-m", message, revision],
            &format!("Failed to add note to {}", revision),
        )?;
        Ok(())
    }

    /// Resolve a revision to a full object id
    pub fn rev_parse(&self, revision: &str) -> Result<String> {
        let output = self.run_git_command(
            &["rev-parse", "--verify", revision],
            &format!("Failed to resolve {}", revision),
        )?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Return the repository path
    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }
}
