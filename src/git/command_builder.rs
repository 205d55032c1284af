//! Type-safe Git command builder for consistent command execution
//!
//! This module provides a fluent API for building and executing Git commands
//! synchronously, so every repository query shares the same environment
//! isolation, logging and error mapping.

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::Instant;

use super::GitError;
use crate::constants::SLOW_GIT_COMMAND_MS;

/// Builder for a single `git` invocation.
///
/// # Examples
///
/// ```rust,no_run
/// use release_docs::git::command_builder::GitCommand;
///
/// # fn example() -> Result<(), release_docs::git::GitError> {
/// let head = GitCommand::rev_parse_verify("HEAD")
///     .current_dir("/path/to/repo")
///     .execute_stdout()?;
/// println!("HEAD is {}", head.trim());
/// # Ok(())
/// # }
/// ```
///
/// # Environment
///
/// Commands run with a cleared environment that only keeps `PATH` and `HOME`,
/// so user-level `GIT_*` variables cannot redirect queries to another
/// repository. Paths are never quoted in output (`core.quotePath=false`).
#[derive(Debug, Default)]
pub struct GitCommand {
    /// Command arguments to pass to Git (e.g., ["cat-file", "commit", "<oid>"])
    args: Vec<String>,

    /// Working directory for command execution (defaults to current directory)
    current_dir: Option<PathBuf>,

    /// Extra environment variables for the Git process
    env_vars: Vec<(String, String)>,

    /// Optional context string for log messages
    context: Option<String>,
}

/// Captured output of a finished Git command.
#[derive(Debug)]
pub struct GitCommandOutput {
    pub stdout: String,
    pub stderr: String,
}

impl GitCommand {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the command in `dir` (passed to git as `-C <dir>`).
    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.push((key.into(), value.into()));
        self
    }

    /// Attach a short description used in log messages.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    fn command_line(&self) -> String {
        format!("git {}", self.args.join(" "))
    }

    fn build(&self) -> Command {
        let mut cmd = Command::new("git");

        if let Some(dir) = &self.current_dir {
            cmd.arg("-C").arg(dir);
        }

        cmd.env_clear();
        if let Ok(path) = std::env::var("PATH") {
            cmd.env("PATH", path);
        }
        if let Ok(home) = std::env::var("HOME") {
            cmd.env("HOME", home);
        }
        for (key, value) in &self.env_vars {
            tracing::trace!(target: "git", "Setting env var: {}={}", key, value);
            cmd.env(key, value);
        }

        cmd.arg("-c").arg("core.quotePath=false");
        cmd.args(&self.args);
        cmd.stdin(Stdio::null());
        cmd
    }

    /// Run the command to completion and capture its output.
    ///
    /// # Errors
    ///
    /// [`GitError::Io`] if git cannot be spawned, [`GitError::CommandFailed`]
    /// if it exits unsuccessfully.
    pub fn execute(self) -> Result<GitCommandOutput, GitError> {
        let start = Instant::now();
        let command_line = self.command_line();
        tracing::trace!(target: "git", "Executing: {}", command_line);

        let output = self.build().output()?;
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            tracing::debug!(
                target: "git",
                "Command failed with exit code {:?}: {}",
                output.status.code(),
                stderr.trim()
            );
            return Err(GitError::CommandFailed {
                command: command_line,
                stderr,
            });
        }

        let elapsed = start.elapsed();
        if elapsed.as_millis() > SLOW_GIT_COMMAND_MS {
            match &self.context {
                Some(ctx) => tracing::debug!(target: "git::perf", "({}) {} took {}ms", ctx, command_line, elapsed.as_millis()),
                None => tracing::debug!(target: "git::perf", "{} took {}ms", command_line, elapsed.as_millis()),
            }
        }

        Ok(GitCommandOutput {
            stdout,
            stderr,
        })
    }

    /// Run the command and return only its standard output.
    pub fn execute_stdout(self) -> Result<String, GitError> {
        Ok(self.execute()?.stdout)
    }

    /// Start the command with a piped standard output for streaming reads.
    ///
    /// The caller owns the child and must wait on or kill it.
    pub fn spawn_stdout(self) -> Result<Child, GitError> {
        tracing::trace!(target: "git", "Spawning: {}", self.command_line());
        let mut cmd = self.build();
        cmd.stdout(Stdio::piped()).stderr(Stdio::null());
        Ok(cmd.spawn()?)
    }

    /// `git cat-file -t <oid>`
    pub fn object_type(oid: &str) -> Self {
        Self::new().args(["cat-file", "-t", oid])
    }

    /// `git cat-file <kind> <oid>`, the raw object body
    pub fn cat_file(kind: &str, oid: &str) -> Self {
        Self::new().args(["cat-file", kind, oid])
    }

    /// `git rev-parse --verify --quiet <revision>^{object}`
    pub fn rev_parse_verify(revision: &str) -> Self {
        Self::new().args(["rev-parse", "--verify", "--quiet"]).arg(format!("{revision}^{{object}}"))
    }

    /// `git rev-list <oid>`, ancestors newest first
    pub fn rev_list(oid: &str) -> Self {
        Self::new().args(["rev-list", oid])
    }

    /// `git notes --ref <ref> list <oid>`, the id of the note blob
    pub fn notes_list(notes_ref: &str, oid: &str) -> Self {
        Self::new().args(["notes", "--ref", notes_ref, "list", oid])
    }

    /// `git notes --ref <ref> show <oid>`
    pub fn notes_show(notes_ref: &str, oid: &str) -> Self {
        Self::new().args(["notes", "--ref", notes_ref, "show", oid])
    }

    /// Committer of the last notes commit under `notes_ref`, as
    /// `name\x1femail\x1fISO-8601 time`.
    pub fn notes_committer(notes_ref: &str) -> Self {
        Self::new().args(["log", "-1", "--format=%cn%x1f%ce%x1f%cI", notes_ref])
    }
}
