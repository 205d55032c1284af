//! Common fixtures for release-docs integration tests

// Not every test file uses every fixture
#![allow(dead_code)]

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

use release_docs::test_utils::TestGit;

/// A temporary directory of template files.
pub struct TemplateTree {
    dir: TempDir,
}

impl TemplateTree {
    pub fn new() -> Result<Self> {
        Ok(Self {
            dir: TempDir::new().context("Failed to create temp directory")?,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `contents` to `relative`, creating parent directories.
    pub fn write(&self, relative: &str, contents: impl AsRef<[u8]>) -> Result<&Self> {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&path, contents).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(self)
    }
}

/// A Git repository in a temporary directory.
pub struct GitFixture {
    dir: TempDir,
    pub git: TestGit,
}

impl GitFixture {
    pub fn new() -> Result<Self> {
        let dir = TempDir::new().context("Failed to create temp directory")?;
        let git = TestGit::new(dir.path());
        git.init()?;
        Ok(Self {
            dir,
            git,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write a file into the work tree without committing it.
    pub fn write(&self, relative: &str, contents: &str) -> Result<()> {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents).with_context(|| format!("Failed to write {}", path.display()))
    }
}
