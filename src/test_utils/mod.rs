//! Test utilities for release-docs
//!
//! Available to unit tests and, through the `test-utils` feature, to the
//! integration tests:
//!
//! - [`MemoryRepository`]: an in-memory [`Repository`](crate::git::Repository)
//! - [`TestGit`]: builds real repositories with the `git` executable
//! - [`init_test_logging`]: routes `tracing` output to the test harness
//!
//! # Example
//!
//! ```rust,no_run
//! use release_docs::test_utils::{TestGit, init_test_logging};
//!
//! # fn example() -> anyhow::Result<()> {
//! init_test_logging(None);
//! let dir = tempfile::tempdir()?;
//! let git = TestGit::new(dir.path());
//! git.init()?;
//! git.commit_file("README.md", "hello", "Initial commit")?;
//! # Ok(())
//! # }
//! ```

pub mod git_helper;
pub mod memory_repo;

pub use git_helper::{TEST_COMMIT_DATE, TestGit};
pub use memory_repo::MemoryRepository;

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has an effect. `level` takes precedence over
/// `RUST_LOG`; with neither, logging stays off.
///
/// ```bash
/// RUST_LOG=release_docs=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}
