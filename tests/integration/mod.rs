//! Integration test suite for release-docs
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **render**: Loading, precedence and rendering against an in-memory repository
//! - **system_git**: Filters and builtin templates against real repositories
//! - **cli**: The `release-docs` binary

#[path = "../common/mod.rs"]
mod common;

mod cli;
mod render;
mod system_git;
