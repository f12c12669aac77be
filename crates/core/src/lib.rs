//! Rebaser core library.
//!
//! This crate rebases a branch onto its target and resolves dependency
//! version conflicts along the way: configuration, conflict parsing and
//! merging, per-file strategies, external commands, the git backend, and
//! the rebase driver.

pub mod config;
pub mod conflict;
pub mod errors;
pub mod git;
pub mod process;
pub mod rebase;

// Re-exports for convenience.
pub use config::RebaserConfig;
pub use errors::{CoreError, RebaseError};
pub use git::{GitClient, VersionControl};
pub use rebase::{RebaseDriver, RebaseSummary};
