//! Version-control operations the rebase driver depends on.
//!
//! [`VersionControl`] is the seam between the driver and the repository;
//! [`GitClient`] implements it over `git2`.

pub mod client;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::TargetConfig;
use crate::errors::GitError;

pub use client::GitClient;

/// Name and email used as the committer for replayed commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    pub email: String,
}

impl Identity {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}

/// Where the underlying rebase stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebaseStatus {
    /// Every commit was replayed and the rebase finished.
    Complete { applied: usize },
    /// Stopped on a commit whose changes conflict.
    Conflicts { applied: usize },
}

impl RebaseStatus {
    /// Commits committed during the step that produced this status.
    pub fn applied(&self) -> usize {
        match self {
            Self::Complete { applied } | Self::Conflicts { applied } => *applied,
        }
    }
}

/// One conflicted path at a pause point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictEntry {
    /// Path relative to the working directory, `/`-separated.
    pub path: String,
    /// Blob id of the "ours" stage, if present.
    pub ours: Option<String>,
    /// Blob id of the "theirs" stage, if present.
    pub theirs: Option<String>,
}

/// The repository operations a rebase run needs.
pub trait VersionControl {
    /// Root of the working tree; conflicted paths are relative to it.
    fn workdir(&self) -> &Path;

    /// Short name of the checked-out branch, or `HEAD` when detached.
    fn head_branch(&self) -> Result<String, GitError>;

    /// Author of the most recent commit on HEAD.
    fn head_author(&self) -> Result<Identity, GitError>;

    /// Resolve the branch to rebase onto to a full reference name.
    fn resolve_target(
        &self,
        explicit: Option<&str>,
        defaults: &TargetConfig,
    ) -> Result<String, GitError>;

    /// Begin rebasing HEAD onto `target` and run until a conflict or the end.
    fn start_rebase(&mut self, target: &str, identity: &Identity)
        -> Result<RebaseStatus, GitError>;

    /// Commit the resolved operation and run until a conflict or the end.
    fn continue_rebase(&mut self, identity: &Identity) -> Result<RebaseStatus, GitError>;

    /// Conflicted paths in index order.
    fn conflicts(&self) -> Result<Vec<ConflictEntry>, GitError>;

    /// Mark `path` as resolved with its current working-tree content.
    fn stage(&mut self, path: &str) -> Result<(), GitError>;
}
