//! Error types for the rebaser core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them all for callers that want a
//! single error type.
//!
//! Parse failures and arity mismatches inside a conflict hunk are *not*
//! errors: they surface as [`MergeOutcome::Unresolved`](crate::conflict::MergeOutcome)
//! so the driver can decide whether to escalate.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Conflict(#[from] ConflictError),

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Rebase(#[from] RebaseError),
}

// ---------------------------------------------------------------------------
// Git errors
// ---------------------------------------------------------------------------

/// Errors from local Git (git2) operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// The repository path does not exist or is not a git repo.
    #[error("git repository not found at '{0}'")]
    RepositoryNotFound(String),

    /// A `git2` library error.
    #[error("git2 error: {0}")]
    Git2Error(#[from] git2::Error),

    /// None of the candidate target branches exist.
    #[error("target branch not found (tried {0})")]
    TargetNotFound(String),

    /// The repository has no commits to take an identity from.
    #[error("repository has no commits on HEAD")]
    EmptyHead,

    /// The repository is bare and has no working tree to resolve in.
    #[error("repository at '{0}' has no working directory")]
    BareRepository(String),

    /// `continue_rebase` was called with no rebase in progress.
    #[error("no rebase in progress")]
    NoRebaseInProgress,

    /// A conflicted index entry carried a non-UTF-8 path.
    #[error("conflicted path is not valid UTF-8")]
    InvalidPath,
}

// ---------------------------------------------------------------------------
// Conflict errors
// ---------------------------------------------------------------------------

/// Errors from reading or rewriting a conflicted file.
#[derive(Debug, Error)]
pub enum ConflictError {
    /// The conflicted file could not be read.
    #[error("failed to read conflicted file '{path}': {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The merged content could not be written back.
    #[error("failed to write merged file '{path}': {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A lock file could not be removed before regeneration.
    #[error("failed to remove lock file '{path}': {source}")]
    RemoveFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// External process errors
// ---------------------------------------------------------------------------

/// Errors from launching external commands (package manager, editor).
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The command line has no program.
    #[error("external command is empty")]
    EmptyCommand,

    /// The program could not be started.
    #[error("failed to start '{program}': {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Waiting on the child process failed.
    #[error("failed waiting for '{program}': {source}")]
    WaitFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue {
        field: String,
        detail: String,
    },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Rebase driver errors
// ---------------------------------------------------------------------------

/// Fatal outcomes of a rebase run.
///
/// Every variant leaves the repository exactly where the failure happened;
/// nothing is rolled back.
#[derive(Debug, Error)]
pub enum RebaseError {
    /// A conflicted path could not be resolved and no escalation was possible.
    #[error("unable to resolve merge conflict in {path}")]
    Unresolved { path: String },

    /// The interactive editor exited non-zero.
    #[error("editor exited with code {exit_code} while resolving {path}")]
    EditorFailed { path: String, exit_code: i32 },

    #[error("rebase git error: {0}")]
    GitError(#[from] GitError),

    #[error("rebase conflict error: {0}")]
    ConflictError(#[from] ConflictError),

    #[error("rebase process error: {0}")]
    ProcessError(#[from] ProcessError),
}

impl RebaseError {
    /// The conflicted path this error is about, if any.
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::Unresolved { path } | Self::EditorFailed { path, .. } => Some(path),
            _ => None,
        }
    }
}
