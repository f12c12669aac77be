//! Choosing how a conflicted file gets resolved.
//!
//! | Base name matches | Strategy |
//! |-------------------|----------|
//! | a lock-file rule | `Regenerate` with that rule's install command |
//! | a deferred pattern | `Defer` |
//! | anything else | `HunkMerge` |

use std::path::Path;

use tracing::debug;

use crate::config::{LockFileRule, StrategyConfig};

/// A resolution strategy for one conflicted file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    /// Delete the file and run `install` in its directory.
    Regenerate { install: Vec<String> },
    /// Merge conflict hunks by highest dependency version.
    HunkMerge,
    /// Never resolved automatically.
    Defer,
}

impl Strategy {
    /// Short human-readable label for logging and summaries.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Regenerate { .. } => "regenerate",
            Self::HunkMerge => "hunk-merge",
            Self::Defer => "defer",
        }
    }
}

/// Maps file names to strategies.
#[derive(Debug, Clone)]
pub struct StrategySelector {
    lock_files: Vec<LockFileRule>,
    deferred: Vec<String>,
}

impl StrategySelector {
    pub fn new(lock_files: Vec<LockFileRule>, deferred: Vec<String>) -> Self {
        Self {
            lock_files,
            deferred,
        }
    }

    /// Pick the strategy for `path` (repository-relative, either separator).
    pub fn classify(&self, path: &str) -> Strategy {
        let normalized = path.replace('\\', "/");
        let name = Path::new(&normalized)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(normalized.as_str());

        let strategy = if let Some(rule) = self
            .lock_files
            .iter()
            .find(|rule| glob_match::glob_match(&rule.pattern, name))
        {
            Strategy::Regenerate {
                install: rule.install.clone(),
            }
        } else if self
            .deferred
            .iter()
            .any(|pattern| glob_match::glob_match(pattern, name))
        {
            Strategy::Defer
        } else {
            Strategy::HunkMerge
        };

        debug!(path, strategy = strategy.label(), "classified conflicted file");
        strategy
    }
}

impl From<&StrategyConfig> for StrategySelector {
    fn from(config: &StrategyConfig) -> Self {
        Self::new(config.lock_files.clone(), config.deferred.clone())
    }
}

impl Default for StrategySelector {
    fn default() -> Self {
        Self::from(&StrategyConfig::default())
    }
}

/// Order conflicted entries for processing: the reverse of index order.
///
/// The index lists `package-lock.json` before `package.json`; reversing it
/// regenerates each lock file only after its manifest has been merged.
pub fn processing_order<T>(mut entries: Vec<T>) -> Vec<T> {
    entries.reverse();
    entries
}
