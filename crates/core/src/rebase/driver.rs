//! The rebase control loop.
//!
//! [`RebaseDriver::run`] starts a rebase and, at every conflict stop:
//!
//! 1. Lists the conflicted paths and reverses them.
//! 2. Classifies each path and applies its [`Strategy`].
//! 3. Stages every resolved path.
//! 4. Escalates unresolved paths to the editor, or fails the run.
//! 5. Continues the rebase.
//!
//! Failures leave the repository mid-rebase. Nothing is rolled back.

use std::io::ErrorKind;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::config::{RebaserConfig, TargetConfig};
use crate::conflict::{processing_order, HunkMerger, Strategy, StrategySelector};
use crate::errors::{ConflictError, RebaseError};
use crate::git::{RebaseStatus, VersionControl};
use crate::process::ExternalCommand;

use super::session::{RebaseSession, RebaseSummary};

/// Drives one rebase over a [`VersionControl`] backend.
pub struct RebaseDriver<V: VersionControl> {
    vcs: V,
    selector: StrategySelector,
    /// Present only when escalation is enabled.
    editor: Option<ExternalCommand>,
    target: TargetConfig,
    session: Option<RebaseSession>,
}

impl<V: VersionControl> RebaseDriver<V> {
    /// Build a driver; with `interactive` set, fails when the editor
    /// command is empty.
    pub fn new(vcs: V, config: &RebaserConfig, interactive: bool) -> Result<Self, RebaseError> {
        let editor = if interactive {
            Some(ExternalCommand::from_argv(&config.editor.command)?)
        } else {
            None
        };
        Ok(Self {
            vcs,
            selector: StrategySelector::from(&config.strategies),
            editor,
            target: config.target.clone(),
            session: None,
        })
    }

    pub fn vcs(&self) -> &V {
        &self.vcs
    }

    /// The session of the last run, if any.
    pub fn session(&self) -> Option<&RebaseSession> {
        self.session.as_ref()
    }

    pub fn into_inner(self) -> V {
        self.vcs
    }

    /// Rebase the current branch onto `target` (or the configured default)
    /// and resolve every conflict along the way.
    pub async fn run(&mut self, target: Option<&str>) -> Result<RebaseSummary, RebaseError> {
        let identity = self.vcs.head_author()?;
        let source = self.vcs.head_branch()?;
        let target = self.vcs.resolve_target(target, &self.target)?;

        let mut session = RebaseSession::new(source, target, identity);
        let mut summary = RebaseSummary::for_session(&session);
        info!(
            source = %session.source,
            target = %session.target,
            identity = %session.identity,
            interactive = self.editor.is_some(),
            "starting rebase"
        );

        let result = self.drive(&mut session, &mut summary).await;
        match &result {
            Ok(()) => {
                session.complete();
                info!(
                    commits = summary.commits_applied,
                    files = summary.files_resolved(),
                    "rebase finished"
                );
            }
            Err(e) => {
                session.abort();
                warn!(error = %e, state = %session.state(), "rebase stopped");
            }
        }
        summary.pauses = session.pauses();
        self.session = Some(session);
        result.map(|()| summary)
    }

    async fn drive(
        &mut self,
        session: &mut RebaseSession,
        summary: &mut RebaseSummary,
    ) -> Result<(), RebaseError> {
        let mut status = self.vcs.start_rebase(&session.target, &session.identity)?;
        session.begin();

        loop {
            summary.commits_applied += status.applied();
            match status {
                RebaseStatus::Complete { .. } => return Ok(()),
                RebaseStatus::Conflicts { .. } => {
                    session.paused();
                    self.resolve_pause(summary).await?;
                    status = self.vcs.continue_rebase(&session.identity)?;
                }
            }
        }
    }

    async fn resolve_pause(&mut self, summary: &mut RebaseSummary) -> Result<(), RebaseError> {
        let conflicts = processing_order(self.vcs.conflicts()?);
        info!(count = conflicts.len(), "resolving conflicted files");

        for entry in conflicts {
            let strategy = self.selector.classify(&entry.path);
            if self.apply(&entry.path, &strategy).await? {
                self.vcs.stage(&entry.path)?;
                summary
                    .resolved
                    .push((entry.path, strategy.label().to_string()));
            } else if self.editor.is_some() && self.vcs.workdir().join(&entry.path).exists() {
                self.escalate(&entry.path).await?;
                self.vcs.stage(&entry.path)?;
                summary.escalated.push(entry.path);
            } else {
                if self.editor.is_some() {
                    warn!(path = %entry.path, "conflicted file is missing, not opening editor");
                }
                return Err(RebaseError::Unresolved { path: entry.path });
            }
        }
        Ok(())
    }

    /// Whether `strategy` resolved `path`.
    async fn apply(&self, path: &str, strategy: &Strategy) -> Result<bool, RebaseError> {
        let file = self.vcs.workdir().join(path);
        match strategy {
            Strategy::Regenerate { install } => regenerate(&file, install).await,
            Strategy::HunkMerge => match HunkMerger::resolve_file(&file) {
                Ok(outcome) => Ok(outcome.is_merged()),
                // Deleted on one side: there is nothing to merge.
                Err(e @ ConflictError::ReadFailed { .. }) => {
                    warn!(path, error = %e, "conflicted file unreadable");
                    Ok(false)
                }
                Err(e) => Err(e.into()),
            },
            Strategy::Defer => {
                debug!(path, "deferred file left for manual resolution");
                Ok(false)
            }
        }
    }

    async fn escalate(&self, path: &str) -> Result<(), RebaseError> {
        let Some(editor) = &self.editor else {
            return Err(RebaseError::Unresolved {
                path: path.to_string(),
            });
        };
        let workdir = self.vcs.workdir();
        let file = workdir.join(path);
        let command = editor.clone().arg(file.to_string_lossy());
        warn!(path, editor = %command, "opening editor for unresolved conflict");

        let outcome = command.run(workdir).await?;
        if !outcome.success() {
            return Err(RebaseError::EditorFailed {
                path: path.to_string(),
                exit_code: outcome.code_or_signal(),
            });
        }
        info!(path, "conflict resolved in editor");
        Ok(())
    }
}

/// Delete `file` and run `install` beside it.
async fn regenerate(file: &Path, install: &[String]) -> Result<bool, RebaseError> {
    match std::fs::remove_file(file) {
        Ok(()) => debug!(path = %file.display(), "removed lock file"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(source) => {
            return Err(ConflictError::RemoveFailed {
                path: file.display().to_string(),
                source,
            }
            .into())
        }
    }

    let command = match ExternalCommand::from_argv(install) {
        Ok(command) => command,
        Err(e) => {
            warn!(path = %file.display(), error = %e, "no install command for lock file");
            return Ok(false);
        }
    };
    let dir = file.parent().unwrap_or_else(|| Path::new("."));
    match command.run(dir).await {
        Ok(outcome) => Ok(outcome.success()),
        Err(e) => {
            warn!(path = %file.display(), error = %e, "install command could not run");
            Ok(false)
        }
    }
}
