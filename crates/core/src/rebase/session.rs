//! State carried through one rebase run.

use serde::{Deserialize, Serialize};

use crate::git::Identity;

/// Lifecycle of a rebase run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    NotStarted,
    Running,
    Complete,
    Aborted,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotStarted => write!(f, "not_started"),
            Self::Running => write!(f, "running"),
            Self::Complete => write!(f, "complete"),
            Self::Aborted => write!(f, "aborted"),
        }
    }
}

/// One rebase of `source` onto `target`, committed as `identity`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebaseSession {
    pub source: String,
    pub target: String,
    pub identity: Identity,
    state: SessionState,
    pauses: usize,
}

impl RebaseSession {
    pub fn new(source: impl Into<String>, target: impl Into<String>, identity: Identity) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            identity,
            state: SessionState::NotStarted,
            pauses: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Number of conflict stops seen so far.
    pub fn pauses(&self) -> usize {
        self.pauses
    }

    pub fn is_running(&self) -> bool {
        self.state == SessionState::Running
    }

    pub(crate) fn begin(&mut self) {
        if self.state == SessionState::NotStarted {
            self.state = SessionState::Running;
        }
    }

    pub(crate) fn paused(&mut self) {
        self.pauses += 1;
    }

    /// Terminal states are sticky.
    pub(crate) fn complete(&mut self) {
        if self.state == SessionState::Running {
            self.state = SessionState::Complete;
        }
    }

    pub(crate) fn abort(&mut self) {
        if matches!(self.state, SessionState::NotStarted | SessionState::Running) {
            self.state = SessionState::Aborted;
        }
    }
}

/// What a finished run did.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RebaseSummary {
    pub source: String,
    pub target: String,
    pub commits_applied: usize,
    pub pauses: usize,
    /// Automatically resolved paths with the strategy that resolved them.
    pub resolved: Vec<(String, String)>,
    /// Paths handed to the editor and accepted on a zero exit.
    pub escalated: Vec<String>,
}

impl RebaseSummary {
    pub fn for_session(session: &RebaseSession) -> Self {
        Self {
            source: session.source.clone(),
            target: session.target.clone(),
            ..Default::default()
        }
    }

    pub fn files_resolved(&self) -> usize {
        self.resolved.len() + self.escalated.len()
    }
}
