//! External commands: the package manager and the interactive editor.
//!
//! Both are launched with inherited stdio and awaited to completion. Only
//! the exit code matters. The child is killed if the future is dropped.

use std::path::Path;

use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::errors::ProcessError;

/// How a finished command exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitOutcome {
    /// `None` when the process was terminated by a signal.
    pub code: Option<i32>,
}

impl ExitOutcome {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Exit code for diagnostics, `-1` for signal termination.
    pub fn code_or_signal(&self) -> i32 {
        self.code.unwrap_or(-1)
    }
}

/// A program plus its leading arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalCommand {
    program: String,
    args: Vec<String>,
}

impl ExternalCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Build from an argv-style list; the first element is the program.
    pub fn from_argv<S: AsRef<str>>(argv: &[S]) -> Result<Self, ProcessError> {
        let (program, args) = argv.split_first().ok_or(ProcessError::EmptyCommand)?;
        if program.as_ref().trim().is_empty() {
            return Err(ProcessError::EmptyCommand);
        }
        Ok(Self {
            program: program.as_ref().to_string(),
            args: args.iter().map(|a| a.as_ref().to_string()).collect(),
        })
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Run to completion in `dir` and report how it exited.
    pub async fn run(&self, dir: &Path) -> Result<ExitOutcome, ProcessError> {
        let mut cmd = self.command();
        cmd.current_dir(dir).kill_on_drop(true);

        debug!(cmd = %self, dir = %dir.display(), "running external command");
        let mut child = cmd.spawn().map_err(|source| ProcessError::SpawnFailed {
            program: self.program.clone(),
            source,
        })?;
        let status = child.wait().await.map_err(|source| ProcessError::WaitFailed {
            program: self.program.clone(),
            source,
        })?;

        let outcome = ExitOutcome {
            code: status.code(),
        };
        if outcome.success() {
            info!(cmd = %self, "external command succeeded");
        } else {
            warn!(cmd = %self, exit_code = outcome.code_or_signal(), "external command failed");
        }
        Ok(outcome)
    }

    // npm, yarn and code are batch shims on Windows and need the shell.
    #[cfg(windows)]
    fn command(&self) -> Command {
        let mut cmd = Command::new("cmd");
        cmd.arg("/C").arg(&self.program).args(&self.args);
        cmd
    }

    #[cfg(not(windows))]
    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }
}

impl std::fmt::Display for ExternalCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}
