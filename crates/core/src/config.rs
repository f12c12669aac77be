//! TOML-based configuration for the rebaser.
//!
//! Every section is optional; a missing file or an empty one yields the
//! built-in defaults (`main` on `origin`, `code --wait`, npm/yarn/pnpm lock
//! files). The editor command can be overridden from the environment via
//! [`RebaserConfig::resolve_env_vars`].

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::ConfigError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RebaserConfig {
    /// Minimum tracing level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Target branch resolution.
    #[serde(default)]
    pub target: TargetConfig,

    /// Interactive editor used for escalation.
    #[serde(default)]
    pub editor: EditorConfig,

    /// File-name based strategy selection.
    #[serde(default)]
    pub strategies: StrategyConfig,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for RebaserConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            target: TargetConfig::default(),
            editor: EditorConfig::default(),
            strategies: StrategyConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Target branch
// ---------------------------------------------------------------------------

/// Where to rebase onto when no branch is given on the command line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Conventional default branch name.
    #[serde(default = "default_branch")]
    pub default_branch: String,

    /// Remote whose tracking branch is the fallback target.
    #[serde(default = "default_remote")]
    pub remote: String,
}

fn default_branch() -> String {
    "main".into()
}
fn default_remote() -> String {
    "origin".into()
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            default_branch: default_branch(),
            remote: default_remote(),
        }
    }
}

// ---------------------------------------------------------------------------
// Editor
// ---------------------------------------------------------------------------

/// External editor launched on files the resolver gives up on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditorConfig {
    /// Program and arguments; the file path is appended. Must block until
    /// the file is closed.
    #[serde(default = "default_editor_command")]
    pub command: Vec<String>,

    /// Environment variable that overrides `command` (split on whitespace).
    #[serde(default = "default_editor_env")]
    pub command_env: Option<String>,
}

fn default_editor_command() -> Vec<String> {
    vec!["code".into(), "--wait".into()]
}
fn default_editor_env() -> Option<String> {
    Some("REBASER_EDITOR".into())
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            command: default_editor_command(),
            command_env: default_editor_env(),
        }
    }
}

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

/// A lock file that is regenerated rather than merged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LockFileRule {
    /// Glob matched against the file's base name.
    pub pattern: String,

    /// Install command run in the lock file's directory.
    pub install: Vec<String>,
}

impl LockFileRule {
    pub fn new(pattern: &str, install: &[&str]) -> Self {
        Self {
            pattern: pattern.to_string(),
            install: install.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// File-name patterns that pick a resolution strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Base-name globs that are never auto-resolved.
    #[serde(default = "default_deferred")]
    pub deferred: Vec<String>,

    /// Lock files regenerated by their package manager.
    #[serde(default = "default_lock_files")]
    pub lock_files: Vec<LockFileRule>,
}

fn default_deferred() -> Vec<String> {
    vec!["global.json".into()]
}

fn default_lock_files() -> Vec<LockFileRule> {
    vec![
        LockFileRule::new("package-lock.json", &["npm", "install"]),
        LockFileRule::new("yarn.lock", &["yarn", "install"]),
        LockFileRule::new("pnpm-lock.yaml", &["pnpm", "install"]),
    ]
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            deferred: default_deferred(),
            lock_files: default_lock_files(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading & resolving
// ---------------------------------------------------------------------------

impl RebaserConfig {
    /// Load a [`RebaserConfig`] from a TOML file at the given path.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: RebaserConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        debug!("configuration parsed successfully");
        Ok(config)
    }

    /// Apply the editor override from the environment, if one is set.
    ///
    /// A referenced variable that is unset or empty logs and keeps the
    /// configured command.
    pub fn resolve_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(ref env_name) = self.editor.command_env {
            if let Some(value) = resolve_optional_env(env_name, "editor.command_env") {
                let command: Vec<String> = value.split_whitespace().map(String::from).collect();
                if command.is_empty() {
                    return Err(ConfigError::InvalidValue {
                        field: "editor.command_env".into(),
                        detail: format!("{} contains no command", env_name),
                    });
                }
                self.editor.command = command;
            }
        }
        Ok(())
    }

    /// Validate that all required fields are present and sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target.default_branch.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "target.default_branch".into(),
                detail: "default branch must not be empty".into(),
            });
        }
        if self.target.remote.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "target.remote".into(),
                detail: "remote must not be empty".into(),
            });
        }
        if self.editor.command.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "editor.command".into(),
                detail: "editor command must name a program".into(),
            });
        }
        for rule in &self.strategies.lock_files {
            if rule.pattern.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "strategies.lock_files.pattern".into(),
                    detail: "lock file pattern must not be empty".into(),
                });
            }
            if rule.install.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "strategies.lock_files.install".into(),
                    detail: format!("no install command for '{}'", rule.pattern),
                });
            }
        }
        Ok(())
    }

    /// Convenience: load, resolve, and validate in one call.
    pub fn load_and_resolve<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::load_from_file(path)?;
        config.resolve_env_vars()?;
        config.validate()?;
        Ok(config)
    }
}

fn resolve_optional_env(env_name: &str, field: &str) -> Option<String> {
    match std::env::var(env_name) {
        Ok(val) if !val.trim().is_empty() => {
            debug!(field, env_name, "resolved env var");
            Some(val)
        }
        Ok(_) => {
            warn!(field, env_name, "env var is set but empty");
            None
        }
        Err(_) => {
            debug!(field, env_name, "env var not set");
            None
        }
    }
}
