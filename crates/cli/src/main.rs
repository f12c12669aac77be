//! Rebaser command-line tool.
//!
//! Rebases the checked-out branch of a repository onto its target branch,
//! resolving dependency version conflicts automatically. Conflicts that
//! cannot be merged fail the run, or open an editor with `--interactive`.

mod style;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rebaser_core::config::RebaserConfig;
use rebaser_core::git::GitClient;
use rebaser_core::rebase::{RebaseDriver, RebaseSummary};

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// Rebase a branch and resolve dependency version conflicts.
#[derive(Parser, Debug)]
#[command(
    name = "rebaser",
    version,
    about = "Rebase onto a target branch, keeping the highest dependency versions"
)]
struct Cli {
    /// Path to the git repository.
    repository: PathBuf,

    /// Branch to rebase onto (defaults to the configured default branch).
    target: Option<String>,

    /// Open an editor for conflicts that cannot be resolved automatically.
    #[arg(short, long)]
    interactive: bool,

    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(short, long)]
    verbose: bool,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };
    init_logging(&config, cli.verbose);

    match run(&cli, &config).await {
        Ok(summary) => {
            print_summary(&summary);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", style::error(&format!("Error: {:#}", e)));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli, config: &RebaserConfig) -> Result<RebaseSummary> {
    info!(version = env!("CARGO_PKG_VERSION"), "rebaser starting");
    let client = GitClient::new(&cli.repository).context("failed to open repository")?;
    let mut driver = RebaseDriver::new(client, config, cli.interactive)
        .context("invalid editor configuration")?;

    let summary = driver.run(cli.target.as_deref()).await?;
    Ok(summary)
}

// ---------------------------------------------------------------------------
// Config and logging
// ---------------------------------------------------------------------------

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("rebaser").join("config.toml"))
}

/// Load the explicit config, else the per-user default if it exists, else
/// the built-in defaults.
fn load_config(explicit: Option<&Path>) -> Result<RebaserConfig> {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => default_config_path().filter(|p| p.exists()),
    };

    let config = match path {
        Some(path) => RebaserConfig::load_and_resolve(&path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => {
            let mut config = RebaserConfig::default();
            config
                .resolve_env_vars()
                .context("failed to resolve environment overrides")?;
            config.validate().context("configuration validation failed")?;
            config
        }
    };
    Ok(config)
}

/// `RUST_LOG` wins over `--verbose`, which wins over the config file.
fn init_logging(config: &RebaserConfig, verbose: bool) {
    let fallback = if verbose { "debug" } else { config.log_level.as_str() };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn print_summary(summary: &RebaseSummary) {
    println!(
        "{}",
        style::success(&format!(
            "Rebased {} onto {} ({} commit(s) applied)",
            summary.source, summary.target, summary.commits_applied
        ))
    );

    if summary.pauses == 0 {
        println!("  {}", style::dim("no conflicts"));
        return;
    }

    println!(
        "{}",
        style::header(&format!(
            "Resolved {} file(s) across {} conflict stop(s)",
            summary.files_resolved(),
            summary.pauses
        ))
    );
    for (path, strategy) in &summary.resolved {
        println!("  {} {}", style::strategy(strategy), path);
    }
    for path in &summary.escalated {
        println!("  {}", style::warn(&format!("{} (resolved in editor)", path)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_arguments() {
        let cli = Cli::parse_from(["rebaser", "/tmp/repo", "release", "-i"]);
        assert_eq!(cli.repository, PathBuf::from("/tmp/repo"));
        assert_eq!(cli.target.as_deref(), Some("release"));
        assert!(cli.interactive);
        assert!(!cli.verbose);

        let cli = Cli::parse_from(["rebaser", "."]);
        assert!(cli.target.is_none());
        assert!(!cli.interactive);
    }

    #[test]
    fn test_explicit_missing_config_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_config(Some(&dir.path().join("absent.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_explicit_config_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[target]\ndefault_branch = \"develop\"\n").unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.target.default_branch, "develop");
    }
}
