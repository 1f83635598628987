mod register_cmd;
mod serve_cmd;
mod stats_cmd;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{debug, error};

use statuskeeper_config::{
    config_dir, config_file_path, load_and_prepare, redact, validate, StatusKeeperConfig,
    ValidationScope,
};
use statuskeeper_core::{KeeperError, UserId};
use statuskeeper_logging::{init_logger, redact_sensitive_data};

#[derive(Parser)]
#[command(name = "statuskeeper")]
#[command(about = "Track Discord presence, voice time, and messages")]
#[command(version)]
struct Cli {
    /// Path to config.yaml (defaults to ~/.statuskeeper/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to Discord and start tracking
    Serve,
    /// Print accumulated stats for one user from the database
    Stats {
        /// Discord user id
        user_id: UserId,
    },
    /// Overwrite the global slash command set and exit
    RegisterCommands,
}

impl Commands {
    fn validation_scope(&self) -> ValidationScope {
        match self {
            Commands::Serve => ValidationScope::Gateway,
            Commands::Stats { .. } => ValidationScope::Storage,
            Commands::RegisterCommands => ValidationScope::Commands,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let message = redact_sensitive_data(&format!("{e:#}"));
            error!(error = %message, "Command failed");
            eprintln!("Error: {message}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let path = cli
        .config
        .unwrap_or_else(|| config_file_path(&config_dir()));
    let config = load_and_prepare(&path).await?;

    let level = config.logging.level.as_deref().unwrap_or("info");
    let _log_guard = init_logger(config.logging.dir.as_deref(), level);

    check_config(&config, cli.command.validation_scope())?;
    if let Ok(snapshot) = serde_json::to_value(&config) {
        debug!(config = %redact(&snapshot), "Effective config");
    }

    match cli.command {
        Commands::Serve => serve_cmd::run(config).await,
        Commands::Stats { user_id } => stats_cmd::run(&config, user_id),
        Commands::RegisterCommands => register_cmd::run(&config).await,
    }
}

/// Log every finding and refuse to run when any of them is an error.
fn check_config(config: &StatusKeeperConfig, scope: ValidationScope) -> Result<()> {
    let report = validate(config, scope);
    report.log();
    if report.is_valid() {
        return Ok(());
    }
    let details = report
        .errors
        .iter()
        .map(|e| format!("{}: {}", e.path, e.message))
        .collect::<Vec<_>>()
        .join("; ");
    Err(KeeperError::Config(details).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats() -> Commands {
        Commands::Stats { user_id: UserId(1) }
    }

    #[test]
    fn empty_storage_path_is_rejected() {
        let mut config = StatusKeeperConfig::default();
        config.storage.path = Some(String::new());
        config.discord.token = Some("token".into());

        for command in [Commands::Serve, stats(), Commands::RegisterCommands] {
            let err = check_config(&config, command.validation_scope()).unwrap_err();
            assert!(err.to_string().contains("storage.path"));
        }
    }

    #[test]
    fn stats_does_not_need_discord_credentials() {
        let mut config = StatusKeeperConfig::default();
        config.storage.path = Some("status.db".into());
        assert!(check_config(&config, stats().validation_scope()).is_ok());
        assert!(check_config(&config, Commands::Serve.validation_scope()).is_err());
    }

    #[test]
    fn cli_parses_stats_user_id() {
        let cli = Cli::try_parse_from(["statuskeeper", "--config", "x.yaml", "stats", "42"]).unwrap();
        assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("x.yaml")));
        assert!(matches!(cli.command, Commands::Stats { user_id: UserId(42) }));
    }
}
