//! CLI definition and command handling

pub mod commands;
pub mod output;
pub mod progress;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use droidsign_core::config::default_config_path;
use droidsign_core::ConfigStore;
use droidsign_signing::{HistoryLedger, ProcessRunner, SigningService};

use commands::{
    BatchCommand, CompletionsCommand, ConfigCommand, HistoryCommand, LogsCommand, SignCommand,
    ToolsCommand, VerifyCommand,
};

/// droidsign - Sign Android APKs with jarsigner, zipalign and apksigner
#[derive(Debug, Parser)]
#[command(name = "droidsign")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output (tool output and info-level logs)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Configuration file (TOML, or YAML by extension)
    #[arg(short, long, global = true, env = "DROIDSIGN_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for CLI
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output
    Json,
}

/// Available commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Sign a single APK
    Sign(SignCommand),

    /// Sign several APKs one after another
    Batch(BatchCommand),

    /// Verify a signed APK and print its certificates
    Verify(VerifyCommand),

    /// Check that jarsigner, zipalign and apksigner are available
    Tools(ToolsCommand),

    /// Signing history
    History(HistoryCommand),

    /// Show or change configuration
    Config(ConfigCommand),

    /// Session log files
    Logs(LogsCommand),

    /// Generate shell completions
    Completions(CompletionsCommand),
}

impl Commands {
    /// Whether this command gets a session log file
    pub fn writes_log_file(&self) -> bool {
        !matches!(self, Self::Logs(_) | Self::Completions(_))
    }
}

impl Cli {
    /// Configuration file to load
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(default_config_path)
    }

    /// Whether human-readable output should be printed
    pub fn shows_text(&self) -> bool {
        self.format == OutputFormat::Text && !self.quiet
    }

    /// Execute the CLI command
    pub fn execute(&self, ctx: &AppContext) -> anyhow::Result<()> {
        match self.command {
            Commands::Sign(ref cmd) => cmd.execute(self, ctx),
            Commands::Batch(ref cmd) => cmd.execute(self, ctx),
            Commands::Verify(ref cmd) => cmd.execute(self, ctx),
            Commands::Tools(ref cmd) => cmd.execute(self, ctx),
            Commands::History(ref cmd) => cmd.execute(self, ctx),
            Commands::Config(ref cmd) => cmd.execute(self, ctx),
            Commands::Logs(ref cmd) => cmd.execute(self, ctx),
            Commands::Completions(ref cmd) => cmd.execute(self),
        }
    }
}

/// Services shared by all commands, built once at startup
pub struct AppContext {
    config: Arc<ConfigStore>,
}

impl AppContext {
    pub fn new(config: ConfigStore) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    /// Signing service over the configured history file and real processes
    pub fn service(&self) -> SigningService {
        let ledger = HistoryLedger::load(self.config.snapshot().history.file);
        SigningService::new(
            Arc::clone(&self.config),
            Arc::new(ledger),
            Arc::new(ProcessRunner::new()),
        )
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
    fn test_parse_global_flags() {
        let cli = Cli::try_parse_from([
            "droidsign",
            "--format",
            "json",
            "-q",
            "--config",
            "/tmp/ds.yaml",
            "sign",
            "app.apk",
        ])
        .unwrap();

        assert_eq!(cli.format, OutputFormat::Json);
        assert!(cli.quiet);
        assert!(!cli.shows_text());
        assert_eq!(cli.config_path(), PathBuf::from("/tmp/ds.yaml"));
        assert!(matches!(cli.command, Commands::Sign(_)));
        assert!(cli.command.writes_log_file());
    }

    #[test]
    fn test_logs_commands_do_not_open_a_log_file() {
        let cli = Cli::try_parse_from(["droidsign", "logs", "show"]).unwrap();
        assert!(!cli.command.writes_log_file());
    }

    #[test]
    fn test_batch_requires_an_apk() {
        assert!(Cli::try_parse_from(["droidsign", "batch"]).is_err());
    }
}
