//! Configuration command

use clap::builder::PossibleValuesParser;
use clap::{Args, Subcommand};
use console::style;
use tracing::info;

use droidsign_core::config::{write_atomic, CONFIG_KEYS, DEFAULT_CONFIG_TEMPLATE};
use droidsign_core::Config;

use crate::cli::output;
use crate::cli::{AppContext, Cli, OutputFormat};

const MASK: &str = "****";

/// Configuration management
#[derive(Debug, Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration (passwords masked)
    Show,
    /// Change a single value and save
    Set(ConfigSetCommand),
    /// Restore all defaults and save
    Reset(ConfigResetCommand),
    /// Print the configuration file path
    Path,
    /// Write a commented starter configuration file
    Init(ConfigInitCommand),
}

/// Change a single value
#[derive(Debug, Args)]
pub struct ConfigSetCommand {
    /// Dotted key, e.g. `signing.alias`
    #[arg(value_parser = PossibleValuesParser::new(CONFIG_KEYS.iter().copied()))]
    pub key: String,

    /// New value; an empty string clears optional values
    pub value: String,
}

/// Restore all defaults
#[derive(Debug, Args)]
pub struct ConfigResetCommand {
    /// Skip confirmation
    #[arg(short = 'y', long)]
    pub yes: bool,
}

/// Write a starter configuration file
#[derive(Debug, Args)]
pub struct ConfigInitCommand {
    /// Overwrite an existing file
    #[arg(short, long)]
    pub force: bool,
}

impl ConfigCommand {
    pub fn execute(&self, cli: &Cli, ctx: &AppContext) -> anyhow::Result<()> {
        match &self.action {
            ConfigAction::Show => show(cli, ctx),
            ConfigAction::Set(cmd) => cmd.execute(cli, ctx),
            ConfigAction::Reset(cmd) => cmd.execute(cli, ctx),
            ConfigAction::Path => path(cli, ctx),
            ConfigAction::Init(cmd) => cmd.execute(cli, ctx),
        }
    }
}

/// Copy of `config` safe to print
fn masked(config: &Config) -> Config {
    let mut config = config.clone();
    if config.signing.store_password.is_some() {
        config.signing.store_password = Some(MASK.to_string());
    }
    if config.signing.key_password.is_some() {
        config.signing.key_password = Some(MASK.to_string());
    }
    config
}

fn is_secret(key: &str) -> bool {
    key.ends_with("password")
}

fn show(cli: &Cli, ctx: &AppContext) -> anyhow::Result<()> {
    let config = masked(&ctx.config().snapshot());

    match cli.format {
        OutputFormat::Json => output::json(&config),
        OutputFormat::Text => {
            if !cli.quiet {
                println!(
                    "{} {}",
                    style("#").dim(),
                    style(ctx.config().path().display()).dim()
                );
            }
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

fn path(cli: &Cli, ctx: &AppContext) -> anyhow::Result<()> {
    let path = ctx.config().path();
    match cli.format {
        OutputFormat::Json => output::json(&serde_json::json!({
            "path": path,
            "exists": path.exists(),
        })),
        OutputFormat::Text => {
            println!("{}", path.display());
            Ok(())
        }
    }
}

impl ConfigSetCommand {
    fn execute(&self, cli: &Cli, ctx: &AppContext) -> anyhow::Result<()> {
        info!(key = %self.key, "executing config set command");
        ctx.config()
            .update(|config| config.set_value(&self.key, &self.value))?;

        let shown = if is_secret(&self.key) && !self.value.is_empty() {
            MASK
        } else {
            self.value.as_str()
        };

        match cli.format {
            OutputFormat::Json => output::json(&serde_json::json!({
                "key": self.key,
                "value": shown,
            })),
            OutputFormat::Text => {
                if !cli.quiet {
                    output::success(&format!("Set {} = {:?}", self.key, shown));
                }
                Ok(())
            }
        }
    }
}

impl ConfigResetCommand {
    fn execute(&self, cli: &Cli, ctx: &AppContext) -> anyhow::Result<()> {
        info!("executing config reset command");
        let path = ctx.config().path();

        if !self.yes {
            let confirmed = dialoguer::Confirm::new()
                .with_prompt(format!(
                    "Reset all settings in {} to defaults?",
                    path.display()
                ))
                .default(false)
                .interact()?;

            if !confirmed {
                println!("{}", style("Aborted.").yellow());
                return Ok(());
            }
        }

        ctx.config().reset()?;

        if cli.shows_text() {
            output::success(&format!("Configuration reset at {}", path.display()));
        }
        Ok(())
    }
}

impl ConfigInitCommand {
    fn execute(&self, cli: &Cli, ctx: &AppContext) -> anyhow::Result<()> {
        let path = ctx.config().path();
        info!(path = %path.display(), force = self.force, "executing config init command");

        if path.exists() && !self.force {
            anyhow::bail!(
                "{} already exists (use --force to overwrite)",
                path.display()
            );
        }

        write_atomic(path, DEFAULT_CONFIG_TEMPLATE.as_bytes())?;

        if cli.shows_text() {
            output::success(&format!(
                "Created {}",
                output::path_style().apply_to(path.display())
            ));
            output::info("Set signing.keystore and signing.alias before signing");
        }
        Ok(())
    }
}
