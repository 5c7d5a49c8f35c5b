//! Signing history command

use std::path::Path;

use anyhow::bail;
use chrono::Local;
use clap::{Args, Subcommand};
use console::style;
use tracing::info;

use droidsign_signing::{HistoryEntry, HistoryStatus};

use crate::cli::output;
use crate::cli::{AppContext, Cli, OutputFormat};

/// Signing history management
#[derive(Debug, Args)]
pub struct HistoryCommand {
    #[command(subcommand)]
    pub action: HistoryAction,
}

/// History subcommands
#[derive(Debug, Subcommand)]
pub enum HistoryAction {
    /// List recorded runs, most recent first
    List(HistoryListCommand),
    /// Show one run in full, hashes included
    Show(HistoryShowCommand),
    /// Delete all recorded runs
    Clear(HistoryClearCommand),
}

/// List recorded runs
#[derive(Debug, Args)]
pub struct HistoryListCommand {
    /// Show at most this many entries
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
}

/// Show one run
#[derive(Debug, Args)]
pub struct HistoryShowCommand {
    /// Entry number as printed by `history list` (1 is the most recent)
    pub number: usize,
}

/// Delete all recorded runs
#[derive(Debug, Args)]
pub struct HistoryClearCommand {
    /// Skip confirmation
    #[arg(short = 'y', long)]
    pub yes: bool,
}

impl HistoryCommand {
    pub fn execute(&self, cli: &Cli, ctx: &AppContext) -> anyhow::Result<()> {
        match &self.action {
            HistoryAction::List(cmd) => cmd.execute(cli, ctx),
            HistoryAction::Show(cmd) => cmd.execute(cli, ctx),
            HistoryAction::Clear(cmd) => cmd.execute(cli, ctx),
        }
    }
}

/// Entries most recent first, numbered from 1
fn newest_first(entries: Vec<HistoryEntry>) -> impl Iterator<Item = (usize, HistoryEntry)> {
    entries
        .into_iter()
        .rev()
        .enumerate()
        .map(|(i, entry)| (i + 1, entry))
}

/// Ledger position of the entry numbered `number` by [`newest_first`]
fn ledger_index(number: usize, len: usize) -> Option<usize> {
    if number == 0 || number > len {
        None
    } else {
        Some(len - number)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn local_time(entry: &HistoryEntry) -> String {
    entry
        .timestamp
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

fn status_label(status: HistoryStatus) -> String {
    match status {
        HistoryStatus::Success => style("SUCCESS").green().to_string(),
        HistoryStatus::Failed => style("FAILED").red().to_string(),
    }
}

impl HistoryListCommand {
    fn execute(&self, cli: &Cli, ctx: &AppContext) -> anyhow::Result<()> {
        info!("executing history list command");
        let service = ctx.service();
        let limit = self.limit.unwrap_or(usize::MAX);
        let entries: Vec<(usize, HistoryEntry)> =
            newest_first(service.list_history()).take(limit).collect();

        if cli.format == OutputFormat::Json {
            let entries: Vec<&HistoryEntry> = entries.iter().map(|(_, e)| e).collect();
            return output::json(&entries);
        }
        if cli.quiet {
            return Ok(());
        }

        println!("{}", output::header("Signing History"));
        println!();

        if entries.is_empty() {
            println!("  {}", style("No signing history yet").dim());
            return Ok(());
        }

        for (number, entry) in &entries {
            println!(
                "  {:>3}  {}  {}  {} -> {}",
                style(number).bold(),
                style(local_time(entry)).dim(),
                status_label(entry.status),
                file_name(&entry.original_apk),
                output::path_style().apply_to(file_name(&entry.signed_apk))
            );
        }

        Ok(())
    }
}

impl HistoryShowCommand {
    fn execute(&self, cli: &Cli, ctx: &AppContext) -> anyhow::Result<()> {
        info!(number = self.number, "executing history show command");
        let service = ctx.service();
        let ledger = service.ledger();

        let Some(entry) = ledger_index(self.number, ledger.len()).and_then(|i| ledger.get(i))
        else {
            bail!(
                "no history entry #{} ({} entries recorded)",
                self.number,
                ledger.len()
            );
        };

        if cli.format == OutputFormat::Json {
            return output::json(&entry);
        }
        if cli.quiet {
            return Ok(());
        }

        println!("{}", output::header(&format!("History Entry #{}", self.number)));
        println!();
        println!("{}", output::key_value("Time", &local_time(&entry)));
        println!("{}", output::key_value("Status", &status_label(entry.status)));
        println!(
            "{}",
            output::key_value("Original APK", &entry.original_apk.display().to_string())
        );
        println!(
            "{}",
            output::key_value("Signed APK", &entry.signed_apk.display().to_string())
        );
        println!(
            "{}",
            output::key_value("Original SHA-256", &entry.original_hash)
        );
        println!("{}", output::key_value("Signed SHA-256", &entry.signed_hash));

        Ok(())
    }
}

impl HistoryClearCommand {
    fn execute(&self, cli: &Cli, ctx: &AppContext) -> anyhow::Result<()> {
        info!("executing history clear command");
        let service = ctx.service();
        let count = service.list_history().len();

        if count == 0 {
            if cli.shows_text() {
                output::success("History is already empty");
            }
            return Ok(());
        }

        if !self.yes {
            let confirmed = dialoguer::Confirm::new()
                .with_prompt(format!("Delete all {} history entries?", count))
                .default(false)
                .interact()?;

            if !confirmed {
                println!("{}", style("Aborted.").yellow());
                return Ok(());
            }
        }

        service.clear_history()?;

        match cli.format {
            OutputFormat::Json => output::json(&serde_json::json!({ "cleared": count }))?,
            OutputFormat::Text if !cli.quiet => {
                output::success(&format!("Cleared {} history entries", count))
            }
            OutputFormat::Text => {}
        }

        Ok(())
    }
}
