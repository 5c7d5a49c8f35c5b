//! Session log command

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Subcommand};
use console::style;

use crate::cli::output;
use crate::cli::{AppContext, Cli, OutputFormat};
use crate::logging::{latest_log, log_files};

/// Session log files
#[derive(Debug, Args)]
pub struct LogsCommand {
    #[command(subcommand)]
    pub action: LogsAction,
}

/// Logs subcommands
#[derive(Debug, Subcommand)]
pub enum LogsAction {
    /// Print the most recent session log
    Show(LogsShowCommand),
    /// List session log files
    List,
    /// Delete all session log files
    Clear(LogsClearCommand),
    /// Copy the most recent session log to a file
    Export(LogsExportCommand),
}

/// Print the most recent session log
#[derive(Debug, Args)]
pub struct LogsShowCommand {
    /// Only print the last N lines
    #[arg(short = 'n', long)]
    pub lines: Option<usize>,
}

/// Delete all session log files
#[derive(Debug, Args)]
pub struct LogsClearCommand {
    /// Skip confirmation
    #[arg(short = 'y', long)]
    pub yes: bool,
}

/// Copy the most recent session log
#[derive(Debug, Args)]
pub struct LogsExportCommand {
    /// Destination file
    pub file: PathBuf,
}

impl LogsCommand {
    pub fn execute(&self, cli: &Cli, ctx: &AppContext) -> anyhow::Result<()> {
        let dir = ctx.config().snapshot().logging.dir;
        match &self.action {
            LogsAction::Show(cmd) => cmd.execute(cli, &dir),
            LogsAction::List => list(cli, &dir),
            LogsAction::Clear(cmd) => cmd.execute(cli, &dir),
            LogsAction::Export(cmd) => cmd.execute(cli, &dir),
        }
    }
}

fn require_latest(dir: &Path) -> anyhow::Result<PathBuf> {
    latest_log(dir)?.with_context(|| format!("no log files in {}", dir.display()))
}

/// The last `count` lines of `content`
fn tail(content: &str, count: usize) -> Vec<&str> {
    let lines: Vec<&str> = content.lines().collect();
    let start = lines.len().saturating_sub(count);
    lines[start..].to_vec()
}

fn list(cli: &Cli, dir: &Path) -> anyhow::Result<()> {
    let files = log_files(dir)?;

    if cli.format == OutputFormat::Json {
        return output::json(&serde_json::json!({ "dir": dir, "files": files }));
    }

    if files.is_empty() {
        if !cli.quiet {
            println!("  {}", style(format!("No log files in {}", dir.display())).dim());
        }
        return Ok(());
    }

    for file in files.iter().rev() {
        let size = std::fs::metadata(file).map(|m| m.len()).unwrap_or(0);
        println!(
            "  {}  {}",
            output::path_style().apply_to(file.display()),
            style(format!("{} bytes", size)).dim()
        );
    }
    Ok(())
}

impl LogsShowCommand {
    fn execute(&self, cli: &Cli, dir: &Path) -> anyhow::Result<()> {
        let file = require_latest(dir)?;
        let content = std::fs::read_to_string(&file)
            .with_context(|| format!("failed to read {}", file.display()))?;

        let lines = match self.lines {
            Some(count) => tail(&content, count),
            None => content.lines().collect(),
        };

        if cli.format == OutputFormat::Json {
            return output::json(&serde_json::json!({ "file": file, "lines": lines }));
        }

        if !cli.quiet {
            eprintln!("{} {}", style("==>").dim(), style(file.display()).dim());
        }
        for line in lines {
            println!("{}", line);
        }
        Ok(())
    }
}

impl LogsClearCommand {
    fn execute(&self, cli: &Cli, dir: &Path) -> anyhow::Result<()> {
        let files = log_files(dir)?;

        if files.is_empty() {
            if cli.shows_text() {
                output::success("No log files to delete");
            }
            return Ok(());
        }

        if !self.yes {
            let confirmed = dialoguer::Confirm::new()
                .with_prompt(format!(
                    "Delete {} log files in {}?",
                    files.len(),
                    dir.display()
                ))
                .default(false)
                .interact()?;

            if !confirmed {
                println!("{}", style("Aborted.").yellow());
                return Ok(());
            }
        }

        for file in &files {
            std::fs::remove_file(file)
                .with_context(|| format!("failed to delete {}", file.display()))?;
        }

        match cli.format {
            OutputFormat::Json => output::json(&serde_json::json!({ "deleted": files.len() }))?,
            OutputFormat::Text if !cli.quiet => {
                output::success(&format!("Deleted {} log files", files.len()))
            }
            OutputFormat::Text => {}
        }
        Ok(())
    }
}

impl LogsExportCommand {
    fn execute(&self, cli: &Cli, dir: &Path) -> anyhow::Result<()> {
        let file = require_latest(dir)?;
        if let Some(parent) = self.file.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::copy(&file, &self.file).with_context(|| {
            format!(
                "failed to copy {} to {}",
                file.display(),
                self.file.display()
            )
        })?;

        match cli.format {
            OutputFormat::Json => output::json(&serde_json::json!({
                "source": file,
                "destination": self.file,
            })),
            OutputFormat::Text => {
                if !cli.quiet {
                    output::success(&format!(
                        "Exported {} to {}",
                        file.display(),
                        self.file.display()
                    ));
                }
                Ok(())
            }
        }
    }
}
