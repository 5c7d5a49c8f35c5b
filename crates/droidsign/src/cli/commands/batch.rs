//! Batch signing command

use std::path::{Path, PathBuf};

use anyhow::bail;
use clap::Args;
use console::style;
use tracing::info;

use droidsign_signing::{BatchItem, BatchOutcome, BatchSummary};

use crate::cli::output;
use crate::cli::progress::{consume, DisplayMode, ProgressDisplay};
use crate::cli::{AppContext, Cli, OutputFormat};

/// Sign several APKs, one after another
#[derive(Debug, Args)]
pub struct BatchCommand {
    /// APKs to sign; directories contribute every `.apk` directly inside them
    #[arg(required = true, num_args = 1..)]
    pub apks: Vec<PathBuf>,
}

impl BatchCommand {
    /// Execute the batch command
    pub fn execute(&self, cli: &Cli, ctx: &AppContext) -> anyhow::Result<()> {
        let apks = expand_inputs(&self.apks)?;
        info!(count = apks.len(), "executing batch command");
        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(self.run(cli, ctx, apks))
    }

    async fn run(&self, cli: &Cli, ctx: &AppContext, apks: Vec<PathBuf>) -> anyhow::Result<()> {
        let service = ctx.service();
        let operation = service.sign_batch(apks)?;

        let mut display = ProgressDisplay::new(cli, DisplayMode::Batch);
        let results = consume(operation, &mut display).await?;
        display.finish();

        let summary = BatchSummary::from_items(&results);
        match cli.format {
            OutputFormat::Json => output::json(&serde_json::json!({
                "summary": summary,
                "results": results,
            }))?,
            OutputFormat::Text if !cli.quiet => print_summary(&results, &summary),
            OutputFormat::Text => {}
        }

        if summary.failed > 0 {
            bail!("{} of {} APKs failed to sign", summary.failed, summary.total);
        }
        Ok(())
    }
}

fn print_summary(results: &[BatchItem], summary: &BatchSummary) {
    println!();
    println!("{}", output::header("Batch Summary"));
    for item in results {
        match &item.outcome {
            BatchOutcome::Success { output } => println!(
                "  {} {} -> {}",
                style("✓").green(),
                file_name(&item.path),
                output::path_style().apply_to(output.display())
            ),
            BatchOutcome::Failed { error, .. } => println!(
                "  {} {}: {}",
                style("✗").red(),
                file_name(&item.path),
                style(error.lines().next().unwrap_or_default()).red()
            ),
        }
    }
    println!();
    println!(
        "  Total: {}  Succeeded: {}  Failed: {}",
        summary.total,
        style(summary.succeeded).green(),
        if summary.failed > 0 {
            style(summary.failed).red()
        } else {
            style(summary.failed).dim()
        }
    );
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Replace directories with the `.apk` files directly inside them, sorted by
/// name. Plain paths are kept as given, even when they do not exist, so the
/// pipeline can report them.
fn expand_inputs(inputs: &[PathBuf]) -> anyhow::Result<Vec<PathBuf>> {
    let mut apks = Vec::new();

    for input in inputs {
        if !input.is_dir() {
            apks.push(input.clone());
            continue;
        }

        let mut found: Vec<PathBuf> = std::fs::read_dir(input)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .and_then(|e| e.to_str())
                        .is_some_and(|e| e.eq_ignore_ascii_case("apk"))
            })
            .collect();
        found.sort();

        if found.is_empty() {
            bail!("no APK files found in {}", input.display());
        }
        apks.extend(found);
    }

    Ok(apks)
}
