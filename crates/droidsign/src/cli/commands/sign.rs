//! Sign command

use std::path::PathBuf;

use clap::Args;
use console::style;
use tracing::{info, warn};

use droidsign_signing::SigningRun;

use crate::cli::output;
use crate::cli::progress::{consume, DisplayMode, ProgressDisplay};
use crate::cli::{AppContext, Cli, OutputFormat};
use crate::desktop;

/// Sign a single APK
#[derive(Debug, Args)]
pub struct SignCommand {
    /// Path to the APK to sign
    #[arg(required = true)]
    pub apk: PathBuf,

    /// Do not open the output directory, whatever the configuration says
    #[arg(long)]
    pub no_open: bool,

    /// Do not copy the output path to the clipboard
    #[arg(long)]
    pub no_clipboard: bool,
}

impl SignCommand {
    /// Execute the sign command
    pub fn execute(&self, cli: &Cli, ctx: &AppContext) -> anyhow::Result<()> {
        info!(apk = %self.apk.display(), "executing sign command");
        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(self.run(cli, ctx))
    }

    async fn run(&self, cli: &Cli, ctx: &AppContext) -> anyhow::Result<()> {
        let service = ctx.service();
        let operation = service.sign_one(self.apk.clone())?;

        if cli.shows_text() {
            println!(
                "{} Signing {}",
                style("→").blue(),
                style(self.apk.display()).cyan()
            );
        }

        let mut display = ProgressDisplay::new(cli, DisplayMode::Steps);
        let result = consume(operation, &mut display).await?;
        display.finish();

        let run = match result {
            Ok(run) => run,
            Err(failure) => {
                if cli.format == OutputFormat::Json {
                    output::json(&serde_json::json!({
                        "status": "failed",
                        "apk": self.apk,
                        "kind": failure.kind(),
                        "error": failure.run.error(),
                        "attempted": failure.run.attempted(),
                    }))?;
                }
                return Err(failure.into_error().into());
            }
        };

        self.report(cli, &run)?;
        self.after_success(cli, ctx, &run);
        Ok(())
    }

    fn report(&self, cli: &Cli, run: &SigningRun) -> anyhow::Result<()> {
        let entry = run.entry();

        match cli.format {
            OutputFormat::Json => output::json(&serde_json::json!({
                "status": "success",
                "input": run.input(),
                "output": run.output(),
                "original_hash": entry.map(|e| e.original_hash.as_str()),
                "signed_hash": entry.map(|e| e.signed_hash.as_str()),
            })),
            OutputFormat::Text => {
                if cli.quiet {
                    return Ok(());
                }
                output::success("APK signed successfully");
                println!(
                    "{}",
                    output::key_value(
                        "Output",
                        &output::path_style().apply_to(run.output().display()).to_string()
                    )
                );
                if let Some(entry) = entry {
                    println!(
                        "{}",
                        output::key_value(
                            "Original SHA-256",
                            &output::hash_style().apply_to(&entry.original_hash).to_string()
                        )
                    );
                    println!(
                        "{}",
                        output::key_value(
                            "Signed SHA-256",
                            &output::hash_style().apply_to(&entry.signed_hash).to_string()
                        )
                    );
                }
                Ok(())
            }
        }
    }

    /// Reveal the output and copy its path, as configured. Failures only warn.
    fn after_success(&self, cli: &Cli, ctx: &AppContext, run: &SigningRun) {
        let config = ctx.config().snapshot();

        if config.output.auto_open && !self.no_open {
            if let Some(dir) = run.output().parent() {
                if let Err(e) = desktop::open_directory(dir) {
                    warn!(error = %e, "could not open output directory");
                }
            }
        }

        if config.output.copy_to_clipboard && !self.no_clipboard {
            let path = run.output().display().to_string();
            match desktop::copy_to_clipboard(&path) {
                Ok(()) => {
                    if cli.shows_text() {
                        output::info("Output path copied to clipboard");
                    }
                }
                Err(e) => warn!(error = %e, "could not copy output path to clipboard"),
            }
        }
    }
}
