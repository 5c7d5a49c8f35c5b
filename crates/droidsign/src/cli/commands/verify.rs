//! Verify command

use std::path::PathBuf;

use clap::Args;
use tracing::info;

use crate::cli::output;
use crate::cli::progress::{consume, DisplayMode, ProgressDisplay};
use crate::cli::{AppContext, Cli, OutputFormat};

/// Verify a signed APK
#[derive(Debug, Args)]
pub struct VerifyCommand {
    /// Path to the signed APK
    #[arg(required = true)]
    pub apk: PathBuf,
}

impl VerifyCommand {
    /// Execute the verify command
    pub fn execute(&self, cli: &Cli, ctx: &AppContext) -> anyhow::Result<()> {
        info!(apk = %self.apk.display(), "executing verify command");
        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(self.run(cli, ctx))
    }

    async fn run(&self, cli: &Cli, ctx: &AppContext) -> anyhow::Result<()> {
        let operation = ctx.service().verify(self.apk.clone());

        let mut display = ProgressDisplay::new(cli, DisplayMode::Verify);
        let result = consume(operation, &mut display).await?;
        display.finish();

        match (cli.format, result) {
            (OutputFormat::Json, Ok(certificates)) => output::json(&serde_json::json!({
                "status": "verified",
                "apk": self.apk,
                "certificates": certificates,
            })),
            (OutputFormat::Json, Err(e)) => {
                output::json(&serde_json::json!({
                    "status": "failed",
                    "apk": self.apk,
                    "kind": e.kind(),
                    "error": e.to_string(),
                }))?;
                Err(e.into())
            }
            (OutputFormat::Text, Ok(certificates)) => {
                if !cli.quiet {
                    output::success("APK verification successful");
                    println!();
                    println!("{}", output::header("Certificates"));
                    for line in certificates.lines().filter(|l| !l.trim().is_empty()) {
                        println!("  {}", line);
                    }
                }
                Ok(())
            }
            (OutputFormat::Text, Err(e)) => Err(e.into()),
        }
    }
}
