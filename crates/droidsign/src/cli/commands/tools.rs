//! Tool availability command

use std::path::Path;

use clap::Args;
use console::style;
use tracing::info;

use droidsign_signing::ToolLocator;

use crate::cli::output;
use crate::cli::{AppContext, Cli, OutputFormat};

/// Check that jarsigner, zipalign and apksigner exist
#[derive(Debug, Args)]
pub struct ToolsCommand;

impl ToolsCommand {
    /// Execute the tools command
    pub fn execute(&self, cli: &Cli, ctx: &AppContext) -> anyhow::Result<()> {
        info!("executing tools command");
        let config = ctx.config().snapshot();
        let expected = ToolLocator::from_config(&config.tools).expected();
        let tools = [
            ("jarsigner", expected.jarsigner.as_path()),
            ("zipalign", expected.zipalign.as_path()),
            ("apksigner", expected.apksigner.as_path()),
        ];

        let result = ctx.service().check_tools();

        match cli.format {
            OutputFormat::Json => {
                let entries: Vec<_> = tools
                    .iter()
                    .map(|(name, path)| {
                        serde_json::json!({
                            "name": name,
                            "path": path,
                            "found": path.is_file(),
                        })
                    })
                    .collect();
                output::json(&serde_json::json!({
                    "jdk_path": config.tools.jdk_path,
                    "sdk_build_tools": config.tools.sdk_build_tools,
                    "available": result.is_ok(),
                    "tools": entries,
                }))?;
            }
            OutputFormat::Text if !cli.quiet => {
                println!("{}", output::header("Signing Tools"));
                println!();
                println!(
                    "{}",
                    output::key_value("JDK", &display_or_unset(&config.tools.jdk_path))
                );
                println!(
                    "{}",
                    output::key_value(
                        "Build tools",
                        &display_or_unset(&config.tools.sdk_build_tools)
                    )
                );
                println!();
                for (name, path) in &tools {
                    let mark = if path.is_file() {
                        style("✓").green()
                    } else {
                        style("✗").red()
                    };
                    println!(
                        "  {} {:<10} {}",
                        mark,
                        name,
                        output::path_style().apply_to(path.display())
                    );
                }
                println!();
                if result.is_ok() {
                    output::success("All required tools found");
                }
            }
            OutputFormat::Text => {}
        }

        result?;
        Ok(())
    }
}

fn display_or_unset(path: &Path) -> String {
    if path.as_os_str().is_empty() {
        style("(not set)").dim().to_string()
    } else {
        path.display().to_string()
    }
}
