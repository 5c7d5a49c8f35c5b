//! droidsign - APK signing pipeline CLI

mod cli;
mod desktop;
mod exit_codes;
mod logging;

use clap::Parser;
use droidsign_core::{Config, ConfigStore};

use cli::{output, AppContext, Cli};

fn main() {
    std::process::exit(run());
}

/// Parse arguments, load configuration, set up tracing and run the command.
///
/// Kept separate from `main` so the log writer guard is dropped (and the log
/// file flushed) before the process exits.
fn run() -> i32 {
    let cli = Cli::parse();

    let config_path = cli.config_path();
    let (store, load_error) = match ConfigStore::try_load(&config_path) {
        Ok(store) => (store, None),
        Err(e) => (ConfigStore::with_config(&config_path, Config::default()), Some(e)),
    };

    let logging_config = store.snapshot().logging;
    let _guard = logging::init_tracing(
        cli.command.writes_log_file().then_some(&logging_config),
        cli.verbose,
    );

    if let Some(e) = load_error {
        tracing::warn!(
            path = %config_path.display(),
            error = %e,
            "failed to load config, using defaults"
        );
        if cli.shows_text() {
            output::warning(&format!("Ignoring {}: {}", config_path.display(), e));
        }
    }

    tracing::info!(
        config = %store.path().display(),
        version = env!("CARGO_PKG_VERSION"),
        "droidsign started"
    );

    let ctx = AppContext::new(store);
    match cli.execute(&ctx) {
        Ok(()) => exit_codes::SUCCESS,
        Err(e) => {
            tracing::error!(error = %format!("{:#}", e), "command failed");
            output::error(&format!("{:#}", e));
            exit_codes::for_error(&e)
        }
    }
}
