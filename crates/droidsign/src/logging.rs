//! Tracing setup and log file discovery

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use droidsign_core::config::LoggingConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Every log file is named `droidsign_<YYYYmmdd_HHMMSS>.log`
pub const LOG_FILE_PREFIX: &str = "droidsign_";
pub const LOG_FILE_EXTENSION: &str = "log";

/// Log file name for a session started at `started`
pub fn log_file_name(started: DateTime<Local>) -> String {
    format!(
        "{}{}.{}",
        LOG_FILE_PREFIX,
        started.format("%Y%m%d_%H%M%S"),
        LOG_FILE_EXTENSION
    )
}

/// Set up tracing with two layers:
/// - Console (stderr): controlled by RUST_LOG (default: warn, or info with `--verbose`)
/// - File: JSON at the configured level, one file per session under `logging.dir`
///
/// The file layer is skipped when `file` is `None` or the directory cannot
/// be created.
pub fn init_tracing(file: Option<&LoggingConfig>, verbose: bool) -> Option<WorkerGuard> {
    let default_console = if verbose { "info" } else { "warn" };
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_console));
    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(console_filter);

    let file = file.and_then(|config| Some((session_appender(config)?, config)));

    if let Some((appender, config)) = file {
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);
        let file_filter = EnvFilter::try_new(config.level.to_lowercase())
            .unwrap_or_else(|_| EnvFilter::new("info"));

        tracing_subscriber::registry()
            .with(console_layer)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(non_blocking)
                    .with_target(true)
                    .with_filter(file_filter),
            )
            .init();

        return Some(guard);
    }

    // Fallback: console only
    tracing_subscriber::registry().with(console_layer).init();

    None
}

fn session_appender(config: &LoggingConfig) -> Option<RollingFileAppender> {
    std::fs::create_dir_all(&config.dir).ok()?;
    let name = log_file_name(Local::now());
    let prefix = name.strip_suffix(&format!(".{}", LOG_FILE_EXTENSION))?;

    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(prefix)
        .filename_suffix(LOG_FILE_EXTENSION)
        .build(&config.dir)
        .ok()
}

/// Session log files in `dir`, oldest first.
///
/// A missing directory has no log files.
pub fn log_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && is_log_file(path))
        .collect();
    // Timestamps in the names sort chronologically
    files.sort();
    Ok(files)
}

/// Most recent session log in `dir`
pub fn latest_log(dir: &Path) -> std::io::Result<Option<PathBuf>> {
    Ok(log_files(dir)?.pop())
}

fn is_log_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    name.starts_with(LOG_FILE_PREFIX)
        && path.extension().and_then(|e| e.to_str()) == Some(LOG_FILE_EXTENSION)
}
