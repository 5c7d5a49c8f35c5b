//! Configuration validation

use tracing::debug;

use crate::error::{ConfigError, Result};

use super::defaults::LOG_LEVELS;
use super::types::Config;

/// Validate configuration.
///
/// Credentials are deliberately not checked here; they are only required
/// when a signing run starts (see [`super::SigningConfig::credentials`]).
pub fn validate_config(config: &Config) -> Result<()> {
    debug!("validating configuration");
    validate_logging(config)?;
    validate_output(config)?;
    validate_history(config)?;
    debug!("configuration validation passed");
    Ok(())
}

fn validate_logging(config: &Config) -> Result<()> {
    let level = config.logging.level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        return Err(ConfigError::InvalidValue {
            field: "logging.level".to_string(),
            message: format!("must be one of: {}", LOG_LEVELS.join(", ")),
        });
    }

    Ok(())
}

fn validate_output(config: &Config) -> Result<()> {
    if config.output.dir.as_os_str().is_empty() {
        return Err(ConfigError::InvalidValue {
            field: "output.dir".to_string(),
            message: "output directory cannot be empty".to_string(),
        });
    }

    Ok(())
}

fn validate_history(config: &Config) -> Result<()> {
    if config.history.file.as_os_str().is_empty() {
        return Err(ConfigError::InvalidValue {
            field: "history.file".to_string(),
            message: "history file cannot be empty".to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_log_level_case_insensitive() {
        let mut config = Config::default();
        config.logging.level = "INFO".to_string();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_string();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::InvalidValue { field, .. }) if field == "logging.level"
        ));
    }

    #[test]
    fn test_empty_output_dir() {
        let mut config = Config::default();
        config.output.dir = PathBuf::new();
        assert!(validate_config(&config).is_err());
    }
}
