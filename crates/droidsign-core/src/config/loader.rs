//! Configuration loading and saving

use std::io::Write;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::error::{ConfigError, Result};

use super::types::Config;
use super::validation::validate_config;

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .is_some_and(|e| e == "yaml" || e == "yml")
}

/// Load configuration from a file.
///
/// The format follows the extension (`.yaml`/`.yml` is YAML, anything else
/// TOML). Missing keys fall back to their defaults.
pub fn load_config(path: &Path) -> Result<Config> {
    let format = if is_yaml(path) { "YAML" } else { "TOML" };
    info!(path = %path.display(), format, "loading config");

    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)?;

    let config: Config = if is_yaml(path) {
        serde_yaml::from_str(&content)?
    } else {
        toml::from_str(&content)?
    };

    validate_config(&config)?;
    debug!(path = %path.display(), "config loaded and validated");
    Ok(config)
}

/// Load configuration or use defaults.
///
/// A missing, unreadable or invalid file never fails startup; the problem is
/// logged and the compiled-in defaults are used instead.
pub fn load_config_or_default(path: &Path) -> Config {
    match load_config(path) {
        Ok(config) => config,
        Err(ConfigError::NotFound(_)) => {
            debug!(path = %path.display(), "no config file, using defaults");
            Config::default()
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            Config::default()
        }
    }
}

/// Save configuration, replacing the file atomically
pub fn save_config(path: &Path, config: &Config) -> Result<()> {
    let content = if is_yaml(path) {
        serde_yaml::to_string(config)?
    } else {
        toml::to_string_pretty(config)?
    };

    write_atomic(path, content.as_bytes())?;
    info!(path = %path.display(), "config saved");
    Ok(())
}

/// Write `contents` to a temporary file next to `path`, then rename it over
/// `path`. Parent directories are created as needed.
pub fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(contents)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_config_toml_merges_defaults() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("droidsign.toml");
        std::fs::write(
            &config_path,
            "[signing]\nalias = \"release\"\n\n[output]\nauto_open = false\n",
        )
        .unwrap();

        let config = load_config(&config_path).unwrap();
        assert_eq!(config.signing.alias.as_deref(), Some("release"));
        assert!(!config.output.auto_open);
        // Untouched keys keep their defaults
        assert!(config.output.copy_to_clipboard);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_config_yaml() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("droidsign.yaml");
        std::fs::write(&config_path, "signing:\n  alias: upload\nlogging:\n  level: debug\n")
            .unwrap();

        let config = load_config(&config_path).unwrap();
        assert_eq!(config.signing.alias.as_deref(), Some("upload"));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_load_config_not_found() {
        let temp = TempDir::new().unwrap();
        let result = load_config(&temp.path().join("missing.toml"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_load_config_or_default_on_garbage() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("droidsign.toml");
        std::fs::write(&config_path, "this is = = not toml [").unwrap();

        let config = load_config_or_default(&config_path);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_config_or_default_on_invalid_value() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("droidsign.toml");
        std::fs::write(&config_path, "[logging]\nlevel = \"loud\"\n").unwrap();

        let config = load_config_or_default(&config_path);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_save_then_load() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("nested").join("droidsign.toml");

        let mut config = Config::default();
        config.signing.alias = Some("release".to_string());
        config.output.copy_to_clipboard = false;
        save_config(&config_path, &config).unwrap();

        let loaded = load_config(&config_path).unwrap();
        assert_eq!(loaded.signing.alias.as_deref(), Some("release"));
        assert!(!loaded.output.copy_to_clipboard);
    }

    #[test]
    fn test_write_atomic_replaces_existing() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("file.json");
        std::fs::write(&path, "old").unwrap();

        write_atomic(&path, b"new").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
    }
}
