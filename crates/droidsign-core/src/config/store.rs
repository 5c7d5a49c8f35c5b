//! Process-wide configuration store

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use tracing::info;

use crate::error::{ConfigError, Result};

use super::loader::{load_config, load_config_or_default, save_config};
use super::types::Config;
use super::validation::validate_config;

/// Configuration loaded once at startup and saved on every mutation.
///
/// Reads hand out snapshots; writes go through [`ConfigStore::update`], which
/// holds the lock for the whole read-modify-save cycle.
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    config: Mutex<Config>,
}

impl ConfigStore {
    /// Load the store from `path`, falling back to defaults
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let config = load_config_or_default(&path);
        Self {
            path,
            config: Mutex::new(config),
        }
    }

    /// Load the store from `path`, failing on an unreadable or invalid file.
    ///
    /// A missing file is not an error; the store starts from defaults and the
    /// file is created on the first change.
    pub fn try_load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let config = match load_config(&path) {
            Ok(config) => config,
            Err(ConfigError::NotFound(_)) => Config::default(),
            Err(e) => return Err(e),
        };
        Ok(Self::with_config(path, config))
    }

    /// Create a store from an in-memory configuration
    pub fn with_config(path: impl Into<PathBuf>, config: Config) -> Self {
        Self {
            path: path.into(),
            config: Mutex::new(config),
        }
    }

    /// Path the store persists to
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current configuration
    pub fn snapshot(&self) -> Config {
        self.lock().clone()
    }

    /// Apply a change, validate the result and persist it.
    ///
    /// The in-memory configuration only changes if validation and saving
    /// both succeed.
    pub fn update<F>(&self, change: F) -> Result<Config>
    where
        F: FnOnce(&mut Config) -> Result<()>,
    {
        let mut guard = self.lock();
        let mut updated = guard.clone();
        change(&mut updated)?;
        validate_config(&updated)?;
        save_config(&self.path, &updated)?;
        *guard = updated.clone();
        Ok(updated)
    }

    /// Replace the configuration with defaults and persist
    pub fn reset(&self) -> Result<Config> {
        let mut guard = self.lock();
        let defaults = Config::default();
        save_config(&self.path, &defaults)?;
        *guard = defaults.clone();
        info!(path = %self.path.display(), "config reset to defaults");
        Ok(defaults)
    }

    fn lock(&self) -> MutexGuard<'_, Config> {
        self.config.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let store = ConfigStore::load(temp.path().join("droidsign.toml"));
        assert_eq!(store.snapshot().logging.level, "info");
    }

    #[test]
    fn test_try_load_reports_invalid_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("droidsign.toml");
        assert!(ConfigStore::try_load(&path).is_ok());

        std::fs::write(&path, "[logging]\nlevel = \"chatty\"\n").unwrap();
        assert!(matches!(
            ConfigStore::try_load(&path),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert_eq!(ConfigStore::load(&path).snapshot().logging.level, "info");
    }

    #[test]
    fn test_update_persists() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("droidsign.toml");
        let store = ConfigStore::load(&path);

        store
            .update(|c| c.set_value("signing.alias", "release"))
            .unwrap();

        assert_eq!(store.snapshot().signing.alias.as_deref(), Some("release"));
        let on_disk = load_config(&path).unwrap();
        assert_eq!(on_disk.signing.alias.as_deref(), Some("release"));
    }

    #[test]
    fn test_failed_update_leaves_config_untouched() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("droidsign.toml");
        let store = ConfigStore::load(&path);

        let result = store.update(|c| c.set_value("logging.level", "chatty"));
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
        assert_eq!(store.snapshot().logging.level, "info");
        assert!(!path.exists());
    }

    #[test]
    fn test_reset() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("droidsign.toml");
        let store = ConfigStore::load(&path);
        store.update(|c| c.set_value("signing.alias", "x")).unwrap();

        store.reset().unwrap();
        assert!(store.snapshot().signing.alias.is_none());
        assert!(load_config(&path).unwrap().signing.alias.is_none());
    }
}
