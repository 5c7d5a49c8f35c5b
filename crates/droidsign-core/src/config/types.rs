//! Configuration types

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{ConfigError, Result};

use super::defaults;
use super::discovery;

/// Main configuration for droidsign
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Locations of the external tools
    pub tools: ToolsConfig,

    /// Keystore and credentials
    pub signing: SigningConfig,

    /// Where signed archives go and what happens afterwards
    pub output: OutputConfig,

    /// Log file settings
    pub logging: LoggingConfig,

    /// Signing history settings
    pub history: HistoryConfig,
}

/// External tool locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// JDK home directory (contains `bin/jarsigner`)
    pub jdk_path: PathBuf,

    /// Android SDK build-tools directory (contains `zipalign` and `apksigner`)
    pub sdk_build_tools: PathBuf,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            jdk_path: discovery::detect_jdk_path().unwrap_or_default(),
            sdk_build_tools: discovery::detect_build_tools().unwrap_or_default(),
        }
    }
}

/// Keystore configuration
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SigningConfig {
    /// Path to the keystore file
    pub keystore: Option<PathBuf>,

    /// Keystore password
    pub store_password: Option<String>,

    /// Key password
    pub key_password: Option<String>,

    /// Key alias within the keystore
    pub alias: Option<String>,

    /// Environment variable consulted when `store_password` is unset
    pub store_password_env: String,

    /// Environment variable consulted when `key_password` is unset
    pub key_password_env: String,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            keystore: None,
            store_password: None,
            key_password: None,
            alias: None,
            store_password_env: defaults::DEFAULT_STORE_PASSWORD_ENV.to_string(),
            key_password_env: defaults::DEFAULT_KEY_PASSWORD_ENV.to_string(),
        }
    }
}

impl std::fmt::Debug for SigningConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningConfig")
            .field("keystore", &self.keystore)
            .field("store_password", &self.store_password.as_ref().map(|_| "****"))
            .field("key_password", &self.key_password.as_ref().map(|_| "****"))
            .field("alias", &self.alias)
            .field("store_password_env", &self.store_password_env)
            .field("key_password_env", &self.key_password_env)
            .finish()
    }
}

impl SigningConfig {
    /// Resolve the credentials needed to sign.
    ///
    /// Passwords fall back to the configured environment variables. Every
    /// field must end up non-empty, otherwise the first missing one is
    /// reported as [`ConfigError::MissingField`].
    pub fn credentials(&self) -> Result<Credentials> {
        let keystore = self
            .keystore
            .clone()
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| ConfigError::MissingField("signing.keystore".to_string()))?;

        let store_password = non_empty(self.store_password.clone())
            .or_else(|| non_empty(std::env::var(&self.store_password_env).ok()))
            .ok_or_else(|| ConfigError::MissingField("signing.store_password".to_string()))?;

        let key_password = non_empty(self.key_password.clone())
            .or_else(|| non_empty(std::env::var(&self.key_password_env).ok()))
            .ok_or_else(|| ConfigError::MissingField("signing.key_password".to_string()))?;

        let alias = non_empty(self.alias.clone())
            .ok_or_else(|| ConfigError::MissingField("signing.alias".to_string()))?;

        Ok(Credentials {
            keystore,
            store_password,
            key_password,
            alias,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Fully resolved keystore credentials
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub keystore: PathBuf,
    pub store_password: String,
    pub key_password: String,
    pub alias: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("keystore", &self.keystore)
            .field("store_password", &"****")
            .field("key_password", &"****")
            .field("alias", &self.alias)
            .finish()
    }
}

/// Output configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory signed archives are written to
    pub dir: PathBuf,

    /// Open the output directory after a successful run
    pub auto_open: bool,

    /// Copy the signed archive path to the clipboard after a successful run
    pub copy_to_clipboard: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: defaults::default_output_dir(),
            auto_open: true,
            copy_to_clipboard: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level for the log file (trace, debug, info, warn, error)
    pub level: String,

    /// Directory for timestamped log files
    pub dir: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::DEFAULT_LOG_LEVEL.to_string(),
            dir: defaults::default_log_dir(),
        }
    }
}

/// History configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Path of the JSON history file
    pub file: PathBuf,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            file: defaults::default_history_file(),
        }
    }
}

/// Keys accepted by [`Config::set_value`]
pub const CONFIG_KEYS: &[&str] = &[
    "tools.jdk_path",
    "tools.sdk_build_tools",
    "signing.keystore",
    "signing.store_password",
    "signing.key_password",
    "signing.alias",
    "signing.store_password_env",
    "signing.key_password_env",
    "output.dir",
    "output.auto_open",
    "output.copy_to_clipboard",
    "logging.level",
    "logging.dir",
    "history.file",
];

impl Config {
    /// Set a single value by its dotted key (e.g. `signing.alias`)
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        let optional = |v: &str| {
            if v.is_empty() {
                None
            } else {
                Some(v.to_string())
            }
        };

        match key {
            "tools.jdk_path" => self.tools.jdk_path = PathBuf::from(value),
            "tools.sdk_build_tools" => self.tools.sdk_build_tools = PathBuf::from(value),
            "signing.keystore" => self.signing.keystore = optional(value).map(PathBuf::from),
            "signing.store_password" => self.signing.store_password = optional(value),
            "signing.key_password" => self.signing.key_password = optional(value),
            "signing.alias" => self.signing.alias = optional(value),
            "signing.store_password_env" => self.signing.store_password_env = value.to_string(),
            "signing.key_password_env" => self.signing.key_password_env = value.to_string(),
            "output.dir" => self.output.dir = PathBuf::from(value),
            "output.auto_open" => self.output.auto_open = parse_bool(key, value)?,
            "output.copy_to_clipboard" => self.output.copy_to_clipboard = parse_bool(key, value)?,
            "logging.level" => self.logging.level = value.to_string(),
            "logging.dir" => self.logging.dir = PathBuf::from(value),
            "history.file" => self.history.file = PathBuf::from(value),
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }

        Ok(())
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            field: key.to_string(),
            message: format!("expected a boolean, got '{}'", value),
        }),
    }
}
