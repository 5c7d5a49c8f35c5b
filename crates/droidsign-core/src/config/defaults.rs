//! Default configuration values

use std::path::PathBuf;

/// Application directory name under the platform config/data directories
pub const APP_DIR: &str = "droidsign";

/// Default configuration file name (TOML)
pub const DEFAULT_CONFIG_TOML: &str = "droidsign.toml";

/// Default history file name
pub const DEFAULT_HISTORY_FILE: &str = "signing_history.json";

/// Default log level for the log file
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Environment variable holding the keystore password
pub const DEFAULT_STORE_PASSWORD_ENV: &str = "ANDROID_KEYSTORE_PASSWORD";

/// Environment variable holding the key password
pub const DEFAULT_KEY_PASSWORD_ENV: &str = "ANDROID_KEY_PASSWORD";

/// Accepted log levels
pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Default location of the configuration file
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join(DEFAULT_CONFIG_TOML)
}

/// Default directory for signed archives
pub fn default_output_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Signed_APKs")
}

/// Default directory for log files
pub fn default_log_dir() -> PathBuf {
    data_dir().join("logs")
}

/// Default history file location
pub fn default_history_file() -> PathBuf {
    data_dir().join(DEFAULT_HISTORY_FILE)
}

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// Default configuration template written by `config init`
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# droidsign configuration
# Passwords may be left empty and supplied through the environment variables
# named by store_password_env / key_password_env.

[tools]
# Detected from JAVA_HOME / ANDROID_HOME when left unset.
# jdk_path = "/usr/lib/jvm/java-17-openjdk"
# sdk_build_tools = "/opt/android-sdk/build-tools/34.0.0"

[signing]
keystore = ""
alias = ""
store_password_env = "ANDROID_KEYSTORE_PASSWORD"
key_password_env = "ANDROID_KEY_PASSWORD"

[output]
auto_open = true
copy_to_clipboard = true

[logging]
level = "info"
"#;
