//! Detection of JDK and Android SDK build-tools locations

use std::path::{Path, PathBuf};

use tracing::debug;

/// Find a JDK home directory.
///
/// `JAVA_HOME` wins; otherwise the JDK is derived from the `java` binary on
/// `PATH` (`<jdk>/bin/java`).
pub fn detect_jdk_path() -> Option<PathBuf> {
    if let Some(home) = std::env::var_os("JAVA_HOME").map(PathBuf::from) {
        if home.exists() {
            debug!(path = %home.display(), "using JAVA_HOME");
            return Some(home);
        }
    }

    let java = which::which("java").ok()?;
    let java = std::fs::canonicalize(&java).unwrap_or(java);
    let jdk = java.parent()?.parent()?.to_path_buf();
    debug!(path = %jdk.display(), "derived JDK home from java on PATH");
    Some(jdk)
}

/// Find the newest Android SDK build-tools directory
pub fn detect_build_tools() -> Option<PathBuf> {
    let sdk_paths = [
        std::env::var("ANDROID_HOME").ok().map(PathBuf::from),
        std::env::var("ANDROID_SDK_ROOT").ok().map(PathBuf::from),
        Some(PathBuf::from("/usr/local/share/android-sdk")),
        dirs::home_dir().map(|h| h.join("Android/Sdk")),
        dirs::home_dir().map(|h| h.join("Library/Android/sdk")),
    ];

    sdk_paths
        .into_iter()
        .flatten()
        .find_map(|sdk| latest_build_tools(&sdk))
}

/// Return `<sdk>/build-tools/<latest version>` if any version is installed
pub fn latest_build_tools(sdk: &Path) -> Option<PathBuf> {
    let build_tools = sdk.join("build-tools");
    let entries = std::fs::read_dir(&build_tools).ok()?;

    let mut versions: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();

    versions.sort_by_key(|p| version_key(p));
    let latest = versions.pop()?;
    debug!(path = %latest.display(), "found build-tools");
    Some(latest)
}

/// Orders version directory names numerically (`9.0.0` before `34.0.0`)
fn version_key(path: &Path) -> (Vec<u64>, String) {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let numbers = name
        .split(|c: char| !c.is_ascii_digit())
        .filter(|part| !part.is_empty())
        .filter_map(|part| part.parse().ok())
        .collect();
    (numbers, name)
}
