//! Location of the external signing tools

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};

use droidsign_core::config::ToolsConfig;

use crate::error::{MissingTool, Result, SigningError};

#[cfg(windows)]
mod names {
    pub const JARSIGNER: &str = "jarsigner.exe";
    pub const ZIPALIGN: &str = "zipalign.exe";
    pub const APKSIGNER: &str = "apksigner.bat";
}

#[cfg(not(windows))]
mod names {
    pub const JARSIGNER: &str = "jarsigner";
    pub const ZIPALIGN: &str = "zipalign";
    pub const APKSIGNER: &str = "apksigner";
}

/// Resolved paths of the three external executables
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolSet {
    pub jarsigner: PathBuf,
    pub zipalign: PathBuf,
    pub apksigner: PathBuf,
}

/// Computes where the tools should be and checks that they are there
#[derive(Debug, Clone)]
pub struct ToolLocator {
    jdk_path: PathBuf,
    build_tools: PathBuf,
}

impl ToolLocator {
    /// Create a locator for a JDK home and an SDK build-tools directory
    pub fn new(jdk_path: impl Into<PathBuf>, build_tools: impl Into<PathBuf>) -> Self {
        Self {
            jdk_path: jdk_path.into(),
            build_tools: build_tools.into(),
        }
    }

    /// Create a locator from the tools section of the configuration
    pub fn from_config(config: &ToolsConfig) -> Self {
        Self::new(config.jdk_path.clone(), config.sdk_build_tools.clone())
    }

    /// The paths the tools are expected at, whether or not they exist
    pub fn expected(&self) -> ToolSet {
        ToolSet {
            jarsigner: self.jdk_path.join("bin").join(names::JARSIGNER),
            zipalign: self.build_tools.join(names::ZIPALIGN),
            apksigner: self.build_tools.join(names::APKSIGNER),
        }
    }

    /// Check every expected path and return the tool set.
    ///
    /// Fails with [`SigningError::ToolsMissing`] naming exactly the tools
    /// that do not exist. Nothing is cached; each call hits the filesystem.
    pub fn resolve(&self) -> Result<ToolSet> {
        let tools = self.expected();

        let missing: Vec<MissingTool> = [
            ("jarsigner", &tools.jarsigner),
            ("zipalign", &tools.zipalign),
            ("apksigner", &tools.apksigner),
        ]
        .into_iter()
        .filter(|(_, path)| !is_present(path))
        .map(|(name, path)| MissingTool {
            name: name.to_string(),
            path: path.clone(),
        })
        .collect();

        if !missing.is_empty() {
            warn!(count = missing.len(), "signing tools missing");
            return Err(SigningError::ToolsMissing(missing));
        }

        debug!(
            jarsigner = %tools.jarsigner.display(),
            zipalign = %tools.zipalign.display(),
            apksigner = %tools.apksigner.display(),
            "signing tools resolved"
        );
        Ok(tools)
    }
}

fn is_present(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "").unwrap();
    }

    #[test]
    fn test_expected_layout() {
        let locator = ToolLocator::new("/jdk", "/sdk/build-tools/34.0.0");
        let tools = locator.expected();
        assert!(tools.jarsigner.starts_with("/jdk/bin"));
        assert!(tools.zipalign.starts_with("/sdk/build-tools/34.0.0"));
        assert!(tools.apksigner.starts_with("/sdk/build-tools/34.0.0"));
    }

    #[test]
    fn test_resolve_all_present() {
        let temp = TempDir::new().unwrap();
        let locator = ToolLocator::new(temp.path().join("jdk"), temp.path().join("bt"));
        let expected = locator.expected();
        touch(&expected.jarsigner);
        touch(&expected.zipalign);
        touch(&expected.apksigner);

        assert_eq!(locator.resolve().unwrap(), expected);
    }

    #[test]
    fn test_resolve_names_exactly_the_missing_tools() {
        let temp = TempDir::new().unwrap();
        let locator = ToolLocator::new(temp.path().join("jdk"), temp.path().join("bt"));
        let expected = locator.expected();
        touch(&expected.zipalign);

        let err = locator.resolve().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ToolsMissing);
        match err {
            SigningError::ToolsMissing(missing) => {
                let names: Vec<_> = missing.iter().map(|m| m.name.as_str()).collect();
                assert_eq!(names, vec!["jarsigner", "apksigner"]);
                assert_eq!(missing[0].path, expected.jarsigner);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_resolve_rechecks_every_time() {
        let temp = TempDir::new().unwrap();
        let locator = ToolLocator::new(temp.path().join("jdk"), temp.path().join("bt"));
        let expected = locator.expected();
        touch(&expected.jarsigner);
        touch(&expected.zipalign);
        touch(&expected.apksigner);
        assert!(locator.resolve().is_ok());

        std::fs::remove_file(&expected.zipalign).unwrap();
        assert!(locator.resolve().is_err());
    }
}
