//! Error types for signing operations

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for signing operations
pub type Result<T> = std::result::Result<T, SigningError>;

/// A tool that could not be found where the configuration says it lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingTool {
    pub name: String,
    pub path: PathBuf,
}

impl std::fmt::Display for MissingTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.name, self.path.display())
    }
}

/// Signing-related errors
#[derive(Debug, Error)]
pub enum SigningError {
    /// Keystore or credentials missing from the configuration
    #[error("Signing configuration error: {0}")]
    ConfigInvalid(String),

    /// One or more external tools do not exist
    #[error("Missing required tools:\n{}", format_missing(.0))]
    ToolsMissing(Vec<MissingTool>),

    /// A tool exited with a non-zero status
    #[error("{step} failed: {message}")]
    StepFailed { step: String, message: String },

    /// A tool did not finish in time
    #[error("Timeout in {step} after {seconds} seconds")]
    StepTimeout { step: String, seconds: u64 },

    /// A tool could not be launched or awaited
    #[error("Exception in {step}: {reason}")]
    StepError { step: String, reason: String },

    /// Filesystem error (hashing, output directory, missing input)
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Corrupt persisted state
    #[error("Parse error: {0}")]
    Parse(String),
}

fn format_missing(missing: &[MissingTool]) -> String {
    missing
        .iter()
        .map(|m| m.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Machine-checkable error category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ConfigInvalid,
    ToolsMissing,
    StepFailed,
    StepTimeout,
    StepError,
    Io,
    Parse,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConfigInvalid => write!(f, "config_invalid"),
            Self::ToolsMissing => write!(f, "tools_missing"),
            Self::StepFailed => write!(f, "step_failed"),
            Self::StepTimeout => write!(f, "step_timeout"),
            Self::StepError => write!(f, "step_error"),
            Self::Io => write!(f, "io"),
            Self::Parse => write!(f, "parse"),
        }
    }
}

impl SigningError {
    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ConfigInvalid(_) => ErrorKind::ConfigInvalid,
            Self::ToolsMissing(_) => ErrorKind::ToolsMissing,
            Self::StepFailed { .. } => ErrorKind::StepFailed,
            Self::StepTimeout { .. } => ErrorKind::StepTimeout,
            Self::StepError { .. } => ErrorKind::StepError,
            Self::Io { .. } => ErrorKind::Io,
            Self::Parse(_) => ErrorKind::Parse,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<droidsign_core::ConfigError> for SigningError {
    fn from(err: droidsign_core::ConfigError) -> Self {
        Self::ConfigInvalid(err.to_string())
    }
}
