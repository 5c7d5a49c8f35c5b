//! Exit codes for the CLI

use droidsign_core::ConfigError;
use droidsign_signing::{ErrorKind, SigningError};

/// Success
pub const SUCCESS: i32 = 0;

/// General error
pub const ERROR: i32 = 1;

/// Configuration error (missing keystore, credentials, bad value)
pub const CONFIG_ERROR: i32 = 2;

/// jarsigner, zipalign or apksigner not found
pub const TOOLS_MISSING: i32 = 3;

/// A signing or verification step failed, timed out or could not start
pub const STEP_FAILED: i32 = 4;

/// Map a command error to its exit code
pub fn for_error(err: &anyhow::Error) -> i32 {
    if let Some(e) = err.downcast_ref::<SigningError>() {
        return match e.kind() {
            ErrorKind::ConfigInvalid => CONFIG_ERROR,
            ErrorKind::ToolsMissing => TOOLS_MISSING,
            ErrorKind::StepFailed | ErrorKind::StepTimeout | ErrorKind::StepError => STEP_FAILED,
            ErrorKind::Io | ErrorKind::Parse => ERROR,
        };
    }

    if err.downcast_ref::<ConfigError>().is_some() {
        return CONFIG_ERROR;
    }

    ERROR
}
