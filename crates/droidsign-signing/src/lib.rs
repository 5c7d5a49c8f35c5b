//! Droidsign Signing - APK signing pipeline orchestration
//!
//! This crate drives the external Android signing tools in sequence:
//! - jarsigner: v1 (JAR) signature
//! - zipalign: 4-byte alignment into a new output archive
//! - apksigner: v2+ signature and verification
//!
//! Runs are reported through [`ProgressEvent`]s, and every successful run is
//! recorded in a persisted [`HistoryLedger`].

pub mod batch;
pub mod error;
pub mod events;
pub mod hash;
pub mod history;
pub mod pipeline;
pub mod runner;
pub mod service;
pub mod tools;
pub mod verify;

#[cfg(test)]
mod testing;

pub use batch::{BatchCoordinator, BatchItem, BatchOutcome, BatchSummary};
pub use error::{ErrorKind, MissingTool, Result, SigningError};
pub use events::{
    ChannelReporter, CollectingReporter, ProgressEvent, ProgressReporter, Step, TracingReporter,
};
pub use hash::digest;
pub use history::{HistoryEntry, HistoryLedger, HistoryStatus, MAX_HISTORY_ENTRIES};
pub use pipeline::{
    output_path_for, RunFailure, RunStatus, SigningPipeline, SigningRun, SIGNING_STEPS,
};
pub use runner::{CommandRunner, ProcessRunner, ToolCommand, DEFAULT_STEP_TIMEOUT};
pub use service::{Operation, SigningService};
pub use tools::{ToolLocator, ToolSet};
pub use verify::VerificationPipeline;
