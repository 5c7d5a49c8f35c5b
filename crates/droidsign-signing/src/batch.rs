//! Sequential signing of many archives

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::error::ErrorKind;
use crate::events::{ProgressEvent, ProgressReporter};
use crate::pipeline::SigningPipeline;

/// Outcome of one archive in a batch
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchOutcome {
    Success { output: PathBuf },
    Failed { kind: ErrorKind, error: String },
}

/// One input archive and what happened to it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchItem {
    pub path: PathBuf,
    #[serde(flatten)]
    pub outcome: BatchOutcome,
}

impl BatchItem {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, BatchOutcome::Success { .. })
    }
}

/// Success/failure counts over a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn from_items(items: &[BatchItem]) -> Self {
        let succeeded = items.iter().filter(|i| i.is_success()).count();
        Self {
            total: items.len(),
            succeeded,
            failed: items.len() - succeeded,
        }
    }
}

/// Runs a [`SigningPipeline`] over archives one at a time.
///
/// A failed archive is recorded and the batch moves on; every input is
/// visited exactly once, in the order given. Runs never overlap, so two
/// tool invocations never touch the keystore at the same time.
pub struct BatchCoordinator {
    pipeline: SigningPipeline,
}

impl BatchCoordinator {
    pub fn new(pipeline: SigningPipeline) -> Self {
        Self { pipeline }
    }

    pub async fn run_all(
        &self,
        paths: &[PathBuf],
        reporter: &dyn ProgressReporter,
    ) -> Vec<BatchItem> {
        let total = paths.len();
        let mut results = Vec::with_capacity(total);

        for (index, path) in paths.iter().enumerate() {
            reporter.report(ProgressEvent::BatchProgress {
                index: index + 1,
                total,
                label: format!("Processing {}", display_name(path)),
            });

            let outcome = match self.pipeline.sign(path, reporter).await {
                Ok(run) => BatchOutcome::Success {
                    output: run.output().to_path_buf(),
                },
                Err(failure) => BatchOutcome::Failed {
                    kind: failure.kind(),
                    error: failure.error.to_string(),
                },
            };

            results.push(BatchItem {
                path: path.clone(),
                outcome,
            });
        }

        let summary = BatchSummary::from_items(&results);
        info!(
            total = summary.total,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "batch signing completed"
        );
        reporter.report(ProgressEvent::BatchComplete {
            results: results.clone(),
        });

        results
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
