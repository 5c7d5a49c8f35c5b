//! Progress events and reporters
//!
//! Pipelines never talk to the presentation layer directly. They report
//! [`ProgressEvent`]s to a [`ProgressReporter`]; the usual reporter is a
//! [`ChannelReporter`] whose receiving end is drained by the UI loop.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::batch::BatchItem;
use crate::error::ErrorKind;

/// A single external-tool step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// jarsigner, in place on the input archive
    Sign,
    /// zipalign from the input archive to the output archive
    Align,
    /// apksigner sign on the output archive
    Resign,
    /// apksigner verify on the output archive
    Verify,
    /// apksigner verify --print-certs
    CertificateInfo,
}

impl Step {
    /// Human-readable step name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sign => "Jarsigner Signing",
            Self::Align => "Zipalign APK",
            Self::Resign => "Apksigner Signing",
            Self::Verify => "Verify APK",
            Self::CertificateInfo => "Get APK Info",
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Events emitted while an operation runs
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// Informational output (command lines, tool output)
    Log { text: String },
    /// A step reported an error
    Error { text: String },
    /// A signing step is about to start (`index` is 1-based)
    Step { index: usize, total: usize, step: Step },
    /// A signing run finished
    Complete { output: PathBuf },
    /// A signing run failed
    Failed { kind: ErrorKind, error: String },
    /// A batch item is about to start (`index` is 1-based)
    BatchProgress {
        index: usize,
        total: usize,
        label: String,
    },
    /// A batch finished
    BatchComplete { results: Vec<BatchItem> },
    /// Verification finished; carries the certificate listing
    VerifyComplete { certificates: String },
    /// Verification failed
    VerifyFailed { kind: ErrorKind, error: String },
}

impl ProgressEvent {
    pub fn log(text: impl Into<String>) -> Self {
        Self::Log { text: text.into() }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::Error { text: text.into() }
    }

    /// Completed fraction for step and batch progress events
    pub fn fraction(&self) -> Option<f64> {
        match self {
            Self::Step { index, total, .. } | Self::BatchProgress { index, total, .. } => {
                if *total == 0 {
                    Some(1.0)
                } else {
                    Some(*index as f64 / *total as f64)
                }
            }
            _ => None,
        }
    }
}

/// Trait for receiving progress events
pub trait ProgressReporter: Send + Sync {
    /// Handle a progress event
    fn report(&self, event: ProgressEvent);
}

impl<R: ProgressReporter + ?Sized> ProgressReporter for Arc<R> {
    fn report(&self, event: ProgressEvent) {
        (**self).report(event)
    }
}

/// Reporter that forwards events onto an mpsc channel
#[derive(Debug, Clone)]
pub struct ChannelReporter {
    sender: UnboundedSender<ProgressEvent>,
}

impl ChannelReporter {
    /// Create a reporter and the receiver the UI loop drains
    pub fn channel() -> (Self, UnboundedReceiver<ProgressEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl ProgressReporter for ChannelReporter {
    fn report(&self, event: ProgressEvent) {
        if self.sender.send(event).is_err() {
            tracing::trace!("progress receiver dropped, event discarded");
        }
    }
}

/// Reporter that only logs through tracing
#[derive(Debug, Default)]
pub struct TracingReporter;

impl ProgressReporter for TracingReporter {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Log { text } => tracing::debug!("{}", text),
            ProgressEvent::Error { text } => tracing::warn!("{}", text),
            ProgressEvent::Step { index, total, step } => {
                tracing::info!("Step {}/{}: {}", index, total, step)
            }
            ProgressEvent::Complete { output } => {
                tracing::info!("Signed APK saved to {}", output.display())
            }
            ProgressEvent::Failed { error, .. } => tracing::error!("Signing failed: {}", error),
            ProgressEvent::BatchProgress {
                index,
                total,
                label,
            } => tracing::info!("Batch {}/{}: {}", index, total, label),
            ProgressEvent::BatchComplete { results } => {
                let succeeded = results.iter().filter(|r| r.is_success()).count();
                tracing::info!(
                    "Batch complete: {}/{} succeeded",
                    succeeded,
                    results.len()
                )
            }
            ProgressEvent::VerifyComplete { .. } => tracing::info!("Verification successful"),
            ProgressEvent::VerifyFailed { error, .. } => {
                tracing::error!("Verification failed: {}", error)
            }
        }
    }
}

/// Reporter that collects events for later inspection (useful for testing)
#[derive(Debug, Default)]
pub struct CollectingReporter {
    events: Mutex<Vec<ProgressEvent>>,
}

impl CollectingReporter {
    /// Get all collected events
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl ProgressReporter for CollectingReporter {
    fn report(&self, event: ProgressEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }
}
