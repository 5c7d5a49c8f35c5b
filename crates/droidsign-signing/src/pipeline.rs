//! The four-step signing pipeline
//!
//! One run takes an input archive through:
//!
//! 1. `jarsigner` in place on the input (SHA-256 digest and signature)
//! 2. `zipalign -p 4` from the input to a fresh output archive
//! 3. `apksigner sign` on the output
//! 4. `apksigner verify` on the output
//!
//! Steps run strictly in order; the first failure ends the run. Only a run
//! that passes verification is written to the history ledger.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Local};
use tracing::{info, warn};

use droidsign_core::Credentials;

use crate::error::{ErrorKind, Result, SigningError};
use crate::events::{ProgressEvent, ProgressReporter, Step};
use crate::hash::digest;
use crate::history::{HistoryEntry, HistoryLedger};
use crate::runner::{CommandRunner, ToolCommand};
use crate::tools::{ToolLocator, ToolSet};

/// Steps of a signing run, in execution order
pub const SIGNING_STEPS: [Step; 4] = [Step::Sign, Step::Align, Step::Resign, Step::Verify];

/// Status of a signing run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Pending,
    Success,
    Failed,
}

/// One execution of the pipeline against one input archive
#[derive(Debug, Clone)]
pub struct SigningRun {
    input: PathBuf,
    output: PathBuf,
    attempted: Vec<Step>,
    status: RunStatus,
    error: Option<String>,
    entry: Option<HistoryEntry>,
}

impl SigningRun {
    fn new(input: PathBuf, output: PathBuf) -> Self {
        Self {
            input,
            output,
            attempted: Vec::new(),
            status: RunStatus::Pending,
            error: None,
            entry: None,
        }
    }

    fn begin(&mut self, step: Step) {
        debug_assert_eq!(self.status, RunStatus::Pending);
        self.attempted.push(step);
    }

    fn succeed(&mut self, entry: HistoryEntry) {
        self.status = RunStatus::Success;
        self.entry = Some(entry);
    }

    fn relocate(&mut self, input: PathBuf, output: PathBuf) {
        self.input = input;
        self.output = output;
    }

    fn fail(&mut self, err: &SigningError) {
        self.status = RunStatus::Failed;
        self.error = Some(err.to_string());
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Steps started so far, in order
    pub fn attempted(&self) -> &[Step] {
        &self.attempted
    }

    /// 1-based index of the current (or last) step, 0 before the first
    pub fn current_step(&self) -> usize {
        self.attempted.len()
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    /// Error text of a failed run
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// History entry written for a successful run
    pub fn entry(&self) -> Option<&HistoryEntry> {
        self.entry.as_ref()
    }
}

/// A run that did not finish, with the error that ended it
#[derive(Debug)]
pub struct RunFailure {
    pub run: SigningRun,
    pub error: SigningError,
}

impl RunFailure {
    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }

    pub fn into_error(self) -> SigningError {
        self.error
    }
}

impl std::fmt::Display for RunFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.error, f)
    }
}

impl std::error::Error for RunFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        std::error::Error::source(&self.error)
    }
}

/// Compute `<output_dir>/<stem>_signed_<YYYYmmdd_HHMMSS>.apk`
pub fn output_path_for(input: &Path, output_dir: &Path, timestamp: DateTime<Local>) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "app".to_string());
    output_dir.join(format!(
        "{}_signed_{}.apk",
        stem,
        timestamp.format("%Y%m%d_%H%M%S")
    ))
}

/// Runs the signing steps for single archives
#[derive(Clone)]
pub struct SigningPipeline {
    locator: ToolLocator,
    credentials: Credentials,
    output_dir: PathBuf,
    runner: Arc<dyn CommandRunner>,
    ledger: Arc<HistoryLedger>,
}

impl SigningPipeline {
    pub fn new(
        locator: ToolLocator,
        credentials: Credentials,
        output_dir: impl Into<PathBuf>,
        runner: Arc<dyn CommandRunner>,
        ledger: Arc<HistoryLedger>,
    ) -> Self {
        Self {
            locator,
            credentials,
            output_dir: output_dir.into(),
            runner,
            ledger,
        }
    }

    /// Sign `input`, stamping the output name with the current local time
    pub async fn sign(
        &self,
        input: &Path,
        reporter: &dyn ProgressReporter,
    ) -> std::result::Result<SigningRun, RunFailure> {
        self.sign_at(input, Local::now(), reporter).await
    }

    /// Sign `input`, using `timestamp` for the output name.
    ///
    /// Reports `Complete` on success and `Failed` on any error. A failed run
    /// is returned with the steps it attempted and its error text, including
    /// runs that ended before the first step.
    pub async fn sign_at(
        &self,
        input: &Path,
        timestamp: DateTime<Local>,
        reporter: &dyn ProgressReporter,
    ) -> std::result::Result<SigningRun, RunFailure> {
        let mut run = SigningRun::new(
            input.to_path_buf(),
            output_path_for(input, &self.output_dir, timestamp),
        );

        match self.execute(&mut run, timestamp, reporter).await {
            Ok(()) => {
                info!(
                    input = %run.input().display(),
                    output = %run.output().display(),
                    "signing completed"
                );
                reporter.report(ProgressEvent::Complete {
                    output: run.output().to_path_buf(),
                });
                Ok(run)
            }
            Err(error) => {
                run.fail(&error);
                warn!(
                    input = %input.display(),
                    kind = %error.kind(),
                    attempted = run.current_step(),
                    error = %error,
                    "signing failed"
                );
                reporter.report(ProgressEvent::Failed {
                    kind: error.kind(),
                    error: error.to_string(),
                });
                Err(RunFailure { run, error })
            }
        }
    }

    async fn execute(
        &self,
        run: &mut SigningRun,
        timestamp: DateTime<Local>,
        reporter: &dyn ProgressReporter,
    ) -> Result<()> {
        let tools = self.locator.resolve()?;
        let input =
            std::fs::canonicalize(run.input()).map_err(|e| SigningError::io(run.input(), e))?;
        let output = output_path_for(&input, &self.output_dir, timestamp);
        run.relocate(input, output);

        let original_hash = digest(run.input())?;

        std::fs::create_dir_all(&self.output_dir)
            .map_err(|e| SigningError::io(&self.output_dir, e))?;

        let plan = self.plan(&tools, run.input(), run.output());
        let total = plan.len();

        for (index, (step, command)) in plan.iter().enumerate() {
            run.begin(*step);
            reporter.report(ProgressEvent::Step {
                index: index + 1,
                total,
                step: *step,
            });

            self.runner.run(command, *step, reporter).await?;
        }

        let signed_hash = digest(run.output())?;
        let entry = HistoryEntry::success(run.input(), run.output(), original_hash, signed_hash);

        // The signed archive is already valid; a ledger write failure is
        // reported but does not fail the run.
        if let Err(e) = self.ledger.append(entry.clone()) {
            warn!(error = %e, "error saving history");
            reporter.report(ProgressEvent::error(format!("Error saving history: {}", e)));
        }

        run.succeed(entry);
        Ok(())
    }

    /// Build the command for every step
    fn plan(&self, tools: &ToolSet, input: &Path, output: &Path) -> Vec<(Step, ToolCommand)> {
        let creds = &self.credentials;

        let sign = ToolCommand::new(&tools.jarsigner)
            .args(["-verbose", "-sigalg", "SHA256withRSA", "-digestalg", "SHA-256"])
            .arg("-keystore")
            .path_arg(&creds.keystore)
            .args(["-storepass", creds.store_password.as_str()])
            .args(["-keypass", creds.key_password.as_str()])
            .path_arg(input)
            .arg(creds.alias.as_str())
            .secret(creds.store_password.as_str())
            .secret(creds.key_password.as_str());

        let align = ToolCommand::new(&tools.zipalign)
            .args(["-v", "-p", "4"])
            .path_arg(input)
            .path_arg(output);

        let resign = ToolCommand::new(&tools.apksigner)
            .args(["sign", "--ks"])
            .path_arg(&creds.keystore)
            .arg(format!("--ks-pass=pass:{}", creds.store_password))
            .arg(format!("--key-pass=pass:{}", creds.key_password))
            .args(["--ks-key-alias", creds.alias.as_str()])
            .path_arg(output)
            .secret(creds.store_password.as_str())
            .secret(creds.key_password.as_str());

        let verify = ToolCommand::new(&tools.apksigner)
            .arg("verify")
            .path_arg(output);

        SIGNING_STEPS.into_iter().zip([sign, align, resign, verify]).collect()
    }
}
