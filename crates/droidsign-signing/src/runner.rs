//! Execution of a single external tool invocation

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{error, info};

use crate::error::{Result, SigningError};
use crate::events::{ProgressEvent, ProgressReporter, Step};

/// Per-step limit before a tool is considered hung
pub const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(300);

const MASK: &str = "****";

/// A program plus its argument vector.
///
/// Values registered with [`ToolCommand::secret`] are masked wherever the
/// command line is displayed or logged.
#[derive(Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
    secrets: Vec<String>,
}

impl ToolCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            secrets: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Append a path argument
    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.to_string_lossy().into_owned())
    }

    /// Mark a value as sensitive
    pub fn secret(mut self, value: impl Into<String>) -> Self {
        let value = value.into();
        if !value.is_empty() {
            self.secrets.push(value);
        }
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// The command line with secrets masked
    pub fn display(&self) -> String {
        let mut line = self.program.to_string_lossy().into_owned();
        for arg in &self.args {
            line.push(' ');
            line.push_str(&self.mask(arg));
        }
        line
    }

    /// Mask `arg` when it is a secret or ends in `pass:<secret>`
    fn mask(&self, arg: &str) -> String {
        let is_secret = |value: &str| self.secrets.iter().any(|s| s == value);

        if is_secret(arg) {
            return MASK.to_string();
        }
        match arg.split_once("pass:") {
            Some((prefix, value)) if is_secret(value) => format!("{}pass:{}", prefix, MASK),
            _ => arg.to_string(),
        }
    }
}

impl std::fmt::Debug for ToolCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display())
    }
}

/// Runs one tool invocation to completion
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `command` as `step`, returning its trimmed stdout.
    ///
    /// Implementations report the command line before running, the captured
    /// output afterwards, and an error event on failure. They never retry.
    async fn run(
        &self,
        command: &ToolCommand,
        step: Step,
        reporter: &dyn ProgressReporter,
    ) -> Result<String>;
}

/// [`CommandRunner`] backed by real child processes
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    timeout: Duration,
}

impl ProcessRunner {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_STEP_TIMEOUT,
        }
    }

    /// Use a different per-step timeout
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn fail(
        &self,
        err: SigningError,
        step: Step,
        reporter: &dyn ProgressReporter,
    ) -> SigningError {
        let message = match &err {
            SigningError::StepFailed { message, .. } => message.clone(),
            other => other.to_string(),
        };
        error!(step = %step, kind = %err.kind(), "{}", message);
        reporter.report(ProgressEvent::error(message));
        err
    }
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(
        &self,
        command: &ToolCommand,
        step: Step,
        reporter: &dyn ProgressReporter,
    ) -> Result<String> {
        let display_line = command.display();
        info!(step = %step, command = %display_line, "running step");
        reporter.report(ProgressEvent::log(format!("Running: {}", display_line)));

        let start = Instant::now();
        let child = Command::new(command.program())
            .args(command.get_args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let child = match child {
            Ok(child) => child,
            Err(e) => {
                let err = SigningError::StepError {
                    step: step.to_string(),
                    reason: e.to_string(),
                };
                return Err(self.fail(err, step, reporter));
            }
        };

        // Dropping the child on timeout kills it (kill_on_drop)
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                let err = SigningError::StepError {
                    step: step.to_string(),
                    reason: e.to_string(),
                };
                return Err(self.fail(err, step, reporter));
            }
            Err(_) => {
                let err = SigningError::StepTimeout {
                    step: step.to_string(),
                    seconds: self.timeout.as_secs(),
                };
                return Err(self.fail(err, step, reporter));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if !output.status.success() {
            if !stdout.is_empty() {
                reporter.report(ProgressEvent::log(stdout.clone()));
            }
            let message = if stderr.is_empty() {
                stdout
            } else {
                stderr
            };
            let err = SigningError::StepFailed {
                step: step.to_string(),
                message,
            };
            return Err(self.fail(err, step, reporter));
        }

        info!(
            step = %step,
            duration_ms = start.elapsed().as_millis() as u64,
            "step finished"
        );
        if !stdout.is_empty() {
            reporter.report(ProgressEvent::log(stdout.clone()));
        }

        Ok(stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::events::CollectingReporter;

    #[test]
    fn test_display_masks_secrets() {
        let command = ToolCommand::new("/bt/apksigner")
            .args(["sign", "--ks", "release.jks"])
            .arg("--ks-pass=pass:hunter2")
            .args(["-storepass", "hunter2"])
            .secret("hunter2")
            .secret("");

        let line = command.display();
        assert!(!line.contains("hunter2"));
        assert_eq!(
            line,
            "/bt/apksigner sign --ks release.jks --ks-pass=pass:**** -storepass ****"
        );
        // The real argument vector is untouched
        assert_eq!(command.get_args()[4], "-storepass");
        assert_eq!(command.get_args()[5], "hunter2");
    }

    #[test]
    fn test_short_secret_leaves_paths_intact() {
        let command = ToolCommand::new("/jdk/bin/jarsigner")
            .args(["-keystore", "/keys/a/release.jks", "-storepass", "a"])
            .arg("--key-pass=pass:a")
            .args(["/apps/app.apk", "alias"])
            .secret("a");

        assert_eq!(
            command.display(),
            "/jdk/bin/jarsigner -keystore /keys/a/release.jks -storepass **** \
             --key-pass=pass:**** /apps/app.apk alias"
        );
    }

    #[cfg(unix)]
    fn sh(script: &str) -> ToolCommand {
        ToolCommand::new("sh").args(["-c", script])
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_success_returns_stdout_and_logs() {
        let reporter = CollectingReporter::default();
        let output = ProcessRunner::new()
            .run(&sh("echo '  aligned  '"), Step::Align, &reporter)
            .await
            .unwrap();

        assert_eq!(output, "aligned");
        let events = reporter.events();
        assert!(matches!(&events[0], ProgressEvent::Log { text } if text.starts_with("Running: sh -c")));
        assert!(matches!(&events[1], ProgressEvent::Log { text } if text == "aligned"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit_prefers_stderr() {
        let reporter = CollectingReporter::default();
        let err = ProcessRunner::new()
            .run(&sh("echo out; echo bad keystore >&2; exit 3"), Step::Sign, &reporter)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::StepFailed);
        match err {
            SigningError::StepFailed { step, message } => {
                assert_eq!(step, "Jarsigner Signing");
                assert_eq!(message, "bad keystore");
            }
            other => panic!("unexpected error: {other}"),
        }
        let events = reporter.events();
        let output_log = events
            .iter()
            .position(|e| matches!(e, ProgressEvent::Log { text } if text == "out"))
            .expect("stdout logged");
        let error = events
            .iter()
            .position(|e| matches!(e, ProgressEvent::Error { text } if text == "bad keystore"))
            .expect("error reported");
        assert!(output_log < error);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit_falls_back_to_stdout() {
        let reporter = CollectingReporter::default();
        let err = ProcessRunner::new()
            .run(&sh("echo DOES NOT VERIFY; exit 1"), Step::Verify, &reporter)
            .await
            .unwrap_err();

        assert!(matches!(err, SigningError::StepFailed { message, .. } if message == "DOES NOT VERIFY"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_kills_and_reports() {
        let reporter = CollectingReporter::default();
        let runner = ProcessRunner::with_timeout(Duration::from_millis(200));
        let start = Instant::now();

        let err = runner
            .run(&sh("sleep 10"), Step::Resign, &reporter)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::StepTimeout);
        assert!(start.elapsed() < Duration::from_secs(5));
        assert!(reporter
            .events()
            .iter()
            .any(|e| matches!(e, ProgressEvent::Error { text } if text.contains("Timeout in Apksigner Signing"))));
    }

    #[tokio::test]
    async fn test_missing_binary_is_step_error() {
        let reporter = CollectingReporter::default();
        let err = ProcessRunner::new()
            .run(
                &ToolCommand::new("/definitely/not/a/real/zipalign"),
                Step::Align,
                &reporter,
            )
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::StepError);
        assert!(err.to_string().starts_with("Exception in Zipalign APK"));
    }
}
