//! Read-only verification of an already signed archive

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{Result, SigningError};
use crate::events::{ProgressEvent, ProgressReporter, Step};
use crate::runner::{CommandRunner, ToolCommand};
use crate::tools::ToolLocator;

/// Runs `apksigner verify` and then `apksigner verify --print-certs`
#[derive(Clone)]
pub struct VerificationPipeline {
    locator: ToolLocator,
    runner: Arc<dyn CommandRunner>,
}

impl VerificationPipeline {
    pub fn new(locator: ToolLocator, runner: Arc<dyn CommandRunner>) -> Self {
        Self { locator, runner }
    }

    /// Verify `archive` and return the certificate listing.
    ///
    /// Reports `VerifyComplete` or `VerifyFailed`. Nothing is written to the
    /// history ledger.
    pub async fn verify(&self, archive: &Path, reporter: &dyn ProgressReporter) -> Result<String> {
        match self.execute(archive, reporter).await {
            Ok(certificates) => {
                info!(archive = %archive.display(), "verification successful");
                reporter.report(ProgressEvent::VerifyComplete {
                    certificates: certificates.clone(),
                });
                Ok(certificates)
            }
            Err(e) => {
                warn!(archive = %archive.display(), kind = %e.kind(), error = %e, "verification failed");
                reporter.report(ProgressEvent::VerifyFailed {
                    kind: e.kind(),
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn execute(&self, archive: &Path, reporter: &dyn ProgressReporter) -> Result<String> {
        let tools = self.locator.resolve()?;
        let archive = std::fs::canonicalize(archive).map_err(|e| SigningError::io(archive, e))?;

        reporter.report(ProgressEvent::log(format!(
            "Verifying APK: {}",
            archive.display()
        )));

        let verify = ToolCommand::new(&tools.apksigner)
            .arg("verify")
            .path_arg(&archive);
        self.runner.run(&verify, Step::Verify, reporter).await?;

        let print_certs = ToolCommand::new(&tools.apksigner)
            .args(["verify", "--print-certs"])
            .path_arg(&archive);
        self.runner
            .run(&print_certs, Step::CertificateInfo, reporter)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::events::CollectingReporter;
    use crate::testing::{installed_tools, step_failure, ScriptedRunner};
    use tempfile::TempDir;

    fn setup(runner: Arc<ScriptedRunner>) -> (TempDir, VerificationPipeline, std::path::PathBuf) {
        let temp = TempDir::new().unwrap();
        let (locator, _) = installed_tools(temp.path());
        let archive = temp.path().join("signed.apk");
        std::fs::write(&archive, b"PK").unwrap();
        (temp, VerificationPipeline::new(locator, runner), archive)
    }

    #[tokio::test]
    async fn test_verify_runs_both_steps_and_returns_certificates() {
        let runner = Arc::new(ScriptedRunner::new());
        let (_temp, pipeline, archive) = setup(runner.clone());
        let reporter = CollectingReporter::default();

        let certificates = pipeline.verify(&archive, &reporter).await.unwrap();

        assert!(certificates.contains("CN=Test"));
        assert_eq!(runner.steps(), vec![Step::Verify, Step::CertificateInfo]);
        let commands = runner.commands();
        assert_eq!(commands[1].1.get_args()[..2], ["verify", "--print-certs"]);

        let events = reporter.events();
        assert!(matches!(&events[0], ProgressEvent::Log { text } if text.starts_with("Verifying APK: ")));
        assert!(matches!(
            events.last(),
            Some(ProgressEvent::VerifyComplete { certificates }) if certificates.contains("CN=Test")
        ));
    }

    #[tokio::test]
    async fn test_first_failure_aborts() {
        let runner = Arc::new(ScriptedRunner::failing_when(|step, _| {
            (step == Step::Verify).then(|| step_failure(step, "DOES NOT VERIFY"))
        }));
        let (_temp, pipeline, archive) = setup(runner.clone());
        let reporter = CollectingReporter::default();

        let err = pipeline.verify(&archive, &reporter).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::StepFailed);
        assert_eq!(runner.steps(), vec![Step::Verify]);
        assert!(matches!(
            reporter.events().last(),
            Some(ProgressEvent::VerifyFailed { kind: ErrorKind::StepFailed, .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_tools() {
        let runner = Arc::new(ScriptedRunner::new());
        let (temp, pipeline, archive) = setup(runner.clone());
        std::fs::remove_dir_all(temp.path().join("build-tools")).unwrap();

        let err = pipeline
            .verify(&archive, &CollectingReporter::default())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ToolsMissing);
        assert!(runner.steps().is_empty());
    }
}
