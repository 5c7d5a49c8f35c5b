//! Entry points used by the presentation layer

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tracing::info;

use droidsign_core::ConfigStore;

use crate::batch::{BatchCoordinator, BatchItem};
use crate::error::Result;
use crate::events::{ChannelReporter, ProgressEvent};
use crate::history::{HistoryEntry, HistoryLedger};
use crate::pipeline::{RunFailure, SigningPipeline, SigningRun};
use crate::runner::CommandRunner;
use crate::tools::{ToolLocator, ToolSet};
use crate::verify::VerificationPipeline;

/// A running background operation.
///
/// `events` is closed once the worker finishes, after its last event.
pub struct Operation<T> {
    pub events: UnboundedReceiver<ProgressEvent>,
    pub handle: JoinHandle<T>,
}

/// Signing, verification and history operations over shared services.
///
/// Constructed once at startup. Each operation snapshots the configuration,
/// checks preconditions synchronously, then runs on its own tokio task and
/// reports through the returned [`Operation`].
#[derive(Clone)]
pub struct SigningService {
    config: Arc<ConfigStore>,
    ledger: Arc<HistoryLedger>,
    runner: Arc<dyn CommandRunner>,
}

impl SigningService {
    pub fn new(
        config: Arc<ConfigStore>,
        ledger: Arc<HistoryLedger>,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            config,
            ledger,
            runner,
        }
    }

    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    pub fn ledger(&self) -> &HistoryLedger {
        &self.ledger
    }

    fn locator(&self) -> ToolLocator {
        ToolLocator::from_config(&self.config.snapshot().tools)
    }

    /// Build a pipeline from the current configuration.
    ///
    /// Fails with `ConfigInvalid` when keystore or credentials are missing.
    fn pipeline(&self) -> Result<SigningPipeline> {
        let config = self.config.snapshot();
        let credentials = config.signing.credentials()?;
        Ok(SigningPipeline::new(
            ToolLocator::from_config(&config.tools),
            credentials,
            config.output.dir,
            Arc::clone(&self.runner),
            Arc::clone(&self.ledger),
        ))
    }

    /// Sign one archive in the background
    pub fn sign_one(
        &self,
        path: PathBuf,
    ) -> Result<Operation<std::result::Result<SigningRun, RunFailure>>> {
        let pipeline = self.pipeline()?;
        let (reporter, events) = ChannelReporter::channel();
        info!(path = %path.display(), "starting signing worker");

        let handle = tokio::spawn(async move { pipeline.sign(&path, &reporter).await });
        Ok(Operation { events, handle })
    }

    /// Sign several archives, one after another, in the background
    pub fn sign_batch(&self, paths: Vec<PathBuf>) -> Result<Operation<Vec<BatchItem>>> {
        let coordinator = BatchCoordinator::new(self.pipeline()?);
        let (reporter, events) = ChannelReporter::channel();
        info!(count = paths.len(), "starting batch worker");

        let handle = tokio::spawn(async move { coordinator.run_all(&paths, &reporter).await });
        Ok(Operation { events, handle })
    }

    /// Verify a signed archive in the background
    pub fn verify(&self, path: PathBuf) -> Operation<Result<String>> {
        let pipeline = VerificationPipeline::new(self.locator(), Arc::clone(&self.runner));
        let (reporter, events) = ChannelReporter::channel();
        info!(path = %path.display(), "starting verification worker");

        let handle = tokio::spawn(async move { pipeline.verify(&path, &reporter).await });
        Operation { events, handle }
    }

    /// Check that all three tools exist where the configuration points
    pub fn check_tools(&self) -> Result<ToolSet> {
        self.locator().resolve()
    }

    pub fn list_history(&self) -> Vec<HistoryEntry> {
        self.ledger.entries()
    }

    pub fn clear_history(&self) -> Result<()> {
        self.ledger.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::runner::ProcessRunner;
    use droidsign_core::Config;
    use tempfile::TempDir;

    fn config_for(temp: &TempDir) -> Config {
        let mut config = Config::default();
        config.tools.jdk_path = temp.path().join("jdk");
        config.tools.sdk_build_tools = temp.path().join("build-tools");
        config.signing.keystore = Some(temp.path().join("release.jks"));
        config.signing.store_password = Some("storepw".to_string());
        config.signing.key_password = Some("keypw".to_string());
        config.signing.alias = Some("release".to_string());
        config.output.dir = temp.path().join("out");
        config.history.file = temp.path().join("history.json");
        config
    }

    fn service(temp: &TempDir, config: Config, runner: Arc<dyn CommandRunner>) -> SigningService {
        let ledger = Arc::new(HistoryLedger::load(&config.history.file));
        let store = Arc::new(ConfigStore::with_config(
            temp.path().join("droidsign.toml"),
            config,
        ));
        SigningService::new(store, ledger, runner)
    }

    async fn drain(events: &mut UnboundedReceiver<ProgressEvent>) -> Vec<ProgressEvent> {
        let mut collected = Vec::new();
        while let Some(event) = events.recv().await {
            collected.push(event);
        }
        collected
    }

    #[tokio::test]
    async fn test_missing_credentials_rejected_before_spawn() {
        let temp = TempDir::new().unwrap();
        let mut config = config_for(&temp);
        config.signing.key_password = None;
        config.signing.key_password_env = "DROIDSIGN_TEST_UNSET_KEY_PASSWORD".to_string();
        let service = service(&temp, config, Arc::new(ProcessRunner::new()));

        let err = match service.sign_one(temp.path().join("app.apk")) {
            Ok(_) => panic!("expected ConfigInvalid"),
            Err(e) => e,
        };
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
        assert!(err.to_string().contains("signing.key_password"));
    }

    #[tokio::test]
    async fn test_check_tools_reports_missing() {
        let temp = TempDir::new().unwrap();
        let service = service(&temp, config_for(&temp), Arc::new(ProcessRunner::new()));

        let err = service.check_tools().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ToolsMissing);
    }

    #[cfg(unix)]
    mod end_to_end {
        use super::*;
        use crate::events::Step;
        use crate::hash::digest;
        use std::os::unix::fs::PermissionsExt;
        use std::path::Path;

        fn script(path: &Path, body: &str) {
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, format!("#!/bin/sh\n{body}\n")).unwrap();
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
        }

        /// Shell stand-ins for the real tools. apksigner refuses any archive
        /// whose path contains "broken".
        fn install_fake_tools(temp: &TempDir) {
            script(
                &temp.path().join("jdk/bin/jarsigner"),
                "echo \"jar signed.\"",
            );
            script(
                &temp.path().join("build-tools/zipalign"),
                "cp \"$4\" \"$5\" && echo \"Verification succesful\"",
            );
            script(
                &temp.path().join("build-tools/apksigner"),
                r#"case "$*" in
  *broken*) echo "DOES NOT VERIFY" >&2; exit 1 ;;
esac
if [ "$1" = "verify" ] && [ "$2" = "--print-certs" ]; then
  echo "Signer #1 certificate DN: CN=Test, O=Example"
fi
exit 0"#,
            );
        }

        #[tokio::test]
        async fn test_sign_one_with_real_processes() {
            let temp = TempDir::new().unwrap();
            install_fake_tools(&temp);
            let input = temp.path().join("app.apk");
            std::fs::write(&input, b"PK\x03\x04 payload").unwrap();
            let original_hash = digest(&input).unwrap();
            let service = service(&temp, config_for(&temp), Arc::new(ProcessRunner::new()));

            let mut op = service.sign_one(input.clone()).unwrap();
            let events = drain(&mut op.events).await;
            let run = op.handle.await.unwrap().unwrap();

            let name = run.output().file_name().unwrap().to_string_lossy().into_owned();
            assert!(name.starts_with("app_signed_") && name.ends_with(".apk"));
            assert_eq!(run.output().parent().unwrap(), temp.path().join("out"));

            let history = service.list_history();
            assert_eq!(history.len(), 1);
            assert_eq!(history[0].original_hash, original_hash);
            assert_eq!(history[0].signed_hash, digest(run.output()).unwrap());

            // Passwords never reach the event stream
            assert!(events.iter().all(|e| match e {
                ProgressEvent::Log { text } => !text.contains("storepw") && !text.contains("keypw"),
                _ => true,
            }));
            assert!(matches!(events.last(), Some(ProgressEvent::Complete { .. })));
        }

        #[tokio::test]
        async fn test_batch_with_real_processes() {
            let temp = TempDir::new().unwrap();
            install_fake_tools(&temp);
            let paths: Vec<PathBuf> = ["first.apk", "broken.apk", "third.apk"]
                .iter()
                .map(|name| {
                    let path = temp.path().join(name);
                    std::fs::write(&path, name.as_bytes()).unwrap();
                    path
                })
                .collect();
            let service = service(&temp, config_for(&temp), Arc::new(ProcessRunner::new()));

            let mut op = service.sign_batch(paths).unwrap();
            let events = drain(&mut op.events).await;
            let results = op.handle.await.unwrap();

            let statuses: Vec<bool> = results.iter().map(|r| r.is_success()).collect();
            assert_eq!(statuses, vec![true, false, true]);
            assert_eq!(service.list_history().len(), 2);
            assert!(matches!(events.last(), Some(ProgressEvent::BatchComplete { .. })));

            // The broken archive failed at re-signing, so verification never ran for it
            let broken_steps: Vec<Step> = events
                .iter()
                .skip_while(|e| !matches!(e, ProgressEvent::BatchProgress { index: 2, .. }))
                .take_while(|e| !matches!(e, ProgressEvent::BatchProgress { index: 3, .. }))
                .filter_map(|e| match e {
                    ProgressEvent::Step { step, .. } => Some(*step),
                    _ => None,
                })
                .collect();
            assert_eq!(broken_steps, vec![Step::Sign, Step::Align, Step::Resign]);
        }

        #[tokio::test]
        async fn test_verify_with_real_processes() {
            let temp = TempDir::new().unwrap();
            install_fake_tools(&temp);
            let archive = temp.path().join("signed.apk");
            std::fs::write(&archive, b"PK").unwrap();
            let service = service(&temp, config_for(&temp), Arc::new(ProcessRunner::new()));

            let mut op = service.verify(archive);
            let events = drain(&mut op.events).await;
            let certificates = op.handle.await.unwrap().unwrap();

            assert!(certificates.contains("CN=Test"));
            assert!(matches!(events.last(), Some(ProgressEvent::VerifyComplete { .. })));
            assert!(service.list_history().is_empty());
        }

        #[tokio::test]
        async fn test_clear_history() {
            let temp = TempDir::new().unwrap();
            install_fake_tools(&temp);
            let input = temp.path().join("app.apk");
            std::fs::write(&input, b"PK").unwrap();
            let service = service(&temp, config_for(&temp), Arc::new(ProcessRunner::new()));

            let op = service.sign_one(input).unwrap();
            op.handle.await.unwrap().unwrap();
            assert_eq!(service.list_history().len(), 1);

            service.clear_history().unwrap();
            assert!(service.list_history().is_empty());
            assert!(HistoryLedger::load(temp.path().join("history.json")).is_empty());
        }
    }
}
