//! Test doubles shared by the pipeline tests

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{Result, SigningError};
use crate::events::{ProgressEvent, ProgressReporter, Step};
use crate::runner::{CommandRunner, ToolCommand};
use crate::tools::{ToolLocator, ToolSet};

type FailRule = Box<dyn Fn(Step, &ToolCommand) -> Option<SigningError> + Send + Sync>;

/// Runner that records every invocation and imitates the tools' file effects.
///
/// Sign appends to the input archive, Align copies input to output, Resign
/// appends to the output. A failure rule can turn any call into an error.
pub(crate) struct ScriptedRunner {
    calls: Mutex<Vec<(Step, ToolCommand)>>,
    fail_rule: Option<FailRule>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_rule: None,
        }
    }

    pub fn failing_when<F>(rule: F) -> Self
    where
        F: Fn(Step, &ToolCommand) -> Option<SigningError> + Send + Sync + 'static,
    {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_rule: Some(Box::new(rule)),
        }
    }

    pub fn steps(&self) -> Vec<Step> {
        self.calls.lock().unwrap().iter().map(|(s, _)| *s).collect()
    }

    pub fn commands(&self) -> Vec<(Step, ToolCommand)> {
        self.calls.lock().unwrap().clone()
    }
}

fn last_arg(command: &ToolCommand, from_end: usize) -> PathBuf {
    let args = command.get_args();
    PathBuf::from(&args[args.len() - 1 - from_end])
}

fn append(path: &Path, bytes: &[u8]) {
    let mut file = std::fs::OpenOptions::new().append(true).open(path).unwrap();
    file.write_all(bytes).unwrap();
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(
        &self,
        command: &ToolCommand,
        step: Step,
        reporter: &dyn ProgressReporter,
    ) -> Result<String> {
        self.calls.lock().unwrap().push((step, command.clone()));
        reporter.report(ProgressEvent::log(format!("Running: {}", command.display())));

        if let Some(err) = self.fail_rule.as_ref().and_then(|rule| rule(step, command)) {
            reporter.report(ProgressEvent::error(err.to_string()));
            return Err(err);
        }

        match step {
            // jarsigner ... <input> <alias>
            Step::Sign => append(&last_arg(command, 1), b"JAR"),
            // zipalign -v -p 4 <input> <output>
            Step::Align => {
                std::fs::copy(last_arg(command, 1), last_arg(command, 0)).unwrap();
            }
            Step::Resign => append(&last_arg(command, 0), b"V2"),
            Step::Verify => {}
            Step::CertificateInfo => return Ok("Signer #1 certificate DN: CN=Test".to_string()),
        }

        Ok(String::new())
    }
}

/// Create empty tool files under `root` and return a locator pointing at them
pub(crate) fn installed_tools(root: &Path) -> (ToolLocator, ToolSet) {
    let locator = ToolLocator::new(root.join("jdk"), root.join("build-tools"));
    let tools = locator.expected();
    for path in [&tools.jarsigner, &tools.zipalign, &tools.apksigner] {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "").unwrap();
    }
    (locator, tools)
}

pub(crate) fn step_failure(step: Step, message: &str) -> SigningError {
    SigningError::StepFailed {
        step: step.to_string(),
        message: message.to_string(),
    }
}
