//! Event drain loop and terminal progress display

use std::time::Duration;

use anyhow::Context;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc::{error::TryRecvError, UnboundedReceiver};

use droidsign_signing::{Operation, ProgressEvent, ProgressReporter, TracingReporter};

use super::Cli;

/// How often the consumer loop drains pending events
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Anything that renders progress events
pub trait EventSink {
    fn handle(&mut self, event: ProgressEvent);
}

impl EventSink for Vec<ProgressEvent> {
    fn handle(&mut self, event: ProgressEvent) {
        self.push(event);
    }
}

/// Drain an operation's events until its worker finishes, then return the
/// worker's result.
///
/// Every [`POLL_INTERVAL`] all pending events are handed to `sink` in
/// order. The loop ends once the channel is closed, which happens after the
/// worker has sent its last event.
pub async fn consume<T>(operation: Operation<T>, sink: &mut dyn EventSink) -> anyhow::Result<T> {
    let Operation { mut events, handle } = operation;
    let mut ticker = tokio::time::interval(POLL_INTERVAL);

    loop {
        ticker.tick().await;
        if !drain_pending(&mut events, sink) {
            break;
        }
    }

    handle.await.context("signing worker stopped unexpectedly")
}

/// Hand every queued event to `sink`; false once the channel is closed
fn drain_pending(events: &mut UnboundedReceiver<ProgressEvent>, sink: &mut dyn EventSink) -> bool {
    loop {
        match events.try_recv() {
            Ok(event) => sink.handle(event),
            Err(TryRecvError::Empty) => return true,
            Err(TryRecvError::Disconnected) => return false,
        }
    }
}

/// Which progress the bar tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    /// Steps of a single run
    Steps,
    /// Archives of a batch; steps only update the message
    Batch,
    /// Verification; no bar, only log lines
    Verify,
}

/// Renders events as an indicatif progress bar plus log lines.
///
/// Hidden in quiet or JSON mode, where events only go to the log.
pub struct ProgressDisplay {
    bar: ProgressBar,
    mode: DisplayMode,
    verbose: bool,
    visible: bool,
}

impl ProgressDisplay {
    pub fn new(cli: &Cli, mode: DisplayMode) -> Self {
        let visible = cli.shows_text();
        let bar = if !visible {
            ProgressBar::hidden()
        } else if mode == DisplayMode::Verify {
            let spinner = ProgressBar::new_spinner();
            spinner.enable_steady_tick(Duration::from_millis(120));
            spinner
        } else {
            let bar = ProgressBar::new(0);
            bar.set_style(
                ProgressStyle::with_template(
                    "{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {msg}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
            );
            bar.enable_steady_tick(Duration::from_millis(120));
            bar
        };

        Self {
            bar,
            mode,
            verbose: cli.verbose,
            visible,
        }
    }

    /// Remove the bar from the terminal
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }

    fn println(&self, line: String) {
        self.bar.println(line);
    }
}

impl EventSink for ProgressDisplay {
    fn handle(&mut self, event: ProgressEvent) {
        if !self.visible {
            TracingReporter.report(event);
            return;
        }

        match event {
            ProgressEvent::Log { text } => {
                if self.verbose {
                    for line in text.lines() {
                        self.println(format!("  {}", style(line).dim()));
                    }
                } else if self.mode == DisplayMode::Verify {
                    self.bar.set_message(text);
                }
            }
            ProgressEvent::Error { text } => {
                self.println(format!("  {} {}", style("✗").red(), style(text).red()));
            }
            ProgressEvent::Step { index, total, step } => match self.mode {
                DisplayMode::Steps => {
                    self.bar.set_length(total as u64);
                    self.bar.set_position(index.saturating_sub(1) as u64);
                    self.bar.set_message(format!("{}...", step));
                }
                DisplayMode::Batch | DisplayMode::Verify => {
                    self.bar.set_message(format!("{}...", step));
                }
            },
            ProgressEvent::Complete { output } => {
                if self.mode == DisplayMode::Steps {
                    let length = self.bar.length().unwrap_or(0);
                    self.bar.set_position(length);
                } else {
                    self.println(format!(
                        "  {} {}",
                        style("✓").green(),
                        style(output.display()).cyan()
                    ));
                }
            }
            ProgressEvent::Failed { error, .. } => {
                if self.mode == DisplayMode::Batch {
                    self.println(format!("  {} {}", style("✗").red(), error));
                }
            }
            ProgressEvent::BatchProgress {
                index,
                total,
                label,
            } => {
                self.bar.set_length(total as u64);
                self.bar.set_position(index.saturating_sub(1) as u64);
                self.println(format!("{} {}", style("→").blue(), label));
                self.bar.set_message(label);
            }
            ProgressEvent::BatchComplete { results } => {
                self.bar.set_position(results.len() as u64);
            }
            ProgressEvent::VerifyComplete { .. } | ProgressEvent::VerifyFailed { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use droidsign_signing::{ChannelReporter, Step};

    #[tokio::test]
    async fn test_consume_delivers_every_event_in_order() {
        let (reporter, events) = ChannelReporter::channel();
        let handle = tokio::spawn(async move {
            for index in 1..=4 {
                reporter.report(ProgressEvent::Step {
                    index,
                    total: 4,
                    step: Step::Sign,
                });
                tokio::time::sleep(Duration::from_millis(30)).await;
            }
            reporter.report(ProgressEvent::log("done"));
            42
        });

        let mut collected: Vec<ProgressEvent> = Vec::new();
        let result = consume(Operation { events, handle }, &mut collected)
            .await
            .unwrap();

        assert_eq!(result, 42);
        assert_eq!(collected.len(), 5);
        let indexes: Vec<usize> = collected
            .iter()
            .filter_map(|e| match e {
                ProgressEvent::Step { index, .. } => Some(*index),
                _ => None,
            })
            .collect();
        assert_eq!(indexes, vec![1, 2, 3, 4]);
        assert!(matches!(collected.last(), Some(ProgressEvent::Log { text }) if text == "done"));
    }

    #[tokio::test]
    async fn test_consume_reports_worker_panic() {
        let (reporter, events) = ChannelReporter::channel();
        let handle = tokio::spawn(async move {
            let _reporter = reporter;
            panic!("boom");
        });

        let mut collected: Vec<ProgressEvent> = Vec::new();
        let result: anyhow::Result<()> = consume(Operation { events, handle }, &mut collected).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_drain_pending_stops_on_disconnect() {
        let (reporter, mut events) = ChannelReporter::channel();
        reporter.report(ProgressEvent::log("one"));
        reporter.report(ProgressEvent::log("two"));

        let mut collected: Vec<ProgressEvent> = Vec::new();
        assert!(drain_pending(&mut events, &mut collected));
        assert_eq!(collected.len(), 2);

        drop(reporter);
        assert!(!drain_pending(&mut events, &mut collected));
        assert_eq!(collected.len(), 2);
    }
}
