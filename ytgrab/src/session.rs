//! Interactive session loop: one download per iteration until the user stops.

use crate::config::SessionConfig;
use crate::console::{Console, LineInput, PromptError};
use crate::download::Outcome;
use crate::fetch::{BarProgress, Fetcher, ProgressObserver};
use std::io::Write;

pub const CANCELLED: &str = "Download cancelled by user.";
pub const FAREWELL: &str = "Thank you for using YouTube Video Downloader!";
pub const EXIT_PROMPT: &str = "Press Enter to exit...";

const CONTINUE_PROMPT: &str = "Do you want to download another video? (y/n): ";

/// Creates the progress observer handed to each download.
pub type ObserverFactory = Box<dyn FnMut() -> Box<dyn ProgressObserver>>;

/// How the loop ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionEnd {
    /// User answered anything but `y`/`yes`
    Declined,
    /// Ctrl-C or closed input
    Cancelled,
    /// Unexpected I/O failure during an iteration
    Failed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionReport {
    pub attempts: usize,
    pub completed: usize,
    pub end: SessionEnd,
}

/// Interactive downloader state shared by every iteration.
pub struct Session<F, R, W, E> {
    pub(crate) config: SessionConfig,
    pub(crate) fetcher: F,
    pub(crate) console: Console<R, W, E>,
    pub(crate) observer: ObserverFactory,
}

impl<F: Fetcher, R: LineInput, W: Write, E: Write> Session<F, R, W, E> {
    /// Session reporting download progress on standard output.
    pub fn new(config: SessionConfig, fetcher: F, console: Console<R, W, E>) -> Self {
        Self {
            config,
            fetcher,
            console,
            observer: Box::new(stdout_progress),
        }
    }

    pub fn with_observer(
        mut self,
        factory: impl FnMut() -> Box<dyn ProgressObserver> + 'static,
    ) -> Self {
        self.observer = Box::new(factory);
        self
    }

    pub fn console(&self) -> &Console<R, W, E> {
        &self.console
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Run downloads until the user declines, interrupts, or I/O fails.
    ///
    /// Ends with the farewell message and an acknowledgement pause, unless a Ctrl-C
    /// signal already showed them.
    pub fn run(&mut self) -> Result<SessionReport, PromptError> {
        let mut report = SessionReport {
            attempts: 0,
            completed: 0,
            end: SessionEnd::Declined,
        };

        loop {
            match self.iteration(&mut report) {
                Ok(true) => continue,
                Ok(false) => {
                    report.end = SessionEnd::Declined;
                    break;
                }
                Err(PromptError::Interrupted) => {
                    report.end = SessionEnd::Cancelled;
                    break;
                }
                Err(PromptError::Io(e)) => {
                    tracing::error!(error = %e, "session aborted");
                    self.console.error(&format!("\nUnexpected error: {e}"))?;
                    self.console.pause("Press Enter to continue...");
                    report.end = SessionEnd::Failed;
                    break;
                }
            }
        }

        tracing::info!(?report, "session finished");

        if self.console.interrupt().is_signalled() {
            return Ok(report);
        }

        if report.end == SessionEnd::Cancelled {
            self.console.say(&format!("\n\n{CANCELLED}"))?;
        }
        self.console.say(&format!("\n{FAREWELL}"))?;
        self.console.pause(EXIT_PROMPT);

        Ok(report)
    }

    /// One download attempt followed by the continue prompt.
    fn iteration(&mut self, report: &mut SessionReport) -> Result<bool, PromptError> {
        report.attempts += 1;

        if let Outcome::Completed(_) = self.run_one_download()? {
            report.completed += 1;
        }

        self.ask_continue()
    }

    fn ask_continue(&mut self) -> Result<bool, PromptError> {
        self.console.say(&format!("\n{}", "=".repeat(50)))?;
        let answer = self.console.prompt(CONTINUE_PROMPT)?;
        Ok(is_yes(&answer))
    }
}

fn stdout_progress() -> Box<dyn ProgressObserver> {
    Box::new(BarProgress::stdout())
}

/// `y` or `yes`, any case, surrounding spaces ignored.
pub fn is_yes(answer: &str) -> bool {
    let answer = answer.trim();
    answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes")
}
