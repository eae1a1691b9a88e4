//! Terminal I/O: prompts, messages, acknowledgement pauses and Ctrl-C bookkeeping.

use console::Term;
use dialoguer::Input;
use dialoguer::theme::Theme;
use std::fmt;
use std::io::{self, BufRead, IsTerminal, Stderr, Stdout, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use thiserror::Error;

/// Why a prompt produced no answer.
#[derive(Debug, Error)]
pub enum PromptError {
    /// Input closed (end of file) or the user interrupted the program
    #[error("input interrupted")]
    Interrupted,

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Source of answer lines.
pub trait LineInput {
    /// Show `message` and read one line without its terminator. `None` once input is closed.
    fn next_line(&mut self, message: &str, out: &mut dyn Write) -> io::Result<Option<String>>;
}

impl<R: BufRead> LineInput for R {
    fn next_line(&mut self, message: &str, out: &mut dyn Write) -> io::Result<Option<String>> {
        write!(out, "{message}")?;
        out.flush()?;

        let mut line = String::new();
        if self.read_line(&mut line)? == 0 {
            return Ok(None);
        }

        let trimmed = line.trim_end_matches(['\r', '\n']).len();
        line.truncate(trimmed);

        Ok(Some(line))
    }
}

/// Standard input: dialoguer line editing on a terminal, plain lines otherwise.
///
/// Stdin is locked per read so the Ctrl-C handler can wait for Enter between prompts.
pub struct Terminal {
    term: Term,
}

impl Terminal {
    pub fn new() -> Self {
        Self {
            term: Term::stdout(),
        }
    }
}

impl Default for Terminal {
    fn default() -> Self {
        Self::new()
    }
}

impl LineInput for Terminal {
    fn next_line(&mut self, message: &str, out: &mut dyn Write) -> io::Result<Option<String>> {
        if !(self.term.is_term() && io::stdin().is_terminal()) {
            return io::stdin().lock().next_line(message, out);
        }

        out.flush()?;

        let answer = Input::<String>::with_theme(&Verbatim)
            .with_prompt(message)
            .allow_empty(true)
            .interact_text_on(&self.term);

        match answer.map_err(|dialoguer::Error::IO(e)| e) {
            Ok(line) => Ok(Some(line)),
            // Ctrl-C arrives as a key while the terminal is in raw mode
            Err(e) if e.kind() == io::ErrorKind::Interrupted => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Prompts rendered exactly as written, answers echoed after them.
struct Verbatim;

impl Theme for Verbatim {
    fn format_input_prompt(
        &self,
        f: &mut dyn fmt::Write,
        prompt: &str,
        _default: Option<&str>,
    ) -> fmt::Result {
        write!(f, "{prompt}")
    }

    fn format_input_prompt_selection(
        &self,
        f: &mut dyn fmt::Write,
        prompt: &str,
        sel: &str,
    ) -> fmt::Result {
        write!(f, "{prompt}{sel}")
    }
}

const READING: u8 = 1;
const SIGNALLED: u8 = 2;
const HANDLER_EXITS: u8 = 4;

/// Who waits for the closing Enter after Ctrl-C.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Acknowledgement {
    /// A prompt read is blocked; its next line is the acknowledgement
    Prompt,
    /// Nothing is reading stdin; the signal handler reads the line and exits
    Handler,
}

/// Ctrl-C state shared by the signal handler and the console.
#[derive(Debug, Default)]
pub struct Interrupt(AtomicU8);

impl Interrupt {
    /// Record a Ctrl-C. `None` when one was already recorded.
    pub fn signal(&self) -> Option<Acknowledgement> {
        let previous = self
            .0
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |state| {
                if state & SIGNALLED != 0 {
                    None
                } else if state & READING != 0 {
                    Some(state | SIGNALLED)
                } else {
                    Some(state | SIGNALLED | HANDLER_EXITS)
                }
            })
            .ok()?;

        if previous & READING != 0 {
            Some(Acknowledgement::Prompt)
        } else {
            Some(Acknowledgement::Handler)
        }
    }

    pub fn is_signalled(&self) -> bool {
        self.0.load(Ordering::SeqCst) & SIGNALLED != 0
    }

    /// The signal handler owns the closing pause and the process exit.
    pub fn handler_exits(&self) -> bool {
        self.0.load(Ordering::SeqCst) & HANDLER_EXITS != 0
    }

    /// Mark a read as started; fails once signalled.
    fn begin_read(&self) -> bool {
        self.0
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |state| {
                (state & SIGNALLED == 0).then_some(state | READING)
            })
            .is_ok()
    }

    /// Mark the read as finished; fails if a signal arrived meanwhile.
    fn end_read(&self) -> bool {
        self.0.fetch_and(!READING, Ordering::SeqCst) & SIGNALLED == 0
    }
}

/// Prompt reader with separate output and error streams.
pub struct Console<R, W, E> {
    input: R,
    out: W,
    err: E,
    interrupt: Arc<Interrupt>,
}

impl Console<Terminal, Stdout, Stderr> {
    /// Console bound to the process standard streams.
    pub fn stdio() -> Self {
        Self::new(Terminal::new(), io::stdout(), io::stderr())
    }
}

impl<R: LineInput, W: Write, E: Write> Console<R, W, E> {
    pub fn new(input: R, out: W, err: E) -> Self {
        Self {
            input,
            out,
            err,
            interrupt: Arc::default(),
        }
    }

    /// Share Ctrl-C state with a signal handler.
    pub fn with_interrupt(mut self, interrupt: Arc<Interrupt>) -> Self {
        self.interrupt = interrupt;
        self
    }

    pub fn interrupt(&self) -> &Interrupt {
        &self.interrupt
    }

    /// Print `message` without a newline and read one line of input.
    ///
    /// The trailing line terminator is removed; surrounding spaces are kept.
    pub fn prompt(&mut self, message: &str) -> Result<String, PromptError> {
        if !self.interrupt.begin_read() {
            return Err(PromptError::Interrupted);
        }

        let line = self.input.next_line(message, &mut self.out);

        if !self.interrupt.end_read() {
            return Err(PromptError::Interrupted);
        }

        line?.ok_or(PromptError::Interrupted)
    }

    /// Wait for Enter. Closed or failing input counts as acknowledged.
    pub fn pause(&mut self, message: &str) {
        match self.prompt(message) {
            Ok(_) | Err(PromptError::Interrupted) => {}
            Err(PromptError::Io(e)) => tracing::debug!(error = %e, "pause not acknowledged"),
        }
    }

    /// Write a line to the output stream.
    pub fn say(&mut self, line: &str) -> io::Result<()> {
        writeln!(self.out, "{line}")
    }

    /// Write a line to the error stream.
    pub fn error(&mut self, line: &str) -> io::Result<()> {
        self.out.flush()?;
        writeln!(self.err, "{line}")
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn errors(&self) -> &E {
        &self.err
    }
}

/// Scripted input that records a Ctrl-C while each line is being read.
#[cfg(test)]
pub(crate) struct SignalOnRead<R> {
    pub input: R,
    pub interrupt: Arc<Interrupt>,
}

#[cfg(test)]
impl<R: BufRead> LineInput for SignalOnRead<R> {
    fn next_line(&mut self, message: &str, out: &mut dyn Write) -> io::Result<Option<String>> {
        self.interrupt.signal();
        self.input.next_line(message, out)
    }
}
