//! CLI entry point: argument parsing, startup checks and the interactive session.

use crate::bootstrap;
use crate::config::SessionConfig;
use crate::console::{Acknowledgement, Console, Interrupt};
use crate::fetch::YtDlp;
use crate::session::{CANCELLED, EXIT_PROMPT, FAREWELL, Session};
use clap::Parser;
use eyre::{Context, Result};
use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::sync::Arc;
use ytgrab_dl::env::PACKAGE;

/// Interactive prompts only; clap provides `--help` and `--version`.
#[derive(Debug, Parser)]
#[command(name = "ytgrab")]
#[command(about = "Download a video at a chosen resolution with the best audio merged in")]
#[command(version)]
pub struct Cli {}

/// Execute CLI - separated for testing.
pub fn run_cli(cli: Cli) -> Result<ExitCode> {
    tracing::debug!(?cli, "parsed arguments");

    let config = SessionConfig::try_from(cli)?;
    let interrupt = Arc::new(Interrupt::default());
    let mut console = Console::stdio().with_interrupt(Arc::clone(&interrupt));

    let availability = bootstrap::ensure_fetch_library(&mut io::stdout())
        .wrap_err("failed to report dependency check")?;

    tracing::info!(?availability, "fetch library checked");

    if !availability.is_usable() {
        console.error(&format!("Error: '{PACKAGE}' library not found."))?;
        console.error(&format!(
            "Please install it by running: pip install {PACKAGE}"
        ))?;
        console.pause(EXIT_PROMPT);
        return Ok(ExitCode::from(1));
    }

    install_interrupt_handler(Arc::clone(&interrupt))?;

    let report = Session::new(config, YtDlp, console).run()?;

    tracing::debug!(?report, "exiting");

    if interrupt.handler_exits() {
        // The signal thread is waiting for Enter and ends the process.
        loop {
            std::thread::park();
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Ctrl-C ends the session from the signal thread.
///
/// A blocked prompt read or a running download does not observe the signal, so the
/// closing messages are printed here. When no prompt is reading, this thread also
/// waits for Enter and exits; otherwise the prompt's next line is the acknowledgement.
fn install_interrupt_handler(interrupt: Arc<Interrupt>) -> Result<()> {
    ctrlc::set_handler(move || {
        tracing::info!("interrupted by user");

        match announce_interrupt(&interrupt, &mut io::stdout()) {
            Ok(Some(Acknowledgement::Handler)) => {
                let _ = io::stdin().lock().read_line(&mut String::new());
                std::process::exit(0);
            }
            Ok(_) => {}
            Err(_) => std::process::exit(0),
        }
    })
    .wrap_err("failed to install interrupt handler")
}

/// Record the signal and print the closing messages once.
fn announce_interrupt(
    interrupt: &Interrupt,
    out: &mut impl Write,
) -> io::Result<Option<Acknowledgement>> {
    let Some(ack) = interrupt.signal() else {
        return Ok(None);
    };

    write!(out, "\n\n{CANCELLED}\n\n{FAREWELL}\n{EXIT_PROMPT}")?;
    out.flush()?;

    Ok(Some(ack))
}
