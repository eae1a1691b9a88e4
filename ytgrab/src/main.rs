//! ytgrab CLI - interactive video downloader

use clap::Parser;
use eyre::Result;
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use ytgrab::cli::{Cli, run_cli};
use ytgrab_dl::env::install_search_path;

fn main() -> Result<ExitCode> {
    // Development builds also look for tools in the workspace checkout.
    #[cfg(debug_assertions)]
    let source_root = Path::new(env!("CARGO_MANIFEST_DIR")).parent();
    #[cfg(not(debug_assertions))]
    let source_root: Option<&Path> = None;

    // SAFETY: runs before the logging worker, the signal handler thread or the
    // Python interpreter exist.
    let search_path = unsafe { install_search_path(source_root) };

    color_eyre::install()?;

    let (non_blocking, _guard) = tracing_appender::non_blocking(std::io::stderr());

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::debug!(?search_path, "bundled tools");

    run_cli(Cli::parse())
}
