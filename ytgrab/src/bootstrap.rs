//! Startup precondition: yt-dlp must be importable before the session starts.

use std::io::{self, Write};
use ytgrab_dl::env::PACKAGE;
use ytgrab_dl::{FetchError, env};

/// Whether the fetch library can be used.
#[derive(Debug)]
pub enum Availability {
    /// Importable at startup
    Available,
    /// Importable after running the package installer
    Installed,
    /// Installer failed or the module still does not import
    Unavailable { reason: FetchError },
}

impl Availability {
    pub fn is_usable(&self) -> bool {
        !matches!(self, Availability::Unavailable { .. })
    }
}

/// Probe once; on failure install once and probe again. Progress lines go to `out`.
pub fn ensure_with<P, I, W>(mut probe: P, install: I, out: &mut W) -> io::Result<Availability>
where
    P: FnMut() -> ytgrab_dl::Result<()>,
    I: FnOnce() -> ytgrab_dl::Result<()>,
    W: Write,
{
    match probe() {
        Ok(()) => return Ok(Availability::Available),
        Err(e) => tracing::info!(error = %e, "yt-dlp not importable"),
    }

    writeln!(out, "Installing {PACKAGE}...")?;

    let installed = install().and_then(|()| probe());

    match installed {
        Ok(()) => {
            writeln!(out, "✓ {PACKAGE} installed successfully!")?;
            Ok(Availability::Installed)
        }
        Err(reason) => {
            tracing::error!(error = %reason, "yt-dlp installation failed");
            writeln!(
                out,
                "✗ Failed to install {PACKAGE}. Please install manually: pip install {PACKAGE}"
            )?;
            Ok(Availability::Unavailable { reason })
        }
    }
}

/// [`ensure_with`] against the embedded interpreter and `pip`.
pub fn ensure_fetch_library<W: Write>(out: &mut W) -> io::Result<Availability> {
    ensure_with(env::probe, env::install_package, out)
}
