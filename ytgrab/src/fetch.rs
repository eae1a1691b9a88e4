//! Seam between the interactive flow and yt-dlp.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use ytgrab_dl::Result;
use ytgrab_dl::dl::{self, DownloadOptions, MediaInfo, ProgressUpdate};

/// Receives progress hook calls while a download blocks the calling thread.
pub trait ProgressObserver: Send {
    fn on_progress(&mut self, update: &ProgressUpdate);
}

/// The two collaborator operations the downloader relies on.
pub trait Fetcher {
    /// Metadata-only extraction for `url`.
    fn extract_info(&mut self, url: &str) -> Result<MediaInfo>;

    /// Download `url`, reporting progress to `observer` until it returns.
    fn download(
        &mut self,
        url: &str,
        opts: DownloadOptions,
        observer: Box<dyn ProgressObserver>,
    ) -> Result<()>;
}

/// [`Fetcher`] backed by the embedded yt-dlp library.
#[derive(Debug, Default)]
pub struct YtDlp;

impl Fetcher for YtDlp {
    fn extract_info(&mut self, url: &str) -> Result<MediaInfo> {
        dl::extract_info(url, DownloadOptions::metadata())
    }

    fn download(
        &mut self,
        url: &str,
        opts: DownloadOptions,
        mut observer: Box<dyn ProgressObserver>,
    ) -> Result<()> {
        dl::download(url, opts, move |update| observer.on_progress(&update))
    }
}

/// Single progress bar showing the completed percentage.
///
/// Only `downloading` updates move the bar; the video and audio streams reuse it.
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new(bar: ProgressBar) -> Self {
        bar.set_style(bar_style());
        Self { bar }
    }

    /// Bar drawn on standard output.
    pub fn stdout() -> Self {
        Self::new(ProgressBar::with_draw_target(
            Some(PERCENT_SCALE),
            ProgressDrawTarget::stdout(),
        ))
    }
}

/// Length used when only yt-dlp's percentage string is available (tenths of a percent).
const PERCENT_SCALE: u64 = 1000;

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template("[{bar:40.cyan/blue}] {percent:>3}%")
        .map(|style| style.progress_chars("#>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}

impl ProgressObserver for BarProgress {
    fn on_progress(&mut self, update: &ProgressUpdate) {
        if !update.is_downloading() {
            return;
        }

        match (update.downloaded_bytes, update.total()) {
            (Some(done), Some(total)) => {
                self.bar.set_length(total as u64);
                self.bar.set_position(done.min(total) as u64);
            }
            _ => {
                if let Some(percent) = update.percent_str.as_deref().and_then(reported_percent) {
                    let tenths = (percent.clamp(0.0, 100.0) * 10.0).round() as u64;
                    self.bar.set_length(PERCENT_SCALE);
                    self.bar.set_position(tenths);
                }
            }
        }
    }
}

/// Parse yt-dlp's `" 45.2%"`, which is colored when its output is a terminal.
fn reported_percent(text: &str) -> Option<f64> {
    console::strip_ansi_codes(text)
        .trim()
        .trim_end_matches('%')
        .trim()
        .parse()
        .ok()
}
