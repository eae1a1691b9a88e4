//! Download executor - one prompt-driven download attempt.

use crate::console::{LineInput, PromptError};
use crate::fetch::Fetcher;
use crate::resolution::{
    ResolutionChoice, discover_resolutions, parse_resolution, resolution_prompt,
};
use crate::session::Session;
use std::io::{self, Write};
use std::path::PathBuf;
use thiserror::Error;
use ytgrab_dl::FetchError;
use ytgrab_dl::dl::{DownloadOptions, OutputPaths, OutputTemplates, PostProcessor};

const BANNER: &[&str] = &[
    "--- YouTube Video Downloader ---",
    "This tool downloads a video with the best audio included.",
    "FFmpeg is bundled with this application for merging streams.",
];

const URL_PROMPT: &str = "Enter the video URL: ";

const FOLDER_PROMPT: &str = "Enter the full path for the output folder (or press Enter to save to Desktop\\yt downloads): ";

/// Reason an attempt stopped before reaching yt-dlp.
#[derive(Debug, Error)]
pub enum AttemptError {
    #[error("Video URL cannot be empty.")]
    EmptyUrl,

    #[error("Invalid input. Please enter a valid resolution.")]
    InvalidResolution { input: String },

    #[error("Error: Could not create directory. {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// How a single attempt ended.
#[derive(Debug)]
pub enum Outcome {
    /// yt-dlp finished; file written below `output_dir`
    Completed(DownloadRequest),
    /// Input rejected, nothing downloaded
    Aborted(AttemptError),
    /// yt-dlp or the environment failed; reported to the user
    Failed(FetchError),
}

/// Everything needed for one download, built from user input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadRequest {
    pub url: String,
    pub resolution: ResolutionChoice,
    /// Absolute and already created
    pub output_dir: PathBuf,
}

impl DownloadRequest {
    /// Best video up to the ceiling plus best non-Opus audio, else best combined stream.
    pub fn format_expression(&self) -> String {
        let h = self.resolution.ceiling;
        format!("bestvideo[height<={h}]+bestaudio[acodec!=opus]/best[height<={h}]")
    }

    /// File name template relative to `output_dir`; yt-dlp fills title and extension.
    pub fn output_template(&self) -> String {
        format!("%(title)s-{}.%(ext)s", self.resolution.label)
    }

    /// yt-dlp parameters merging and converting into `container` with metadata embedded.
    pub fn options(&self, container: &str) -> DownloadOptions {
        DownloadOptions {
            format: Some(self.format_expression()),
            paths: Some(OutputPaths::home(&self.output_dir)),
            outtmpl: Some(OutputTemplates::simple(self.output_template())),
            merge_output_format: Some(container.to_string()),
            postprocessors: Some(vec![
                PostProcessor::video_convertor(container),
                PostProcessor::metadata(),
            ]),
            quiet: Some(true),
            no_warnings: Some(true),
            noprogress: Some(true),
        }
    }
}

impl<F: Fetcher, R: LineInput, W: Write, E: Write> Session<F, R, W, E> {
    /// Prompt for URL, resolution and folder, then download.
    ///
    /// Only [`PromptError`]s escape: validation and download failures are reported here
    /// and returned as an [`Outcome`] so the session can continue.
    pub fn run_one_download(&mut self) -> Result<Outcome, PromptError> {
        let rule = "-".repeat(30);

        for line in BANNER {
            self.console.say(line)?;
        }
        self.console.say(&rule)?;

        let url = self.console.prompt(URL_PROMPT)?.trim().to_string();
        if url.is_empty() {
            return self.abort(AttemptError::EmptyUrl);
        }

        self.console.say("Fetching available resolutions...")?;
        let discovery = discover_resolutions(&mut self.fetcher, &url);
        if let Some(warning) = &discovery.warning {
            self.console.say(&format!(
                "Warning: Could not fetch available resolutions. Error: {warning}"
            ))?;
        }

        let input = self.console.prompt(&resolution_prompt(&discovery.tiers))?;
        let Some(resolution) = parse_resolution(&input) else {
            return self.abort(AttemptError::InvalidResolution { input });
        };

        let folder = self.console.prompt(FOLDER_PROMPT)?;
        let output_dir = match self.prepare_output_dir(folder.trim())? {
            Ok(dir) => dir,
            Err(e) => return self.abort(e),
        };

        self.console.say(&rule)?;
        self.console.say(&format!("Starting download for: {url}"))?;
        self.console
            .say(&format!("Requested resolution: {}", resolution.label))?;
        self.console
            .say(&format!("Saving files to: {}", output_dir.display()))?;
        self.console.say(&rule)?;

        let request = DownloadRequest {
            url,
            resolution,
            output_dir,
        };

        self.execute(request)
    }

    /// Resolve the folder answer and create it if missing.
    ///
    /// The outer error is terminal I/O; the inner one aborts the attempt.
    fn prepare_output_dir(
        &mut self,
        folder: &str,
    ) -> Result<Result<PathBuf, AttemptError>, PromptError> {
        let dir = if folder.is_empty() {
            let dir = self.config.default_output_dir.clone();
            self.console.say(&format!(
                "No folder specified. Using default path: {}",
                dir.display()
            ))?;
            dir
        } else {
            PathBuf::from(folder)
        };

        if !dir.is_dir() {
            self.console.say(&format!(
                "Directory not found. Creating folder: {}",
                dir.display()
            ))?;

            if let Err(source) = std::fs::create_dir_all(&dir) {
                return Ok(Err(AttemptError::CreateDir { path: dir, source }));
            }
        }

        Ok(Ok(std::path::absolute(&dir).unwrap_or(dir)))
    }

    fn execute(&mut self, request: DownloadRequest) -> Result<Outcome, PromptError> {
        tracing::info!(
            url = request.url,
            ceiling = request.resolution.ceiling,
            label = request.resolution.label,
            dir = %request.output_dir.display(),
            "starting download"
        );

        let observer = (self.observer)();
        let opts = request.options(&self.config.container);

        match self.fetcher.download(&request.url, opts, observer) {
            Ok(()) => {
                tracing::info!(dir = %request.output_dir.display(), "download complete");
                self.console.say("\n--- Download Complete! ---")?;
                self.console.say(&format!(
                    "The video has been saved in: {}",
                    request.output_dir.display()
                ))?;
                self.console.pause("\nPress Enter to continue...");
                Ok(Outcome::Completed(request))
            }
            Err(FetchError::Interrupted) => Err(PromptError::Interrupted),
            Err(e) if e.is_download() => {
                tracing::error!(error = %e, "download failed");
                self.console.error("\nError: Could not download the video.")?;
                self.console.error(&format!("Details: {e}"))?;
                self.console
                    .error("Please check the URL, resolution, and your network connection.")?;
                self.console.error(
                    "If the error mentions FFmpeg, please ensure it is installed and accessible.",
                )?;
                self.console.pause("\nPress Enter to continue...");
                Ok(Outcome::Failed(e))
            }
            Err(e) => {
                tracing::error!(error = ?e, "unexpected download error");
                self.console
                    .error(&format!("\nAn unexpected error occurred: {e}"))?;
                self.console.pause("\nPress Enter to continue...");
                Ok(Outcome::Failed(e))
            }
        }
    }

    fn abort(&mut self, reason: AttemptError) -> Result<Outcome, PromptError> {
        tracing::info!(%reason, "download attempt aborted");
        self.console.error(&reason.to_string())?;
        Ok(Outcome::Aborted(reason))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::console::Console;
    use crate::fetch::fake::FakeFetcher;
    use crate::fetch::{BarProgress, ProgressObserver};
    use indicatif::ProgressBar;
    use std::io::Cursor;
    use std::path::Path;
    use ytgrab_dl::dl::ProgressUpdate;

    type TestSession = Session<FakeFetcher, Cursor<Vec<u8>>, Vec<u8>, Vec<u8>>;

    fn session(input: &str, fetcher: FakeFetcher, home: &Path) -> TestSession {
        let input = Cursor::new(input.as_bytes().to_vec());
        let console = Console::new(input, Vec::new(), Vec::new());

        Session::new(SessionConfig::with_home(home), fetcher, console)
            .with_observer(hidden_progress)
    }

    fn hidden_progress() -> Box<dyn ProgressObserver> {
        Box::new(BarProgress::new(ProgressBar::hidden()))
    }

    fn stdout(session: &TestSession) -> String {
        String::from_utf8_lossy(session.console().output()).into_owned()
    }

    fn stderr(session: &TestSession) -> String {
        String::from_utf8_lossy(session.console().errors()).into_owned()
    }

    fn request(ceiling: u32, label: &str) -> DownloadRequest {
        DownloadRequest {
            url: "https://example.com/v".to_string(),
            resolution: ResolutionChoice {
                ceiling,
                label: label.to_string(),
            },
            output_dir: PathBuf::from("/downloads"),
        }
    }

    #[test]
    fn format_expression_caps_height() {
        assert_eq!(
            request(720, "720").format_expression(),
            "bestvideo[height<=720]+bestaudio[acodec!=opus]/best[height<=720]"
        );
    }

    #[test]
    fn output_template_embeds_label() {
        assert_eq!(
            request(2200, "4k").output_template(),
            "%(title)s-4k.%(ext)s"
        );
    }

    #[test]
    fn options_merge_and_convert_to_container() {
        let opts = request(480, "480").options("mp4");

        assert_eq!(opts.merge_output_format.as_deref(), Some("mp4"));

        let postprocessors = opts.postprocessors.unwrap();
        assert!(matches!(
            postprocessors.as_slice(),
            [
                PostProcessor { key: convert, preferedformat: Some(target), .. },
                PostProcessor { key: metadata, add_metadata: Some(true), .. },
            ] if convert == "FFmpegVideoConvertor"
                && target == "mp4"
                && metadata == "FFmpegMetadata"
        ));

        let home = opts.paths.and_then(|p| p.0).unwrap();
        assert_eq!(home.get("home").map(String::as_str), Some("/downloads"));
    }

    #[test]
    fn empty_url_skips_discovery_and_download() {
        let home = tempfile::tempdir().unwrap();
        let mut session = session("\n", FakeFetcher::with_heights(&[720]), home.path());

        let outcome = session.run_one_download().unwrap();

        assert!(matches!(outcome, Outcome::Aborted(AttemptError::EmptyUrl)));
        assert!(session.fetcher().extracted.is_empty());
        assert!(session.fetcher().downloads.is_empty());
        assert!(stderr(&session).contains("Video URL cannot be empty."));
    }

    #[test]
    fn default_folder_end_to_end() {
        let home = tempfile::tempdir().unwrap();
        let input = "https://example.com/v\n720\n\n\n";
        let fetcher = FakeFetcher::with_heights(&[1080, 720, 480]);
        let mut session = session(input, fetcher, home.path());

        let outcome = session.run_one_download().unwrap();

        let expected_dir = home.path().join("Desktop").join("yt downloads");
        match &outcome {
            Outcome::Completed(DownloadRequest {
                url,
                resolution,
                output_dir,
            }) => {
                assert_eq!(url, "https://example.com/v");
                assert_eq!(resolution.ceiling, 720);
                assert_eq!(resolution.label, "720");
                assert_eq!(output_dir, &expected_dir);
            }
            _ => panic!("unexpected outcome: {outcome:?}"),
        }
        assert!(expected_dir.is_dir());

        let (url, opts) = &session.fetcher().downloads[0];
        assert_eq!(url, "https://example.com/v");
        assert_eq!(
            opts.format.as_deref(),
            Some("bestvideo[height<=720]+bestaudio[acodec!=opus]/best[height<=720]")
        );
        let template = opts.outtmpl.as_ref().and_then(|t| t.0.as_ref()).unwrap();
        assert_eq!(
            template.get("default").map(String::as_str),
            Some("%(title)s-720.%(ext)s")
        );

        let out = stdout(&session);
        assert!(out.contains("(e.g., 1080, 720, 480)"));
        assert!(out.contains("--- Download Complete! ---"));
    }

    #[test]
    fn existing_folder_is_reused() {
        let dir = tempfile::tempdir().unwrap();
        let input = format!(
            "https://example.com/v\n480\n{0}\n\nhttps://example.com/v\n480\n{0}\n\n",
            dir.path().display()
        );
        let mut session = session(&input, FakeFetcher::with_heights(&[480]), dir.path());

        for _ in 0..2 {
            let outcome = session.run_one_download().unwrap();
            assert!(matches!(outcome, Outcome::Completed(_)), "{outcome:?}");
        }

        assert!(!stdout(&session).contains("Directory not found"));
    }

    #[test]
    fn missing_folder_is_created_with_parents() {
        let root = tempfile::tempdir().unwrap();
        let target = root.path().join("a").join("b");
        let input = format!("https://example.com/v\n360\n{}\n\n", target.display());
        let mut session = session(&input, FakeFetcher::with_heights(&[360]), root.path());

        let outcome = session.run_one_download().unwrap();

        assert!(matches!(outcome, Outcome::Completed(_)));
        assert!(target.is_dir());
        assert!(stdout(&session).contains("Directory not found. Creating folder:"));
    }

    #[test]
    fn folder_creation_failure_aborts() {
        let root = tempfile::tempdir().unwrap();
        let file = root.path().join("not-a-dir");
        std::fs::write(&file, b"").unwrap();
        let input = format!("https://example.com/v\n720\n{}\n", file.join("sub").display());
        let mut session = session(&input, FakeFetcher::with_heights(&[720]), root.path());

        let outcome = session.run_one_download().unwrap();

        assert!(matches!(
            outcome,
            Outcome::Aborted(AttemptError::CreateDir { .. })
        ));
        assert!(session.fetcher().downloads.is_empty());
        assert!(stderr(&session).contains("Error: Could not create directory."));
    }

    #[test]
    fn invalid_resolution_aborts() {
        let home = tempfile::tempdir().unwrap();
        let mut session = session(
            "https://example.com/v\nabc\n",
            FakeFetcher::with_heights(&[720]),
            home.path(),
        );

        let outcome = session.run_one_download().unwrap();

        assert!(matches!(
            outcome,
            Outcome::Aborted(AttemptError::InvalidResolution { ref input }) if input == "abc"
        ));
        assert!(session.fetcher().downloads.is_empty());
        assert!(stderr(&session).contains("Invalid input. Please enter a valid resolution."));
    }

    #[test]
    fn discovery_failure_warns_and_offers_fallback() {
        let home = tempfile::tempdir().unwrap();
        let mut session = session(
            "https://example.com/bad\n1080\n\n\n",
            FakeFetcher::default(),
            home.path(),
        );

        let outcome = session.run_one_download().unwrap();

        assert!(matches!(outcome, Outcome::Completed(_)));
        let out = stdout(&session);
        assert!(out.contains("Warning: Could not fetch available resolutions."));
        assert!(out.contains("(e.g., 1080, 720, 480)"));
    }

    #[test]
    fn raw_height_uses_derived_label() {
        let home = tempfile::tempdir().unwrap();
        let mut session = session(
            "https://example.com/v\n2200\n\n\n",
            FakeFetcher::with_heights(&[2160]),
            home.path(),
        );

        session.run_one_download().unwrap();

        let (_, opts) = &session.fetcher().downloads[0];
        let template = opts.outtmpl.as_ref().and_then(|t| t.0.as_ref()).unwrap();
        assert_eq!(
            template.get("default").map(String::as_str),
            Some("%(title)s-4k.%(ext)s")
        );
        assert!(stdout(&session).contains("Requested resolution: 4k"));
    }

    #[test]
    fn download_error_reported_with_hints() {
        let home = tempfile::tempdir().unwrap();
        let fetcher = FakeFetcher::with_heights(&[720]).failing_download(FetchError::Download {
            message: "ERROR: ffmpeg not found".to_string(),
        });
        let mut session = session("https://example.com/v\n720\n\n\n", fetcher, home.path());

        let outcome = session.run_one_download().unwrap();

        assert!(matches!(outcome, Outcome::Failed(FetchError::Download { .. })));
        let err = stderr(&session);
        assert!(err.contains("Error: Could not download the video."));
        assert!(err.contains("Details: ERROR: ffmpeg not found"));
        assert!(err.contains("check the URL, resolution, and your network connection"));
        assert!(err.contains("If the error mentions FFmpeg"));
    }

    #[test]
    fn unexpected_error_reported_generically() {
        let home = tempfile::tempdir().unwrap();
        let fetcher = FakeFetcher::with_heights(&[720])
            .failing_download(FetchError::Spawn(io::Error::other("boom")));
        let mut session = session("https://example.com/v\n720\n\n\n", fetcher, home.path());

        let outcome = session.run_one_download().unwrap();

        assert!(matches!(outcome, Outcome::Failed(FetchError::Spawn(_))));
        assert!(stderr(&session).contains("An unexpected error occurred"));
    }

    #[test]
    fn progress_reaches_observer() {
        let home = tempfile::tempdir().unwrap();
        let mut fetcher = FakeFetcher::with_heights(&[720]);
        fetcher.progress = vec![
            ProgressUpdate {
                status: "downloading".to_string(),
                downloaded_bytes: Some(1.0),
                total_bytes: Some(2.0),
                ..Default::default()
            },
            ProgressUpdate {
                status: "finished".to_string(),
                ..Default::default()
            },
        ];

        let bar = ProgressBar::hidden();
        let shared = bar.clone();
        let input = Cursor::new(b"https://example.com/v\n720\n\n\n".to_vec());
        let console = Console::new(input, Vec::new(), Vec::new());
        let mut session = Session::new(SessionConfig::with_home(home.path()), fetcher, console)
            .with_observer(move || -> Box<dyn ProgressObserver> {
                Box::new(BarProgress::new(shared.clone()))
            });

        session.run_one_download().unwrap();

        assert_eq!((bar.position(), bar.length()), (1, Some(2)));
    }
}
