//! Type-safe Rust bindings to [yt-dlp](https://github.com/yt-dlp/yt-dlp) Python library.
//!
//! ## Modules
//!
//! - [`dl`] - Core yt-dlp API wrappers (metadata extraction, download, progress hook)
//! - [`env`] - Process environment bootstrap (bundled FFmpeg, yt-dlp provisioning)
//! - [`error`] - Error classification for yt-dlp failures
//!
//! ## Quick Start
//!
//! **Metadata only**:
//! ```no_run
//! use ytgrab_dl::dl::{DownloadOptions, extract_info};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let info = extract_info("https://youtube.com/watch?v=example", DownloadOptions::metadata())?;
//! for format in &info.formats {
//!     println!("{:?} {:?}", format.format_id, format.height);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! **Video download with progress**:
//! ```no_run
//! use ytgrab_dl::dl::{DownloadOptions, OutputTemplates, download};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let opts = DownloadOptions {
//!     format: Some("bestvideo[height<=720]+bestaudio/best[height<=720]".to_string()),
//!     outtmpl: Some(OutputTemplates::simple("%(title)s.%(ext)s".to_string())),
//!     merge_output_format: Some("mp4".to_string()),
//!     ..Default::default()
//! };
//!
//! download("https://youtube.com/watch?v=example", opts, |update| {
//!     println!("{}", update.status);
//! })?;
//! # Ok(())
//! # }
//! ```

pub mod dl;
pub mod env;
pub mod error;

pub use error::{FetchError, Result};
