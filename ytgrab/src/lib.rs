//! ytgrab: interactive video downloader on top of yt-dlp.
//!
//! The user is prompted for a URL, a resolution and an output folder; yt-dlp does the
//! fetching and FFmpeg the merging into an mp4 named `<title>-<resolution>.mp4`.
//!
//! # Architecture
//!
//! - [`session::Session`]: prompt loop, one download per iteration
//! - [`download`]: a single attempt from URL prompt to finished file
//! - [`resolution`]: tier table, input parsing, discovery from format metadata
//! - [`fetch::Fetcher`]: seam over yt-dlp metadata extraction and download
//! - [`bootstrap`]: startup check that yt-dlp is importable

pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod console;
pub mod download;
pub mod fetch;
pub mod resolution;
pub mod session;
