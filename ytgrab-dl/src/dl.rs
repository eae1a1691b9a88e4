//! yt-dlp Python API wrappers.
//!
//! Type-safe bindings to [yt-dlp](https://github.com/yt-dlp/yt-dlp) `YoutubeDL` parameters,
//! metadata extraction and downloads with a progress hook.
//!
//! ```no_run
//! use ytgrab_dl::dl::{DownloadOptions, extract_info};
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let info = extract_info("https://youtube.com/watch?v=example", DownloadOptions::metadata())?;
//! println!("Found: {}", info.title);
//! # Ok(())
//! # }
//! ```

use crate::error::{FetchError, Result};
use pyo3::ffi::c_str;
use pyo3::prelude::*;
use pyo3::types::{PyCFunction, PyDict, PyTuple};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

/// Filename templates using `%(field)s` syntax. Key `default` required.
#[derive(Clone, Debug, Default, IntoPyObject)]
pub struct OutputTemplates(pub Option<HashMap<String, String>>);

impl OutputTemplates {
    /// Create with a single default template.
    pub fn simple(default: String) -> Self {
        Self(Some(HashMap::from([("default".to_string(), default)])))
    }
}

/// Download directories keyed by yt-dlp path type (`home`, `temp`, ...).
#[derive(Clone, Debug, Default, IntoPyObject)]
pub struct OutputPaths(pub Option<HashMap<String, String>>);

impl OutputPaths {
    /// Create with only the home directory set.
    pub fn home(home: &Path) -> Self {
        Self::default().with_home(home)
    }

    pub fn with_home(self, home: &Path) -> Self {
        self.with_key("home".to_string(), home)
    }

    fn with_key(self, key: String, value: &Path) -> Self {
        let mut inner = self.0.unwrap_or_default();
        inner.insert(key, value.to_string_lossy().to_string());
        Self(Some(inner))
    }
}

/// Post-download operation: `key` plus the keyword arguments of that post-processor.
///
/// `None` fields are dropped before reaching yt-dlp, so one struct covers the
/// convertor and metadata post-processors.
#[derive(Clone, Debug, Default, IntoPyObject)]
pub struct PostProcessor {
    pub key: String,
    /// Spelling matches yt-dlp's `FFmpegVideoConvertorPP` argument.
    pub preferedformat: Option<String>,
    pub add_metadata: Option<bool>,
}

impl PostProcessor {
    /// Convert the final file to `container` (e.g. `"mp4"`).
    pub fn video_convertor(container: &str) -> Self {
        Self {
            key: "FFmpegVideoConvertor".to_string(),
            preferedformat: Some(container.to_string()),
            ..Default::default()
        }
    }

    /// Embed title, uploader and similar tags into the output file.
    pub fn metadata() -> Self {
        Self {
            key: "FFmpegMetadata".to_string(),
            add_metadata: Some(true),
            ..Default::default()
        }
    }
}

/// yt-dlp configuration passed to `YoutubeDL(params)`.
#[derive(Clone, Debug, Default, IntoPyObject)]
pub struct DownloadOptions {
    pub format: Option<String>,
    pub paths: Option<OutputPaths>,
    pub outtmpl: Option<OutputTemplates>,
    pub merge_output_format: Option<String>,
    pub postprocessors: Option<Vec<PostProcessor>>,
    pub quiet: Option<bool>,
    pub no_warnings: Option<bool>,
    pub noprogress: Option<bool>,
}

impl DownloadOptions {
    /// Quiet options for metadata-only extraction.
    pub fn metadata() -> Self {
        Self {
            quiet: Some(true),
            no_warnings: Some(true),
            ..Default::default()
        }
    }
}

/// One entry of the `formats` list in the yt-dlp info dict.
#[derive(Clone, Debug, Default, PartialEq, FromPyObject)]
#[pyo3(from_item_all)]
pub struct FormatRecord {
    pub format_id: Option<String>,
    /// Container extension (e.g. `"webm"`)
    pub ext: Option<String>,
    /// Frame height in pixels; absent for audio-only formats
    pub height: Option<u32>,
    /// Video codec, `"none"` for audio-only formats
    pub vcodec: Option<String>,
    /// Audio codec, `"none"` for video-only formats
    pub acodec: Option<String>,
}

impl FormatRecord {
    /// Height of the video stream, if this format carries one.
    pub fn video_height(&self) -> Option<u32> {
        match self.vcodec.as_deref() {
            Some("none") => None,
            _ => self.height,
        }
    }
}

/// Essential metadata from yt-dlp info dict.
///
/// Extracted via `FromPyObject` from the sanitized info dict returned by `extract_info`.
#[derive(Clone, Debug, FromPyObject)]
#[pyo3(from_item_all)]
pub struct MediaInfo {
    /// Video identifier
    pub id: String,
    /// Video title
    pub title: String,
    /// URL to the video webpage
    pub webpage_url: Option<String>,
    /// Every stream format yt-dlp can select from
    pub formats: Vec<FormatRecord>,
}

/// Progress hook payload, reduced to the fields ytgrab displays.
#[derive(Clone, Debug, Default, FromPyObject)]
#[pyo3(from_item_all)]
pub struct ProgressUpdate {
    /// `"downloading"`, `"finished"` or `"error"`
    pub status: String,
    pub downloaded_bytes: Option<f64>,
    pub total_bytes: Option<f64>,
    pub total_bytes_estimate: Option<f64>,
    /// yt-dlp's preformatted percentage, may contain ANSI color codes
    pub percent_str: Option<String>,
}

impl ProgressUpdate {
    pub fn is_downloading(&self) -> bool {
        self.status == "downloading"
    }

    /// Expected size in bytes: exact when known, else yt-dlp's estimate.
    pub fn total(&self) -> Option<f64> {
        self.total_bytes
            .or(self.total_bytes_estimate)
            .filter(|total| *total > 0.0)
    }
}

/// Extract metadata for a single URL without downloading.
///
/// Uses `extract_info(url, download=False)`.
pub fn extract_info(url: &str, opts: DownloadOptions) -> Result<MediaInfo> {
    Python::attach(|py| {
        let run = move || -> PyResult<MediaInfo> {
            let module =
                PyModule::from_code(py, c_str!(include_str!("./dl.py")), c"dl.py", c"dl")?;

            let py_params = opts.into_pyobject(py)?;

            let info = module.getattr("extract_info")?.call1((url, py_params))?;

            info.extract()
        };

        run().map_err(|e| FetchError::classify(py, e))
    })
}

/// Download a single URL, forwarding progress hook calls to `hook`.
///
/// Blocks until yt-dlp (and its FFmpeg post-processing) finishes. `hook` runs on the
/// calling thread while the GIL is held.
pub fn download<F>(url: &str, opts: DownloadOptions, hook: F) -> Result<()>
where
    F: FnMut(ProgressUpdate) + Send + 'static,
{
    let hook = Mutex::new(hook);

    Python::attach(|py| {
        let run = move || -> PyResult<i64> {
            let module =
                PyModule::from_code(py, c_str!(include_str!("./dl.py")), c"dl.py", c"dl")?;

            let py_params = opts.into_pyobject(py)?;

            let callback = PyCFunction::new_closure(
                py,
                None,
                None,
                move |args: &Bound<'_, PyTuple>,
                      _kwargs: Option<&Bound<'_, PyDict>>|
                      -> PyResult<()> {
                    let update = match args.get_item(0)?.extract::<ProgressUpdate>() {
                        Ok(update) => update,
                        Err(e) => {
                            tracing::debug!(error = %e, "skipping malformed progress update");
                            return Ok(());
                        }
                    };

                    if let Ok(mut hook) = hook.lock() {
                        (*hook)(update);
                    }

                    Ok(())
                },
            )?;

            module
                .getattr("download")?
                .call1((url, py_params, callback))?
                .extract()
        };

        match run() {
            Ok(0) => Ok(()),
            Ok(code) => Err(FetchError::ReturnCode(code)),
            Err(e) => Err(FetchError::classify(py, e)),
        }
    })
}
