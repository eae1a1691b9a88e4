//! Error types for yt-dlp calls and dependency provisioning.

use pyo3::exceptions::PyKeyboardInterrupt;
use pyo3::prelude::*;
use std::process::ExitStatus;
use thiserror::Error;

/// Failure while talking to yt-dlp or provisioning it.
#[derive(Debug, Error)]
pub enum FetchError {
    /// yt-dlp raised `yt_dlp.utils.DownloadError` (format unavailable, network, FFmpeg missing)
    #[error("{message}")]
    Download { message: String },

    /// yt-dlp reported a non-zero return code without raising
    #[error("yt-dlp finished with return code {0}")]
    ReturnCode(i64),

    /// Python `KeyboardInterrupt` surfaced from the interpreter
    #[error("interrupted")]
    Interrupted,

    /// Package installer could not be spawned
    #[error("failed to run package installer: {0}")]
    Spawn(#[from] std::io::Error),

    /// Package installer exited unsuccessfully
    #[error("package installer failed with {0}")]
    Install(ExitStatus),

    /// Any other Python exception
    #[error(transparent)]
    Python(#[from] PyErr),
}

impl FetchError {
    /// Map a Python exception to a typed failure.
    ///
    /// `DownloadError` is looked up lazily so that classification still works
    /// (falling back to [`FetchError::Python`]) when yt-dlp failed to import.
    pub fn classify(py: Python<'_>, err: PyErr) -> Self {
        if err.is_instance_of::<PyKeyboardInterrupt>(py) {
            return Self::Interrupted;
        }

        let download_error = py
            .import("yt_dlp.utils")
            .and_then(|utils| utils.getattr("DownloadError"));

        match download_error {
            Ok(ty) if err.is_instance(py, &ty) => Self::Download {
                message: err.value(py).to_string(),
            },
            _ => Self::Python(err),
        }
    }

    /// Whether this failure came from yt-dlp's own download machinery.
    pub fn is_download(&self) -> bool {
        matches!(self, Self::Download { .. } | Self::ReturnCode(_))
    }
}

/// Result type alias for ytgrab-dl operations.
pub type Result<T> = std::result::Result<T, FetchError>;

#[cfg(test)]
mod tests {
    use super::*;
    use pyo3::exceptions::{PyKeyboardInterrupt, PyValueError};

    #[test]
    fn keyboard_interrupt_is_interrupted() {
        Python::attach(|py| {
            let err = PyKeyboardInterrupt::new_err("stop");
            assert!(matches!(
                FetchError::classify(py, err),
                FetchError::Interrupted
            ));
        });
    }

    #[test]
    fn unrelated_exception_stays_python() {
        Python::attach(|py| {
            let err = PyValueError::new_err("bad value");
            let classified = FetchError::classify(py, err);
            assert!(matches!(classified, FetchError::Python(_)));
            assert!(!classified.is_download());
        });
    }

    #[test]
    fn return_code_counts_as_download_failure() {
        let err = FetchError::ReturnCode(1);
        assert!(err.is_download());
        assert_eq!(err.to_string(), "yt-dlp finished with return code 1");
    }
}
