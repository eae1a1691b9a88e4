//! Process environment bootstrap.
//!
//! - Bundled FFmpeg: `ffmpeg/bin` next to the executable (packaged) or next to the
//!   sources (development checkout) is put first on `PATH`.
//! - yt-dlp provisioning: import probe in the embedded interpreter, `pip install` fallback.

use crate::error::{FetchError, Result};
use pyo3::prelude::*;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Package name passed to the installer.
pub const PACKAGE: &str = "yt-dlp";

/// Module name probed in the interpreter.
pub const MODULE: &str = "yt_dlp";

/// Search path variable extended with the bundled tool directory.
pub const SEARCH_PATH_VAR: &str = "PATH";

/// Location of the media tools relative to a bundle root.
pub fn tool_dir(root: &Path) -> PathBuf {
    root.join("ffmpeg").join("bin")
}

/// First existing tool directory among the bundle roots, in priority order.
pub fn find_tool_dir<'a>(roots: impl IntoIterator<Item = &'a Path>) -> Option<PathBuf> {
    roots.into_iter().map(tool_dir).find(|dir| dir.is_dir())
}

/// Bundle roots: the executable's directory, then `source_root` when given.
pub fn bundle_roots(source_root: Option<&Path>) -> Vec<PathBuf> {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));

    exe_dir
        .into_iter()
        .chain(source_root.map(Path::to_path_buf))
        .collect()
}

/// Build a search path value with `dir` first and `current` entries after it.
pub fn prepend_search_path(
    dir: &Path,
    current: Option<&OsStr>,
) -> std::result::Result<OsString, std::env::JoinPathsError> {
    let existing = current
        .map(|value| std::env::split_paths(value).collect::<Vec<_>>())
        .unwrap_or_default();

    std::env::join_paths(std::iter::once(dir.to_path_buf()).chain(existing))
}

/// Outcome of putting the bundled tools on the search path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SearchPath {
    /// Tool directory found and prepended
    Prepended(PathBuf),
    /// No bundled tools; the system search path is used as-is
    Unchanged,
}

/// Prepend the first existing bundled tool directory to `PATH`.
///
/// # Safety
///
/// Mutates the process environment. Must run before any other thread is
/// spawned (logging workers, signal handlers, the Python interpreter).
pub unsafe fn install_search_path(source_root: Option<&Path>) -> SearchPath {
    let roots = bundle_roots(source_root);

    let Some(dir) = find_tool_dir(roots.iter().map(PathBuf::as_path)) else {
        return SearchPath::Unchanged;
    };

    let current = std::env::var_os(SEARCH_PATH_VAR);

    match prepend_search_path(&dir, current.as_deref()) {
        Ok(value) => {
            // SAFETY: upheld by the caller, no other thread reads the environment yet.
            unsafe { std::env::set_var(SEARCH_PATH_VAR, value) };
            SearchPath::Prepended(dir)
        }
        Err(_) => SearchPath::Unchanged,
    }
}

/// Check that yt-dlp can be imported by the embedded interpreter.
pub fn probe() -> Result<()> {
    Python::attach(|py| {
        py.import(MODULE)
            .map(|_| ())
            .map_err(|e| FetchError::classify(py, e))
    })
}

/// Python executable used for `-m pip`.
///
/// Prefers the interpreter's `sys.executable`; an embedded interpreter may report the
/// host binary (or nothing), in which case the platform default name is used.
pub fn python_executable() -> PathBuf {
    let reported = Python::attach(|py| -> PyResult<String> {
        py.import("sys")?.getattr("executable")?.extract()
    })
    .ok()
    .filter(|exe| !exe.is_empty())
    .map(PathBuf::from);

    let host = std::env::current_exe().ok();

    match reported {
        Some(exe) if Some(&exe) != host.as_ref() => exe,
        _ => PathBuf::from(default_python()),
    }
}

fn default_python() -> &'static str {
    if cfg!(target_os = "windows") {
        "python"
    } else {
        "python3"
    }
}

/// Run `<python> -m pip install yt-dlp` and refresh the interpreter's import state.
pub fn install_package() -> Result<()> {
    let python = python_executable();

    tracing::info!(python = %python.display(), package = PACKAGE, "running package installer");

    let status = Command::new(&python)
        .args(["-m", "pip", "install", PACKAGE])
        .status()?;

    if !status.success() {
        return Err(FetchError::Install(status));
    }

    refresh_import_state()
}

/// Make packages installed after interpreter start importable.
fn refresh_import_state() -> Result<()> {
    Python::attach(|py| -> PyResult<()> {
        let site = py.import("site")?;
        let user_site: String = site.call_method0("getusersitepackages")?.extract()?;
        if Path::new(&user_site).is_dir() {
            site.call_method1("addsitedir", (user_site,))?;
        }
        py.import("importlib")?.call_method0("invalidate_caches")?;
        Ok(())
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepends_before_existing_entries() {
        let current = std::env::join_paths(["/usr/bin", "/bin"]).unwrap();
        let joined = prepend_search_path(Path::new("/opt/app/ffmpeg/bin"), Some(&current)).unwrap();

        let entries: Vec<_> = std::env::split_paths(&joined).collect();
        assert_eq!(
            entries,
            vec![
                PathBuf::from("/opt/app/ffmpeg/bin"),
                PathBuf::from("/usr/bin"),
                PathBuf::from("/bin"),
            ]
        );
    }

    #[test]
    fn prepends_to_missing_path() {
        let joined = prepend_search_path(Path::new("/opt/app/ffmpeg/bin"), None).unwrap();
        assert_eq!(joined, OsString::from("/opt/app/ffmpeg/bin"));
    }

    #[test]
    fn finds_first_existing_tool_dir() {
        let missing = tempfile::tempdir().unwrap();
        let bundled = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tool_dir(bundled.path())).unwrap();

        let found = find_tool_dir([missing.path(), bundled.path()]);

        assert_eq!(found, Some(tool_dir(bundled.path())));
    }

    #[test]
    fn no_tool_dir_when_absent() {
        let missing = tempfile::tempdir().unwrap();
        assert_eq!(find_tool_dir([missing.path()]), None);
    }

    #[test]
    fn bundle_roots_put_executable_first() {
        let roots = bundle_roots(Some(Path::new("/src/ytgrab")));
        assert_eq!(roots.last().map(PathBuf::as_path), Some(Path::new("/src/ytgrab")));
        assert_eq!(roots.len(), 2);
    }
}
