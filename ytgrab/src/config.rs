//! Process-scoped settings resolved once at startup.
//!
//! Nothing is persisted between runs; the values here only depend on the host
//! (home directory) and fixed defaults.

use crate::cli::Cli;
use eyre::{OptionExt, Result};
use std::path::{Path, PathBuf};

/// Container every download is merged and converted into.
pub const CONTAINER: &str = "mp4";

/// Default output folder below the home directory.
pub fn default_output_dir(home: &Path) -> PathBuf {
    home.join("Desktop").join("yt downloads")
}

/// Resolved session configuration.
///
/// Converted from [`Cli`] via TryFrom.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Used when the output folder prompt is left empty
    pub default_output_dir: PathBuf,
    /// Merge and conversion target (`mp4`)
    pub container: String,
}

impl SessionConfig {
    /// Configuration rooted at `home`.
    pub fn with_home(home: &Path) -> Self {
        Self {
            default_output_dir: default_output_dir(home),
            container: CONTAINER.to_string(),
        }
    }
}

impl TryFrom<Cli> for SessionConfig {
    type Error = eyre::Error;

    fn try_from(_cli: Cli) -> Result<Self> {
        let home = dirs::home_dir().ok_or_eyre("failed to locate home directory")?;
        Ok(Self::with_home(&home))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_dir_is_under_desktop() {
        let config = SessionConfig::with_home(Path::new("/home/user"));

        assert_eq!(
            config.default_output_dir,
            Path::new("/home/user").join("Desktop").join("yt downloads")
        );
        assert_eq!(config.container, "mp4");
    }

    #[test]
    fn resolves_from_cli() {
        let config = SessionConfig::try_from(Cli {}).unwrap();
        let home = dirs::home_dir().expect("failed to get home dir");

        assert!(config.default_output_dir.starts_with(home));
    }
}
