//! Resolution tiers, user input parsing and discovery from yt-dlp metadata.

use crate::fetch::Fetcher;
use std::collections::BTreeSet;
use std::fmt;
use ytgrab_dl::dl::FormatRecord;

/// Fixed resolution bucket, ordered highest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    P2160,
    P1440,
    P1080,
    P720,
    P480,
    P360,
    P240,
}

impl Tier {
    /// Every tier, highest to lowest.
    pub const ALL: [Tier; 7] = [
        Tier::P2160,
        Tier::P1440,
        Tier::P1080,
        Tier::P720,
        Tier::P480,
        Tier::P360,
        Tier::P240,
    ];

    /// Label shown to and typed by the user.
    pub fn label(self) -> &'static str {
        match self {
            Tier::P2160 => "4k",
            Tier::P1440 => "1440",
            Tier::P1080 => "1080",
            Tier::P720 => "720",
            Tier::P480 => "480",
            Tier::P360 => "360",
            Tier::P240 => "240",
        }
    }

    /// Minimum frame height belonging to this tier; also the download ceiling.
    pub fn min_height(self) -> u32 {
        match self {
            Tier::P2160 => 2160,
            Tier::P1440 => 1440,
            Tier::P1080 => 1080,
            Tier::P720 => 720,
            Tier::P480 => 480,
            Tier::P360 => 360,
            Tier::P240 => 240,
        }
    }

    /// Highest tier whose threshold `height` meets; `None` below 240.
    pub fn from_height(height: u32) -> Option<Tier> {
        Self::ALL.into_iter().find(|t| height >= t.min_height())
    }

    /// Case-insensitive label lookup.
    pub fn from_label(label: &str) -> Option<Tier> {
        Self::ALL
            .into_iter()
            .find(|t| t.label().eq_ignore_ascii_case(label))
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Tiers offered when metadata cannot be fetched.
pub const FALLBACK_TIERS: [Tier; 3] = [Tier::P1080, Tier::P720, Tier::P480];

/// Tiers present among the video formats, in [`Tier::ALL`] order.
pub fn tiers_from_formats(formats: &[FormatRecord]) -> Vec<Tier> {
    let found: BTreeSet<Tier> = formats
        .iter()
        .filter_map(FormatRecord::video_height)
        .filter_map(Tier::from_height)
        .collect();

    Tier::ALL
        .into_iter()
        .filter(|t| found.contains(t))
        .collect()
}

/// Result of resolution discovery. Never an error: failures carry a warning.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Discovery {
    pub tiers: Vec<Tier>,
    /// Set when metadata extraction failed and [`FALLBACK_TIERS`] were substituted
    pub warning: Option<String>,
}

/// Query metadata for `url` and list the available tiers, highest first.
pub fn discover_resolutions<F: Fetcher>(fetcher: &mut F, url: &str) -> Discovery {
    match fetcher.extract_info(url) {
        Ok(info) => {
            let tiers = tiers_from_formats(&info.formats);
            tracing::debug!(formats = info.formats.len(), ?tiers, "discovered resolutions");
            Discovery {
                tiers,
                warning: None,
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, url, "resolution discovery failed, using fallback");
            Discovery {
                tiers: FALLBACK_TIERS.to_vec(),
                warning: Some(e.to_string()),
            }
        }
    }
}

/// Prompt text listing `tiers`, or a static example list when empty.
pub fn resolution_prompt(tiers: &[Tier]) -> String {
    let examples = if tiers.is_empty() {
        "1080, 720, 480".to_string()
    } else {
        tiers
            .iter()
            .map(|t| t.label())
            .collect::<Vec<_>>()
            .join(", ")
    };

    format!("Enter desired video resolution (e.g., {examples}): ")
}

/// Height ceiling with the label used in the output file name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolutionChoice {
    pub ceiling: u32,
    pub label: String,
}

impl ResolutionChoice {
    /// Choice for a raw pixel height.
    ///
    /// Label is `"{n}p"`, or `"4k"` from 2160 up.
    pub fn from_height(ceiling: u32) -> Self {
        let label = if ceiling >= 2160 {
            "4k".to_string()
        } else {
            format!("{ceiling}p")
        };

        Self { ceiling, label }
    }
}

impl From<Tier> for ResolutionChoice {
    fn from(tier: Tier) -> Self {
        Self {
            ceiling: tier.min_height(),
            label: tier.label().to_string(),
        }
    }
}

/// Parse a tier label (any case) or a raw integer height.
///
/// Raw heights must fit in a `u32`; larger numbers are rejected as invalid input.
pub fn parse_resolution(input: &str) -> Option<ResolutionChoice> {
    let input = input.trim();

    if let Some(tier) = Tier::from_label(input) {
        return Some(tier.into());
    }

    input.parse().ok().map(ResolutionChoice::from_height)
}
