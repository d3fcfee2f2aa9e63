//! Recognized source resolutions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The source frame size a job was recorded at.
///
/// Four resolutions have tuned HUD tables; any other `WxH` tag is carried
/// as `Other` and handled by the generic projection. Tags that are not
/// `WxH` at all are kept verbatim as `Unknown`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SourceResolution {
    /// 1920x1080
    Hd1080,
    /// 2560x1440, the reference resolution for HUD tables.
    Qhd1440,
    /// 3440x1440 ultrawide.
    Ultrawide1440,
    /// 3840x2160
    Uhd2160,
    /// Any other parsable `WxH`.
    Other { width: u32, height: u32 },
    /// Unparsable tag.
    Unknown(String),
}

impl SourceResolution {
    /// Build from probed dimensions.
    pub fn from_dimensions(width: u32, height: u32) -> Self {
        match (width, height) {
            (1920, 1080) => Self::Hd1080,
            (2560, 1440) => Self::Qhd1440,
            (3440, 1440) => Self::Ultrawide1440,
            (3840, 2160) => Self::Uhd2160,
            (width, height) => Self::Other { width, height },
        }
    }

    /// Frame dimensions, when known.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        match self {
            Self::Hd1080 => Some((1920, 1080)),
            Self::Qhd1440 => Some((2560, 1440)),
            Self::Ultrawide1440 => Some((3440, 1440)),
            Self::Uhd2160 => Some((3840, 2160)),
            Self::Other { width, height } => Some((*width, *height)),
            Self::Unknown(_) => None,
        }
    }

    /// Frame height, when known.
    pub fn height(&self) -> Option<u32> {
        self.dimensions().map(|(_, h)| h)
    }

    /// Whether this resolution has a tuned HUD table.
    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Other { .. } | Self::Unknown(_))
    }
}

impl FromStr for SourceResolution {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let parsed = trimmed
            .split_once(|c: char| c == 'x' || c == 'X')
            .and_then(|(w, h)| Some((w.trim().parse::<u32>().ok()?, h.trim().parse::<u32>().ok()?)))
            .filter(|(w, h)| *w > 0 && *h > 0);
        Ok(match parsed {
            Some((w, h)) => Self::from_dimensions(w, h),
            None => Self::Unknown(trimmed.to_string()),
        })
    }
}

impl From<String> for SourceResolution {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(resolution) => resolution,
            Err(never) => match never {},
        }
    }
}

impl From<SourceResolution> for String {
    fn from(value: SourceResolution) -> Self {
        value.to_string()
    }
}

impl fmt::Display for SourceResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(tag) => f.write_str(tag),
            other => match other.dimensions() {
                Some((w, h)) => write!(f, "{w}x{h}"),
                None => f.write_str("unknown"),
            },
        }
    }
}
