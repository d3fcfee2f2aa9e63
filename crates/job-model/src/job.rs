//! The render request supplied by the caller.
//!
//! A [`JobSpec`] is immutable once submitted; the planner only reads it.

use std::fmt;
use std::path::PathBuf;

use hudclip_common::error::{HudclipError, HudclipResult};
use serde::{Deserialize, Serialize};

use crate::resolution::SourceResolution;

/// Default background music volume when the caller gives none.
pub const DEFAULT_MUSIC_VOLUME: f64 = 0.35;

/// Output quality / size tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum QualityTier {
    Low = 0,
    Okay = 1,
    Standard = 2,
    Good = 3,
    /// Match the source file size at source resolution.
    Source = 4,
}

impl QualityTier {
    pub const ALL: [QualityTier; 5] = [
        QualityTier::Low,
        QualityTier::Okay,
        QualityTier::Standard,
        QualityTier::Good,
        QualityTier::Source,
    ];

    /// Fixed output size target in MB; `None` for [`QualityTier::Source`].
    pub fn target_mb(self) -> Option<f64> {
        match self {
            Self::Low => Some(15.0),
            Self::Okay => Some(25.0),
            Self::Standard => Some(45.0),
            Self::Good => Some(90.0),
            Self::Source => None,
        }
    }

    pub fn level(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "Bad",
            Self::Okay => "Okay",
            Self::Standard => "Standard",
            Self::Good => "Good",
            Self::Source => "Maximum",
        }
    }
}

impl TryFrom<u8> for QualityTier {
    type Error = HudclipError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .get(value as usize)
            .copied()
            .ok_or_else(|| HudclipError::invalid_job(format!("quality tier {value} is not in 0-4")))
    }
}

impl From<QualityTier> for u8 {
    fn from(value: QualityTier) -> Self {
        value.level()
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label(), self.level())
    }
}

/// Background music mixed under the clip audio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MusicTrack {
    pub path: PathBuf,

    /// Volume multiplier; defaults to [`DEFAULT_MUSIC_VOLUME`].
    #[serde(default)]
    pub volume: Option<f64>,

    /// Seconds into the music file where the mix starts.
    #[serde(default)]
    pub offset_secs: f64,
}

impl MusicTrack {
    pub fn effective_volume(&self) -> f64 {
        let volume = self.volume.unwrap_or(DEFAULT_MUSIC_VOLUME);
        if volume.is_finite() {
            volume.clamp(0.0, 1.0)
        } else {
            DEFAULT_MUSIC_VOLUME
        }
    }

    pub fn effective_offset(&self) -> f64 {
        if self.offset_secs.is_finite() {
            self.offset_secs.max(0.0)
        } else {
            0.0
        }
    }
}

/// Still-frame intro request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntroRequest {
    /// How long the still frame is held (0 = no intro).
    #[serde(default)]
    pub still_secs: f64,

    /// Take the frame from the middle of the core segment.
    #[serde(default)]
    pub from_midpoint: bool,

    /// Explicit frame timestamp within the core segment (output seconds).
    /// Ignored when `from_midpoint` is set.
    #[serde(default)]
    pub frame_at_secs: Option<f64>,
}

/// An immutable render request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSpec {
    pub input_path: PathBuf,
    pub start_secs: f64,
    pub end_secs: f64,
    pub resolution: SourceResolution,

    /// Render the 1150x1920 portrait layout with HUD overlays.
    #[serde(default)]
    pub mobile: bool,

    /// Playback speed multiplier (> 0).
    pub speed: f64,
    pub quality: QualityTier,

    #[serde(default)]
    pub teammates_overlay: bool,

    #[serde(default)]
    pub music: Option<MusicTrack>,

    /// Total source duration; 0 when unknown.
    #[serde(default)]
    pub total_duration_secs: f64,

    #[serde(default)]
    pub disable_fades: bool,

    #[serde(default)]
    pub intro: IntroRequest,
}

impl JobSpec {
    /// A job with neutral options for the given window.
    pub fn new(input_path: impl Into<PathBuf>, start_secs: f64, end_secs: f64) -> Self {
        Self {
            input_path: input_path.into(),
            start_secs,
            end_secs,
            resolution: SourceResolution::Qhd1440,
            mobile: false,
            speed: 1.0,
            quality: QualityTier::Standard,
            teammates_overlay: false,
            music: None,
            total_duration_secs: 0.0,
            disable_fades: false,
            intro: IntroRequest::default(),
        }
    }

    /// Check the caller-facing invariants.
    pub fn validate(&self) -> HudclipResult<()> {
        if !self.start_secs.is_finite() || !self.end_secs.is_finite() {
            return Err(HudclipError::invalid_job("start and end must be finite"));
        }
        if self.start_secs < 0.0 {
            return Err(HudclipError::invalid_job(format!(
                "start time {:.3}s is negative",
                self.start_secs
            )));
        }
        if self.end_secs <= self.start_secs {
            return Err(HudclipError::ZeroOrNegativeDuration {
                duration_secs: self.end_secs - self.start_secs,
            });
        }
        if !self.speed.is_finite() || self.speed <= 0.0 {
            return Err(HudclipError::invalid_job(format!(
                "speed factor must be positive, got {}",
                self.speed
            )));
        }
        if !self.intro.still_secs.is_finite() || self.intro.still_secs < 0.0 {
            return Err(HudclipError::invalid_job(format!(
                "intro duration must be non-negative, got {}",
                self.intro.still_secs
            )));
        }
        if !self.total_duration_secs.is_finite() || self.total_duration_secs < 0.0 {
            return Err(HudclipError::invalid_job("total duration must be non-negative"));
        }
        Ok(())
    }

    pub fn fades_enabled(&self) -> bool {
        !self.disable_fades
    }

    /// Whether INTRO and CONCAT stages will run after CORE.
    pub fn intro_planned(&self) -> bool {
        self.fades_enabled() && self.intro.still_secs > 0.0
    }

    /// Intro length that counts toward the delivered runtime.
    pub fn planned_intro_secs(&self) -> f64 {
        if self.intro_planned() {
            self.intro.still_secs
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_targets() {
        assert_eq!(QualityTier::Low.target_mb(), Some(15.0));
        assert_eq!(QualityTier::Okay.target_mb(), Some(25.0));
        assert_eq!(QualityTier::Standard.target_mb(), Some(45.0));
        assert_eq!(QualityTier::Good.target_mb(), Some(90.0));
        assert_eq!(QualityTier::Source.target_mb(), None);
    }

    #[test]
    fn test_tier_from_integer() {
        assert_eq!(QualityTier::try_from(3).unwrap(), QualityTier::Good);
        assert!(QualityTier::try_from(5).is_err());
        let tier: QualityTier = serde_json::from_str("4").unwrap();
        assert_eq!(tier, QualityTier::Source);
    }

    #[test]
    fn test_validate_rejects_reversed_window() {
        let spec = JobSpec::new("in.mp4", 10.0, 10.0);
        assert!(matches!(
            spec.validate(),
            Err(HudclipError::ZeroOrNegativeDuration { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_bad_speed() {
        let mut spec = JobSpec::new("in.mp4", 0.0, 5.0);
        spec.speed = 0.0;
        assert!(matches!(spec.validate(), Err(HudclipError::InvalidJob { .. })));
        spec.speed = f64::NAN;
        assert!(spec.validate().is_err());
        spec.speed = 1.5;
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_intro_requires_fades() {
        let mut spec = JobSpec::new("in.mp4", 0.0, 5.0);
        spec.intro.still_secs = 2.0;
        assert!(spec.intro_planned());
        assert_eq!(spec.planned_intro_secs(), 2.0);

        spec.disable_fades = true;
        assert!(!spec.intro_planned());
        assert_eq!(spec.planned_intro_secs(), 0.0);
    }

    #[test]
    fn test_music_defaults_and_clamps() {
        let mut track = MusicTrack {
            path: PathBuf::from("song.mp3"),
            volume: None,
            offset_secs: -3.0,
        };
        assert!((track.effective_volume() - DEFAULT_MUSIC_VOLUME).abs() < 1e-12);
        assert_eq!(track.effective_offset(), 0.0);
        track.volume = Some(4.0);
        assert_eq!(track.effective_volume(), 1.0);
    }

    #[test]
    fn test_spec_json_round_trip_keeps_resolution_tag() {
        let mut spec = JobSpec::new("clip.mp4", 1.0, 9.0);
        spec.resolution = SourceResolution::Hd1080;
        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json["resolution"], "1920x1080");
        assert_eq!(json["quality"], 2);
    }
}
