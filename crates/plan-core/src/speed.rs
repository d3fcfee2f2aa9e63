//! Playback speed adjustment.
//!
//! Video is retimed with a single `setpts`. Audio uses `atempo`, which only
//! accepts factors in [0.5, 2.0], so arbitrary speeds are decomposed into a
//! chain of bounded factors whose product is the requested speed.

use hudclip_common::error::{HudclipError, HudclipResult};

/// Smallest factor a single `atempo` accepts.
pub const MIN_TEMPO: f64 = 0.5;
/// Largest factor a single `atempo` accepts.
pub const MAX_TEMPO: f64 = 2.0;

const IDENTITY_TOLERANCE: f64 = 1e-9;

/// Decompose `speed` into `atempo` factors, each within [0.5, 2.0].
///
/// Returns an empty chain for speed 1.0. `speed` must be positive.
pub fn tempo_chain(speed: f64) -> Vec<f64> {
    let mut chain = Vec::new();
    let mut remaining = speed;
    while remaining > MAX_TEMPO {
        chain.push(MAX_TEMPO);
        remaining /= MAX_TEMPO;
    }
    while remaining < MIN_TEMPO {
        chain.push(MIN_TEMPO);
        remaining /= MIN_TEMPO;
    }
    if (remaining - 1.0).abs() > IDENTITY_TOLERANCE {
        chain.push(remaining);
    }
    chain
}

/// A validated speed multiplier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedAdjuster {
    factor: f64,
}

impl SpeedAdjuster {
    pub fn new(factor: f64) -> HudclipResult<Self> {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(HudclipError::invalid_job(format!(
                "speed factor must be positive, got {factor}"
            )));
        }
        Ok(Self { factor })
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }

    pub fn is_identity(&self) -> bool {
        (self.factor - 1.0).abs() <= IDENTITY_TOLERANCE
    }

    /// Source-timeline seconds to output seconds.
    pub fn to_output_secs(&self, source_secs: f64) -> f64 {
        source_secs / self.factor
    }

    /// `setpts` filter for the video chain, if any.
    pub fn video_filter(&self) -> Option<String> {
        if self.is_identity() {
            None
        } else {
            Some(format!("setpts=PTS/{}", self.factor))
        }
    }

    /// Comma-joined `atempo` chain for the audio, if any.
    pub fn audio_filter(&self) -> Option<String> {
        let chain = tempo_chain(self.factor);
        if chain.is_empty() {
            return None;
        }
        Some(
            chain
                .iter()
                .map(|f| format!("atempo={f}"))
                .collect::<Vec<_>>()
                .join(","),
        )
    }
}
