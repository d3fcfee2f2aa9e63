//! Bitrate budget estimation.
//!
//! The output size is fixed per quality tier (or matches the source file
//! for the top tier). The video bitrate is whatever remains of that size
//! once the audio track has been paid for, spread across the delivered
//! runtime.

use hudclip_common::error::{HudclipError, HudclipResult};
use hudclip_job_model::job::QualityTier;
use serde::{Deserialize, Serialize};

/// Floor applied to every video bitrate.
pub const MIN_VIDEO_KBPS: u32 = 300;

/// Audio bitrate used when nothing better is known.
pub const DEFAULT_AUDIO_KBPS: u32 = 128;

/// Size target used when the source size cannot be read in match-source mode.
pub const FALLBACK_TARGET_MB: f64 = 52.0;

const BITS_PER_MB: f64 = 8.0 * 1024.0 * 1024.0;

/// What the size budget is derived from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SizeTarget {
    /// Match the source file size.
    MatchSource { bytes: u64 },
    /// Fixed tier target.
    FixedMb { mb: f64 },
    /// Match-source mode could not read the source size.
    FallbackMb { mb: f64 },
}

/// Result of a budget estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BitrateBudget {
    pub audio_kbps: u32,
    pub video_kbps: u32,
    pub target: SizeTarget,
    pub effective_duration_secs: f64,
    /// Human-readable summary for the status channel.
    pub note: String,
}

/// What is known about the source file before planning.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFacts {
    /// Source file size, or the reason it could not be read.
    pub size_bytes: Result<u64, String>,

    /// Probed audio bitrate (already normalized with [`audio_kbps_from_bit_rate`]).
    pub audio_kbps: Option<u32>,

    /// Whether the configured background music file exists.
    pub music_available: bool,
}

impl SourceFacts {
    pub fn new(size_bytes: u64) -> Self {
        Self {
            size_bytes: Ok(size_bytes),
            audio_kbps: None,
            music_available: true,
        }
    }
}

/// Convert a probed `bit_rate` (bits per second) into kbps, never below 8.
pub fn audio_kbps_from_bit_rate(bits_per_sec: f64) -> Option<u32> {
    if !bits_per_sec.is_finite() || bits_per_sec < 0.0 {
        return None;
    }
    Some(((bits_per_sec / 1000.0).round() as u32).max(8))
}

/// Configuration for the estimator.
#[derive(Debug, Clone)]
pub struct BudgetConfig {
    /// Audio bitrate for fixed tiers, and for match-source mode when the
    /// probe fails.
    pub default_audio_kbps: u32,
    pub min_video_kbps: u32,
    pub fallback_target_mb: f64,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            default_audio_kbps: DEFAULT_AUDIO_KBPS,
            min_video_kbps: MIN_VIDEO_KBPS,
            fallback_target_mb: FALLBACK_TARGET_MB,
        }
    }
}

/// Derives [`BitrateBudget`]s.
pub struct BitrateBudgetEstimator {
    config: BudgetConfig,
}

impl BitrateBudgetEstimator {
    pub fn new(config: BudgetConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(BudgetConfig::default())
    }

    /// Defaults with the fixed-tier audio bitrate replaced when `Some`.
    pub fn with_audio_override(audio_kbps: Option<u32>) -> Self {
        let mut config = BudgetConfig::default();
        if let Some(kbps) = audio_kbps.filter(|k| *k > 0) {
            config.default_audio_kbps = kbps;
        }
        Self::new(config)
    }

    /// Estimate the budget for `effective_duration_secs` of output
    /// (core duration plus any intro hold).
    pub fn estimate(
        &self,
        tier: QualityTier,
        effective_duration_secs: f64,
        source: &SourceFacts,
    ) -> HudclipResult<BitrateBudget> {
        if effective_duration_secs.is_nan() || effective_duration_secs <= 0.0 {
            return Err(HudclipError::ZeroOrNegativeDuration {
                duration_secs: effective_duration_secs,
            });
        }

        match tier.target_mb() {
            Some(target_mb) => {
                let mut budget = self.fixed_target(
                    target_mb,
                    self.config.default_audio_kbps,
                    effective_duration_secs,
                )?;
                budget.note = format!(
                    "{} quality: target size ~{:.0} MB; video bitrate ~{} kbps.",
                    tier.label(),
                    target_mb,
                    budget.video_kbps
                );
                Ok(budget)
            }
            None => match &source.size_bytes {
                Ok(bytes) => Ok(self.match_source(*bytes, source.audio_kbps, effective_duration_secs)),
                Err(reason) => {
                    tracing::warn!(
                        reason = %reason,
                        fallback_mb = self.config.fallback_target_mb,
                        "Source size unavailable; using fallback size target"
                    );
                    let mut budget = self.fixed_target(
                        self.config.fallback_target_mb,
                        self.config.default_audio_kbps,
                        effective_duration_secs,
                    )?;
                    budget.target = SizeTarget::FallbackMb {
                        mb: self.config.fallback_target_mb,
                    };
                    budget.note = format!(
                        "Maximum quality fallback: {reason}. Using ~{:.0} MB target size.",
                        self.config.fallback_target_mb
                    );
                    Ok(budget)
                }
            },
        }
    }

    fn fixed_target(
        &self,
        target_mb: f64,
        audio_kbps: u32,
        duration_secs: f64,
    ) -> HudclipResult<BitrateBudget> {
        let target_bits = target_mb * BITS_PER_MB;
        let audio_bits = audio_kbps as f64 * 1024.0 * duration_secs;
        let video_bits = target_bits - audio_bits;
        if video_bits < 0.0 {
            return Err(HudclipError::InsufficientSizeBudget {
                target_mb,
                audio_kbps,
                duration_secs,
            });
        }

        let video_kbps = self.video_kbps(video_bits, duration_secs);
        Ok(BitrateBudget {
            audio_kbps,
            video_kbps,
            target: SizeTarget::FixedMb { mb: target_mb },
            effective_duration_secs: duration_secs,
            note: String::new(),
        })
    }

    fn match_source(
        &self,
        source_bytes: u64,
        probed_audio_kbps: Option<u32>,
        duration_secs: f64,
    ) -> BitrateBudget {
        let audio_kbps = probed_audio_kbps.unwrap_or(self.config.default_audio_kbps);
        let target_bits = source_bytes.max(1) as f64 * 8.0;
        let audio_bits = audio_kbps as f64 * 1024.0 * duration_secs;
        let video_bits = target_bits - audio_bits;

        let video_kbps = if video_bits <= 0.0 {
            self.config.min_video_kbps
        } else {
            self.video_kbps(video_bits, duration_secs)
        };

        BitrateBudget {
            audio_kbps,
            video_kbps,
            target: SizeTarget::MatchSource {
                bytes: source_bytes,
            },
            effective_duration_secs: duration_secs,
            note: format!(
                "Maximum quality: matching source size; audio ~{audio_kbps} kbps; video ~{video_kbps} kbps."
            ),
        }
    }

    fn video_kbps(&self, video_bits: f64, duration_secs: f64) -> u32 {
        let kbps = (video_bits / (1024.0 * duration_secs)).floor();
        let kbps = if kbps >= u32::MAX as f64 {
            u32::MAX
        } else {
            kbps as u32
        };
        kbps.max(self.config.min_video_kbps)
    }
}
