//! The complete encode plan for one job.
//!
//! `JobSpec -> TrimWindow -> BitrateBudget -> OverlayLayout -> filter graphs`,
//! each step a pure function of the previous ones and of the [`SourceFacts`].

use std::path::PathBuf;

use hudclip_common::error::HudclipResult;
use hudclip_job_model::job::{IntroRequest, JobSpec, QualityTier};
use serde::Serialize;

use crate::bitrate::{BitrateBudget, BitrateBudgetEstimator, SourceFacts};
use crate::filter_graph::{
    intro_graph, intro_loop_frames, FilterGraphBuilder, MusicMix, ScaleCap, OUTPUT_FPS,
};
use crate::overlay::{OverlayGeometryResolver, OverlayLayout};
use crate::speed::SpeedAdjuster;
use crate::trim::{TrimWindow, TrimWindowPlanner};

/// Effective durations at or below this use strict-size CBR.
pub const STRICT_SIZE_MAX_SECS: f64 = 20.0;

/// Share of the progress bar given to the core stage when an intro follows.
pub const CORE_WEIGHT_WITH_INTRO: f64 = 0.8;

/// Frame position used when the intro frame comes from the core midpoint.
const MIDPOINT_FRACTION_WITH_FADES: f64 = 0.55;
const MIDPOINT_FRACTION: f64 = 0.5;

/// Background music resolved for the core stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MusicPlan {
    pub path: PathBuf,
    pub volume: f64,
    pub offset_secs: f64,
}

/// The still-frame intro stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntroPlan {
    pub still_secs: f64,
    /// Frame timestamp within the core artifact.
    pub frame_at_secs: f64,
    pub loop_frames: u32,
    pub filter_graph: String,
}

/// Everything needed to drive the encoder for one job.
#[derive(Debug, Clone, Serialize)]
pub struct EncodePlan {
    pub input_path: PathBuf,
    pub window: TrimWindow,
    pub budget: BitrateBudget,
    pub speed: f64,
    pub fades: bool,
    /// Landscape scale cap; `None` in mobile layout.
    pub scale_cap: Option<ScaleCap>,
    /// Mobile HUD layout; `None` in landscape.
    pub layout: Option<OverlayLayout>,
    pub music: Option<MusicPlan>,
    pub core_filter_graph: String,
    pub intro: Option<IntroPlan>,
    /// Status lines describing the decisions made, in order.
    pub notes: Vec<String>,
}

impl EncodePlan {
    /// Derive the plan. `audio_override` replaces the fixed-tier audio bitrate.
    pub fn derive(
        spec: &JobSpec,
        facts: &SourceFacts,
        audio_override: Option<u32>,
    ) -> HudclipResult<Self> {
        spec.validate()?;
        let speed = SpeedAdjuster::new(spec.speed)?;
        let fades = spec.fades_enabled();
        let mut notes = Vec::new();

        let window = TrimWindowPlanner::with_defaults().plan(
            spec.start_secs,
            spec.end_secs,
            spec.total_duration_secs,
            fades,
            speed.factor(),
        )?;
        if !fades {
            notes.push("Fades disabled: using exact trim.".to_string());
        }
        if !speed.is_identity() {
            notes.push(format!(
                "Applying speed factor {}x to video and audio.",
                speed.factor()
            ));
        }

        let effective_duration = window.output_duration_secs + spec.planned_intro_secs();
        let budget = BitrateBudgetEstimator::with_audio_override(audio_override).estimate(
            spec.quality,
            effective_duration,
            facts,
        )?;
        notes.push(budget.note.clone());

        let (scale_cap, layout) = if spec.mobile {
            let layout = OverlayGeometryResolver::new().resolve(&spec.resolution, spec.teammates_overlay);
            notes.push("Optimizing for mobile: applying portrait crop.".to_string());
            (None, Some(layout))
        } else {
            let cap = ScaleCap::for_tier(spec.quality, budget.video_kbps, spec.resolution.height());
            notes.push(scale_note(spec, cap).to_string());
            (Some(cap), None)
        };

        let music = match &spec.music {
            Some(track) if facts.music_available => {
                notes.push("Background music: mixing enabled.".to_string());
                Some(MusicPlan {
                    path: track.path.clone(),
                    volume: track.effective_volume(),
                    offset_secs: track.effective_offset(),
                })
            }
            Some(track) => {
                tracing::warn!(path = %track.path.display(), "Background music file not found");
                notes.push("Background music: disabled or not found.".to_string());
                None
            }
            None => None,
        };

        let mut builder = FilterGraphBuilder::new(&window, speed)
            .fades(fades)
            .music(music.as_ref().map(|m| MusicMix {
                volume: m.volume,
                offset_secs: m.offset_secs,
            }));
        builder = match (&layout, scale_cap) {
            (Some(layout), _) => builder.mobile(layout),
            (None, Some(cap)) => builder.scale_cap(cap),
            (None, None) => builder,
        };
        let core_filter_graph = builder.core_graph();

        let intro = spec.intro_planned().then(|| {
            let still_secs = spec.intro.still_secs;
            let frame_at_secs = intro_frame_secs(&spec.intro, window.output_duration_secs, fades);
            IntroPlan {
                still_secs,
                frame_at_secs,
                loop_frames: intro_loop_frames(still_secs),
                filter_graph: intro_graph(frame_at_secs, still_secs),
            }
        });

        tracing::debug!(
            seek_start = window.seek_start_secs,
            seek_length = window.seek_length_secs,
            output_duration = window.output_duration_secs,
            video_kbps = budget.video_kbps,
            audio_kbps = budget.audio_kbps,
            intro = intro.is_some(),
            "Derived encode plan"
        );

        Ok(Self {
            input_path: spec.input_path.clone(),
            window,
            budget,
            speed: speed.factor(),
            fades,
            scale_cap,
            layout,
            music,
            core_filter_graph,
            intro,
            notes,
        })
    }

    /// Core duration plus the intro hold, used for rate control.
    pub fn effective_duration_secs(&self) -> f64 {
        self.budget.effective_duration_secs
    }

    /// Short clips use CBR so the size target is hit exactly.
    pub fn strict_size(&self) -> bool {
        self.effective_duration_secs() <= STRICT_SIZE_MAX_SECS
    }

    pub fn core_progress_weight(&self) -> f64 {
        if self.intro.is_some() {
            CORE_WEIGHT_WITH_INTRO
        } else {
            1.0
        }
    }

    pub fn stage_count(&self) -> usize {
        if self.intro.is_some() {
            3
        } else {
            1
        }
    }
}

/// Timestamp of the intro frame inside a core segment of `core_secs`.
///
/// Clamped to the start of the last output frame so a seek always lands on
/// a decodable frame.
pub fn intro_frame_secs(request: &IntroRequest, core_secs: f64, fades: bool) -> f64 {
    let at = match request.frame_at_secs {
        Some(at) if !request.from_midpoint && at.is_finite() => at,
        _ => {
            let fraction = if fades {
                MIDPOINT_FRACTION_WITH_FADES
            } else {
                MIDPOINT_FRACTION
            };
            core_secs * fraction
        }
    };
    let last_frame = (core_secs - 1.0 / f64::from(OUTPUT_FPS)).max(0.0);
    at.clamp(0.0, last_frame)
}

fn scale_note(spec: &JobSpec, cap: ScaleCap) -> &'static str {
    match (spec.quality, cap) {
        (QualityTier::Source, _) => "Highest resolution: keeping source resolution.",
        (QualityTier::Standard | QualityTier::Good, ScaleCap::MaxWidth { width: 1280 }) => {
            "Low bitrate detected: scaling to 720p."
        }
        (QualityTier::Standard | QualityTier::Good, _) => "Scaling to at most 1080p.",
        (QualityTier::Okay, _) => "Okay quality: scaling to 720p.",
        (QualityTier::Low, _) => "Bad quality: smaller resolution for a ~15 MB target.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hudclip_job_model::job::MusicTrack;
    use hudclip_job_model::resolution::SourceResolution;

    fn spec() -> JobSpec {
        let mut spec = JobSpec::new("/videos/match.mp4", 10.0, 40.0);
        spec.total_duration_secs = 120.0;
        spec
    }

    #[test]
    fn test_core_only_plan() {
        let plan = EncodePlan::derive(&spec(), &SourceFacts::new(0), None).unwrap();
        assert!(plan.intro.is_none());
        assert_eq!(plan.stage_count(), 1);
        assert_eq!(plan.core_progress_weight(), 1.0);
        assert!(!plan.strict_size());
        assert_eq!(plan.scale_cap, Some(ScaleCap::MaxWidth { width: 1920 }));
        assert!(plan.layout.is_none());
        assert!(plan.notes.iter().any(|n| n.starts_with("Standard quality")));
    }

    #[test]
    fn test_intro_counts_toward_budget_duration() {
        let mut spec = spec();
        spec.intro.still_secs = 2.0;
        spec.intro.from_midpoint = true;
        let plan = EncodePlan::derive(&spec, &SourceFacts::new(0), None).unwrap();
        assert!((plan.effective_duration_secs() - 35.0).abs() < 1e-9);
        assert_eq!(plan.core_progress_weight(), CORE_WEIGHT_WITH_INTRO);
        let intro = plan.intro.unwrap();
        assert!((intro.frame_at_secs - 33.0 * 0.55).abs() < 1e-9);
        assert_eq!(intro.loop_frames, 120);
    }

    #[test]
    fn test_disabled_fades_skip_intro() {
        let mut spec = spec();
        spec.intro.still_secs = 2.0;
        spec.disable_fades = true;
        let plan = EncodePlan::derive(&spec, &SourceFacts::new(0), None).unwrap();
        assert!(plan.intro.is_none());
        assert!(plan.notes[0].starts_with("Fades disabled"));
    }

    #[test]
    fn test_missing_music_is_dropped_with_note() {
        let mut spec = spec();
        spec.music = Some(MusicTrack {
            path: PathBuf::from("/music/missing.mp3"),
            volume: Some(0.5),
            offset_secs: 0.0,
        });
        let mut facts = SourceFacts::new(0);
        facts.music_available = false;
        let plan = EncodePlan::derive(&spec, &facts, None).unwrap();
        assert!(plan.music.is_none());
        assert!(!plan.core_filter_graph.contains("[1:a]"));
        assert!(plan.notes.iter().any(|n| n.contains("not found")));
    }

    #[test]
    fn test_mobile_plan_has_layout_and_no_scale_cap() {
        let mut spec = spec();
        spec.mobile = true;
        spec.resolution = SourceResolution::Hd1080;
        spec.quality = QualityTier::Good;
        let plan = EncodePlan::derive(&spec, &SourceFacts::new(0), None).unwrap();
        assert!(plan.scale_cap.is_none());
        assert_eq!(plan.layout.as_ref().unwrap().scale, 0.75);
        assert!(plan.core_filter_graph.contains("[composited]"));
    }

    #[test]
    fn test_intro_frame_selection() {
        let explicit = IntroRequest {
            still_secs: 1.0,
            from_midpoint: false,
            frame_at_secs: Some(4.0),
        };
        assert_eq!(intro_frame_secs(&explicit, 10.0, true), 4.0);

        let beyond = IntroRequest {
            frame_at_secs: Some(40.0),
            ..explicit.clone()
        };
        assert!((intro_frame_secs(&beyond, 10.0, true) - (10.0 - 1.0 / 60.0)).abs() < 1e-9);

        let at_end = IntroRequest {
            frame_at_secs: Some(10.0),
            ..explicit.clone()
        };
        assert!(intro_frame_secs(&at_end, 10.0, true) < 10.0);

        let negative = IntroRequest {
            frame_at_secs: Some(-3.0),
            ..explicit.clone()
        };
        assert_eq!(intro_frame_secs(&negative, 10.0, true), 0.0);
        assert_eq!(intro_frame_secs(&explicit, 0.01, true), 0.0);

        let midpoint = IntroRequest {
            from_midpoint: true,
            ..explicit
        };
        assert!((intro_frame_secs(&midpoint, 10.0, true) - 5.5).abs() < 1e-9);
        assert!((intro_frame_secs(&midpoint, 10.0, false) - 5.0).abs() < 1e-9);
    }
}
