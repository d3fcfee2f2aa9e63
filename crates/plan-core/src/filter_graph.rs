//! ffmpeg `-filter_complex` construction.
//!
//! The core graph always produces `[vcore]` and `[acore]`; the intro graph
//! produces `[vintro]` and `[aintro]`.

use hudclip_job_model::job::QualityTier;
use serde::{Deserialize, Serialize};

use crate::overlay::{OverlayLayout, CANVAS_HEIGHT, CANVAS_WIDTH};
use crate::speed::SpeedAdjuster;
use crate::trim::TrimWindow;

/// Output frame rate of every stage.
pub const OUTPUT_FPS: u32 = 60;

/// Music fade length when fades are enabled.
pub const MUSIC_FADE_SECS: f64 = 1.5;

/// Width the intro slice extends past the chosen frame.
const INTRO_SLICE_SECS: f64 = 0.1;

/// Landscape resolution cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScaleCap {
    /// Keep the source resolution.
    Source,
    /// Limit the width, keeping aspect ratio.
    MaxWidth { width: u32 },
}

impl ScaleCap {
    /// Pick the cap for a tier. Low bitrates on tall sources drop to 720p.
    pub fn for_tier(tier: QualityTier, video_kbps: u32, source_height: Option<u32>) -> Self {
        match tier {
            QualityTier::Source => Self::Source,
            QualityTier::Standard | QualityTier::Good => {
                if video_kbps < 800 && source_height.is_some_and(|h| h > 720) {
                    Self::MaxWidth { width: 1280 }
                } else {
                    Self::MaxWidth { width: 1920 }
                }
            }
            QualityTier::Okay => Self::MaxWidth { width: 1280 },
            QualityTier::Low => Self::MaxWidth { width: 960 },
        }
    }

    pub fn filter(&self) -> String {
        match self {
            Self::Source => "scale=iw:ih".to_string(),
            Self::MaxWidth { width } => format!("scale='min({width},iw)':-2"),
        }
    }
}

/// Background music parameters as seen by the graph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MusicMix {
    pub volume: f64,
    pub offset_secs: f64,
}

/// Builds the core-stage filter graph.
pub struct FilterGraphBuilder<'a> {
    window: &'a TrimWindow,
    speed: SpeedAdjuster,
    fades: bool,
    scale: ScaleCap,
    layout: Option<&'a OverlayLayout>,
    music: Option<MusicMix>,
}

impl<'a> FilterGraphBuilder<'a> {
    pub fn new(window: &'a TrimWindow, speed: SpeedAdjuster) -> Self {
        Self {
            window,
            speed,
            fades: true,
            scale: ScaleCap::Source,
            layout: None,
            music: None,
        }
    }

    pub fn fades(mut self, enabled: bool) -> Self {
        self.fades = enabled;
        self
    }

    pub fn scale_cap(mut self, scale: ScaleCap) -> Self {
        self.scale = scale;
        self
    }

    /// Use the mobile portrait layout instead of the landscape scale cap.
    pub fn mobile(mut self, layout: &'a OverlayLayout) -> Self {
        self.layout = Some(layout);
        self
    }

    pub fn music(mut self, music: Option<MusicMix>) -> Self {
        self.music = music;
        self
    }

    /// The full core graph: video chain then audio chain.
    pub fn core_graph(&self) -> String {
        let mut parts = Vec::new();
        match self.layout {
            Some(layout) => {
                parts.extend(mobile_composite(layout));
                parts.push(format!("[composited]{}[vcore]", self.video_tail()));
            }
            None => {
                parts.push(format!(
                    "[0:v]fps={OUTPUT_FPS},{},{}[vcore]",
                    self.scale.filter(),
                    self.video_tail()
                ));
            }
        }
        parts.extend(self.audio_chain());
        parts.join(";")
    }

    /// Speed, fades, trim and normalization shared by both layouts.
    fn video_tail(&self) -> String {
        let w = self.window;
        let mut filters = Vec::new();
        if let Some(setpts) = self.speed.video_filter() {
            filters.push(setpts);
        }
        if self.fades {
            if w.has_fade_in() {
                filters.push(format!("fade=t=in:st=0:d={:.3}", w.fade_in_secs));
            }
            if w.has_fade_out() {
                filters.push(format!(
                    "fade=t=out:st={:.3}:d={:.3}",
                    w.fade_out_start_secs, w.fade_out_secs
                ));
            }
        }
        filters.push("format=yuv420p".to_string());
        filters.push(format!("trim=duration={:.6}", w.output_duration_secs));
        filters.push("setpts=PTS-STARTPTS".to_string());
        filters.push("setsar=1".to_string());
        filters.push(format!("fps={OUTPUT_FPS}"));
        filters.join(",")
    }

    fn audio_chain(&self) -> Vec<String> {
        let duration = self.window.output_duration_secs;
        let trim = format!("atrim=duration={duration:.6},asetpts=PTS-STARTPTS");
        let main = match self.speed.audio_filter() {
            Some(tempo) => format!("[0:a]{tempo},{trim}"),
            None => format!("[0:a]{trim}"),
        };

        let Some(music) = self.music else {
            return vec![format!("{main}[acore]")];
        };

        let mut music_chain = format!(
            "[1:a]atrim=start={:.3}:end={:.3},asetpts=PTS-STARTPTS,volume={:.4}",
            music.offset_secs,
            music.offset_secs + duration,
            music.volume
        );
        if self.fades {
            music_chain.push_str(&format!(
                ",afade=t=in:st=0:d={MUSIC_FADE_SECS},afade=t=out:st={:.3}:d={MUSIC_FADE_SECS}",
                (duration - MUSIC_FADE_SECS).max(0.0)
            ));
        }
        music_chain.push_str("[a_music]");

        vec![
            format!("{main}[a_main]"),
            music_chain,
            format!(
                "[a_main][a_music]amix=inputs=2:duration=first:dropout_transition=3,{trim}[acore]"
            ),
        ]
    }
}

/// Split, crop, scale and composite the HUD branches into `[composited]`.
fn mobile_composite(layout: &OverlayLayout) -> Vec<String> {
    let mut parts = Vec::new();

    let mut split = format!("[0:v]split={}[main]", layout.regions.len() + 1);
    for region in &layout.regions {
        split.push_str(&format!("[{}]", region.element.branch_label()));
    }
    parts.push(split);

    parts.push(format!(
        "[main]scale={CANVAS_WIDTH}:{CANVAS_HEIGHT}:force_original_aspect_ratio=increase,crop={CANVAS_WIDTH}:{CANVAS_HEIGHT}[main_cropped]"
    ));

    for region in &layout.regions {
        let label = region.element.branch_label();
        parts.push(format!(
            "[{label}]crop={},scale={}:{},format=yuva444p,colorchannelmixer=aa={}[{label}_scaled]",
            region.crop.crop_arg(),
            region.placement.width,
            region.placement.height,
            region.alpha
        ));
    }

    let mut base = "main_cropped".to_string();
    let last = layout.regions.len();
    for (index, region) in layout.regions.iter().enumerate() {
        let next = if index + 1 == last {
            "composited".to_string()
        } else {
            format!("t{}", index + 1)
        };
        parts.push(format!(
            "[{base}][{}_scaled]overlay={}:{}[{next}]",
            region.element.branch_label(),
            region.placement.x,
            region.placement.y
        ));
        base = next;
    }

    parts
}

/// Graph for the still-frame intro, read from the core artifact.
pub fn intro_graph(frame_at_secs: f64, still_secs: f64) -> String {
    let loop_frames = intro_loop_frames(still_secs);
    format!(
        "[0:v]trim=start={:.6}:end={:.6},setpts=PTS-STARTPTS,select='eq(n\\,0)',format=yuv420p,setsar=1,\
         loop=loop={loop_frames}:size=1:start=0,setpts=N/{OUTPUT_FPS}/TB,fps={OUTPUT_FPS}[vintro];\
         anullsrc=r=48000:cl=stereo,atrim=duration={still_secs:.3},asetpts=PTS-STARTPTS[aintro]",
        frame_at_secs,
        frame_at_secs + INTRO_SLICE_SECS,
    )
}

/// Number of frames the intro still is held for.
pub fn intro_loop_frames(still_secs: f64) -> u32 {
    ((still_secs * OUTPUT_FPS as f64).round() as u32).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::OverlayGeometryResolver;
    use crate::trim::TrimWindowPlanner;
    use hudclip_job_model::resolution::SourceResolution;

    fn window(start: f64, end: f64, fades: bool, speed: f64) -> TrimWindow {
        TrimWindowPlanner::with_defaults()
            .plan(start, end, 120.0, fades, speed)
            .unwrap()
    }

    #[test]
    fn test_scale_caps_per_tier() {
        assert_eq!(ScaleCap::for_tier(QualityTier::Source, 100, Some(1440)), ScaleCap::Source);
        assert_eq!(
            ScaleCap::for_tier(QualityTier::Standard, 5000, Some(1440)).filter(),
            "scale='min(1920,iw)':-2"
        );
        assert_eq!(
            ScaleCap::for_tier(QualityTier::Good, 700, Some(1080)),
            ScaleCap::MaxWidth { width: 1280 }
        );
        assert_eq!(
            ScaleCap::for_tier(QualityTier::Standard, 700, None),
            ScaleCap::MaxWidth { width: 1920 }
        );
        assert_eq!(
            ScaleCap::for_tier(QualityTier::Okay, 5000, Some(1440)),
            ScaleCap::MaxWidth { width: 1280 }
        );
        assert_eq!(
            ScaleCap::for_tier(QualityTier::Low, 5000, Some(1440)),
            ScaleCap::MaxWidth { width: 960 }
        );
    }

    #[test]
    fn test_landscape_graph_with_fades() {
        let window = window(10.0, 40.0, true, 1.0);
        let graph = FilterGraphBuilder::new(&window, SpeedAdjuster::new(1.0).unwrap())
            .scale_cap(ScaleCap::MaxWidth { width: 1920 })
            .core_graph();
        assert_eq!(
            graph,
            "[0:v]fps=60,scale='min(1920,iw)':-2,fade=t=in:st=0:d=1.500,fade=t=out:st=31.500:d=1.500,\
             format=yuv420p,trim=duration=33.000000,setpts=PTS-STARTPTS,setsar=1,fps=60[vcore];\
             [0:a]atrim=duration=33.000000,asetpts=PTS-STARTPTS[acore]"
        );
    }

    #[test]
    fn test_speed_adds_setpts_and_atempo() {
        let window = window(10.0, 40.0, false, 2.0);
        let graph = FilterGraphBuilder::new(&window, SpeedAdjuster::new(2.0).unwrap())
            .fades(false)
            .core_graph();
        assert!(graph.contains("scale=iw:ih,setpts=PTS/2,format=yuv420p,trim=duration=15.000000"));
        assert!(graph.contains("[0:a]atempo=2,atrim=duration=15.000000"));
        assert!(!graph.contains("fade="));
    }

    #[test]
    fn test_music_mix_chain() {
        let window = window(10.0, 40.0, true, 1.0);
        let graph = FilterGraphBuilder::new(&window, SpeedAdjuster::new(1.0).unwrap())
            .music(Some(MusicMix {
                volume: 0.35,
                offset_secs: 4.0,
            }))
            .core_graph();
        assert!(graph.contains("[0:a]atrim=duration=33.000000,asetpts=PTS-STARTPTS[a_main]"));
        assert!(graph.contains(
            "[1:a]atrim=start=4.000:end=37.000,asetpts=PTS-STARTPTS,volume=0.3500,\
             afade=t=in:st=0:d=1.5,afade=t=out:st=31.500:d=1.5[a_music]"
        ));
        assert!(graph.ends_with(
            "[a_main][a_music]amix=inputs=2:duration=first:dropout_transition=3,\
             atrim=duration=33.000000,asetpts=PTS-STARTPTS[acore]"
        ));
    }

    #[test]
    fn test_mobile_graph_composites_every_region() {
        let window = window(10.0, 40.0, true, 1.0);
        let layout = OverlayGeometryResolver::new().resolve(&SourceResolution::Hd1080, true);
        let graph = FilterGraphBuilder::new(&window, SpeedAdjuster::new(1.0).unwrap())
            .mobile(&layout)
            .core_graph();

        assert!(graph.starts_with("[0:v]split=5[main][lootbar][healthbar][stats][team];"));
        assert!(graph.contains(
            "[main]scale=1150:1920:force_original_aspect_ratio=increase,crop=1150:1920[main_cropped]"
        ));
        assert!(graph.contains(
            "[healthbar]crop=278:49:45:988,scale=519:91,format=yuva444p,colorchannelmixer=aa=0.8[healthbar_scaled]"
        ));
        assert!(graph.contains("[main_cropped][lootbar_scaled]overlay=540:1761[t1]"));
        assert!(graph.contains("[t3][team_scaled]overlay=0:0[composited]"));
        assert!(graph.contains("[composited]fade=t=in"));
        assert!(graph.contains("[vcore]"));
        assert!(!graph.contains("fps=60,scale="));
    }

    #[test]
    fn test_intro_graph() {
        let graph = intro_graph(18.15, 2.0);
        assert!(graph.starts_with("[0:v]trim=start=18.150000:end=18.250000,"));
        assert!(graph.contains("select='eq(n\\,0)'"));
        assert!(graph.contains("loop=loop=120:size=1:start=0,setpts=N/60/TB,fps=60[vintro]"));
        assert!(graph.ends_with(
            "anullsrc=r=48000:cl=stereo,atrim=duration=2.000,asetpts=PTS-STARTPTS[aintro]"
        ));
    }

    #[test]
    fn test_intro_loop_frames_has_floor() {
        assert_eq!(intro_loop_frames(0.001), 1);
        assert_eq!(intro_loop_frames(1.5), 90);
    }
}
