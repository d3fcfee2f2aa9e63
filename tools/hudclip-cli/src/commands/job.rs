//! Clip arguments shared by `render` and `plan`.

use std::path::PathBuf;

use anyhow::{anyhow, Context};
use clap::Args;
use hudclip_common::clock::parse_timecode;
use hudclip_common::config::AppConfig;
use hudclip_job_model::job::{JobSpec, MusicTrack, QualityTier};
use hudclip_job_model::resolution::SourceResolution;
use hudclip_render_engine::{FfprobeProber, JobContext, SourceProber};

/// Times accept seconds, `MM:SS(.ff)` or `HH:MM:SS(.ff)`.
#[derive(Args, Debug, Clone)]
pub struct ClipArgs {
    /// Source video
    pub input: PathBuf,

    /// Clip start
    #[arg(short, long)]
    pub start: String,

    /// Clip end
    #[arg(short, long)]
    pub end: String,

    /// Source resolution as WIDTHxHEIGHT (probed when omitted)
    #[arg(long)]
    pub resolution: Option<String>,

    /// Total source duration (probed when omitted)
    #[arg(long)]
    pub duration: Option<String>,

    /// Portrait 9:16 output with HUD overlays
    #[arg(long)]
    pub mobile: bool,

    /// Playback speed multiplier
    #[arg(long, default_value = "1.0")]
    pub speed: f64,

    /// Quality tier 0-4 (4 matches the source size)
    #[arg(short, long)]
    pub quality: Option<u8>,

    /// Include the teammates overlay in mobile output
    #[arg(long)]
    pub teammates: bool,

    /// Background music file
    #[arg(long)]
    pub music: Option<PathBuf>,

    /// Background music volume [0.0, 1.0]
    #[arg(long)]
    pub music_volume: Option<f64>,

    /// Skip this far into the music track
    #[arg(long)]
    pub music_offset: Option<String>,

    /// Cut exactly at start/end without fades
    #[arg(long)]
    pub no_fades: bool,

    /// Seconds of still-frame intro to prepend
    #[arg(long)]
    pub intro_still: Option<f64>,

    /// Clip time of the intro frame (defaults to the clip midpoint)
    #[arg(long)]
    pub intro_at: Option<String>,

    /// Output directory
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Encode with libx264 instead of NVENC
    #[arg(long)]
    pub force_cpu: bool,
}

fn timecode(label: &str, value: &str) -> anyhow::Result<f64> {
    parse_timecode(value).ok_or_else(|| anyhow!("Invalid {label} time: {value:?}"))
}

/// Build the job from arguments and configured defaults, probing the
/// source for anything not given on the command line.
pub fn build_spec(args: &ClipArgs, config: &AppConfig) -> anyhow::Result<JobSpec> {
    let start = timecode("start", &args.start)?;
    let end = timecode("end", &args.end)?;
    let mut spec = JobSpec::new(&args.input, start, end);

    let given_resolution = args.resolution.as_deref().map(|r| {
        r.parse::<SourceResolution>()
            .unwrap_or_else(|never| match never {})
    });
    let given_duration = args
        .duration
        .as_deref()
        .map(|d| timecode("duration", d))
        .transpose()?;

    if given_resolution.is_none() || given_duration.is_none() {
        let prober = FfprobeProber::new(config.ffprobe_path.clone());
        match prober.source_info(&args.input) {
            Ok(info) => {
                spec.resolution = info.resolution();
                spec.total_duration_secs = info.duration_secs;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Source probe failed; using defaults");
                eprintln!("Warning: could not probe {}: {e}", args.input.display());
            }
        }
    }
    if let Some(resolution) = given_resolution {
        spec.resolution = resolution;
    }
    if let Some(duration) = given_duration {
        spec.total_duration_secs = duration;
    }

    let defaults = &config.defaults;
    spec.quality = QualityTier::try_from(args.quality.unwrap_or(defaults.quality_tier))?;
    spec.mobile = args.mobile || defaults.mobile;
    spec.speed = args.speed;
    spec.teammates_overlay = args.teammates || defaults.teammates_overlay;
    spec.disable_fades = args.no_fades || defaults.disable_fades;
    spec.intro.still_secs = args.intro_still.unwrap_or(defaults.intro_still_secs);
    spec.intro.frame_at_secs = args
        .intro_at
        .as_deref()
        .map(|t| timecode("intro", t))
        .transpose()?;
    spec.intro.from_midpoint = spec.intro.frame_at_secs.is_none();

    if let Some(path) = &args.music {
        let offset_secs = args
            .music_offset
            .as_deref()
            .map(|t| timecode("music offset", t))
            .transpose()?
            .unwrap_or(0.0);
        spec.music = Some(MusicTrack {
            path: path.clone(),
            volume: Some(args.music_volume.unwrap_or(defaults.music_volume)),
            offset_secs,
        });
    }

    spec.validate().context("Invalid clip")?;
    Ok(spec)
}

/// Job environment from config with command-line overrides applied.
pub fn job_context(args: &ClipArgs, config: &AppConfig) -> JobContext {
    let mut ctx = JobContext::from_config(config);
    if let Some(dir) = &args.output_dir {
        ctx.output_dir = dir.clone();
    }
    ctx.force_cpu |= args.force_cpu;
    ctx
}
