//! ffmpeg argument construction for each pipeline stage.

use std::path::Path;

use hudclip_job_model::job::QualityTier;
use hudclip_plan_core::plan::EncodePlan;

/// Keyframe interval (frames) shared by every hardware encode.
const GOP_FRAMES: &str = "60";

/// Audio sample rate of every stage; concat copies streams, so they must agree.
const AUDIO_SAMPLE_RATE: &str = "48000";

/// Video rate control for one encode.
#[derive(Debug, Clone, PartialEq)]
pub enum RateControl {
    /// NVENC constant bitrate; used for short clips and the intro.
    NvencCbr { kbps: u32 },
    /// NVENC two-pass variable bitrate.
    NvencVbr { kbps: u32, passlog_prefix: String },
    /// libx264 constant rate factor.
    CpuCrf { crf: u8 },
}

impl RateControl {
    /// Rate control for the core stage.
    pub fn for_core(plan: &EncodePlan, tier: QualityTier, force_cpu: bool, passlog: &Path) -> Self {
        if force_cpu {
            return Self::cpu(tier);
        }
        let kbps = plan.budget.video_kbps;
        if plan.strict_size() {
            Self::NvencCbr { kbps }
        } else {
            Self::NvencVbr {
                kbps,
                passlog_prefix: passlog.to_string_lossy().into_owned(),
            }
        }
    }

    /// Rate control for the intro stage: strict CBR, or the same CPU
    /// encoder as the core so the segments concat cleanly.
    pub fn for_intro(plan: &EncodePlan, tier: QualityTier, force_cpu: bool) -> Self {
        if force_cpu {
            Self::cpu(tier)
        } else {
            Self::NvencCbr {
                kbps: plan.budget.video_kbps,
            }
        }
    }

    fn cpu(tier: QualityTier) -> Self {
        let crf = if tier == QualityTier::Source { 18 } else { 23 };
        Self::CpuCrf { crf }
    }

    /// Human-readable label for status messages.
    pub fn label(&self) -> &'static str {
        match self {
            Self::NvencCbr { .. } => "NVENC CBR (strict size)",
            Self::NvencVbr { .. } => "NVENC VBR (two-pass)",
            Self::CpuCrf { .. } => "CPU libx264",
        }
    }

    pub fn video_args(&self) -> Vec<String> {
        match self {
            Self::NvencCbr { kbps } => {
                let rate = format!("{kbps}k");
                strings(&[
                    "-c:v",
                    "h264_nvenc",
                    "-rc",
                    "cbr",
                    "-tune",
                    "hq",
                    "-b:v",
                    rate.as_str(),
                    "-maxrate",
                    rate.as_str(),
                    "-bufsize",
                    rate.as_str(),
                    "-g",
                    GOP_FRAMES,
                    "-keyint_min",
                    GOP_FRAMES,
                    "-forced-idr",
                    "1",
                    "-rc-lookahead",
                    "0",
                    "-bf",
                    "0",
                    "-b_ref_mode",
                    "disabled",
                ])
            }
            Self::NvencVbr {
                kbps,
                passlog_prefix,
            } => {
                let rate = format!("{kbps}k");
                let maxrate = format!("{}k", (*kbps as f64 * 1.05) as u32);
                let bufsize = format!("{}k", (*kbps as f64 * 1.2) as u32);
                strings(&[
                    "-c:v",
                    "h264_nvenc",
                    "-rc",
                    "vbr",
                    "-tune",
                    "hq",
                    "-multipass",
                    "2",
                    "-b:v",
                    rate.as_str(),
                    "-maxrate",
                    maxrate.as_str(),
                    "-bufsize",
                    bufsize.as_str(),
                    "-g",
                    GOP_FRAMES,
                    "-keyint_min",
                    GOP_FRAMES,
                    "-forced-idr",
                    "1",
                    "-rc-lookahead",
                    "8",
                    "-bf",
                    "1",
                    "-b_ref_mode",
                    "disabled",
                    "-passlogfile",
                    passlog_prefix.as_str(),
                ])
            }
            Self::CpuCrf { crf } => {
                let crf = crf.to_string();
                strings(&["-c:v", "libx264", "-preset", "veryfast", "-crf", crf.as_str()])
            }
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Options every invocation starts with. Progress goes to stdout as
/// `key=value` lines; stderr only carries errors.
fn common_prefix() -> Vec<String> {
    strings(&[
        "-y",
        "-hide_banner",
        "-nostats",
        "-loglevel",
        "error",
        "-progress",
        "pipe:1",
    ])
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Arguments for the core encode.
pub fn core_args(plan: &EncodePlan, rate: &RateControl, output: &Path) -> Vec<String> {
    let seek_start = format!("{:.3}", plan.window.seek_start_secs);
    let seek_length = format!("{:.3}", plan.window.seek_length_secs);
    let mut args = common_prefix();
    args.extend(strings(&[
        "-hwaccel",
        "auto",
        "-ss",
        seek_start.as_str(),
        "-t",
        seek_length.as_str(),
        "-i",
    ]));
    args.push(path_arg(&plan.input_path));
    if let Some(music) = &plan.music {
        args.push("-i".to_string());
        args.push(path_arg(&music.path));
    }
    args.extend(rate.video_args());
    args.extend(strings(&[
        "-pix_fmt",
        "yuv420p",
        "-movflags",
        "+faststart",
        "-filter_complex",
        plan.core_filter_graph.as_str(),
        "-map",
        "[vcore]",
        "-map",
        "[acore]",
    ]));
    args.extend(audio_args(plan.budget.audio_kbps));
    args.extend(strings(&["-avoid_negative_ts", "make_zero", "-shortest"]));
    args.push(path_arg(output));
    args
}

/// Arguments for the intro encode, reading the finished core artifact.
///
/// Returns `None` when the plan has no intro.
pub fn intro_args(
    plan: &EncodePlan,
    rate: &RateControl,
    core: &Path,
    output: &Path,
) -> Option<Vec<String>> {
    let intro = plan.intro.as_ref()?;
    let mut args = common_prefix();
    args.extend(strings(&["-hwaccel", "auto", "-i"]));
    args.push(path_arg(core));
    args.extend(rate.video_args());
    args.extend(strings(&[
        "-pix_fmt",
        "yuv420p",
        "-movflags",
        "+faststart",
        "-filter_complex",
        intro.filter_graph.as_str(),
        "-map",
        "[vintro]",
        "-map",
        "[aintro]",
    ]));
    args.extend(audio_args(plan.budget.audio_kbps));
    args.push("-shortest".to_string());
    args.push(path_arg(output));
    Some(args)
}

/// Arguments for the stream-copy concat of intro then core.
pub fn concat_args(list: &Path, output: &Path) -> Vec<String> {
    let mut args = common_prefix();
    args.extend(strings(&["-f", "concat", "-safe", "0", "-i"]));
    args.push(path_arg(list));
    args.extend(strings(&["-c", "copy", "-movflags", "+faststart"]));
    args.push(path_arg(output));
    args
}

/// Concat demuxer list: one `file '<path>'` line per segment, forward slashes.
pub fn concat_list(segments: &[&Path]) -> String {
    segments
        .iter()
        .map(|path| {
            let normalized = path.to_string_lossy().replace('\\', "/");
            format!("file '{}'\n", normalized.replace('\'', "'\\''"))
        })
        .collect()
}

fn audio_args(kbps: u32) -> Vec<String> {
    let rate = format!("{kbps}k");
    strings(&["-c:a", "aac", "-b:a", rate.as_str(), "-ar", AUDIO_SAMPLE_RATE])
}

#[cfg(test)]
mod tests {
    use super::*;
    use hudclip_job_model::job::{JobSpec, MusicTrack};
    use hudclip_plan_core::bitrate::SourceFacts;
    use std::path::PathBuf;

    fn plan_for(end: f64, intro: f64) -> EncodePlan {
        let mut spec = JobSpec::new("/in/match.mp4", 10.0, end);
        spec.total_duration_secs = 300.0;
        spec.intro.still_secs = intro;
        EncodePlan::derive(&spec, &SourceFacts::new(0), None).unwrap()
    }

    fn window_after<'a>(args: &'a [String], flag: &str) -> &'a str {
        let index = args.iter().position(|a| a == flag).unwrap();
        &args[index + 1]
    }

    #[test]
    fn test_short_clip_uses_cbr() {
        let plan = plan_for(20.0, 0.0);
        assert!(plan.strict_size());
        let rate = RateControl::for_core(&plan, QualityTier::Standard, false, Path::new("/tmp/p"));
        assert_eq!(
            rate,
            RateControl::NvencCbr {
                kbps: plan.budget.video_kbps
            }
        );
        let args = rate.video_args();
        assert_eq!(window_after(&args, "-rc"), "cbr");
        assert_eq!(window_after(&args, "-bf"), "0");
        assert_eq!(window_after(&args, "-rc-lookahead"), "0");
    }

    #[test]
    fn test_long_clip_uses_vbr_with_passlog() {
        let plan = plan_for(60.0, 0.0);
        let rate = RateControl::for_core(&plan, QualityTier::Standard, false, Path::new("/tmp/passlog-1-2"));
        let args = rate.video_args();
        let kbps = plan.budget.video_kbps;
        assert_eq!(window_after(&args, "-rc"), "vbr");
        assert_eq!(window_after(&args, "-multipass"), "2");
        assert_eq!(
            window_after(&args, "-maxrate"),
            format!("{}k", (kbps as f64 * 1.05) as u32)
        );
        assert_eq!(
            window_after(&args, "-bufsize"),
            format!("{}k", (kbps as f64 * 1.2) as u32)
        );
        assert_eq!(window_after(&args, "-passlogfile"), "/tmp/passlog-1-2");
    }

    #[test]
    fn test_forced_cpu_uses_crf() {
        let plan = plan_for(60.0, 0.0);
        let rate = RateControl::for_core(&plan, QualityTier::Source, true, Path::new("/tmp/p"));
        assert_eq!(rate, RateControl::CpuCrf { crf: 18 });
        assert_eq!(
            RateControl::for_intro(&plan, QualityTier::Good, true),
            RateControl::CpuCrf { crf: 23 }
        );
    }

    #[test]
    fn test_core_args_layout() {
        let plan = plan_for(40.0, 0.0);
        let rate = RateControl::for_core(&plan, QualityTier::Standard, false, Path::new("/tmp/p"));
        let args = core_args(&plan, &rate, Path::new("/tmp/core-1-2.mp4"));
        assert_eq!(window_after(&args, "-progress"), "pipe:1");
        assert_eq!(window_after(&args, "-ss"), "8.500");
        assert_eq!(window_after(&args, "-t"), "33.000");
        assert_eq!(window_after(&args, "-i"), "/in/match.mp4");
        assert_eq!(window_after(&args, "-b:a"), "128k");
        assert_eq!(window_after(&args, "-ar"), "48000");
        assert_eq!(args.last().map(String::as_str), Some("/tmp/core-1-2.mp4"));
    }

    #[test]
    fn test_core_args_add_music_input() {
        let mut spec = JobSpec::new("/in/match.mp4", 10.0, 40.0);
        spec.total_duration_secs = 300.0;
        spec.music = Some(MusicTrack {
            path: PathBuf::from("/music/track.mp3"),
            volume: Some(0.35),
            offset_secs: 0.0,
        });
        let plan = EncodePlan::derive(&spec, &SourceFacts::new(0), None).unwrap();
        let rate = RateControl::for_core(&plan, QualityTier::Standard, false, Path::new("/tmp/p"));
        let args = core_args(&plan, &rate, Path::new("/tmp/core.mp4"));

        let inputs: Vec<&str> = args
            .iter()
            .enumerate()
            .filter(|(_, a)| *a == "-i")
            .map(|(i, _)| args[i + 1].as_str())
            .collect();
        assert_eq!(inputs, vec!["/in/match.mp4", "/music/track.mp3"]);

        let graph = window_after(&args, "-filter_complex");
        assert!(graph.contains("[1:a]"), "{graph}");
        assert!(graph.contains("volume=0.35"), "{graph}");
        assert_eq!(window_after(&args, "-map"), "[vcore]");
    }

    #[test]
    fn test_intro_args_read_core_artifact() {
        let plan = plan_for(40.0, 2.0);
        let rate = RateControl::for_intro(&plan, QualityTier::Standard, false);
        let args = intro_args(&plan, &rate, Path::new("/tmp/core.mp4"), Path::new("/tmp/intro.mp4"))
            .unwrap();
        assert_eq!(window_after(&args, "-i"), "/tmp/core.mp4");
        assert!(args.iter().any(|a| a == "[vintro]"));
        assert!(intro_args(&plan_for(40.0, 0.0), &rate, Path::new("a"), Path::new("b")).is_none());
    }

    #[test]
    fn test_concat_list_and_args() {
        let intro = PathBuf::from("C:\\temp\\intro.mp4");
        let core = PathBuf::from("/tmp/core.mp4");
        assert_eq!(
            concat_list(&[intro.as_path(), core.as_path()]),
            "file 'C:/temp/intro.mp4'\nfile '/tmp/core.mp4'\n"
        );
        let args = concat_args(Path::new("/tmp/list.txt"), Path::new("/out/Highlight-1.mp4"));
        assert_eq!(window_after(&args, "-f"), "concat");
        assert_eq!(window_after(&args, "-c"), "copy");
    }
}
