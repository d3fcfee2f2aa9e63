//! Source inspection through ffprobe.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::{Deserialize, Serialize};

use hudclip_common::error::{HudclipError, HudclipResult};
use hudclip_job_model::resolution::SourceResolution;
use hudclip_plan_core::bitrate::audio_kbps_from_bit_rate;

/// What the front end needs to know about a source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceInfo {
    pub width: u32,
    pub height: u32,
    pub duration_secs: f64,
    pub size_bytes: u64,
    /// Bit rate of the first audio stream, when it reports one.
    pub audio_kbps: Option<u32>,
}

impl SourceInfo {
    pub fn resolution(&self) -> SourceResolution {
        SourceResolution::from_dimensions(self.width, self.height)
    }
}

/// Reads stream facts from a media file.
pub trait SourceProber: Send + Sync {
    /// Bit rate of the first audio stream in kbps.
    fn audio_kbps(&self, path: &Path) -> HudclipResult<u32>;

    /// Dimensions, duration and size of the source.
    fn source_info(&self, path: &Path) -> HudclipResult<SourceInfo>;
}

/// [`SourceProber`] backed by the `ffprobe` executable.
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    ffprobe: PathBuf,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    bit_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
    size: Option<String>,
}

impl FfprobeProber {
    pub fn new(ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffprobe: ffprobe.into(),
        }
    }

    fn run(&self, path: &Path, args: &[&str]) -> HudclipResult<ProbeOutput> {
        let output = Command::new(&self.ffprobe)
            .args(["-v", "error"])
            .args(args)
            .args(["-of", "json"])
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                HudclipError::probe(format!(
                    "Failed to start {}: {e}",
                    self.ffprobe.display()
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(HudclipError::probe(format!(
                "ffprobe failed (status {}): {}",
                output.status,
                stderr.trim()
            )));
        }

        parse_probe_output(&output.stdout)
    }
}

impl Default for FfprobeProber {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

impl SourceProber for FfprobeProber {
    fn audio_kbps(&self, path: &Path) -> HudclipResult<u32> {
        let probed = self.run(
            path,
            &["-select_streams", "a:0", "-show_entries", "stream=codec_type,bit_rate"],
        )?;
        let kbps = audio_kbps_of(&probed)
            .ok_or_else(|| HudclipError::probe("Audio stream reports no bit rate"))?;
        tracing::debug!(path = %path.display(), kbps, "Probed audio bitrate");
        Ok(kbps)
    }

    fn source_info(&self, path: &Path) -> HudclipResult<SourceInfo> {
        let probed = self.run(
            path,
            &[
                "-show_entries",
                "stream=codec_type,width,height,bit_rate:format=duration,size",
            ],
        )?;
        source_info_of(&probed, path)
    }
}

fn parse_probe_output(stdout: &[u8]) -> HudclipResult<ProbeOutput> {
    serde_json::from_slice(stdout)
        .map_err(|e| HudclipError::probe(format!("Unreadable ffprobe output: {e}")))
}

fn audio_kbps_of(probed: &ProbeOutput) -> Option<u32> {
    probed
        .streams
        .iter()
        .filter(|s| s.codec_type.as_deref().map_or(true, |t| t == "audio"))
        .find_map(|s| s.bit_rate.as_deref()?.trim().parse::<f64>().ok())
        .and_then(audio_kbps_from_bit_rate)
}

fn source_info_of(probed: &ProbeOutput, path: &Path) -> HudclipResult<SourceInfo> {
    let video = probed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video") && s.width.is_some())
        .ok_or_else(|| HudclipError::probe(format!("No video stream in {}", path.display())))?;
    let (width, height) = match (video.width, video.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => return Err(HudclipError::probe("Video stream has no dimensions")),
    };

    let format = probed.format.as_ref();
    let duration_secs = format
        .and_then(|f| f.duration.as_deref()?.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0)
        .unwrap_or(0.0);
    let size_bytes = format
        .and_then(|f| f.size.as_deref()?.trim().parse::<u64>().ok())
        .or_else(|| std::fs::metadata(path).ok().map(|m| m.len()))
        .unwrap_or(0);

    Ok(SourceInfo {
        width,
        height,
        duration_secs,
        size_bytes,
        audio_kbps: audio_kbps_of(probed),
    })
}

/// Whether `binary` can be started (it answers `-version`).
pub fn command_exists(binary: &Path) -> bool {
    Command::new(binary)
        .arg("-version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"{
        "streams": [
            {"codec_type": "video", "width": 1920, "height": 1080},
            {"codec_type": "audio", "bit_rate": "160000"}
        ],
        "format": {"duration": "183.416000", "size": "734003200"}
    }"#;

    #[test]
    fn test_source_info_from_json() {
        let probed = parse_probe_output(FULL.as_bytes()).unwrap();
        let info = source_info_of(&probed, Path::new("/clips/a.mp4")).unwrap();
        assert_eq!(info.width, 1920);
        assert_eq!(info.height, 1080);
        assert!((info.duration_secs - 183.416).abs() < 1e-9);
        assert_eq!(info.size_bytes, 734_003_200);
        assert_eq!(info.audio_kbps, Some(160));
        assert_eq!(info.resolution(), SourceResolution::Hd1080);
    }

    #[test]
    fn test_audio_only_selection() {
        let probed =
            parse_probe_output(br#"{"streams": [{"codec_type": "audio", "bit_rate": "127999"}]}"#)
                .unwrap();
        assert_eq!(audio_kbps_of(&probed), Some(128));

        let silent = parse_probe_output(br#"{"streams": []}"#).unwrap();
        assert_eq!(audio_kbps_of(&silent), None);
    }

    #[test]
    fn test_missing_video_stream_is_probe_error() {
        let probed =
            parse_probe_output(br#"{"streams": [{"codec_type": "audio"}], "format": {}}"#).unwrap();
        let err = source_info_of(&probed, Path::new("/clips/a.mp4")).unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_garbage_output_is_probe_error() {
        assert!(matches!(
            parse_probe_output(b"not json"),
            Err(HudclipError::Probe { .. })
        ));
    }

    #[test]
    fn test_missing_binary_does_not_exist() {
        assert!(!command_exists(Path::new("/nonexistent/hudclip-ffmpeg")));
    }
}
