//! Per-process settings a render job runs with.

use std::path::PathBuf;

use hudclip_common::config::AppConfig;

/// Environment of a job: tool locations, output and temp directories,
/// encoder overrides.
#[derive(Debug, Clone)]
pub struct JobContext {
    pub output_dir: PathBuf,
    pub ffmpeg_path: PathBuf,
    pub ffprobe_path: PathBuf,
    /// Use libx264 instead of NVENC.
    pub force_cpu: bool,
    pub audio_kbps_override: Option<u32>,
    pub temp_dir: PathBuf,
}

impl JobContext {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            output_dir: config.output_dir.clone(),
            ffmpeg_path: config.ffmpeg_path.clone(),
            ffprobe_path: config.ffprobe_path.clone(),
            force_cpu: config.force_cpu,
            audio_kbps_override: config.audio_kbps_override,
            temp_dir: std::env::temp_dir(),
        }
    }
}

impl Default for JobContext {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}
