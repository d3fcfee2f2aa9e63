//! Show source information.

use std::path::PathBuf;

use hudclip_common::clock::format_timecode;
use hudclip_common::config::AppConfig;
use hudclip_render_engine::{FfprobeProber, SourceProber};

pub fn run(input: PathBuf, config: &AppConfig) -> anyhow::Result<()> {
    let prober = FfprobeProber::new(config.ffprobe_path.clone());
    let info = prober
        .source_info(&input)
        .map_err(|e| anyhow::anyhow!("Failed to probe {}: {e}", input.display()))?;

    let resolution = info.resolution();
    println!("Source: {}", input.display());
    println!(
        "  Resolution: {}x{}{}",
        info.width,
        info.height,
        if resolution.is_recognized() {
            ""
        } else {
            " (generic HUD layout)"
        }
    );
    println!(
        "  Duration: {} ({:.3}s)",
        format_timecode(info.duration_secs),
        info.duration_secs
    );
    println!(
        "  Size: {:.1} MB",
        info.size_bytes as f64 / (1024.0 * 1024.0)
    );
    match info.audio_kbps {
        Some(kbps) => println!("  Audio bitrate: {kbps} kbps"),
        None => println!("  Audio bitrate: unknown"),
    }

    Ok(())
}
