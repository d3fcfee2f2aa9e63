//! Check encoder availability.

use std::path::Path;
use std::process::{Command, Stdio};

use hudclip_common::config::AppConfig;
use hudclip_render_engine::command_exists;

pub fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("HudClip System Check");
    println!("{}", "=".repeat(50));

    let ffmpeg_ok = report_tool("ffmpeg", &config.ffmpeg_path);
    let ffprobe_ok = report_tool("ffprobe", &config.ffprobe_path);

    if ffmpeg_ok {
        if config.force_cpu {
            println!("[OK] Encoder: libx264 (CPU forced)");
        } else if has_encoder(&config.ffmpeg_path, "h264_nvenc") {
            println!("[OK] Encoder: h264_nvenc");
        } else {
            println!("[WARN] Encoder: h264_nvenc not listed; set HUDCLIP_FORCE_CPU=1 or force_cpu in config");
        }
    }
    println!("[OK] Output directory: {}", config.output_dir.display());

    println!();
    if ffmpeg_ok && ffprobe_ok {
        println!("All required tools are available. HudClip is ready.");
        Ok(())
    } else {
        Err(anyhow::anyhow!(
            "Required tools are missing. Install ffmpeg or set ffmpeg_path/ffprobe_path in the config."
        ))
    }
}

fn report_tool(name: &str, path: &Path) -> bool {
    let ok = command_exists(path);
    if ok {
        println!("[OK] {name}: {}", path.display());
    } else {
        println!("[MISSING] {name}: {} is not runnable", path.display());
    }
    ok
}

fn has_encoder(ffmpeg: &Path, encoder: &str) -> bool {
    Command::new(ffmpeg)
        .args(["-hide_banner", "-encoders"])
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .map(|out| {
            String::from_utf8_lossy(&out.stdout)
                .split_whitespace()
                .any(|word| word == encoder)
        })
        .unwrap_or(false)
}
