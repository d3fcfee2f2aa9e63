//! Render a highlight clip.

use std::io::Write;

use hudclip_common::config::AppConfig;
use hudclip_job_model::result::JobResult;
use hudclip_render_engine::spawn_job;

use super::job::{build_spec, job_context, ClipArgs};

pub async fn run(args: ClipArgs, config: &AppConfig) -> anyhow::Result<()> {
    let spec = build_spec(&args, config)?;
    let ctx = job_context(&args, config);

    println!("Rendering: {}", spec.input_path.display());
    println!(
        "  Clip: {:.2}s - {:.2}s ({})",
        spec.start_secs, spec.end_secs, spec.quality
    );
    println!("  Source: {}", spec.resolution);
    println!("  Output directory: {}", ctx.output_dir.display());

    let mut handle = spawn_job(spec, ctx);
    let mut progress_open = true;
    let mut status_open = true;
    while progress_open || status_open {
        tokio::select! {
            value = handle.progress.recv(), if progress_open => match value {
                Some(p) => {
                    print!("\r  Progress: {p:>3}%  ");
                    std::io::stdout().flush().ok();
                }
                None => progress_open = false,
            },
            message = handle.status.recv(), if status_open => match message {
                Some(m) => println!("\n  {m}"),
                None => status_open = false,
            },
        }
    }

    match handle.join().await {
        JobResult::Success { output } => {
            println!("\nRender complete: {}", output.display());
            Ok(())
        }
        JobResult::Failure { message } => {
            println!();
            Err(anyhow::anyhow!("Render failed: {message}"))
        }
    }
}
