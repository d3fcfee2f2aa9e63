//! Print the encode plan for a clip without running the encoder.

use hudclip_common::config::AppConfig;
use hudclip_common::clock::JobClock;
use hudclip_plan_core::plan::EncodePlan;
use hudclip_render_engine::artifacts::JobArtifacts;
use hudclip_render_engine::pipeline::gather_facts;
use hudclip_render_engine::{EncodePipeline, FfprobeProber, PipelineObserver, StageInvocation};

use super::job::{build_spec, job_context, ClipArgs};

/// Prints probe notes as they arrive.
struct PrintNotes;

impl PipelineObserver for PrintNotes {
    fn progress(&mut self, _value: u8) {}

    fn status(&mut self, message: String) {
        println!("# {message}");
    }
}

pub fn run(args: ClipArgs, config: &AppConfig) -> anyhow::Result<()> {
    let spec = build_spec(&args, config)?;
    let ctx = job_context(&args, config);
    let prober = FfprobeProber::new(ctx.ffprobe_path.clone());

    let facts = gather_facts(&spec, &prober, &mut PrintNotes);
    let plan = EncodePlan::derive(&spec, &facts, ctx.audio_kbps_override)?;
    println!("{}", serde_json::to_string_pretty(&plan)?);

    let artifacts = JobArtifacts::new(&ctx.temp_dir, JobClock::start().unix_stamp());
    let pipeline = EncodePipeline::new(&plan, spec.quality, &ctx, &artifacts);
    let output = ctx.output_dir.join("Highlight-<n>.mp4");

    println!();
    print_invocation(&pipeline.core_invocation());
    if let Some(intro) = pipeline.intro_invocation() {
        print_invocation(&intro);
        print_invocation(&pipeline.concat_invocation(&output));
    }
    Ok(())
}

fn print_invocation(invocation: &StageInvocation) {
    println!("# STEP {}: {}", invocation.stage.step(), invocation.stage);
    let quoted: Vec<String> = invocation.args.iter().map(|a| shell_quote(a)).collect();
    println!("{} {}", invocation.program.display(), quoted.join(" "));
}

fn shell_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=+,".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', "'\\''"))
    }
}
