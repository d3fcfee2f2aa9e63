//! The staged encode pipeline: CORE, then optionally INTRO and CONCAT.
//!
//! ```text
//! input ──► CORE (trim, fades, speed, crop, music) ──► core artifact
//!                                                         │
//!              no intro ◄─────────────────────────────────┤
//!                 │                                       ▼
//!                 │                     INTRO (still frame of the core)
//!                 │                                       │
//!                 │                     CONCAT (intro, then core; stream copy)
//!                 ▼                                       ▼
//!            Highlight-<n>.mp4                    Highlight-<n>.mp4
//! ```
//!
//! Stages run strictly in order. The first failing stage ends the job and
//! nothing after it runs.

use std::fmt;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

use hudclip_common::clock::{JobClock, StallWatch};
use hudclip_common::error::{HudclipError, HudclipResult};
use hudclip_job_model::job::{JobSpec, QualityTier};
use hudclip_job_model::result::JobResult;
use hudclip_plan_core::bitrate::SourceFacts;
use hudclip_plan_core::plan::EncodePlan;

use crate::artifacts::{move_file, next_output_path, JobArtifacts};
use crate::context::JobContext;
use crate::encoder::{concat_args, concat_list, core_args, intro_args, RateControl};
use crate::probe::SourceProber;
use crate::progress::{
    parse_out_time, ProgressReporter, COMPLETE_PROGRESS, CONCAT_PROGRESS, INTRO_PROGRESS,
};

/// Total number of stages a job can have.
const STAGE_TOTAL: u8 = 3;

/// Lines of encoder stderr kept for failure messages.
const STDERR_TAIL_LINES: usize = 20;

/// Warn after this long without the encoder's output position advancing.
pub const STALL_WARNING: Duration = Duration::from_secs(10);

/// A single encoder invocation within a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Core,
    Intro,
    Concat,
}

impl PipelineStage {
    /// 1-based position in the three-stage sequence.
    pub fn step(self) -> u8 {
        match self {
            Self::Core => 1,
            Self::Intro => 2,
            Self::Concat => 3,
        }
    }

    /// Status line emitted when this stage fails.
    pub fn failure_status(self) -> String {
        let what = match self {
            Self::Core => "Core encode",
            Self::Intro => "Intro encode",
            Self::Concat => "Concat",
        };
        format!("{what} failed (STEP {}/{STAGE_TOTAL}).", self.step())
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Core => "core encode",
            Self::Intro => "intro encode",
            Self::Concat => "concat",
        })
    }
}

/// A fully resolved process invocation for one stage.
#[derive(Debug, Clone)]
pub struct StageInvocation {
    pub stage: PipelineStage,
    pub program: PathBuf,
    pub args: Vec<String>,
    /// File the stage writes.
    pub artifact: PathBuf,
}

/// Runs stage invocations to completion.
pub trait ProcessRunner: Send {
    /// Run `invocation`, passing each progress line to `on_line`.
    ///
    /// Returns [`HudclipError::StageFailed`] when the process exits unsuccessfully.
    fn run(
        &mut self,
        invocation: &StageInvocation,
        on_line: &mut dyn FnMut(&str),
    ) -> HudclipResult<()>;
}

/// Receives job progress (0-100) and human-readable status lines.
pub trait PipelineObserver {
    fn progress(&mut self, value: u8);

    fn status(&mut self, message: String);
}

/// [`ProcessRunner`] that spawns the real encoder and follows its
/// `-progress pipe:1` stream.
#[derive(Debug, Clone)]
pub struct FfmpegRunner {
    stall_threshold: Duration,
}

impl FfmpegRunner {
    pub fn new() -> Self {
        Self {
            stall_threshold: STALL_WARNING,
        }
    }
}

impl Default for FfmpegRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessRunner for FfmpegRunner {
    fn run(
        &mut self,
        invocation: &StageInvocation,
        on_line: &mut dyn FnMut(&str),
    ) -> HudclipResult<()> {
        let stage = invocation.stage;
        tracing::debug!(%stage, args = ?invocation.args, "Running encoder");
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let started = std::time::Instant::now();
        let mut child = cmd.spawn().map_err(|e| {
            HudclipError::render(format!(
                "Failed to start {}: {e}",
                invocation.program.display()
            ))
        })?;

        tracing::info!(
            pid = child.id(),
            %stage,
            args_len = invocation.args.len(),
            "Encoder process started"
        );

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| HudclipError::render("Failed to capture encoder stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| HudclipError::render("Failed to capture encoder stderr"))?;

        // Drain stderr concurrently so the encoder never blocks on a full pipe.
        let stderr_task = std::thread::spawn(move || -> String {
            let mut reader = BufReader::new(stderr);
            let mut output = Vec::new();
            match reader.read_to_end(&mut output) {
                Ok(_) => String::from_utf8_lossy(&output).into_owned(),
                Err(err) => format!("<failed to read encoder stderr: {err}>"),
            }
        });

        let mut reader = BufReader::new(stdout);
        let mut buf = Vec::new();
        let mut stall = StallWatch::new(self.stall_threshold);
        let mut out_time_secs = 0.0f64;
        loop {
            buf.clear();
            let bytes = match reader.read_until(b'\n', &mut buf) {
                Ok(bytes) => bytes,
                Err(e) => {
                    // The child must not outlive the stage.
                    let _ = child.kill();
                    let _ = child.wait();
                    let _ = stderr_task.join();
                    return Err(HudclipError::render(format!(
                        "Failed reading encoder progress: {e}"
                    )));
                }
            };
            if bytes == 0 {
                break;
            }

            let line = String::from_utf8_lossy(&buf);
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            on_line(trimmed);

            if let Some(secs) = parse_out_time(trimmed) {
                out_time_secs = secs;
            }
            if trimmed.starts_with("progress=") && stall.observe(out_time_secs) {
                tracing::warn!(
                    %stage,
                    out_time_secs,
                    elapsed_secs = started.elapsed().as_secs_f64(),
                    "No encoder progress advancement for 10s"
                );
            }
        }

        let status = child
            .wait()
            .map_err(|e| HudclipError::render(format!("Failed to wait on encoder: {e}")))?;

        let stderr_output = stderr_task
            .join()
            .unwrap_or_else(|_| "<failed to join stderr reader>".to_string());

        if !status.success() {
            return Err(HudclipError::stage_failed(
                stage.to_string(),
                status.to_string(),
                stderr_tail(&stderr_output, STDERR_TAIL_LINES),
            ));
        }

        tracing::info!(
            %stage,
            elapsed_secs = started.elapsed().as_secs_f64(),
            "Encoder stage finished"
        );
        Ok(())
    }
}

/// Last `max_lines` non-empty lines of `output`.
fn stderr_tail(output: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = output
        .lines()
        .map(str::trim_end)
        .filter(|l| !l.is_empty())
        .collect();
    let skip = lines.len().saturating_sub(max_lines);
    lines[skip..].join("\n")
}

/// Executes one [`EncodePlan`] against its temp artifacts.
pub struct EncodePipeline<'a> {
    plan: &'a EncodePlan,
    tier: QualityTier,
    ctx: &'a JobContext,
    artifacts: &'a JobArtifacts,
}

impl<'a> EncodePipeline<'a> {
    pub fn new(
        plan: &'a EncodePlan,
        tier: QualityTier,
        ctx: &'a JobContext,
        artifacts: &'a JobArtifacts,
    ) -> Self {
        Self {
            plan,
            tier,
            ctx,
            artifacts,
        }
    }

    /// Core stage invocation.
    pub fn core_invocation(&self) -> StageInvocation {
        let rate = self.core_rate();
        StageInvocation {
            stage: PipelineStage::Core,
            program: self.ctx.ffmpeg_path.clone(),
            args: core_args(self.plan, &rate, self.artifacts.core()),
            artifact: self.artifacts.core().to_path_buf(),
        }
    }

    /// Intro stage invocation; `None` when the plan has no intro.
    pub fn intro_invocation(&self) -> Option<StageInvocation> {
        let rate = RateControl::for_intro(self.plan, self.tier, self.ctx.force_cpu);
        let args = intro_args(
            self.plan,
            &rate,
            self.artifacts.core(),
            self.artifacts.intro(),
        )?;
        Some(StageInvocation {
            stage: PipelineStage::Intro,
            program: self.ctx.ffmpeg_path.clone(),
            args,
            artifact: self.artifacts.intro().to_path_buf(),
        })
    }

    /// Concat stage invocation writing to `output`.
    pub fn concat_invocation(&self, output: &Path) -> StageInvocation {
        StageInvocation {
            stage: PipelineStage::Concat,
            program: self.ctx.ffmpeg_path.clone(),
            args: concat_args(self.artifacts.concat_list(), output),
            artifact: output.to_path_buf(),
        }
    }

    fn core_rate(&self) -> RateControl {
        RateControl::for_core(
            self.plan,
            self.tier,
            self.ctx.force_cpu,
            self.artifacts.passlog_prefix(),
        )
    }

    /// Run every stage, delivering the result to `output`.
    pub fn run(
        &self,
        output: &Path,
        runner: &mut dyn ProcessRunner,
        observer: &mut dyn PipelineObserver,
    ) -> HudclipResult<PathBuf> {
        let mut reporter = ProgressReporter::new(
            self.plan.window.output_duration_secs,
            self.plan.core_progress_weight(),
        );
        if let Some(value) = reporter.advance_to(0) {
            observer.progress(value);
        }
        for note in &self.plan.notes {
            observer.status(note.clone());
        }

        let core = self.core_invocation();
        observer.status(format!(
            "Processing video ({}).",
            self.core_rate().label()
        ));
        let core_result = runner.run(&core, &mut |line| {
            if let Some(value) = reporter.observe_line(line) {
                observer.progress(value);
            }
        });
        self.check_stage(PipelineStage::Core, core_result, observer)?;

        let Some(intro) = self.intro_invocation() else {
            move_file(self.artifacts.core(), output)?;
            return Ok(self.finish(output, &mut reporter, observer));
        };

        if let Some(value) = reporter.advance_to(INTRO_PROGRESS) {
            observer.progress(value);
        }
        observer.status(format!(
            "Rendering intro still (STEP 2/{STAGE_TOTAL})."
        ));
        let intro_result = runner.run(&intro, &mut |_| {});
        self.check_stage(PipelineStage::Intro, intro_result, observer)?;

        std::fs::write(
            self.artifacts.concat_list(),
            concat_list(&[self.artifacts.intro(), self.artifacts.core()]),
        )?;
        if let Some(value) = reporter.advance_to(CONCAT_PROGRESS) {
            observer.progress(value);
        }
        observer.status(format!(
            "Joining intro and clip (STEP 3/{STAGE_TOTAL})."
        ));
        let concat = self.concat_invocation(output);
        let concat_result = runner.run(&concat, &mut |_| {});
        if concat_result.is_err() {
            remove_partial_output(output);
        }
        self.check_stage(PipelineStage::Concat, concat_result, observer)?;

        Ok(self.finish(output, &mut reporter, observer))
    }

    fn check_stage(
        &self,
        stage: PipelineStage,
        result: HudclipResult<()>,
        observer: &mut dyn PipelineObserver,
    ) -> HudclipResult<()> {
        if let Err(e) = &result {
            tracing::error!(%stage, step = stage.step(), error = %e, "Pipeline stage failed");
            observer.status(stage.failure_status());
        }
        result
    }

    fn finish(
        &self,
        output: &Path,
        reporter: &mut ProgressReporter,
        observer: &mut dyn PipelineObserver,
    ) -> PathBuf {
        if let Some(value) = reporter.advance_to(COMPLETE_PROGRESS) {
            observer.progress(value);
        }
        observer.status(format!("Done: {}", output.display()));
        output.to_path_buf()
    }
}

fn remove_partial_output(output: &Path) {
    match std::fs::remove_file(output) {
        Ok(()) => tracing::debug!(path = %output.display(), "Removed partial output"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(path = %output.display(), error = %e, "Failed to remove partial output")
        }
    }
}

/// Collect the facts planning needs: file size, audio bitrate for
/// match-source mode, and whether the music file is present.
///
/// Audio probe failures are absorbed with a status note.
pub fn gather_facts(
    spec: &JobSpec,
    prober: &dyn SourceProber,
    observer: &mut dyn PipelineObserver,
) -> SourceFacts {
    let size_bytes = std::fs::metadata(&spec.input_path)
        .map(|m| m.len())
        .map_err(|e| e.to_string());

    let audio_kbps = if spec.quality == QualityTier::Source {
        match prober.audio_kbps(&spec.input_path) {
            Ok(kbps) => Some(kbps),
            Err(e) => {
                tracing::warn!(error = %e, "Audio bitrate probe failed; using default");
                observer.status(format!(
                    "Could not read source audio bitrate ({e}); using default."
                ));
                None
            }
        }
    } else {
        None
    };

    let music_available = spec
        .music
        .as_ref()
        .map_or(false, |track| track.path.is_file());

    SourceFacts {
        size_bytes,
        audio_kbps,
        music_available,
    }
}

/// Run a job start to finish on the current thread.
///
/// Every outcome is reported as exactly one [`JobResult`]; temp artifacts
/// are gone by the time this returns.
pub fn run_job(
    spec: &JobSpec,
    ctx: &JobContext,
    prober: &dyn SourceProber,
    runner: &mut dyn ProcessRunner,
    observer: &mut dyn PipelineObserver,
) -> JobResult {
    let clock = JobClock::start();
    tracing::info!(
        input = %spec.input_path.display(),
        start_secs = spec.start_secs,
        end_secs = spec.end_secs,
        quality = spec.quality.level(),
        mobile = spec.mobile,
        started_at = %clock.epoch_wall(),
        "Render job started"
    );

    match execute(spec, ctx, prober, runner, observer, &clock) {
        Ok(output) => {
            tracing::info!(
                output = %output.display(),
                elapsed_secs = clock.elapsed_secs(),
                "Render job finished"
            );
            JobResult::success(output)
        }
        Err(e) => {
            tracing::error!(
                input = %spec.input_path.display(),
                error = %e,
                elapsed_secs = clock.elapsed_secs(),
                "Render job failed"
            );
            JobResult::failure(e.to_string())
        }
    }
}

fn execute(
    spec: &JobSpec,
    ctx: &JobContext,
    prober: &dyn SourceProber,
    runner: &mut dyn ProcessRunner,
    observer: &mut dyn PipelineObserver,
    clock: &JobClock,
) -> HudclipResult<PathBuf> {
    if !spec.input_path.is_file() {
        return Err(HudclipError::FileNotFound {
            path: spec.input_path.clone(),
        });
    }

    let facts = gather_facts(spec, prober, observer);
    let plan = EncodePlan::derive(spec, &facts, ctx.audio_kbps_override)?;
    std::fs::create_dir_all(&ctx.temp_dir)?;
    let artifacts = JobArtifacts::new(&ctx.temp_dir, clock.unix_stamp());
    let output = next_output_path(&ctx.output_dir)?;
    tracing::debug!(
        output = %output.display(),
        stages = plan.stage_count(),
        core = %artifacts.core().display(),
        "Pipeline prepared"
    );

    let result =
        EncodePipeline::new(&plan, spec.quality, ctx, &artifacts).run(&output, runner, observer);
    if result.is_err() {
        // Release the reserved name.
        remove_partial_output(&output);
    }
    result
}
