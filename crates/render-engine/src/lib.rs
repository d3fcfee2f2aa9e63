//! HudClip Render Engine
//!
//! Turns an [`EncodePlan`](hudclip_plan_core::plan::EncodePlan) into a
//! finished `Highlight-<n>.mp4` by supervising ffmpeg through up to three
//! stages, reporting progress and status over channels.
//!
//! # Pipeline Architecture
//!
//! ```text
//! JobSpec ──► probe (size, audio kbps) ──► EncodePlan
//!                                             │
//!                                             ├── CORE encode ──► core-<pid>-<ts>.mp4
//!                                             │         │
//!                                             │         ├── INTRO encode ──► intro-<pid>-<ts>.mp4
//!                                             │         │         │
//!                                             │         │         └── CONCAT ──┐
//!                                             │         └──────────(move)──────┤
//!                                             ▼                                ▼
//!                                     progress / status                 Highlight-<n>.mp4
//! ```

pub mod artifacts;
pub mod context;
pub mod encoder;
pub mod notify;
pub mod pipeline;
pub mod probe;
pub mod progress;

pub use context::JobContext;
pub use notify::{spawn_job, spawn_job_with, JobHandle, JobNotifier};
pub use pipeline::{
    run_job, EncodePipeline, FfmpegRunner, PipelineObserver, PipelineStage, ProcessRunner,
    StageInvocation,
};
pub use probe::{command_exists, FfprobeProber, SourceInfo, SourceProber};
pub use progress::ProgressReporter;
