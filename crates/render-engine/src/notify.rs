//! Background job worker and its notification channels.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use hudclip_job_model::job::JobSpec;
use hudclip_job_model::result::JobResult;

use crate::context::JobContext;
use crate::pipeline::{run_job, FfmpegRunner, PipelineObserver, ProcessRunner};
use crate::probe::{FfprobeProber, SourceProber};

/// Forwards pipeline events to the caller's channels. A closed receiver is
/// not an error; the job keeps running.
#[derive(Debug, Clone)]
pub struct JobNotifier {
    progress: mpsc::UnboundedSender<u8>,
    status: mpsc::UnboundedSender<String>,
}

impl PipelineObserver for JobNotifier {
    fn progress(&mut self, value: u8) {
        let _ = self.progress.send(value);
    }

    fn status(&mut self, message: String) {
        tracing::info!(status = %message, "Job status");
        let _ = self.status.send(message);
    }
}

/// Caller side of a running job.
///
/// `progress` and `status` close when the worker finishes; `result`
/// always yields exactly one value.
#[derive(Debug)]
pub struct JobHandle {
    pub progress: mpsc::UnboundedReceiver<u8>,
    pub status: mpsc::UnboundedReceiver<String>,
    pub result: oneshot::Receiver<JobResult>,
    worker: JoinHandle<()>,
}

impl JobHandle {
    /// Wait for the terminal result, discarding any unread notifications.
    pub async fn join(self) -> JobResult {
        let result = self.result.await.unwrap_or_else(|_| {
            JobResult::failure("Render worker exited without reporting a result")
        });
        if let Err(e) = self.worker.await {
            tracing::warn!(error = %e, "Render worker task did not shut down cleanly");
        }
        result
    }
}

/// Start `spec` on a blocking worker with the real ffmpeg and ffprobe.
///
/// Must be called from within a tokio runtime.
pub fn spawn_job(spec: JobSpec, ctx: JobContext) -> JobHandle {
    let prober = Arc::new(FfprobeProber::new(ctx.ffprobe_path.clone()));
    spawn_job_with(spec, ctx, prober, Box::new(FfmpegRunner::new()))
}

/// Start `spec` with explicit prober and runner implementations.
pub fn spawn_job_with(
    spec: JobSpec,
    ctx: JobContext,
    prober: Arc<dyn SourceProber>,
    mut runner: Box<dyn ProcessRunner>,
) -> JobHandle {
    let (progress_tx, progress_rx) = mpsc::unbounded_channel();
    let (status_tx, status_rx) = mpsc::unbounded_channel();
    let (result_tx, result_rx) = oneshot::channel();

    let worker = tokio::task::spawn_blocking(move || {
        let mut notifier = JobNotifier {
            progress: progress_tx,
            status: status_tx,
        };

        let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| {
            run_job(&spec, &ctx, prober.as_ref(), runner.as_mut(), &mut notifier)
        }));
        let result = outcome.unwrap_or_else(|panic| {
            let message = panic_message(panic.as_ref());
            tracing::error!(panic = %message, "Render worker panicked");
            JobResult::failure(format!("Unexpected error: {message}"))
        });

        drop(notifier);
        if result_tx.send(result).is_err() {
            tracing::debug!("Job result receiver dropped before completion");
        }
    });

    JobHandle {
        progress: progress_rx,
        status: status_rx,
        result: result_rx,
        worker,
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message_extraction() {
        let boxed: Box<dyn std::any::Any + Send> = Box::new("bad index");
        assert_eq!(panic_message(boxed.as_ref()), "bad index");
        let boxed: Box<dyn std::any::Any + Send> = Box::new(String::from("overflow"));
        assert_eq!(panic_message(boxed.as_ref()), "overflow");
        let boxed: Box<dyn std::any::Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(boxed.as_ref()), "worker panicked");
    }

    #[tokio::test]
    async fn test_closed_receivers_do_not_stop_notifier() {
        let (progress_tx, progress_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = mpsc::unbounded_channel();
        drop(progress_rx);
        drop(status_rx);
        let mut notifier = JobNotifier {
            progress: progress_tx,
            status: status_tx,
        };
        notifier.progress(10);
        notifier.status("still running".to_string());
    }
}
