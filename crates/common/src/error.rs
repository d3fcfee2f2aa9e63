//! Error types shared across HudClip crates.

use std::path::PathBuf;

/// Top-level error type for HudClip operations.
#[derive(Debug, thiserror::Error)]
pub enum HudclipError {
    #[error("Selected clip duration is zero or negative ({duration_secs:.3}s)")]
    ZeroOrNegativeDuration { duration_secs: f64 },

    #[error(
        "Clip is too short for the target size: {target_mb:.0} MB cannot hold {duration_secs:.2}s of {audio_kbps} kbps audio"
    )]
    InsufficientSizeBudget {
        target_mb: f64,
        audio_kbps: u32,
        duration_secs: f64,
    },

    #[error("Probe error: {message}")]
    Probe { message: String },

    #[error("{stage} stage failed (status {status}): {detail}")]
    StageFailed {
        stage: String,
        status: String,
        detail: String,
    },

    #[error("Failed to finalize output file {path}: {message}")]
    FinalizeMove { path: PathBuf, message: String },

    #[error("Invalid job: {message}")]
    InvalidJob { message: String },

    #[error("Render error: {message}")]
    Render { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result type alias using HudclipError.
pub type HudclipResult<T> = Result<T, HudclipError>;

impl HudclipError {
    pub fn probe(msg: impl Into<String>) -> Self {
        Self::Probe {
            message: msg.into(),
        }
    }

    pub fn invalid_job(msg: impl Into<String>) -> Self {
        Self::InvalidJob {
            message: msg.into(),
        }
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
        }
    }

    pub fn stage_failed(
        stage: impl Into<String>,
        status: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self::StageFailed {
            stage: stage.into(),
            status: status.into(),
            detail: detail.into(),
        }
    }

    /// Whether the job may continue after this error with a fallback.
    ///
    /// Only probe failures are recoverable; everything else terminates the job.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Probe { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_probe_errors_are_recoverable() {
        assert!(HudclipError::probe("no audio stream").is_recoverable());
        assert!(!HudclipError::invalid_job("bad").is_recoverable());
        assert!(!HudclipError::ZeroOrNegativeDuration { duration_secs: 0.0 }.is_recoverable());
    }

    #[test]
    fn test_unexpected_failures_convert_with_question_mark() {
        fn read_config(raw: &str) -> HudclipResult<serde_json::Value> {
            Ok(serde_json::from_str(raw)?)
        }
        assert!(matches!(read_config("{ nope"), Err(HudclipError::Json(_))));

        fn open_missing() -> HudclipResult<std::fs::File> {
            Ok(std::fs::File::open("/nonexistent/hudclip/config.json")?)
        }
        let err = open_missing().unwrap_err();
        assert!(matches!(err, HudclipError::Io(_)));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_stage_failure_message_names_stage() {
        let err = HudclipError::stage_failed("CORE", "exit status: 1", "Conversion failed!");
        let msg = err.to_string();
        assert!(msg.starts_with("CORE stage failed"));
        assert!(msg.contains("Conversion failed!"));
    }

    #[test]
    fn test_insufficient_budget_message_is_human_readable() {
        let err = HudclipError::InsufficientSizeBudget {
            target_mb: 15.0,
            audio_kbps: 128,
            duration_secs: 1200.0,
        };
        assert!(err.to_string().contains("15 MB"));
    }
}
