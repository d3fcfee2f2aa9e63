//! Terminal job outcome.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// The single terminal result of a render job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobResult {
    Success { output: PathBuf },
    Failure { message: String },
}

impl JobResult {
    pub fn success(output: impl Into<PathBuf>) -> Self {
        Self::Success {
            output: output.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure {
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn output(&self) -> Option<&Path> {
        match self {
            Self::Success { output } => Some(output),
            Self::Failure { .. } => None,
        }
    }

    /// Output path on success, failure message otherwise.
    pub fn detail(&self) -> String {
        match self {
            Self::Success { output } => output.display().to_string(),
            Self::Failure { message } => message.clone(),
        }
    }
}
