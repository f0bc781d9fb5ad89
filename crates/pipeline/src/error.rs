//! Error types for the pipeline layer.

use thiserror::Error;

/// Remote failure messages that mean the target asset is already there
const ALREADY_EXISTS_MARKERS: [&str; 2] = ["Cannot overwrite asset", "already exists"];

/// Errors produced by pipeline orchestration.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("core error: {0}")]
    Core(#[from] irrigis_core::Error),

    #[error("configuration error: {0}")]
    Config(String),

    /// Raised by [`AssetStore::put`](crate::AssetStore::put) on a taken id.
    /// Jobs surface it as a failure message the tracker counts as skipped.
    #[error("asset already exists: {0}")]
    AssetExists(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("job '{job}' failed: {message}")]
    JobFailed { job: String, message: String },

    #[error("job '{0}' was cancelled")]
    JobCancelled(String),
}

impl PipelineError {
    /// Whether the error only reports that the output is already stored
    pub fn is_already_exists(&self) -> bool {
        match self {
            PipelineError::AssetExists(_) => true,
            PipelineError::JobFailed { message, .. } => reports_existing_asset(message),
            _ => false,
        }
    }

    /// Whether retrying the call may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, PipelineError::Transport(_))
    }
}

/// Whether a remote failure message reports an existing asset
pub fn reports_existing_asset(message: &str) -> bool {
    ALREADY_EXISTS_MARKERS.iter().any(|m| message.contains(m))
}

/// Result alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_exists_detection() {
        assert!(PipelineError::AssetExists("a".into()).is_already_exists());
        assert!(PipelineError::JobFailed {
            job: "ia".into(),
            message: "Cannot overwrite asset 'results/x'".into(),
        }
        .is_already_exists());
        assert!(!PipelineError::JobFailed {
            job: "ia".into(),
            message: "Out of memory".into(),
        }
        .is_already_exists());
        assert!(!PipelineError::Transport("reset".into()).is_already_exists());
    }

    #[test]
    fn test_core_error_converts() {
        let err: PipelineError = irrigis_core::Error::UnknownSeason("spring".into()).into();
        assert!(matches!(err, PipelineError::Core(_)));
        assert!(err.to_string().contains("spring"));
    }
}
