//! Error types shared by both pipeline stages

use thiserror::Error;

/// Errors that can abort a pipeline stage.
///
/// Every variant is fatal: the owning stage stops at the first one and the
/// binary wraps it into a single `anyhow::Error` before exiting non-zero.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Source unreadable, missing, or malformed
    #[error("data load failed: {0}")]
    DataLoad(String),

    /// Expected column absent or has an incompatible type
    #[error("preprocessing failed: {0}")]
    Preprocessing(String),

    /// Too few numeric columns, or the score function's domain was violated
    #[error("feature selection failed: {0}")]
    FeatureSelection(String),

    /// Degenerate or undefined split/scale input
    #[error("split and scale failed: {0}")]
    Scaling(String),

    /// Destination unwritable or payload not serializable
    #[error("persistence failed: {0}")]
    Persistence(String),

    /// Learner failure: shape mismatch or numerical breakdown
    #[error("training failed: {0}")]
    Training(String),

    /// Prediction or metric computation failure
    #[error("evaluation failed: {0}")]
    Evaluation(String),
}

/// Tag of a [`PipelineError`], handy for assertions and log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    DataLoad,
    Preprocessing,
    FeatureSelection,
    Scaling,
    Persistence,
    Training,
    Evaluation,
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DataLoad(_) => ErrorKind::DataLoad,
            Self::Preprocessing(_) => ErrorKind::Preprocessing,
            Self::FeatureSelection(_) => ErrorKind::FeatureSelection,
            Self::Scaling(_) => ErrorKind::Scaling,
            Self::Persistence(_) => ErrorKind::Persistence,
            Self::Training(_) => ErrorKind::Training,
            Self::Evaluation(_) => ErrorKind::Evaluation,
        }
    }

    /// Log the error at its point of origin and hand it back for `?`.
    pub fn logged(self) -> Self {
        tracing::error!(kind = ?self.kind(), "{self}");
        self
    }
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant() {
        let err = PipelineError::FeatureSelection("need 5 columns, found 3".into());
        assert_eq!(err.kind(), ErrorKind::FeatureSelection);
        assert_eq!(err.to_string(), "feature selection failed: need 5 columns, found 3");
    }

    #[test]
    fn logged_is_identity() {
        let err = PipelineError::Persistence("read-only".into()).logged();
        assert_eq!(err.kind(), ErrorKind::Persistence);
    }
}
