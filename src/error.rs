//! Error taxonomy surfaced by robust estimators.

use thiserror::Error;

/// Errors returned by robust estimators and their configuration setters.
///
/// Degenerate minimal samples and refinement failures never reach the caller:
/// the consensus loop skips the former and the refiner falls back to the
/// consensus model for the latter.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EstimatorError {
    /// Malformed configuration value or sample shape.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A mutator or `estimate` was invoked while an estimation is running.
    #[error("estimator is locked while an estimation is in progress")]
    Locked,

    /// `estimate` was invoked before the estimator had enough data.
    #[error("estimator is not ready: samples or quality scores are missing or too few")]
    NotReady,

    /// The iteration budget was exhausted without a usable model.
    #[error("robust estimation failed: {0}")]
    RobustEstimation(String),
}

impl EstimatorError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        EstimatorError::InvalidArgument(msg.into())
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, EstimatorError>;
