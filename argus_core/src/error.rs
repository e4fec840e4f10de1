// argus_core/src/error.rs

use crate::types::Time;
use thiserror::Error;

/// Errors surfaced by filter construction and the predict/observe recursion.
///
/// Every failure is local to the call that raised it; `predict` commits no
/// partial state update on failure, so the caller may retry with corrected
/// input.
#[derive(Debug, Error)]
pub enum FilterError {
    /// `predict` was asked to move the filter into the past.
    #[error("predicting the past (current time {current}, prediction time {requested})")]
    InvalidTime { current: Time, requested: Time },

    /// A process propagated its state to a non-Gaussian distribution while
    /// moment-matched approximation was disabled.
    #[error(
        "the propagated state distribution is not Gaussian; to approximate it \
         with a Gaussian, set the approximate_distr parameter to true"
    )]
    NonGaussianPropagation,

    /// An observable was constructed over a process the filter does not own.
    #[error("each observed process must match one of the filter's own processes")]
    UnmatchedProcess,

    /// The innovation covariance could not be inverted during `observe`.
    #[error("the innovation covariance is singular")]
    SingularInnovationCov,

    /// An observable was used with a filter other than the one that created it.
    #[error("observable is bound to a different filter instance")]
    FilterMismatch,
}
