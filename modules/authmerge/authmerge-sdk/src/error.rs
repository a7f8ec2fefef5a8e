//! Error types for the authmerge module.

use thiserror::Error;

/// Errors that can occur when delegating evaluation to a policy evaluator.
///
/// These represent infrastructure failures only. A denied change is
/// expressed via `EvaluationResponse.decision == false`, not as an error.
/// None of these variants may ever be read as an allow.
#[derive(Debug, Error)]
pub enum AuthmergeError {
    /// No evaluator is configured to handle the request.
    #[error("no policy evaluator available")]
    NoEvaluatorAvailable,

    /// The evaluator failed to initialize or is not reachable.
    #[error("policy evaluator unavailable: {0}")]
    EvaluatorUnavailable(String),

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}
