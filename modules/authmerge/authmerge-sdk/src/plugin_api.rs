//! Plugin API trait for delegated policy evaluators.

use async_trait::async_trait;

use crate::error::AuthmergeError;
use crate::evaluation::{EvaluationRequest, EvaluationResponse};

/// A pluggable backend that decides a batch of changes from an opaque
/// policy and the supplied context.
///
/// Implementations must be side-effect free with respect to the request.
/// Their boolean decision is trusted as-is.
#[async_trait]
pub trait PolicyEvaluatorClient: Send + Sync {
    /// Evaluate a batch of changes.
    ///
    /// # Errors
    ///
    /// - `EvaluatorUnavailable` if the evaluator cannot run
    /// - `Internal` for unexpected errors
    async fn evaluate(
        &self,
        request: EvaluationRequest,
    ) -> Result<EvaluationResponse, AuthmergeError>;
}
