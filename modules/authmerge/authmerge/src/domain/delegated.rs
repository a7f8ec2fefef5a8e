//! Authorization delegated to an external policy evaluator.

use std::sync::Arc;

use authmerge_sdk::{
    DecodedChange, DenyReason, DocumentSnapshot, EvaluationInput, EvaluationRequest,
    ObjectIdentityProvider, PolicyContext, PolicyEvaluatorClient,
};
use serde_json::Value;
use tracing::{debug, warn};

use super::authorizer::{DenialReason, Verdict};
use super::error::DomainError;
use super::path_index::PathIndex;

/// Error code reported when an evaluator denies without saying why.
const UNSPECIFIED_DENIAL: &str = "denied";

/// Sends changes plus the snapshot's path index to a [`PolicyEvaluatorClient`]
/// and trusts its decision.
#[derive(Clone)]
pub struct DelegatedAuthorizer {
    evaluator: Arc<dyn PolicyEvaluatorClient>,
    facts: Value,
}

impl DelegatedAuthorizer {
    #[must_use]
    pub fn new(evaluator: Arc<dyn PolicyEvaluatorClient>, facts: Value) -> Self {
        Self { evaluator, facts }
    }

    #[must_use]
    pub fn facts(&self) -> &Value {
        &self.facts
    }

    /// The request an evaluator sees for `changes` against `index`.
    #[must_use]
    pub fn build_request(&self, index: &PathIndex, changes: &[DecodedChange]) -> EvaluationRequest {
        EvaluationRequest {
            context: PolicyContext {
                facts: self.facts.clone(),
                object_paths: index.to_object_paths(),
            },
            input: EvaluationInput {
                changes: changes.to_vec(),
            },
        }
    }

    /// Ask the evaluator about `changes` against a prebuilt index.
    ///
    /// An empty batch is denied without consulting the evaluator.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Evaluator`] if the evaluator fails. A failure
    /// is never turned into a decision.
    pub async fn evaluate_indexed(
        &self,
        index: &PathIndex,
        changes: &[DecodedChange],
    ) -> Result<Verdict, DomainError> {
        if changes.is_empty() {
            debug!("denying empty batch without consulting evaluator");
            return Ok(Verdict::Deny(DenialReason::EmptyBatch));
        }

        let request = self.build_request(index, changes);
        let response = self.evaluator.evaluate(request).await.map_err(|e| {
            warn!(error = %e, "policy evaluator failed");
            DomainError::from(e)
        })?;

        if response.decision {
            return Ok(Verdict::Allow);
        }
        let reason = response
            .deny_reason
            .unwrap_or_else(|| DenyReason::new(UNSPECIFIED_DENIAL));
        debug!(
            error_code = %reason.error_code,
            details = reason.details.as_deref().unwrap_or_default(),
            "policy evaluator denied changes"
        );
        Ok(Verdict::Deny(DenialReason::EvaluatorDenied {
            error_code: reason.error_code,
            details: reason.details,
        }))
    }

    /// Boolean form of [`evaluate_indexed`](Self::evaluate_indexed).
    ///
    /// # Errors
    ///
    /// See [`evaluate_indexed`](Self::evaluate_indexed).
    pub async fn check_indexed(
        &self,
        index: &PathIndex,
        changes: &[DecodedChange],
    ) -> Result<bool, DomainError> {
        Ok(self.evaluate_indexed(index, changes).await?.is_allowed())
    }

    /// Index `snapshot` and ask the evaluator about `changes`.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InconsistentSnapshot`] if the snapshot cannot be
    /// indexed, or [`DomainError::Evaluator`] if the evaluator fails.
    pub async fn check<S, P>(
        &self,
        snapshot: &S,
        identity: &P,
        changes: &[DecodedChange],
    ) -> Result<bool, DomainError>
    where
        S: DocumentSnapshot + ?Sized,
        P: ObjectIdentityProvider<S> + ?Sized,
    {
        let index = PathIndex::build(snapshot, identity)?;
        self.check_indexed(&index, changes).await
    }
}

impl std::fmt::Debug for DelegatedAuthorizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DelegatedAuthorizer")
            .field("facts", &self.facts)
            .finish_non_exhaustive()
    }
}
