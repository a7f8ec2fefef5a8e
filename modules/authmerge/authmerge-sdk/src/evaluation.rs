//! Request/response models for delegated policy evaluators.
//!
//! A delegated evaluator receives the same data a declarative policy program
//! would: caller-supplied facts (role assignments, per-path permissions, ...),
//! the object path index of the snapshot under change, and the decoded changes
//! themselves.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{DecodedChange, ObjectId};
use crate::path::ObjectPath;

/// Contextual data exposed to the evaluator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyContext {
    /// External facts supplied by the integrator.
    #[serde(default)]
    pub facts: Value,
    /// Object path of every indexed container in the snapshot.
    #[serde(default)]
    pub object_paths: BTreeMap<ObjectId, ObjectPath>,
}

/// The changes under evaluation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvaluationInput {
    pub changes: Vec<DecodedChange>,
}

/// Evaluation request sent to a [`PolicyEvaluatorClient`](crate::PolicyEvaluatorClient).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvaluationRequest {
    pub context: PolicyContext,
    pub input: EvaluationInput,
}

/// Reason for an explicit deny from the evaluator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DenyReason {
    /// Machine-readable error code.
    pub error_code: String,
    /// Human-readable details (optional).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl DenyReason {
    #[must_use]
    pub fn new(error_code: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            details: None,
        }
    }

    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Evaluator verdict for the whole batch of changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationResponse {
    /// Whether the changes are allowed.
    pub decision: bool,
    /// Present when `decision` is `false`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deny_reason: Option<DenyReason>,
}

impl EvaluationResponse {
    #[must_use]
    pub fn allow() -> Self {
        Self {
            decision: true,
            deny_reason: None,
        }
    }

    #[must_use]
    pub fn deny(reason: DenyReason) -> Self {
        Self {
            decision: false,
            deny_reason: Some(reason),
        }
    }
}
