#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! authmerge SDK
//!
//! Shared types for path-scoped authorization of CRDT document changes:
//!
//! - [`DecodedChange`], [`Operation`], [`Action`] - change models
//! - [`ObjectPath`], [`PathExpr`] - logical document locations
//! - [`RuleSet`], [`AuthorizationRule`], [`RuleSpec`] - validated rules
//! - [`DocumentSnapshot`], [`ObjectIdentityProvider`] - snapshot access
//! - [`PolicyEvaluatorClient`] - plugin API for delegated evaluators
//! - [`AuthmergeError`] - error types
//!
//! ## Usage
//!
//! ```ignore
//! use authmerge_sdk::{DecodedChange, RuleSet};
//!
//! let rules = RuleSet::from_json(r#"[{"actors": "*", "actions": "*", "target": ""}]"#)?;
//! let change: DecodedChange = serde_json::from_str(raw_change)?;
//! ```

pub mod error;
pub mod evaluation;
pub mod models;
pub mod path;
pub mod plugin_api;
pub mod rules;
pub mod snapshot;

// Re-export main types at crate root
pub use error::AuthmergeError;
pub use evaluation::{
    DenyReason, EvaluationInput, EvaluationRequest, EvaluationResponse, PolicyContext,
};
pub use models::{Action, ActorId, DecodedChange, ObjectId, OpKey, Operation, UnknownAction};
pub use path::{ObjectPath, PathExpr, PathExprError};
pub use plugin_api::PolicyEvaluatorClient;
pub use rules::{
    AuthorizationRule, RuleError, RuleSet, RuleSetError, RuleSpec, Selector, SelectorSpec,
};
pub use snapshot::{DocumentSnapshot, ObjectIdentityProvider, SnapshotVersion};
