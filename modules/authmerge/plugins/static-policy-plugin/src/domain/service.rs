//! Service implementation for the static policy plugin.

use std::collections::BTreeMap;

use authmerge_sdk::{
    DecodedChange, DenyReason, EvaluationRequest, EvaluationResponse, ObjectId, ObjectPath,
};
use tracing::debug;

use super::facts::PolicyFacts;
use crate::config::StaticPolicyPluginConfig;

/// Static policy service.
///
/// Decides from the request facts alone; holds no state besides its
/// configuration.
#[derive(Debug, Clone, Default)]
pub struct Service {
    config: StaticPolicyPluginConfig,
}

impl Service {
    #[must_use]
    pub fn new(config: StaticPolicyPluginConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &StaticPolicyPluginConfig {
        &self.config
    }

    /// Evaluate an evaluation request.
    #[must_use]
    pub fn evaluate(&self, request: &EvaluationRequest) -> EvaluationResponse {
        let changes = &request.input.changes;
        if changes.is_empty() {
            return EvaluationResponse::deny(DenyReason::new("empty_batch"));
        }

        let facts: PolicyFacts = if request.context.facts.is_null() {
            PolicyFacts::default()
        } else {
            match serde_json::from_value(request.context.facts.clone()) {
                Ok(facts) => facts,
                Err(e) => {
                    debug!(error = %e, "malformed policy facts");
                    return EvaluationResponse::deny(
                        DenyReason::new("malformed_facts").with_details(e.to_string()),
                    );
                }
            }
        };

        for change in changes {
            if let Err(reason) = self.check_change(&facts, &request.context.object_paths, change) {
                return EvaluationResponse::deny(reason);
            }
        }
        EvaluationResponse::allow()
    }

    fn check_change(
        &self,
        facts: &PolicyFacts,
        object_paths: &BTreeMap<ObjectId, ObjectPath>,
        change: &DecodedChange,
    ) -> Result<(), DenyReason> {
        if change.ops.is_empty() {
            return Err(DenyReason::new("empty_change"));
        }
        if facts.has_role(&self.config.admin_role, &change.actor) {
            return Ok(());
        }

        for op in &change.ops {
            let Some(container) = object_paths.get(&op.obj) else {
                return Err(DenyReason::new("unknown_object")
                    .with_details(format!("object '{}' is not in the path index", op.obj)));
            };

            let granted = facts.is_granted(&container.to_string(), op.action, &change.actor)
                || (self.config.inherit_ancestor_permissions
                    && container
                        .ancestors()
                        .any(|p| facts.is_granted(&p.to_string(), op.action, &change.actor)));

            if !granted {
                return Err(DenyReason::new("not_permitted").with_details(format!(
                    "actor '{}' may not {} in '{container}'",
                    change.actor, op.action
                )));
            }
        }
        Ok(())
    }
}
