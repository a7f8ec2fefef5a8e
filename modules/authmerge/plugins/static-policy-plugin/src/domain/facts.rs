//! Typed view of the request facts the plugin understands.

use std::collections::{BTreeMap, BTreeSet};

use authmerge_sdk::{Action, ActorId};
use serde::Deserialize;

/// Role assignments and per-path grants.
///
/// Unrelated facts are ignored so several evaluators can share one context.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct PolicyFacts {
    pub roles: BTreeMap<String, BTreeSet<ActorId>>,

    #[serde(alias = "objectPermissions")]
    pub object_permissions: BTreeMap<String, BTreeMap<String, BTreeSet<ActorId>>>,
}

impl PolicyFacts {
    pub fn has_role(&self, role: &str, actor: &ActorId) -> bool {
        self.roles.get(role).is_some_and(|members| members.contains(actor))
    }

    pub fn is_granted(&self, path: &str, action: Action, actor: &ActorId) -> bool {
        self.object_permissions
            .get(path)
            .and_then(|grants| grants.get(action.as_str()))
            .is_some_and(|actors| actors.contains(actor))
    }
}
