//! Configuration for the static policy plugin.

use serde::{Deserialize, Serialize};

/// Plugin configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StaticPolicyPluginConfig {
    /// Role whose members may apply any change.
    pub admin_role: String,

    /// Permissions granted on a path also apply to everything beneath it.
    pub inherit_ancestor_permissions: bool,
}

impl Default for StaticPolicyPluginConfig {
    fn default() -> Self {
        Self {
            admin_role: "admin".to_owned(),
            inherit_ancestor_permissions: false,
        }
    }
}
