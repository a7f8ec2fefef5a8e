//! Configuration for authmerge.
//!
//! Configuration is layered: built-in defaults, then one section of a YAML
//! file, then prefixed environment variables with `__` separating nested
//! keys (`AUTHMERGE_BACKEND=delegated`, `AUTHMERGE_FACTS__TENANT=acme`).
//!
//! ```yaml
//! authmerge:
//!   backend: rules
//!   strategy: all_matching
//!   rules:
//!     - { actors: "*", actions: "*", target: "" }
//!     - { actors: ["9021"], actions: ["set"], target: "nestedObject" }
//! ```

use std::path::{Path, PathBuf};

use authmerge_sdk::{RuleSet, RuleSetError, RuleSpec};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::ConflictStrategy;

/// File section holding [`AuthmergeConfig`].
pub const SECTION: &str = "authmerge";

/// Environment prefix for [`AuthmergeConfig`] overrides.
pub const ENV_PREFIX: &str = "AUTHMERGE_";

/// Error loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file '{}' does not exist", path.display())]
    MissingFile { path: PathBuf },

    #[error("invalid configuration: {0}")]
    Invalid(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        Self::Invalid(Box::new(e))
    }
}

/// Which engine decides.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Built-in rule evaluation.
    #[default]
    Rules,
    /// An external [`PolicyEvaluatorClient`](authmerge_sdk::PolicyEvaluatorClient).
    Delegated,
}

/// Configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthmergeConfig {
    pub backend: BackendKind,

    /// Rules for the `rules` backend, validated by [`rule_set`](Self::rule_set).
    pub rules: Vec<RuleSpec>,

    pub strategy: ConflictStrategy,

    /// Facts handed to a delegated evaluator.
    pub facts: Value,

    /// Reuse the path index while the snapshot version is unchanged.
    pub cache_index: bool,
}

impl Default for AuthmergeConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Rules,
            rules: Vec::new(),
            strategy: ConflictStrategy::AllMatching,
            facts: Value::Object(serde_json::Map::new()),
            cache_index: true,
        }
    }
}

impl AuthmergeConfig {
    /// Load the `authmerge` section of `path` with `AUTHMERGE_` overrides.
    ///
    /// # Errors
    ///
    /// See [`load_section`].
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        load_section(path, SECTION, ENV_PREFIX)
    }

    /// Validate the configured rules.
    ///
    /// # Errors
    ///
    /// Returns [`RuleSetError::InvalidRule`] for the first invalid rule.
    pub fn rule_set(&self) -> Result<RuleSet, RuleSetError> {
        RuleSet::from_specs(&self.rules)
    }
}

/// Load one section of a layered configuration.
///
/// Defaults come from `T::default()`, then `section` of the YAML file at
/// `path` (if given), then environment variables starting with `env_prefix`.
///
/// # Errors
///
/// Returns [`ConfigError::MissingFile`] if `path` does not exist and
/// [`ConfigError::Invalid`] if the merged values do not fit `T`.
pub fn load_section<T>(path: Option<&Path>, section: &str, env_prefix: &str) -> Result<T, ConfigError>
where
    T: Default + Serialize + DeserializeOwned,
{
    let mut figment = Figment::from(Serialized::defaults(T::default()));
    if let Some(path) = path {
        if !path.is_file() {
            return Err(ConfigError::MissingFile {
                path: path.to_path_buf(),
            });
        }
        figment = figment.merge(Figment::from(Yaml::file(path)).focus(section));
    }
    figment = figment.merge(Env::prefixed(env_prefix).split("__"));

    let config = figment.extract()?;
    tracing::debug!(section, file = ?path, "configuration loaded");
    Ok(config)
}
