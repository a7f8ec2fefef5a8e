//! Authorization rules and rule sets.
//!
//! Rules arrive in a loose wire form ([`RuleSpec`]) from configuration files
//! or API payloads and are validated eagerly into [`AuthorizationRule`]s. A
//! malformed rule fails construction of the whole [`RuleSet`] so that bad
//! configuration can never surface as a silent allow.
//!
//! ```json
//! [
//!   { "actors": "*", "actions": "*", "target": "" },
//!   { "actors": ["9021"], "actions": ["set", "del"], "target": "nestedObject.subObject" }
//! ]
//! ```

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{Action, ActorId, UnknownAction};
use crate::path::{PathExpr, PathExprError};

/// Wire spelling of a wildcard selector.
pub const WILDCARD: &str = "*";

/// Either every value, or an explicit non-empty set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector<T: Ord> {
    Any,
    Only(BTreeSet<T>),
}

impl<T: Ord> Selector<T> {
    #[must_use]
    pub fn allows(&self, value: &T) -> bool {
        match self {
            Self::Any => true,
            Self::Only(set) => set.contains(value),
        }
    }

    #[must_use]
    pub fn is_any(&self) -> bool {
        matches!(self, Self::Any)
    }
}

/// Wire form of a selector: `"*"` or a list of values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SelectorSpec {
    Wildcard(String),
    List(Vec<String>),
}

impl SelectorSpec {
    #[must_use]
    pub fn any() -> Self {
        Self::Wildcard(WILDCARD.to_owned())
    }

    #[must_use]
    pub fn list<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}

/// Wire form of a rule, as loaded from configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSpec {
    pub actors: SelectorSpec,
    pub actions: SelectorSpec,
    /// Kept untyped so a non-string target is reported as a rule error.
    pub target: Value,
}

/// Reason a single rule failed validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    #[error("target must be a string, got {found}")]
    TargetNotString { found: String },

    #[error("invalid target: {0}")]
    InvalidTarget(#[from] PathExprError),

    #[error("{field} list must not be empty; use \"*\" to match everything")]
    EmptyList { field: &'static str },

    #[error("{field} must be \"*\" or a list, got \"{value}\"")]
    InvalidWildcard { field: &'static str, value: String },

    #[error("actors list contains an empty actor id")]
    EmptyActorId,

    #[error(transparent)]
    UnknownAction(#[from] UnknownAction),
}

/// Error building a [`RuleSet`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleSetError {
    #[error("rule #{index} is invalid: {source}")]
    InvalidRule {
        index: usize,
        #[source]
        source: RuleError,
    },

    #[error("rule set is not valid JSON: {0}")]
    Parse(String),
}

/// A validated authorization rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRule {
    pub actors: Selector<ActorId>,
    pub actions: Selector<Action>,
    pub target: PathExpr,
}

impl AuthorizationRule {
    /// Rule granting every actor every action on the whole document.
    #[must_use]
    pub fn allow_all() -> Self {
        Self {
            actors: Selector::Any,
            actions: Selector::Any,
            target: PathExpr::root(),
        }
    }

    /// Whether this rule approves `actor` performing `action`.
    ///
    /// Does not consider the target; callers match the target first.
    #[must_use]
    pub fn approves(&self, actor: &ActorId, action: Action) -> bool {
        self.actors.allows(actor) && self.actions.allows(&action)
    }

    /// Validate a wire-form rule.
    ///
    /// # Errors
    ///
    /// Returns a [`RuleError`] describing the first problem found.
    pub fn from_spec(spec: &RuleSpec) -> Result<Self, RuleError> {
        let target = match &spec.target {
            Value::String(raw) => PathExpr::parse(raw)?,
            other => {
                return Err(RuleError::TargetNotString {
                    found: other.to_string(),
                });
            }
        };

        let actors = parse_selector(&spec.actors, "actors", |raw| {
            if raw.is_empty() {
                Err(RuleError::EmptyActorId)
            } else {
                Ok(ActorId::new(raw))
            }
        })?;

        let actions = parse_selector(&spec.actions, "actions", |raw| {
            raw.parse::<Action>().map_err(RuleError::from)
        })?;

        Ok(Self {
            actors,
            actions,
            target,
        })
    }

    /// Convert back into wire form.
    #[must_use]
    pub fn to_spec(&self) -> RuleSpec {
        RuleSpec {
            actors: match &self.actors {
                Selector::Any => SelectorSpec::any(),
                Selector::Only(set) => SelectorSpec::list(set.iter().map(ActorId::as_str)),
            },
            actions: match &self.actions {
                Selector::Any => SelectorSpec::any(),
                Selector::Only(set) => SelectorSpec::list(set.iter().map(|a| a.as_str())),
            },
            target: Value::String(self.target.to_string()),
        }
    }
}

fn parse_selector<T, F>(
    spec: &SelectorSpec,
    field: &'static str,
    parse: F,
) -> Result<Selector<T>, RuleError>
where
    T: Ord,
    F: Fn(&str) -> Result<T, RuleError>,
{
    match spec {
        SelectorSpec::Wildcard(raw) if raw == WILDCARD => Ok(Selector::Any),
        SelectorSpec::Wildcard(raw) => Err(RuleError::InvalidWildcard {
            field,
            value: raw.clone(),
        }),
        SelectorSpec::List(values) if values.is_empty() => Err(RuleError::EmptyList { field }),
        SelectorSpec::List(values) => values
            .iter()
            .map(|raw| parse(raw))
            .collect::<Result<BTreeSet<_>, _>>()
            .map(Selector::Only),
    }
}

/// An unordered collection of validated rules.
///
/// Evaluation never depends on rule order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<RuleSpec>", into = "Vec<RuleSpec>")]
pub struct RuleSet {
    rules: Vec<AuthorizationRule>,
}

impl RuleSet {
    #[must_use]
    pub fn new(rules: Vec<AuthorizationRule>) -> Self {
        Self { rules }
    }

    /// Validate every wire-form rule.
    ///
    /// # Errors
    ///
    /// Returns [`RuleSetError::InvalidRule`] for the first invalid rule.
    pub fn from_specs(specs: &[RuleSpec]) -> Result<Self, RuleSetError> {
        specs
            .iter()
            .enumerate()
            .map(|(index, spec)| {
                AuthorizationRule::from_spec(spec)
                    .map_err(|source| RuleSetError::InvalidRule { index, source })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self::new)
    }

    /// Parse and validate a JSON array of rules.
    ///
    /// # Errors
    ///
    /// Returns [`RuleSetError::Parse`] for malformed JSON and
    /// [`RuleSetError::InvalidRule`] for rules that fail validation.
    pub fn from_json(json: &str) -> Result<Self, RuleSetError> {
        let specs: Vec<RuleSpec> =
            serde_json::from_str(json).map_err(|e| RuleSetError::Parse(e.to_string()))?;
        Self::from_specs(&specs)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AuthorizationRule> {
        self.rules.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl TryFrom<Vec<RuleSpec>> for RuleSet {
    type Error = RuleSetError;

    fn try_from(specs: Vec<RuleSpec>) -> Result<Self, Self::Error> {
        Self::from_specs(&specs)
    }
}

impl From<RuleSet> for Vec<RuleSpec> {
    fn from(set: RuleSet) -> Self {
        set.rules.iter().map(AuthorizationRule::to_spec).collect()
    }
}

impl FromIterator<AuthorizationRule> for RuleSet {
    fn from_iter<I: IntoIterator<Item = AuthorizationRule>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
