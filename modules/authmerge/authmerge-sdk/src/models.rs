//! Change models for the authmerge module.
//!
//! Mirrors the shape of a decoded CRDT change: an authoring actor plus an
//! ordered list of operations, each targeting a key inside a container.
//! Fields the CRDT engine emits beyond these (sequence numbers, dependencies,
//! values, ...) are accepted and ignored during deserialization.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Opaque identifier naming a container (map, list, text) inside a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    /// Identifier CRDT engines conventionally give the document root.
    pub const ROOT: &'static str = "_root";

    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn root() -> Self {
        Self(Self::ROOT.to_owned())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// Identity of the replica that authored a change.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(String);

impl ActorId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ActorId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// Kind of mutation an operation performs.
///
/// Serialized names follow the decoded-change format of the CRDT engine
/// (`set`, `del`, `makeMap`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    /// Assign a primitive value to a key.
    Set,
    /// Delete a key or list element.
    Del,
    /// Insert a list or text element.
    Insert,
    /// Increment a counter.
    Inc,
    /// Create a nested map at a key.
    MakeMap,
    /// Create a nested list at a key.
    MakeList,
    /// Create a nested text object at a key.
    MakeText,
    /// Create a nested table at a key.
    MakeTable,
    /// Add a rich-text mark.
    Mark,
    /// Remove a rich-text mark.
    Unmark,
}

impl Action {
    /// Every action kind, in declaration order.
    pub const ALL: [Self; 10] = [
        Self::Set,
        Self::Del,
        Self::Insert,
        Self::Inc,
        Self::MakeMap,
        Self::MakeList,
        Self::MakeText,
        Self::MakeTable,
        Self::Mark,
        Self::Unmark,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Set => "set",
            Self::Del => "del",
            Self::Insert => "insert",
            Self::Inc => "inc",
            Self::MakeMap => "makeMap",
            Self::MakeList => "makeList",
            Self::MakeText => "makeText",
            Self::MakeTable => "makeTable",
            Self::Mark => "mark",
            Self::Unmark => "unmark",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string does not name a known [`Action`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown action kind '{0}'")]
pub struct UnknownAction(pub String);

impl FromStr for Action {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| UnknownAction(s.to_owned()))
    }
}

/// The key an operation mutates inside its container.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OpKey {
    /// List position.
    Index(u64),
    /// Map property name, or an element id for list/text operations.
    Prop(String),
}

impl OpKey {
    /// Render the key as a single path segment.
    #[must_use]
    pub fn to_segment(&self) -> String {
        match self {
            Self::Index(i) => i.to_string(),
            Self::Prop(p) => p.clone(),
        }
    }
}

impl fmt::Display for OpKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(i) => write!(f, "{i}"),
            Self::Prop(p) => f.write_str(p),
        }
    }
}

impl From<&str> for OpKey {
    fn from(value: &str) -> Self {
        Self::Prop(value.to_owned())
    }
}

impl From<u64> for OpKey {
    fn from(value: u64) -> Self {
        Self::Index(value)
    }
}

/// A single atomic mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    /// Container the operation writes into.
    pub obj: ObjectId,
    /// Key or index inside `obj`.
    pub key: OpKey,
    /// What the operation does.
    pub action: Action,
}

impl Operation {
    #[must_use]
    pub fn new(obj: impl Into<ObjectId>, key: impl Into<OpKey>, action: Action) -> Self {
        Self {
            obj: obj.into(),
            key: key.into(),
            action,
        }
    }
}

/// An authored, ordered batch of operations. Authorized as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedChange {
    /// Actor that produced the change.
    pub actor: ActorId,
    /// Operations in application order.
    #[serde(default)]
    pub ops: Vec<Operation>,
}

impl DecodedChange {
    #[must_use]
    pub fn new(actor: impl Into<ActorId>, ops: Vec<Operation>) -> Self {
        Self {
            actor: actor.into(),
            ops,
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn action_names_match_decoded_change_format() {
        for action in Action::ALL {
            let json = serde_json::to_value(action).unwrap();
            assert_eq!(json, serde_json::Value::String(action.as_str().to_owned()));
            assert_eq!(action.as_str().parse::<Action>().unwrap(), action);
        }
        assert_eq!(serde_json::to_string(&Action::MakeMap).unwrap(), r#""makeMap""#);
    }

    #[test]
    fn unknown_action_is_rejected() {
        let err = "update".parse::<Action>().unwrap_err();
        assert_eq!(err, UnknownAction("update".to_owned()));
        assert!(serde_json::from_str::<Action>(r#""update""#).is_err());
    }

    #[test]
    fn decoded_change_ignores_engine_specific_fields() {
        let raw = serde_json::json!({
            "actor": "9021",
            "seq": 2,
            "startOp": 5,
            "deps": ["abc"],
            "hash": "def",
            "ops": [
                {"obj": "1@9021", "key": "someKey", "action": "set", "value": "otherValue", "pred": []},
                {"obj": "4@9021", "key": 3, "action": "del", "pred": ["3@9021"]}
            ]
        });

        let change: DecodedChange = serde_json::from_value(raw).unwrap();
        assert_eq!(change.actor, ActorId::from("9021"));
        assert_eq!(change.ops.len(), 2);
        assert_eq!(change.ops[0].key, OpKey::from("someKey"));
        assert_eq!(change.ops[1].key, OpKey::Index(3));
        assert_eq!(change.ops[1].action, Action::Del);
    }

    #[test]
    fn change_without_ops_defaults_to_empty() {
        let change: DecodedChange = serde_json::from_str(r#"{"actor": "x"}"#).unwrap();
        assert!(change.ops.is_empty());
    }

    #[test]
    fn op_key_renders_as_segment() {
        assert_eq!(OpKey::Index(7).to_segment(), "7");
        assert_eq!(OpKey::from("title").to_segment(), "title");
    }
}
