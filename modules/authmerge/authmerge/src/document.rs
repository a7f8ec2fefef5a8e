//! In-memory document snapshots.
//!
//! [`MemoryDocument`] is a plain serde tree that carries its own object
//! identities. It stands in for a CRDT engine's snapshot in tests and in the
//! CLI, where snapshots are exported to JSON:
//!
//! ```json
//! {
//!   "version": "heads:4f2a",
//!   "root": { "id": "_root", "map": {
//!     "title": { "value": "groceries" },
//!     "items": { "id": "2@9021", "list": [ { "id": "3@9021", "map": {} } ] }
//!   } }
//! }
//! ```

use std::collections::BTreeMap;

use authmerge_sdk::{DocumentSnapshot, ObjectId, ObjectIdentityProvider, SnapshotVersion};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A node of an in-memory document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MemoryNode {
    Map {
        id: ObjectId,
        map: BTreeMap<String, MemoryNode>,
    },
    List {
        id: ObjectId,
        list: Vec<MemoryNode>,
    },
    Value {
        value: Value,
    },
}

impl MemoryNode {
    #[must_use]
    pub fn map<I, K>(id: impl Into<ObjectId>, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, MemoryNode)>,
        K: Into<String>,
    {
        Self::Map {
            id: id.into(),
            map: entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    #[must_use]
    pub fn list(id: impl Into<ObjectId>, items: Vec<MemoryNode>) -> Self {
        Self::List {
            id: id.into(),
            list: items,
        }
    }

    #[must_use]
    pub fn value(value: impl Into<Value>) -> Self {
        Self::Value {
            value: value.into(),
        }
    }

    /// Identity of a container node.
    #[must_use]
    pub fn id(&self) -> Option<&ObjectId> {
        match self {
            Self::Map { id, .. } | Self::List { id, .. } => Some(id),
            Self::Value { .. } => None,
        }
    }
}

/// A complete in-memory snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<SnapshotVersion>,
    pub root: MemoryNode,
}

impl MemoryDocument {
    #[must_use]
    pub fn new(root: MemoryNode) -> Self {
        Self {
            version: None,
            root,
        }
    }

    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(SnapshotVersion::new(version));
        self
    }
}

impl DocumentSnapshot for MemoryDocument {
    type Node<'a> = &'a MemoryNode;

    fn root(&self) -> Self::Node<'_> {
        &self.root
    }

    fn children<'a>(&'a self, node: &Self::Node<'a>) -> Vec<(String, Self::Node<'a>)> {
        match *node {
            MemoryNode::Map { map, .. } => map.iter().map(|(k, v)| (k.clone(), v)).collect(),
            MemoryNode::List { list, .. } => list
                .iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), v))
                .collect(),
            MemoryNode::Value { .. } => Vec::new(),
        }
    }

    fn version(&self) -> Option<SnapshotVersion> {
        self.version.clone()
    }
}

/// Reads the identity each [`MemoryNode`] container carries.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedIdentity;

impl ObjectIdentityProvider<MemoryDocument> for EmbeddedIdentity {
    fn object_id<'a>(&self, _snapshot: &'a MemoryDocument, node: &&'a MemoryNode) -> Option<ObjectId> {
        node.id().cloned()
    }
}
