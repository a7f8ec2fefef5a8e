//! Read-only access to CRDT document snapshots.
//!
//! The CRDT engine owns the document; authmerge only needs to walk a
//! snapshot's containers and learn their object identities. Both capabilities
//! are injected so the indexer stays independent of any particular engine's
//! internal representation.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::ObjectId;

/// Token naming one revision of one document (e.g. the engine's heads).
///
/// Index caches are keyed by it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapshotVersion(String);

impl SnapshotVersion {
    #[must_use]
    pub fn new(version: impl Into<String>) -> Self {
        Self(version.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SnapshotVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An immutable, point-in-time view of a document tree.
pub trait DocumentSnapshot {
    /// Handle to a node (container or primitive) of this snapshot.
    type Node<'a>: Clone
    where
        Self: 'a;

    /// The document root.
    fn root(&self) -> Self::Node<'_>;

    /// Child nodes of `node`, keyed by property name or list index.
    ///
    /// Primitive leaves have no children.
    fn children<'a>(&'a self, node: &Self::Node<'a>) -> Vec<(String, Self::Node<'a>)>;

    /// Revision identity of this snapshot, if the engine exposes one.
    fn version(&self) -> Option<SnapshotVersion> {
        None
    }
}

/// Resolves stable object identities for snapshot nodes.
pub trait ObjectIdentityProvider<S: DocumentSnapshot + ?Sized> {
    /// Identifier of `node` if it is a container, `None` for primitives.
    fn object_id<'a>(&self, snapshot: &'a S, node: &S::Node<'a>) -> Option<ObjectId>;
}
