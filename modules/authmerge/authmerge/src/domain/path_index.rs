//! Object path index.
//!
//! Maps every reachable container of a snapshot to its logical dotted path,
//! so that change operations (which name their container by object id) can
//! be located in the document tree.

use std::collections::{BTreeMap, VecDeque};

use authmerge_sdk::{DocumentSnapshot, ObjectId, ObjectIdentityProvider, ObjectPath};
use serde::Serialize;

/// The snapshot violates the tree invariant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IndexError {
    #[error("object '{id}' is reachable at both '{first}' and '{second}'")]
    Inconsistent {
        id: ObjectId,
        first: ObjectPath,
        second: ObjectPath,
    },
}

/// Object id to path mapping for one snapshot.
///
/// The root is present only when the identity provider names it; an absent
/// root is implicit and resolves to the empty path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PathIndex {
    paths: BTreeMap<ObjectId, ObjectPath>,
}

impl PathIndex {
    /// Index `snapshot` breadth-first.
    ///
    /// Only containers (nodes the provider names) are recorded and descended
    /// into. Each identity may be reached once; reaching it again means the
    /// snapshot is not a tree, which is reported instead of looping.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Inconsistent`] if a container is reachable
    /// through more than one parent edge.
    pub fn build<S, P>(snapshot: &S, identity: &P) -> Result<Self, IndexError>
    where
        S: DocumentSnapshot + ?Sized,
        P: ObjectIdentityProvider<S> + ?Sized,
    {
        let mut paths = BTreeMap::new();
        let root = snapshot.root();
        if let Some(id) = identity.object_id(snapshot, &root) {
            paths.insert(id, ObjectPath::root());
        }

        let mut pending = VecDeque::from([(root, ObjectPath::root())]);
        while let Some((node, path)) = pending.pop_front() {
            for (key, child) in snapshot.children(&node) {
                let Some(id) = identity.object_id(snapshot, &child) else {
                    continue;
                };
                let child_path = path.child(key);
                if let Some(first) = paths.get(&id) {
                    return Err(IndexError::Inconsistent {
                        first: ObjectPath::clone(first),
                        second: child_path,
                        id,
                    });
                }
                paths.insert(id, child_path.clone());
                pending.push_back((child, child_path));
            }
        }

        tracing::trace!(containers = paths.len(), "built object path index");
        Ok(Self { paths })
    }

    /// Path of the container named `id`, if indexed.
    #[must_use]
    pub fn path_of(&self, id: &ObjectId) -> Option<&ObjectPath> {
        self.paths.get(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ObjectId, &ObjectPath)> {
        self.paths.iter()
    }

    /// Owned copy of the mapping, as exposed to delegated evaluators.
    #[must_use]
    pub fn to_object_paths(&self) -> BTreeMap<ObjectId, ObjectPath> {
        self.paths.clone()
    }
}

impl FromIterator<(ObjectId, ObjectPath)> for PathIndex {
    fn from_iter<I: IntoIterator<Item = (ObjectId, ObjectPath)>>(iter: I) -> Self {
        Self {
            paths: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::document::{EmbeddedIdentity, MemoryDocument, MemoryNode};

    fn nested() -> MemoryDocument {
        MemoryDocument::new(MemoryNode::map(
            "_root",
            [
                (
                    "nestedObject",
                    MemoryNode::map(
                        "1@9021",
                        [(
                            "subObject",
                            MemoryNode::map(
                                "2@9021",
                                [
                                    ("someKey", MemoryNode::value("someValue")),
                                    ("someOtherKey", MemoryNode::value(42)),
                                ],
                            ),
                        )],
                    ),
                ),
                (
                    "todos",
                    MemoryNode::list(
                        "3@9021",
                        vec![
                            MemoryNode::map("4@9021", [("done", MemoryNode::value(false))]),
                            MemoryNode::value("loose"),
                        ],
                    ),
                ),
            ],
        ))
    }

    #[test]
    fn indexes_every_container_with_its_path() {
        let index = PathIndex::build(&nested(), &EmbeddedIdentity).unwrap();

        let path = |id: &str| index.path_of(&ObjectId::from(id)).map(ToString::to_string);
        assert_eq!(path("_root"), Some(String::new()));
        assert_eq!(path("1@9021"), Some("nestedObject".to_owned()));
        assert_eq!(path("2@9021"), Some("nestedObject.subObject".to_owned()));
        assert_eq!(path("3@9021"), Some("todos".to_owned()));
        assert_eq!(path("4@9021"), Some("todos.0".to_owned()));
        assert_eq!(index.len(), 5);
    }

    #[test]
    fn unnamed_root_is_implicit() {
        struct NoRootIdentity;

        impl ObjectIdentityProvider<MemoryDocument> for NoRootIdentity {
            fn object_id<'a>(
                &self,
                snapshot: &'a MemoryDocument,
                node: &&'a MemoryNode,
            ) -> Option<ObjectId> {
                if std::ptr::eq(*node, snapshot.root()) {
                    None
                } else {
                    node.id().cloned()
                }
            }
        }

        let index = PathIndex::build(&nested(), &NoRootIdentity).unwrap();
        assert!(index.path_of(&ObjectId::root()).is_none());
        assert_eq!(
            index
                .path_of(&ObjectId::from("2@9021"))
                .map(ToString::to_string),
            Some("nestedObject.subObject".to_owned())
        );
    }

    #[test]
    fn shared_container_is_reported_not_looped() {
        let shared = MemoryNode::map("9@x", [("leaf", MemoryNode::value(1))]);
        let doc = MemoryDocument::new(MemoryNode::map(
            "_root",
            [("a", shared.clone()), ("b", shared)],
        ));

        let err = PathIndex::build(&doc, &EmbeddedIdentity).unwrap_err();
        let IndexError::Inconsistent { id, first, second } = err;
        assert_eq!(id, ObjectId::from("9@x"));
        assert_eq!(first.to_string(), "a");
        assert_eq!(second.to_string(), "b");
    }

    #[test]
    fn container_claiming_root_identity_is_reported() {
        let doc = MemoryDocument::new(MemoryNode::map(
            "_root",
            [(
                "loop",
                MemoryNode::map("_root", Vec::<(String, MemoryNode)>::new()),
            )],
        ));
        assert!(PathIndex::build(&doc, &EmbeddedIdentity).is_err());
    }

    #[test]
    fn index_serializes_as_dotted_map() {
        let index = PathIndex::build(&nested(), &EmbeddedIdentity).unwrap();
        let value = serde_json::to_value(&index).unwrap();
        assert_eq!(value["2@9021"], "nestedObject.subObject");
        assert_eq!(value["_root"], "");
    }

    #[test]
    fn dotted_keys_survive_serialization() {
        let doc = MemoryDocument::new(MemoryNode::map(
            "_root",
            [("a.b", MemoryNode::map("1@x", Vec::<(String, MemoryNode)>::new()))],
        ));
        let index = PathIndex::build(&doc, &EmbeddedIdentity).unwrap();

        let json = serde_json::to_string(&index.to_object_paths()).unwrap();
        let back: BTreeMap<ObjectId, ObjectPath> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, index.to_object_paths());
        assert_eq!(back[&ObjectId::from("1@x")].segments(), ["a", "b"]);
    }
}
