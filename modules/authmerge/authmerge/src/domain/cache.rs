//! Path index cache keyed by snapshot version.

use std::sync::Arc;

use authmerge_sdk::{DocumentSnapshot, ObjectIdentityProvider, SnapshotVersion};
use parking_lot::RwLock;

use super::path_index::{IndexError, PathIndex};

/// Holds the index of the most recently seen snapshot version.
///
/// Any version change replaces the slot. Snapshots without a version are
/// indexed on every call and never cached. The lock is not held while an
/// index is being built, so concurrent misses may build the same index twice.
#[derive(Debug, Default)]
pub struct PathIndexCache {
    slot: RwLock<Option<(SnapshotVersion, Arc<PathIndex>)>>,
}

impl PathIndexCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of `snapshot`, reused when its version matches the cached one.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError`] if the snapshot is not a tree. Failed builds
    /// are not cached.
    pub fn get_or_build<S, P>(&self, snapshot: &S, identity: &P) -> Result<Arc<PathIndex>, IndexError>
    where
        S: DocumentSnapshot + ?Sized,
        P: ObjectIdentityProvider<S> + ?Sized,
    {
        let Some(version) = snapshot.version() else {
            return PathIndex::build(snapshot, identity).map(Arc::new);
        };

        if let Some((cached, index)) = self.slot.read().as_ref()
            && *cached == version
        {
            tracing::trace!(%version, "path index cache hit");
            return Ok(Arc::clone(index));
        }

        let index = Arc::new(PathIndex::build(snapshot, identity)?);
        tracing::debug!(%version, containers = index.len(), "path index cache refreshed");
        *self.slot.write() = Some((version, Arc::clone(&index)));
        Ok(index)
    }

    /// Version of the cached index, if any.
    #[must_use]
    pub fn cached_version(&self) -> Option<SnapshotVersion> {
        self.slot.read().as_ref().map(|(version, _)| version.clone())
    }

    pub fn invalidate(&self) {
        *self.slot.write() = None;
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::document::{EmbeddedIdentity, MemoryDocument, MemoryNode};
    use authmerge_sdk::ObjectId;

    fn doc(version: Option<&str>, child: &str) -> MemoryDocument {
        let doc = MemoryDocument::new(MemoryNode::map(
            "_root",
            [(child, MemoryNode::map("1@a", Vec::<(String, MemoryNode)>::new()))],
        ));
        match version {
            Some(v) => doc.with_version(v),
            None => doc,
        }
    }

    fn path_of_1a(index: &PathIndex) -> String {
        index
            .path_of(&ObjectId::from("1@a"))
            .map(ToString::to_string)
            .unwrap_or_default()
    }

    #[test]
    fn same_version_reuses_index() {
        let cache = PathIndexCache::new();
        let first = cache.get_or_build(&doc(Some("v1"), "a"), &EmbeddedIdentity).unwrap();
        let second = cache.get_or_build(&doc(Some("v1"), "a"), &EmbeddedIdentity).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.cached_version(), Some(SnapshotVersion::new("v1")));
    }

    #[test]
    fn new_version_rebuilds() {
        let cache = PathIndexCache::new();
        let first = cache.get_or_build(&doc(Some("v1"), "a"), &EmbeddedIdentity).unwrap();
        let second = cache.get_or_build(&doc(Some("v2"), "moved"), &EmbeddedIdentity).unwrap();

        assert_eq!(path_of_1a(&first), "a");
        assert_eq!(path_of_1a(&second), "moved");
        assert_eq!(cache.cached_version(), Some(SnapshotVersion::new("v2")));
    }

    #[test]
    fn unversioned_snapshots_are_not_cached() {
        let cache = PathIndexCache::new();
        let first = cache.get_or_build(&doc(None, "a"), &EmbeddedIdentity).unwrap();
        let second = cache.get_or_build(&doc(None, "b"), &EmbeddedIdentity).unwrap();

        assert_eq!(path_of_1a(&first), "a");
        assert_eq!(path_of_1a(&second), "b");
        assert!(cache.cached_version().is_none());
    }

    #[test]
    fn invalidate_clears_slot() {
        let cache = PathIndexCache::new();
        cache.get_or_build(&doc(Some("v1"), "a"), &EmbeddedIdentity).unwrap();
        cache.invalidate();
        assert!(cache.cached_version().is_none());
    }
}
