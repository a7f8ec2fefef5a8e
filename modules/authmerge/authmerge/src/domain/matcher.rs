//! Matching of change operations against path expressions.

use authmerge_sdk::{ObjectPath, Operation, PathExpr};

use super::path_index::PathIndex;

/// Resolves operation targets through a [`PathIndex`] and tests them
/// against path expressions.
#[derive(Debug, Clone, Copy)]
pub struct PathMatcher<'i> {
    index: &'i PathIndex,
}

impl<'i> PathMatcher<'i> {
    #[must_use]
    pub fn new(index: &'i PathIndex) -> Self {
        Self { index }
    }

    /// Path of the operation's container. Unindexed containers resolve to the
    /// root, so only root-scoped rules can cover them.
    #[must_use]
    pub fn container_path(&self, op: &Operation) -> &'i [String] {
        self.index
            .path_of(&op.obj)
            .map_or(&[][..], ObjectPath::segments)
    }

    /// Full path of the location the operation mutates.
    #[must_use]
    pub fn target_path(&self, op: &Operation) -> ObjectPath {
        ObjectPath::from_segments(self.container_path(op).iter().cloned())
            .child(op.key.to_segment())
    }

    /// Whether `expr` covers the location `op` mutates.
    ///
    /// The root expression covers everything. Any other expression covers an
    /// operation iff it is a segment-wise prefix of the operation's target
    /// path, where a dotted key counts as one segment per part. Actor and
    /// action are not considered here.
    #[must_use]
    pub fn matches(&self, op: &Operation, expr: &PathExpr) -> bool {
        if expr.is_root() {
            return true;
        }
        self.target_path(op)
            .segments()
            .starts_with(expr.segments())
    }
}

/// Shorthand for [`PathMatcher::matches`].
#[must_use]
pub fn matches(index: &PathIndex, op: &Operation, expr: &PathExpr) -> bool {
    PathMatcher::new(index).matches(op, expr)
}
