//! Logical document paths and dotted path expressions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Separator between segments in the dotted notation.
pub const SEPARATOR: char = '.';

/// Location of a container relative to the document root.
///
/// The root's path is the empty sequence. Serialized in dotted notation.
/// A key containing the separator contributes one segment per dotted part,
/// so the key `"a.b"` and the nested keys `a` then `b` share a path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectPath(Vec<String>);

impl ObjectPath {
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    #[must_use]
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut path = Self::root();
        for segment in segments {
            let segment: String = segment.into();
            path.push(&segment);
        }
        path
    }

    /// Path of a child reached through the key `segment`.
    #[must_use]
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let segment: String = segment.into();
        let mut path = self.clone();
        path.push(&segment);
        path
    }

    fn push(&mut self, key: &str) {
        self.0.extend(key.split(SEPARATOR).map(ToOwned::to_owned));
    }

    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `self` equals `other` or lies beneath it.
    #[must_use]
    pub fn is_within(&self, other: &ObjectPath) -> bool {
        self.0.starts_with(&other.0)
    }

    /// All strict ancestors, nearest first, ending with the root.
    pub fn ancestors(&self) -> impl Iterator<Item = ObjectPath> + '_ {
        (0..self.0.len())
            .rev()
            .map(|len| Self(self.0[..len].to_vec()))
    }
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for segment in &self.0 {
            if !first {
                write!(f, "{SEPARATOR}")?;
            }
            f.write_str(segment)?;
            first = false;
        }
        Ok(())
    }
}

impl Serialize for ObjectPath {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ObjectPath {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if raw.is_empty() {
            return Ok(Self::root());
        }
        Ok(Self(raw.split(SEPARATOR).map(ToOwned::to_owned).collect()))
    }
}

/// Error produced when parsing a [`PathExpr`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathExprError {
    #[error("path expression '{expr}' has an empty segment at position {position}")]
    EmptySegment { expr: String, position: usize },
}

/// A dotted path expression scoping a rule to a subtree.
///
/// The empty expression denotes the document root and covers every location.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathExpr(Vec<String>);

impl PathExpr {
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Parse dotted notation. `""` is the root; `"a..b"`, `".a"` and `"a."`
    /// are rejected.
    ///
    /// # Errors
    ///
    /// Returns [`PathExprError::EmptySegment`] if any segment is empty.
    pub fn parse(expr: &str) -> Result<Self, PathExprError> {
        if expr.is_empty() {
            return Ok(Self::root());
        }
        expr.split(SEPARATOR)
            .enumerate()
            .map(|(position, segment)| {
                if segment.is_empty() {
                    Err(PathExprError::EmptySegment {
                        expr: expr.to_owned(),
                        position,
                    })
                } else {
                    Ok(segment.to_owned())
                }
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Strict-prefix ancestors, nearest first, ending with the root expression.
    pub fn ancestors(&self) -> impl Iterator<Item = PathExpr> + '_ {
        (0..self.0.len())
            .rev()
            .map(|len| Self(self.0[..len].to_vec()))
    }
}

impl FromStr for PathExpr {
    type Err = PathExprError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for PathExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for segment in &self.0 {
            if !first {
                write!(f, "{SEPARATOR}")?;
            }
            f.write_str(segment)?;
            first = false;
        }
        Ok(())
    }
}

impl Serialize for PathExpr {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PathExpr {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
