//! authmerge Module
//!
//! Path-scoped authorization of CRDT document changes. A snapshot's
//! containers are indexed by logical path, each operation of a change is
//! located through that index, and the change is allowed only if every
//! operation is covered and permitted by the configured rules (or by a
//! delegated policy evaluator).
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod config;
pub mod document;
pub mod domain;

pub use config::{AuthmergeConfig, BackendKind, ConfigError};
pub use document::{EmbeddedIdentity, MemoryDocument, MemoryNode};
pub use domain::{
    Authorizer, ConflictStrategy, DelegatedAuthorizer, DenialReason, DomainError, IndexError,
    PathIndex, PathIndexCache, PathMatcher, Service, Verdict, check, matches,
};
