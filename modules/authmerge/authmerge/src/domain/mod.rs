//! Domain layer for authmerge.

pub mod authorizer;
pub mod cache;
pub mod delegated;
pub mod error;
pub mod matcher;
pub mod path_index;
pub mod service;
pub mod strategy;

pub use authorizer::{Authorizer, DenialReason, Verdict, check};
pub use cache::PathIndexCache;
pub use delegated::DelegatedAuthorizer;
pub use error::DomainError;
pub use matcher::{PathMatcher, matches};
pub use path_index::{IndexError, PathIndex};
pub use service::Service;
pub use strategy::ConflictStrategy;
