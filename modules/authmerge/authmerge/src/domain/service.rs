//! Domain service for authmerge.

use std::sync::Arc;

use authmerge_sdk::{DecodedChange, DocumentSnapshot, ObjectIdentityProvider, PolicyEvaluatorClient};
use tracing::{info, warn};

use super::authorizer::{Authorizer, Verdict};
use super::cache::PathIndexCache;
use super::delegated::DelegatedAuthorizer;
use super::error::DomainError;
use super::path_index::PathIndex;
use crate::config::{AuthmergeConfig, BackendKind};

#[derive(Debug)]
enum Backend {
    Rules(Authorizer),
    Delegated(DelegatedAuthorizer),
}

/// authmerge service.
///
/// Decides whether batches of decoded changes may be applied to a snapshot,
/// using either the configured rules or a delegated policy evaluator.
#[derive(Debug)]
pub struct Service {
    backend: Backend,
    cache: Option<PathIndexCache>,
}

impl Service {
    /// Rule-backed service with no index cache.
    #[must_use]
    pub fn with_authorizer(authorizer: Authorizer) -> Self {
        Self {
            backend: Backend::Rules(authorizer),
            cache: None,
        }
    }

    /// Service backed by a policy evaluator, with no index cache.
    #[must_use]
    pub fn with_delegated(delegated: DelegatedAuthorizer) -> Self {
        Self {
            backend: Backend::Delegated(delegated),
            cache: None,
        }
    }

    /// Build the service described by `config`.
    ///
    /// `evaluator` is required when the delegated backend is selected and
    /// ignored otherwise.
    ///
    /// # Errors
    ///
    /// - [`DomainError::InvalidRules`] if a configured rule is malformed
    /// - [`DomainError::EvaluatorNotConfigured`] if the delegated backend is
    ///   selected without an evaluator
    pub fn from_config(
        config: &AuthmergeConfig,
        evaluator: Option<Arc<dyn PolicyEvaluatorClient>>,
    ) -> Result<Self, DomainError> {
        let backend = match config.backend {
            BackendKind::Rules => {
                let rules = config.rule_set()?;
                if rules.is_empty() {
                    warn!("no authorization rules configured; every change will be denied");
                }
                info!(rules = rules.len(), strategy = ?config.strategy, "using rule backend");
                Backend::Rules(Authorizer::new(rules).with_strategy(config.strategy))
            }
            BackendKind::Delegated => {
                let evaluator = evaluator.ok_or(DomainError::EvaluatorNotConfigured)?;
                info!("using delegated policy evaluator");
                Backend::Delegated(DelegatedAuthorizer::new(evaluator, config.facts.clone()))
            }
        };

        Ok(Self {
            backend,
            cache: config.cache_index.then(PathIndexCache::new),
        })
    }

    /// Path index of `snapshot`, served from the cache when enabled.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InconsistentSnapshot`] if the snapshot is not a
    /// tree.
    pub fn index_of<S, P>(&self, snapshot: &S, identity: &P) -> Result<Arc<PathIndex>, DomainError>
    where
        S: DocumentSnapshot + ?Sized,
        P: ObjectIdentityProvider<S> + ?Sized,
    {
        let index = match &self.cache {
            Some(cache) => cache.get_or_build(snapshot, identity),
            None => PathIndex::build(snapshot, identity).map(Arc::new),
        };
        index.map_err(|e| {
            warn!(error = %e, "cannot index inconsistent snapshot");
            DomainError::from(e)
        })
    }

    /// Authorize `changes` against `snapshot`, with the denial reason.
    ///
    /// # Errors
    ///
    /// - [`DomainError::InconsistentSnapshot`] if the snapshot is not a tree
    /// - [`DomainError::Evaluator`] if the delegated evaluator fails
    #[tracing::instrument(skip_all, fields(changes = changes.len()))]
    pub async fn evaluate<S, P>(
        &self,
        snapshot: &S,
        identity: &P,
        changes: &[DecodedChange],
    ) -> Result<Verdict, DomainError>
    where
        S: DocumentSnapshot + ?Sized,
        P: ObjectIdentityProvider<S> + ?Sized,
    {
        let index = self.index_of(snapshot, identity)?;
        match &self.backend {
            Backend::Rules(authorizer) => Ok(authorizer.evaluate_all_indexed(&index, changes)),
            Backend::Delegated(delegated) => delegated.evaluate_indexed(&index, changes).await,
        }
    }

    /// Whether every change in `changes` may be applied to `snapshot`.
    ///
    /// # Errors
    ///
    /// See [`evaluate`](Self::evaluate).
    pub async fn check<S, P>(
        &self,
        snapshot: &S,
        identity: &P,
        changes: &[DecodedChange],
    ) -> Result<bool, DomainError>
    where
        S: DocumentSnapshot + ?Sized,
        P: ObjectIdentityProvider<S> + ?Sized,
    {
        Ok(self.evaluate(snapshot, identity, changes).await?.is_allowed())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::document::{EmbeddedIdentity, MemoryDocument, MemoryNode};
    use crate::domain::DenialReason;
    use authmerge_sdk::{Action, Operation, RuleSpec, SelectorSpec};
    use serde_json::json;

    fn config(rules: Vec<RuleSpec>) -> AuthmergeConfig {
        AuthmergeConfig {
            rules,
            ..AuthmergeConfig::default()
        }
    }

    fn doc(version: &str) -> MemoryDocument {
        MemoryDocument::new(MemoryNode::map(
            "_root",
            [("notes", MemoryNode::map("1@a", [("body", MemoryNode::value(""))]))],
        ))
        .with_version(version)
    }

    fn edit(actor: &str) -> Vec<DecodedChange> {
        vec![DecodedChange::new(
            actor,
            vec![Operation::new("1@a", "body", Action::Set)],
        )]
    }

    #[tokio::test]
    async fn rules_backend_authorizes_batches() {
        let svc = Service::from_config(
            &config(vec![RuleSpec {
                actors: SelectorSpec::list(["alice"]),
                actions: SelectorSpec::any(),
                target: json!("notes"),
            }]),
            None,
        )
        .unwrap();

        assert!(svc.check(&doc("v1"), &EmbeddedIdentity, &edit("alice")).await.unwrap());
        assert!(!svc.check(&doc("v1"), &EmbeddedIdentity, &edit("bob")).await.unwrap());
        assert_eq!(
            svc.evaluate(&doc("v1"), &EmbeddedIdentity, &[]).await.unwrap(),
            Verdict::Deny(DenialReason::EmptyBatch)
        );
    }

    #[test]
    fn invalid_rules_fail_construction() {
        let err = Service::from_config(
            &config(vec![RuleSpec {
                actors: SelectorSpec::any(),
                actions: SelectorSpec::list(["sett"]),
                target: json!(""),
            }]),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::InvalidRules(_)));
    }

    #[test]
    fn delegated_backend_requires_evaluator() {
        let config = AuthmergeConfig {
            backend: BackendKind::Delegated,
            ..AuthmergeConfig::default()
        };
        assert!(matches!(
            Service::from_config(&config, None).unwrap_err(),
            DomainError::EvaluatorNotConfigured
        ));
    }

    #[test]
    fn cached_index_is_reused_per_version() {
        let svc = Service::from_config(&config(Vec::new()), None).unwrap();
        let first = svc.index_of(&doc("v1"), &EmbeddedIdentity).unwrap();
        let second = svc.index_of(&doc("v1"), &EmbeddedIdentity).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let uncached = Service::from_config(
            &AuthmergeConfig {
                cache_index: false,
                ..AuthmergeConfig::default()
            },
            None,
        )
        .unwrap();
        let first = uncached.index_of(&doc("v1"), &EmbeddedIdentity).unwrap();
        let second = uncached.index_of(&doc("v1"), &EmbeddedIdentity).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn inconsistent_snapshot_is_an_error() {
        let shared = MemoryNode::map("9@x", Vec::<(String, MemoryNode)>::new());
        let doc = MemoryDocument::new(MemoryNode::map(
            "_root",
            [("a", shared.clone()), ("b", shared)],
        ));
        let svc = Service::with_authorizer(Authorizer::default());

        let err = svc
            .check(&doc, &EmbeddedIdentity, &edit("alice"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InconsistentSnapshot(_)));
    }
}
