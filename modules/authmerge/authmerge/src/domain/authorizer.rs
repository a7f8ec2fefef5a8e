//! Rule-based change authorizer.
//!
//! Decides whether a decoded change may be applied to a snapshot:
//!
//! 1. Index the snapshot's containers by object path.
//! 2. For each operation, collect the rules whose target covers it.
//! 3. No covering rule denies the change (fail-closed); otherwise the
//!    [`ConflictStrategy`] combines the covering rules' approvals.
//!
//! A change is allowed only if it has at least one operation and every
//! operation is permitted. Evaluation stops at the first denied operation.

use authmerge_sdk::{
    Action, AuthorizationRule, DecodedChange, DocumentSnapshot, ObjectIdentityProvider, ObjectPath,
    RuleSet,
};
use serde::Serialize;
use tracing::{debug, warn};

use super::matcher::PathMatcher;
use super::path_index::PathIndex;
use super::strategy::ConflictStrategy;

/// Why a change was denied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum DenialReason {
    #[error("change contains no operations")]
    EmptyChange,

    #[error("no changes to authorize")]
    EmptyBatch,

    #[error("operation #{op_index} ({action} at '{path}') is not covered by any rule")]
    NoApplicableRule {
        op_index: usize,
        action: Action,
        path: ObjectPath,
    },

    #[error("operation #{op_index} ({action} at '{path}') was rejected by a matching rule")]
    RuleRejected {
        op_index: usize,
        action: Action,
        path: ObjectPath,
    },

    #[error("snapshot is inconsistent: {detail}")]
    InconsistentSnapshot { detail: String },

    #[error("policy evaluator denied the changes ({error_code})")]
    EvaluatorDenied {
        error_code: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        details: Option<String>,
    },
}

/// Outcome of authorizing a change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Deny(DenialReason),
}

impl Verdict {
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    #[must_use]
    pub fn denial(&self) -> Option<&DenialReason> {
        match self {
            Self::Allow => None,
            Self::Deny(reason) => Some(reason),
        }
    }
}

/// Authorizes changes against a fixed rule set.
///
/// Holds no mutable state; one instance can serve concurrent checks.
#[derive(Debug, Clone, Default)]
pub struct Authorizer {
    rules: RuleSet,
    strategy: ConflictStrategy,
}

impl Authorizer {
    #[must_use]
    pub fn new(rules: RuleSet) -> Self {
        Self {
            rules,
            strategy: ConflictStrategy::default(),
        }
    }

    #[must_use]
    pub fn with_strategy(mut self, strategy: ConflictStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    #[must_use]
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    #[must_use]
    pub fn strategy(&self) -> ConflictStrategy {
        self.strategy
    }

    /// Whether `change` may be applied to `snapshot`.
    #[must_use]
    pub fn check<S, P>(&self, snapshot: &S, identity: &P, change: &DecodedChange) -> bool
    where
        S: DocumentSnapshot + ?Sized,
        P: ObjectIdentityProvider<S> + ?Sized,
    {
        self.evaluate(snapshot, identity, change).is_allowed()
    }

    /// Like [`check`](Self::check), with the reason for a denial.
    #[must_use]
    pub fn evaluate<S, P>(&self, snapshot: &S, identity: &P, change: &DecodedChange) -> Verdict
    where
        S: DocumentSnapshot + ?Sized,
        P: ObjectIdentityProvider<S> + ?Sized,
    {
        match PathIndex::build(snapshot, identity) {
            Ok(index) => self.evaluate_indexed(&index, change),
            Err(e) => inconsistent(&e),
        }
    }

    /// Whether every change in `changes` may be applied to `snapshot`.
    ///
    /// An empty batch is denied. The snapshot is indexed once.
    #[must_use]
    pub fn check_all<S, P>(&self, snapshot: &S, identity: &P, changes: &[DecodedChange]) -> bool
    where
        S: DocumentSnapshot + ?Sized,
        P: ObjectIdentityProvider<S> + ?Sized,
    {
        match PathIndex::build(snapshot, identity) {
            Ok(index) => self.evaluate_all_indexed(&index, changes).is_allowed(),
            Err(e) => inconsistent(&e).is_allowed(),
        }
    }

    /// Authorize `change` against a prebuilt index.
    #[must_use]
    pub fn check_indexed(&self, index: &PathIndex, change: &DecodedChange) -> bool {
        self.evaluate_indexed(index, change).is_allowed()
    }

    /// Authorize `change` against a prebuilt index, with the denial reason.
    #[must_use]
    pub fn evaluate_indexed(&self, index: &PathIndex, change: &DecodedChange) -> Verdict {
        if change.ops.is_empty() {
            debug!(actor = %change.actor, "denying change without operations");
            return Verdict::Deny(DenialReason::EmptyChange);
        }

        let matcher = PathMatcher::new(index);
        for (op_index, op) in change.ops.iter().enumerate() {
            let matching: Vec<&AuthorizationRule> = self
                .rules
                .iter()
                .filter(|rule| matcher.matches(op, &rule.target))
                .collect();

            if matching.is_empty() {
                let path = matcher.target_path(op);
                debug!(actor = %change.actor, op_index, action = %op.action, %path, "no rule covers operation");
                return Verdict::Deny(DenialReason::NoApplicableRule {
                    op_index,
                    action: op.action,
                    path,
                });
            }

            if !self.strategy.permits(&matching, &change.actor, op.action) {
                let path = matcher.target_path(op);
                debug!(
                    actor = %change.actor,
                    op_index,
                    action = %op.action,
                    %path,
                    matching = matching.len(),
                    "operation rejected by matching rules"
                );
                return Verdict::Deny(DenialReason::RuleRejected {
                    op_index,
                    action: op.action,
                    path,
                });
            }
        }

        debug!(actor = %change.actor, ops = change.ops.len(), "change allowed");
        Verdict::Allow
    }

    /// Authorize a batch against a prebuilt index. Stops at the first denied
    /// change.
    #[must_use]
    pub fn evaluate_all_indexed(&self, index: &PathIndex, changes: &[DecodedChange]) -> Verdict {
        if changes.is_empty() {
            return Verdict::Deny(DenialReason::EmptyBatch);
        }
        changes
            .iter()
            .map(|change| self.evaluate_indexed(index, change))
            .find(|verdict| !verdict.is_allowed())
            .unwrap_or(Verdict::Allow)
    }
}

fn inconsistent(err: &super::path_index::IndexError) -> Verdict {
    warn!(error = %err, "denying change against inconsistent snapshot");
    Verdict::Deny(DenialReason::InconsistentSnapshot {
        detail: err.to_string(),
    })
}

/// Authorize `change` under `rules` with the default strategy.
#[must_use]
pub fn check<S, P>(snapshot: &S, identity: &P, change: &DecodedChange, rules: &RuleSet) -> bool
where
    S: DocumentSnapshot + ?Sized,
    P: ObjectIdentityProvider<S> + ?Sized,
{
    Authorizer::new(rules.clone()).check(snapshot, identity, change)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::document::{EmbeddedIdentity, MemoryDocument, MemoryNode};
    use authmerge_sdk::{ObjectId, Operation};

    /// Document with container path `a.b.c` and a sibling `x.y`.
    fn doc() -> MemoryDocument {
        MemoryDocument::new(MemoryNode::map(
            "_root",
            [
                (
                    "a",
                    MemoryNode::map(
                        "1@d",
                        [(
                            "b",
                            MemoryNode::map(
                                "2@d",
                                [("c", MemoryNode::map("3@d", [("v", MemoryNode::value(1))]))],
                            ),
                        )],
                    ),
                ),
                (
                    "x",
                    MemoryNode::map("4@d", [("y", MemoryNode::map("5@d", Vec::<(String, MemoryNode)>::new()))]),
                ),
            ],
        ))
    }

    fn scenario_rules() -> RuleSet {
        RuleSet::from_json(r#"[{"actors": ["X"], "actions": ["set"], "target": "a.b"}]"#).unwrap()
    }

    fn change(actor: &str, ops: Vec<Operation>) -> DecodedChange {
        DecodedChange::new(actor, ops)
    }

    #[test]
    fn scoped_rule_scenario() {
        let doc = doc();
        let authz = Authorizer::new(scenario_rules());
        let under_abc = Operation::new("3@d", "v", Action::Set);

        assert!(authz.check(&doc, &EmbeddedIdentity, &change("X", vec![under_abc.clone()])));
        assert_eq!(
            authz.evaluate(&doc, &EmbeddedIdentity, &change("Y", vec![under_abc])),
            Verdict::Deny(DenialReason::RuleRejected {
                op_index: 0,
                action: Action::Set,
                path: ObjectPath::from_segments(["a", "b", "c", "v"]),
            })
        );
        assert!(!authz.check(
            &doc,
            &EmbeddedIdentity,
            &change("X", vec![Operation::new("3@d", "v", Action::Del)])
        ));
        assert!(matches!(
            authz.evaluate(
                &doc,
                &EmbeddedIdentity,
                &change("X", vec![Operation::new("5@d", "z", Action::Set)])
            ),
            Verdict::Deny(DenialReason::NoApplicableRule { .. })
        ));
    }

    #[test]
    fn empty_change_is_denied() {
        let authz = Authorizer::new(RuleSet::new(vec![AuthorizationRule::allow_all()]));
        assert_eq!(
            authz.evaluate(&doc(), &EmbeddedIdentity, &change("X", vec![])),
            Verdict::Deny(DenialReason::EmptyChange)
        );
    }

    #[test]
    fn one_denied_operation_denies_whole_change() {
        let doc = doc();
        let authz = Authorizer::new(scenario_rules());
        let verdict = authz.evaluate(
            &doc,
            &EmbeddedIdentity,
            &change(
                "X",
                vec![
                    Operation::new("3@d", "v", Action::Set),
                    Operation::new("2@d", "fresh", Action::Set),
                    Operation::new(ObjectId::root(), "title", Action::Set),
                ],
            ),
        );
        assert!(matches!(
            verdict,
            Verdict::Deny(DenialReason::NoApplicableRule { op_index: 2, .. })
        ));
    }

    #[test]
    fn narrower_rule_vetoes_broader_grant() {
        let rules = RuleSet::from_json(
            r#"[
                {"actors": "*", "actions": "*", "target": ""},
                {"actors": ["X"], "actions": ["set"], "target": "a.b"}
            ]"#,
        )
        .unwrap();
        let doc = doc();
        let authz = Authorizer::new(rules);

        assert!(!authz.check(
            &doc,
            &EmbeddedIdentity,
            &change("Y", vec![Operation::new("3@d", "v", Action::Set)])
        ));
        assert!(authz.check(
            &doc,
            &EmbeddedIdentity,
            &change("Y", vec![Operation::new("5@d", "z", Action::Set)])
        ));

        let lenient = authz.clone().with_strategy(ConflictStrategy::AnyMatching);
        assert!(lenient.check(
            &doc,
            &EmbeddedIdentity,
            &change("Y", vec![Operation::new("3@d", "v", Action::Set)])
        ));
    }

    #[test]
    fn batch_requires_every_change_and_at_least_one() {
        let doc = doc();
        let authz = Authorizer::new(scenario_rules());
        let good = change("X", vec![Operation::new("3@d", "v", Action::Set)]);
        let bad = change("Y", vec![Operation::new("3@d", "v", Action::Set)]);

        assert!(authz.check_all(&doc, &EmbeddedIdentity, std::slice::from_ref(&good)));
        assert!(!authz.check_all(&doc, &EmbeddedIdentity, &[good, bad]));
        assert!(!authz.check_all(&doc, &EmbeddedIdentity, &[]));
    }

    #[test]
    fn free_function_uses_default_strategy() {
        let doc = doc();
        let allowed = change("X", vec![Operation::new("3@d", "v", Action::Set)]);
        assert!(check(&doc, &EmbeddedIdentity, &allowed, &scenario_rules()));
        assert!(!check(&doc, &EmbeddedIdentity, &allowed, &RuleSet::default()));
    }

    #[test]
    fn denial_reason_serializes_with_code() {
        let reason = DenialReason::NoApplicableRule {
            op_index: 1,
            action: Action::Del,
            path: ObjectPath::from_segments(["x", "y"]),
        };
        assert_eq!(
            serde_json::to_value(&reason).unwrap(),
            serde_json::json!({"code": "no_applicable_rule", "op_index": 1, "action": "del", "path": "x.y"})
        );
        assert_eq!(
            reason.to_string(),
            "operation #1 (del at 'x.y') is not covered by any rule"
        );
    }
}
