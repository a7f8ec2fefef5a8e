//! How the verdicts of several matching rules combine for one operation.

use authmerge_sdk::{Action, ActorId, AuthorizationRule};
use serde::{Deserialize, Serialize};

/// Conflict resolution across the rules whose target covers an operation.
///
/// An operation with no matching rule is denied under every strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictStrategy {
    /// Every matching rule must approve; any narrower rule can veto.
    #[default]
    AllMatching,
    /// Only the rules with the longest matching target decide, and all of
    /// them must approve.
    MostSpecific,
    /// One approving matching rule is enough.
    AnyMatching,
}

impl ConflictStrategy {
    /// Combine the rules matching an operation into a single permit/deny.
    #[must_use]
    pub fn permits(self, matching: &[&AuthorizationRule], actor: &ActorId, action: Action) -> bool {
        if matching.is_empty() {
            return false;
        }
        match self {
            Self::AllMatching => matching.iter().all(|r| r.approves(actor, action)),
            Self::AnyMatching => matching.iter().any(|r| r.approves(actor, action)),
            Self::MostSpecific => {
                let depth = matching.iter().map(|r| r.target.len()).max().unwrap_or(0);
                matching
                    .iter()
                    .filter(|r| r.target.len() == depth)
                    .all(|r| r.approves(actor, action))
            }
        }
    }
}
