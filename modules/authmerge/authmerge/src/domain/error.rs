//! Domain errors for authmerge.

use authmerge_sdk::{AuthmergeError, RuleSetError};

use super::path_index::IndexError;

/// Internal domain errors.
///
/// A denied change is never an error; these describe why no decision could
/// be reached at all.
#[derive(thiserror::Error, Debug)]
pub enum DomainError {
    #[error("invalid rules: {0}")]
    InvalidRules(#[from] RuleSetError),

    #[error(transparent)]
    InconsistentSnapshot(#[from] IndexError),

    #[error("delegated backend selected but no policy evaluator is configured")]
    EvaluatorNotConfigured,

    #[error("policy evaluator failed: {0}")]
    Evaluator(AuthmergeError),
}

impl From<AuthmergeError> for DomainError {
    fn from(e: AuthmergeError) -> Self {
        match e {
            AuthmergeError::NoEvaluatorAvailable => Self::EvaluatorNotConfigured,
            other => Self::Evaluator(other),
        }
    }
}

impl From<DomainError> for AuthmergeError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::EvaluatorNotConfigured => Self::NoEvaluatorAvailable,
            DomainError::Evaluator(inner) => inner,
            DomainError::InvalidRules(err) => Self::Internal(format!("invalid rules: {err}")),
            DomainError::InconsistentSnapshot(err) => Self::Internal(err.to_string()),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn evaluator_errors_convert_both_ways() {
        let domain = DomainError::from(AuthmergeError::NoEvaluatorAvailable);
        assert!(matches!(domain, DomainError::EvaluatorNotConfigured));
        assert!(matches!(
            AuthmergeError::from(domain),
            AuthmergeError::NoEvaluatorAvailable
        ));

        let domain = DomainError::from(AuthmergeError::EvaluatorUnavailable("down".to_owned()));
        match AuthmergeError::from(domain) {
            AuthmergeError::EvaluatorUnavailable(msg) => assert_eq!(msg, "down"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn rule_errors_surface_as_internal() {
        let err = RuleSetError::Parse("expected a list".to_owned());
        let sdk: AuthmergeError = DomainError::from(err).into();
        assert!(matches!(sdk, AuthmergeError::Internal(msg) if msg.contains("expected a list")));
    }

    #[test]
    fn inconsistent_snapshot_surfaces_as_internal() {
        use authmerge_sdk::{ObjectId, ObjectPath};

        let err = IndexError::Inconsistent {
            id: ObjectId::from("9@x"),
            first: ObjectPath::from_segments(["a"]),
            second: ObjectPath::from_segments(["b"]),
        };
        let sdk: AuthmergeError = DomainError::from(err).into();
        assert!(matches!(sdk, AuthmergeError::Internal(msg) if msg.contains("9@x")));
    }
}
