//! Store error types.
//!
//! Domain errors carry an explicit kind next to the wrapped cause so callers
//! can branch on the kind without inspecting the cause's concrete type.

use std::fmt;
use thiserror::Error;

/// Boxed cause carried by domain errors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Classification of a domain error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DomainErrorKind {
    /// The caller supplied input the store cannot act on.
    BadRequest,
    /// The requested entity does not exist.
    NotFound,
    /// The orchestration state observed by the store is inconsistent.
    UnexpectedState,
}

impl fmt::Display for DomainErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DomainErrorKind::BadRequest => "bad request",
            DomainErrorKind::NotFound => "not found",
            DomainErrorKind::UnexpectedState => "unexpected orchestration state",
        };
        f.write_str(name)
    }
}

/// A failure tagged with its domain kind.
#[derive(Debug, Error)]
#[error("{kind}: {source}")]
pub struct DomainError {
    kind: DomainErrorKind,
    source: BoxError,
}

impl DomainError {
    pub fn new(kind: DomainErrorKind, source: impl Into<BoxError>) -> Self {
        Self {
            kind,
            source: source.into(),
        }
    }

    pub fn bad_request(source: impl Into<BoxError>) -> Self {
        Self::new(DomainErrorKind::BadRequest, source)
    }

    pub fn not_found(source: impl Into<BoxError>) -> Self {
        Self::new(DomainErrorKind::NotFound, source)
    }

    pub fn unexpected_state(source: impl Into<BoxError>) -> Self {
        Self::new(DomainErrorKind::UnexpectedState, source)
    }

    pub fn kind(&self) -> DomainErrorKind {
        self.kind
    }
}

/// Errors returned by a resource store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A classified domain failure.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The store could not serve the request at all.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A change subscriber fell behind the bounded change buffer.
    #[error("change stream lagged behind by {0} events")]
    Lagged(u64),

    /// The store did not answer within the request deadline.
    #[error("store call timed out after {0:?}")]
    Timeout(std::time::Duration),
}

impl StoreError {
    /// Domain kind of the failure, if it carries one.
    pub fn domain_kind(&self) -> Option<DomainErrorKind> {
        match self {
            StoreError::Domain(err) => Some(err.kind()),
            _ => None,
        }
    }
}

/// Result type for store operations and change stream items.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_domain_error_keeps_kind_and_cause() {
        let err = DomainError::not_found("arn:aws:ecs:task/missing");
        assert_eq!(err.kind(), DomainErrorKind::NotFound);
        assert_eq!(err.to_string(), "not found: arn:aws:ecs:task/missing");
        assert!(err.source().is_some());
    }

    #[test]
    fn test_store_error_domain_kind() {
        let err: StoreError = DomainError::unexpected_state("deployment stuck").into();
        assert_eq!(err.domain_kind(), Some(DomainErrorKind::UnexpectedState));
        assert_eq!(StoreError::Lagged(4).domain_kind(), None);
        assert_eq!(StoreError::Unavailable("down".into()).domain_kind(), None);
        let timeout = StoreError::Timeout(std::time::Duration::from_secs(2));
        assert_eq!(timeout.domain_kind(), None);
        assert_eq!(timeout.to_string(), "store call timed out after 2s");
    }
}
