use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use viridian_identity::IdentityError;
use viridian_storage::StorageError;
use viridian_types::{AssetId, AssetStatus, ReviewOutcome, ValidationError};

pub type RegistryResult<T> = Result<T, RegistryError>;

/// Failure of one registry operation. Every variant maps to one [`ErrorKind`].
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("predecessor {id} is {status}, expected active")]
    InvalidPredecessorState { id: AssetId, status: AssetStatus },

    #[error("{outcome} is not allowed for {id} in status {from}")]
    IllegalTransition {
        id: AssetId,
        from: AssetStatus,
        outcome: ReviewOutcome,
    },

    #[error("product {product} would contain itself via {via}")]
    CyclicContainment { product: AssetId, via: AssetId },

    /// A read went stale before commit. The caller decides whether to retry.
    #[error("transaction aborted by a concurrent commit: {0}")]
    ConflictAborted(String),

    #[error("storage failure: {0}")]
    StorageFailure(String),
}

/// Failure taxonomy exposed to callers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    AccessDenied,
    InvalidArgument,
    NotFound,
    InvalidPredecessorState,
    IllegalTransition,
    CyclicContainment,
    ConflictAborted,
    StorageFailure,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::AccessDenied => "AccessDenied",
            ErrorKind::InvalidArgument => "InvalidArgument",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::InvalidPredecessorState => "InvalidPredecessorState",
            ErrorKind::IllegalTransition => "IllegalTransition",
            ErrorKind::CyclicContainment => "CyclicContainment",
            ErrorKind::ConflictAborted => "ConflictAborted",
            ErrorKind::StorageFailure => "StorageFailure",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl RegistryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RegistryError::AccessDenied(_) => ErrorKind::AccessDenied,
            RegistryError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            RegistryError::NotFound(_) => ErrorKind::NotFound,
            RegistryError::InvalidPredecessorState { .. } => ErrorKind::InvalidPredecessorState,
            RegistryError::IllegalTransition { .. } => ErrorKind::IllegalTransition,
            RegistryError::CyclicContainment { .. } => ErrorKind::CyclicContainment,
            RegistryError::ConflictAborted(_) => ErrorKind::ConflictAborted,
            RegistryError::StorageFailure(_) => ErrorKind::StorageFailure,
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        RegistryError::InvalidArgument(message.into())
    }

    pub(crate) fn corrupt(message: impl Into<String>) -> Self {
        RegistryError::from(StorageError::InvariantViolation(message.into()))
    }
}

impl From<ValidationError> for RegistryError {
    fn from(err: ValidationError) -> Self {
        RegistryError::InvalidArgument(err.to_string())
    }
}

impl From<IdentityError> for RegistryError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::LockError => RegistryError::StorageFailure(err.to_string()),
            other => RegistryError::AccessDenied(other.to_string()),
        }
    }
}

impl From<StorageError> for RegistryError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Conflict(message) => RegistryError::ConflictAborted(message),
            StorageError::NotFound(message) => RegistryError::NotFound(message),
            other => RegistryError::StorageFailure(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for RegistryError {
    fn from(err: serde_json::Error) -> Self {
        RegistryError::from(StorageError::Serialization(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_conflict_surfaces_as_conflict_aborted() {
        let err = RegistryError::from(StorageError::Conflict("k".into()));
        assert_eq!(err.kind(), ErrorKind::ConflictAborted);
    }

    #[test]
    fn corruption_is_a_storage_failure() {
        assert_eq!(
            RegistryError::corrupt("dangling link").kind(),
            ErrorKind::StorageFailure
        );
    }

    #[test]
    fn identity_failures_deny_access() {
        let err = RegistryError::from(IdentityError::Anonymous);
        assert_eq!(err.kind(), ErrorKind::AccessDenied);
    }

    #[test]
    fn validation_failures_are_invalid_arguments() {
        let err = RegistryError::from(ValidationError::UnknownOutcome("x".into()));
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(ErrorKind::InvalidArgument.to_string(), "InvalidArgument");
    }
}
