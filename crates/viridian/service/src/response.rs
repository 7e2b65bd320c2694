use serde::{Deserialize, Serialize};
use thiserror::Error;
use viridian_engine::{ErrorKind, RegistryError};

/// Structured failure returned to the transport.
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct OperationFailure {
    pub kind: ErrorKind,
    pub message: String,
}

impl OperationFailure {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({ "kind": self.kind, "message": self.message })
    }
}

impl From<RegistryError> for OperationFailure {
    fn from(err: RegistryError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failures_serialize_kind_and_message() {
        let failure = OperationFailure::from(RegistryError::NotFound("asset x".into()));
        assert_eq!(
            failure.to_json(),
            serde_json::json!({"kind": "NotFound", "message": "not found: asset x"})
        );
    }
}
