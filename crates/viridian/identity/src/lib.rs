//! Viridian Identity - the gate in front of every mutating registry call.
//!
//! Credential verification is delegated to an [`IdentityProvider`]. The gate
//! turns a successful lookup into a [`ResolvedCaller`], the only value the
//! engine accepts when it fills `createdBy`/`updatedBy`.

#![deny(unsafe_code)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use thiserror::Error;
use tracing::debug;
use viridian_types::Identity;

/// What the transport knows about the caller of one operation.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CallContext {
    /// Opaque credential presented by the caller, if any.
    pub credential: Option<String>,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

impl CallContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_credential(credential: impl Into<String>) -> Self {
        Self {
            credential: Some(credential.into()),
            attributes: HashMap::new(),
        }
    }
}

/// External credential verifier.
pub trait IdentityProvider: Send + Sync {
    fn current_caller_identity(&self, context: &CallContext) -> Result<Identity, IdentityError>;
}

/// A caller whose identity passed the gate.
///
/// Constructed only by [`resolve_caller`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedCaller {
    identity: Identity,
    resolved_at: DateTime<Utc>,
}

impl ResolvedCaller {
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn resolved_at(&self) -> DateTime<Utc> {
        self.resolved_at
    }
}

/// Resolve the caller of a mutating operation or fail.
pub fn resolve_caller(
    provider: &dyn IdentityProvider,
    context: &CallContext,
) -> Result<ResolvedCaller, IdentityError> {
    let identity = provider.current_caller_identity(context)?;
    if identity.as_str().trim().is_empty() {
        return Err(IdentityError::Anonymous);
    }
    debug!(caller = %identity, "caller resolved");
    Ok(ResolvedCaller {
        identity,
        resolved_at: Utc::now(),
    })
}

/// Reference identity provider: registered members authenticated by credential.
pub struct MemberRegistry {
    members: RwLock<HashMap<String, RegisteredMember>>,
}

impl MemberRegistry {
    pub fn new() -> Self {
        Self {
            members: RwLock::new(HashMap::new()),
        }
    }

    /// Register a member and issue a fresh credential.
    pub fn register(
        &self,
        request: RegistrationRequest,
    ) -> Result<RegisteredMember, IdentityError> {
        let credential = uuid::Uuid::new_v4().to_string();
        self.register_with_credential(request, credential)
    }

    /// Register a member under a credential issued elsewhere.
    pub fn register_with_credential(
        &self,
        request: RegistrationRequest,
        credential: impl Into<String>,
    ) -> Result<RegisteredMember, IdentityError> {
        if request.identity.as_str().trim().is_empty() {
            return Err(IdentityError::InvalidFormat(
                "identity must not be empty".to_string(),
            ));
        }
        let credential = credential.into();
        let member = RegisteredMember {
            identity: request.identity,
            credential: credential.clone(),
            display_name: request.display_name,
            status: MemberStatus::Active,
            registered_at: Utc::now(),
        };

        let mut members = self.members.write().map_err(|_| IdentityError::LockError)?;
        if members.contains_key(&credential) {
            return Err(IdentityError::InvalidFormat(
                "credential already issued".to_string(),
            ));
        }
        if members.values().any(|m| m.identity == member.identity) {
            return Err(IdentityError::AlreadyRegistered(member.identity.0.clone()));
        }
        members.insert(credential, member.clone());
        Ok(member)
    }

    /// Lookup a member by identity.
    pub fn lookup(&self, identity: &Identity) -> Result<Option<RegisteredMember>, IdentityError> {
        let members = self.members.read().map_err(|_| IdentityError::LockError)?;
        Ok(members.values().find(|m| &m.identity == identity).cloned())
    }

    pub fn suspend(&self, identity: &Identity, reason: &str) -> Result<(), IdentityError> {
        self.set_status(identity, MemberStatus::Suspended(reason.to_string()))
    }

    pub fn revoke(&self, identity: &Identity, reason: &str) -> Result<(), IdentityError> {
        self.set_status(identity, MemberStatus::Revoked(reason.to_string()))
    }

    fn set_status(&self, identity: &Identity, status: MemberStatus) -> Result<(), IdentityError> {
        let mut members = self.members.write().map_err(|_| IdentityError::LockError)?;
        let member = members
            .values_mut()
            .find(|m| &m.identity == identity)
            .ok_or_else(|| IdentityError::NotFound(identity.0.clone()))?;
        member.status = status;
        Ok(())
    }
}

impl Default for MemberRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityProvider for MemberRegistry {
    fn current_caller_identity(&self, context: &CallContext) -> Result<Identity, IdentityError> {
        let credential = context
            .credential
            .as_deref()
            .filter(|c| !c.is_empty())
            .ok_or(IdentityError::Anonymous)?;

        let members = self.members.read().map_err(|_| IdentityError::LockError)?;
        let member = members
            .get(credential)
            .ok_or(IdentityError::UnknownCredential)?;

        match &member.status {
            MemberStatus::Active => Ok(member.identity.clone()),
            other => Err(IdentityError::Inactive {
                identity: member.identity.0.clone(),
                status: format!("{other:?}"),
            }),
        }
    }
}

/// A registered member of the registry community.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegisteredMember {
    pub identity: Identity,
    pub credential: String,
    pub display_name: Option<String>,
    pub status: MemberStatus,
    pub registered_at: DateTime<Utc>,
}

/// Request to register a new member
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegistrationRequest {
    pub identity: Identity,
    pub display_name: Option<String>,
}

impl RegistrationRequest {
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: Identity::new(identity),
            display_name: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberStatus {
    Active,
    Suspended(String),
    Revoked(String),
}

/// Identity-related errors
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("anonymous caller")]
    Anonymous,

    #[error("unknown credential")]
    UnknownCredential,

    #[error("member {identity} is not active: {status}")]
    Inactive { identity: String, status: String },

    #[error("member not found: {0}")]
    NotFound(String),

    #[error("member already registered: {0}")]
    AlreadyRegistered(String),

    #[error("invalid identity format: {0}")]
    InvalidFormat(String),

    #[error("lock error")]
    LockError,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registered_member_resolves() {
        let registry = MemberRegistry::new();
        let member = registry.register(RegistrationRequest::new("alice")).unwrap();

        let caller =
            resolve_caller(&registry, &CallContext::with_credential(&member.credential)).unwrap();
        assert_eq!(caller.identity(), &Identity::new("alice"));
    }

    #[test]
    fn anonymous_caller_is_denied() {
        let registry = MemberRegistry::new();
        let result = resolve_caller(&registry, &CallContext::anonymous());
        assert!(matches!(result, Err(IdentityError::Anonymous)));

        let empty = CallContext::with_credential("");
        assert!(matches!(
            resolve_caller(&registry, &empty),
            Err(IdentityError::Anonymous)
        ));
    }

    #[test]
    fn unknown_credential_is_denied() {
        let registry = MemberRegistry::new();
        let result = resolve_caller(&registry, &CallContext::with_credential("forged"));
        assert!(matches!(result, Err(IdentityError::UnknownCredential)));
    }

    #[test]
    fn suspended_member_is_denied() {
        let registry = MemberRegistry::new();
        registry
            .register_with_credential(RegistrationRequest::new("bob"), "bob-token")
            .unwrap();
        registry.suspend(&Identity::new("bob"), "spam").unwrap();

        let result = resolve_caller(&registry, &CallContext::with_credential("bob-token"));
        assert!(matches!(result, Err(IdentityError::Inactive { .. })));
    }

    #[test]
    fn identities_are_registered_once() {
        let registry = MemberRegistry::new();
        registry.register(RegistrationRequest::new("carol")).unwrap();
        assert!(matches!(
            registry.register(RegistrationRequest::new("carol")),
            Err(IdentityError::AlreadyRegistered(_))
        ));
    }
}
