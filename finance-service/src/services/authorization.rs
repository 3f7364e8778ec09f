//! Role-based authorization.
//!
//! [`AuthorizationGate`] resolves the caller's role through a [`RoleLookup`]
//! and checks a single required permission against it. Lookup failures never
//! grant access: a missing role is a [`AuthorizationDecision::Deny`], a failed
//! lookup a [`AuthorizationDecision::Fault`]. Callers must treat anything other
//! than `Allow` as "not authorized".

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::models::Role;
use crate::services::metrics::record_authorization;

/// The authenticated caller, as established by the authentication middleware.
#[derive(Debug, Clone, PartialEq)]
pub struct Principal {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role_id: Option<String>,
}

#[async_trait]
pub trait RoleLookup: Send + Sync {
    async fn find_role_by_id(&self, id: &str) -> Result<Option<Role>, anyhow::Error>;
    async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>, anyhow::Error>;
}

/// Reserved role name that is granted every permission.
#[derive(Debug, Clone)]
pub struct BypassPolicy {
    role_name: String,
}

impl BypassPolicy {
    pub fn new(role_name: impl Into<String>) -> Self {
        Self {
            role_name: role_name.into(),
        }
    }

    pub fn applies_to(&self, role: &Role) -> bool {
        role.name == self.role_name
    }
}

impl Default for BypassPolicy {
    fn default() -> Self {
        Self::new("superAdmin")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationDecision {
    Allow,
    Deny,
    /// The role could not be resolved because the lookup itself failed.
    Fault,
}

impl AuthorizationDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AuthorizationDecision::Allow)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AuthorizationDecision::Allow => "allow",
            AuthorizationDecision::Deny => "deny",
            AuthorizationDecision::Fault => "fault",
        }
    }
}

#[derive(Clone)]
pub struct AuthorizationGate {
    lookup: Arc<dyn RoleLookup>,
    bypass: BypassPolicy,
}

impl AuthorizationGate {
    pub fn new(lookup: Arc<dyn RoleLookup>, bypass: BypassPolicy) -> Self {
        Self { lookup, bypass }
    }

    pub async fn authorize(&self, principal: &Principal, permission: &str) -> AuthorizationDecision {
        let decision = self.decide(principal, permission).await;
        record_authorization(permission, decision.as_str());
        decision
    }

    async fn decide(&self, principal: &Principal, permission: &str) -> AuthorizationDecision {
        let Some(role_id) = principal.role_id.as_deref() else {
            tracing::debug!(user_id = %principal.id, permission, "Principal has no role");
            return AuthorizationDecision::Deny;
        };

        let role = match self.lookup.find_role_by_id(role_id).await {
            Ok(Some(role)) => role,
            Ok(None) => {
                tracing::warn!(
                    user_id = %principal.id,
                    role_id,
                    "Principal references a role that does not exist"
                );
                return AuthorizationDecision::Deny;
            }
            Err(e) => {
                tracing::error!(
                    user_id = %principal.id,
                    role_id,
                    error = %e,
                    "Role lookup failed during authorization"
                );
                return AuthorizationDecision::Fault;
            }
        };

        if self.bypass.applies_to(&role) || role.grants(permission) {
            AuthorizationDecision::Allow
        } else {
            tracing::debug!(
                user_id = %principal.id,
                role = %role.name,
                permission,
                "Permission not granted by role"
            );
            AuthorizationDecision::Deny
        }
    }
}

/// In-memory [`RoleLookup`] for tests.
pub struct MockRoleLookup {
    pub roles: Mutex<Vec<Role>>,
    pub fail: AtomicBool,
}

impl Default for MockRoleLookup {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRoleLookup {
    pub fn new() -> Self {
        Self {
            roles: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        }
    }

    pub fn with_role(self, role: Role) -> Self {
        if let Ok(mut roles) = self.roles.lock() {
            roles.push(role);
        }
        self
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    fn find(&self, pred: impl Fn(&Role) -> bool) -> Result<Option<Role>, anyhow::Error> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(anyhow::anyhow!("mock role store unavailable"));
        }
        let roles = self
            .roles
            .lock()
            .map_err(|e| anyhow::anyhow!("Mock role store mutex poisoned: {}", e))?;
        Ok(roles.iter().find(|r| !r.deleted && pred(r)).cloned())
    }
}

#[async_trait]
impl RoleLookup for MockRoleLookup {
    async fn find_role_by_id(&self, id: &str) -> Result<Option<Role>, anyhow::Error> {
        self.find(|r| r.id == id)
    }

    async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>, anyhow::Error> {
        self.find(|r| r.name == name)
    }
}
