use veritor_auth::Role;
use veritor_core::TenantId;

/// Tenant context resolved for a request (header first, then token claims).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantContext {
    tenant_id: TenantId,
}

impl TenantContext {
    pub fn new(tenant_id: TenantId) -> Self {
        Self { tenant_id }
    }

    pub fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }
}

/// Principal context for a request (authenticated identity + roles).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    sub: String,
    roles: Vec<Role>,
}

impl PrincipalContext {
    pub fn new(sub: String, roles: Vec<Role>) -> Self {
        Self { sub, roles }
    }

    pub fn sub(&self) -> &str {
        &self.sub
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    pub fn is_admin(&self) -> bool {
        self.roles.iter().any(Role::is_admin)
    }
}
