use serde::{Deserialize, Serialize};

use crate::Role;

/// JWT claims model (transport-agnostic).
///
/// The minimal set of claims the service expects once a token has been
/// decoded and verified. Tenant context may come from either the `tenant_id`
/// claim or the identity-provider object id (`oid`); the API layer owns the
/// resolution precedence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject / principal identifier.
    pub sub: String,

    /// Tenant the token was issued for, when the issuer scopes tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,

    /// Identity-provider object id (fallback tenant context).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oid: Option<String>,

    /// Roles granted within the tenant context.
    #[serde(default)]
    pub roles: Vec<Role>,

    /// Issued-at (unix seconds).
    pub iat: i64,

    /// Expiration (unix seconds).
    pub exp: i64,
}

impl JwtClaims {
    pub fn has_role(&self, name: &str) -> bool {
        self.roles.iter().any(|r| r.as_str() == name)
    }
}
