use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use veritor_auth::JwtValidator;
use veritor_core::TenantId;

use crate::context::{PrincipalContext, TenantContext};

#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<dyn JwtValidator>,
}

/// Resolve principal and tenant context for the request.
///
/// A bearer token is optional; when present it must verify (401 otherwise).
/// Tenant resolution precedence: `X-Tenant-Id` header, then the token's
/// `tenant_id` claim, then `oid`. Handlers enforce what they need (tenant
/// for submission, admin role for the snapshot).
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let claims = match extract_bearer(req.headers())? {
        Some(token) => Some(
            state
                .jwt
                .validate(token)
                .map_err(|_e| StatusCode::UNAUTHORIZED)?,
        ),
        None => None,
    };

    let header_tenant = req
        .headers()
        .get("x-tenant-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let raw_tenant = header_tenant.or_else(|| {
        claims
            .as_ref()
            .and_then(|c| c.tenant_id.clone().or_else(|| c.oid.clone()))
    });

    if let Some(raw) = raw_tenant {
        if let Ok(tenant_id) = TenantId::parse(raw) {
            req.extensions_mut().insert(TenantContext::new(tenant_id));
        }
    }

    if let Some(claims) = claims {
        req.extensions_mut()
            .insert(PrincipalContext::new(claims.sub, claims.roles));
    }

    Ok(next.run(req).await)
}

fn extract_bearer(headers: &HeaderMap) -> Result<Option<&str>, StatusCode> {
    let Some(header) = headers.get(axum::http::header::AUTHORIZATION) else {
        return Ok(None);
    };

    let header = header.to_str().map_err(|_| StatusCode::UNAUTHORIZED)?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or(StatusCode::UNAUTHORIZED)?
        .trim();

    if token.is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(Some(token))
}
