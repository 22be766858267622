//! Admin routes: usage snapshot and the worker usage-event channel.

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use veritor_admission::UsageEventType;
use veritor_core::TenantId;

use crate::app::{errors, services::AppServices};
use crate::context::PrincipalContext;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageEventRequest {
    pub tenant_id: String,
    #[serde(rename = "type")]
    pub event_type: String,
}

pub fn router() -> Router {
    Router::new()
        .route("/usage", get(usage_snapshot))
        .route("/usage/events", post(usage_event))
}

/// GET /admin/usage - counters for every tenant (admin role required)
pub async fn usage_snapshot(
    Extension(services): Extension<Arc<AppServices>>,
    principal: Option<Extension<PrincipalContext>>,
) -> axum::response::Response {
    let is_admin = principal.map(|Extension(p)| p.is_admin()).unwrap_or(false);
    if !is_admin {
        return errors::json_error(StatusCode::FORBIDDEN, json!("admin role required"));
    }

    (StatusCode::OK, Json(services.accounting.snapshot())).into_response()
}

/// POST /admin/usage/events - lifecycle feedback from the worker
pub async fn usage_event(
    Extension(services): Extension<Arc<AppServices>>,
    headers: HeaderMap,
    Json(body): Json<UsageEventRequest>,
) -> axum::response::Response {
    if let Some(secret) = &services.usage_event_secret {
        let presented = headers
            .get("x-usage-secret")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if presented != secret {
            return errors::json_error(StatusCode::UNAUTHORIZED, json!("invalid usage secret"));
        }
    }

    let tenant_id = match TenantId::parse(body.tenant_id) {
        Ok(t) => t,
        Err(e) => return errors::json_error(StatusCode::BAD_REQUEST, json!(e.to_string())),
    };

    let event = match UsageEventType::from_str(&body.event_type) {
        Ok(e) => e,
        Err(e) => return errors::json_error(StatusCode::BAD_REQUEST, json!(e)),
    };

    services.accounting.on_usage_event(&tenant_id, event);

    (StatusCode::OK, Json(json!({"status": "ok"}))).into_response()
}
