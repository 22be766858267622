//! Error responses.
//!
//! Failures always surface as `{"error": <string | {code, …}>}` per the wire
//! contract; resource-limit errors echo the observed values.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use veritor_core::DomainError;

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, json!(msg)),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, json!(msg)),
        DomainError::MissingTenantId => json_error(
            StatusCode::BAD_REQUEST,
            json!({
                "code": "MissingTenantId",
                "message": "tenant id missing from header and token claims",
            }),
        ),
        DomainError::TenantQuotaExceeded {
            tenant_id,
            quota,
            queued,
            active,
        } => json_error(
            StatusCode::TOO_MANY_REQUESTS,
            json!({
                "code": "TenantQuotaExceeded",
                "tenantId": tenant_id,
                "quota": quota,
                "usage": {"queued": queued, "active": active},
            }),
        ),
        DomainError::QueueDepthExceeded { depth, limit } => json_error(
            StatusCode::TOO_MANY_REQUESTS,
            json!({
                "code": "QueueDepthExceeded",
                "queueDepth": depth,
                "limit": limit,
            }),
        ),
        DomainError::BusUnavailable => {
            json_error(StatusCode::SERVICE_UNAVAILABLE, json!("message bus unavailable"))
        }
    }
}

pub fn json_error(status: StatusCode, error: serde_json::Value) -> axum::response::Response {
    (status, axum::Json(json!({ "error": error }))).into_response()
}
