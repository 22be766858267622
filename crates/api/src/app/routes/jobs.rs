//! Job submission.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde_json::Value;

use veritor_core::DomainError;

use crate::app::{dto, errors, services::AppServices};
use crate::context::TenantContext;

pub fn router() -> Router {
    Router::new().route("/jobs", post(submit_job))
}

/// POST /reasoning/jobs - admit a claim-evaluation job
pub async fn submit_job(
    Extension(services): Extension<Arc<AppServices>>,
    tenant: Option<Extension<TenantContext>>,
    Json(body): Json<Value>,
) -> axum::response::Response {
    let Some(Extension(tenant)) = tenant else {
        return errors::domain_error_to_response(DomainError::MissingTenantId);
    };

    let Some(queue) = services.queue.as_ref() else {
        return errors::domain_error_to_response(DomainError::BusUnavailable);
    };

    let job = match dto::build_job(tenant.tenant_id(), body) {
        Ok(job) => job,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match queue.enqueue(job) {
        Ok(receipt) => (StatusCode::OK, Json(dto::queued_response(&receipt))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
