//! Request/response JSON mapping helpers.

use serde_json::{json, Value};

use veritor_admission::EnqueueReceipt;
use veritor_core::{DomainError, JobId, TenantId};
use veritor_schemas::{validate_job, ReasoningJob};

/// Build a `ReasoningJob` from a submission body: mint the job id, stamp the
/// resolved tenant, and validate the whole record against the job schema.
pub fn build_job(tenant_id: &TenantId, body: Value) -> Result<ReasoningJob, DomainError> {
    let Value::Object(mut fields) = body else {
        return Err(DomainError::validation("request body must be a JSON object"));
    };

    fields.insert("jobId".to_string(), json!(JobId::new()));
    fields.insert("tenantId".to_string(), json!(tenant_id));

    validate_job(&Value::Object(fields)).map_err(|e| DomainError::validation(e.to_string()))
}

pub fn queued_response(receipt: &EnqueueReceipt) -> Value {
    json!({
        "jobId": receipt.job_id,
        "status": "queued",
        "queueDepth": receipt.queue_depth,
        "position": receipt.position,
        "quota": receipt.quota,
        "usage": {"queued": receipt.usage.queued, "active": receipt.usage.active},
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_job_stamps_ids_and_validates() {
        let tenant = TenantId::parse("t1").unwrap();
        let job = build_job(
            &tenant,
            json!({
                "claim": "c",
                "context": {"documents": [{"id": "d1", "content": "x"}]},
                "criteria": [{"id": "k1", "description": "r"}]
            }),
        )
        .unwrap();

        assert_eq!(job.tenant_id, tenant);
        assert!(!job.job_id.as_str().is_empty());
    }

    #[test]
    fn build_job_rejects_extra_fields() {
        let tenant = TenantId::parse("t1").unwrap();
        let err = build_job(
            &tenant,
            json!({
                "claim": "c",
                "context": {"documents": [{"id": "d1", "content": "x"}]},
                "criteria": [{"id": "k1", "description": "r"}],
                "extra": 1
            }),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn build_job_rejects_non_object_body() {
        let tenant = TenantId::parse("t1").unwrap();
        assert!(build_job(&tenant, json!([1, 2, 3])).is_err());
    }
}
