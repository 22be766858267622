//! Output envelopes emitted to the result queue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use veritor_core::{JobId, TenantId};
use veritor_schemas::PipelineResult;

/// Envelope for a job the pipeline finished successfully.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionEnvelope {
    pub job_id: JobId,
    pub tenant_id: TenantId,
    pub completed_at: DateTime<Utc>,
    pub status: String,
    pub result: PipelineResult,
}

/// Envelope for a job the worker refused to run (quota gate).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectionEnvelope {
    pub job_id: JobId,
    pub tenant_id: TenantId,
    pub status: String,
    pub completed_at: DateTime<Utc>,
    pub error: RejectionError,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectionError {
    pub code: String,
    pub message: String,
    pub quota: u32,
    pub active: u32,
}

/// Either output envelope, as it travels on the result queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResultEnvelope {
    Completed(CompletionEnvelope),
    Rejected(RejectionEnvelope),
}

impl ResultEnvelope {
    pub fn completed(job_id: JobId, tenant_id: TenantId, result: PipelineResult) -> Self {
        Self::Completed(CompletionEnvelope {
            job_id,
            tenant_id,
            completed_at: Utc::now(),
            status: "completed".to_string(),
            result,
        })
    }

    pub fn rejected(job_id: JobId, tenant_id: TenantId, quota: u32, active: u32) -> Self {
        Self::Rejected(RejectionEnvelope {
            job_id,
            tenant_id: tenant_id.clone(),
            status: "rejected".to_string(),
            completed_at: Utc::now(),
            error: RejectionError {
                code: "TenantQuotaExceeded".to_string(),
                message: format!(
                    "tenant {tenant_id} has {active} active jobs against a quota of {quota}"
                ),
                quota,
                active,
            },
        })
    }

    pub fn job_id(&self) -> &JobId {
        match self {
            Self::Completed(e) => &e.job_id,
            Self::Rejected(e) => &e.job_id,
        }
    }

    pub fn status(&self) -> &str {
        match self {
            Self::Completed(e) => &e.status,
            Self::Rejected(e) => &e.status,
        }
    }
}
