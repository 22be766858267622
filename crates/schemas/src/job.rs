//! Inbound job contract.

use serde::{Deserialize, Serialize};

use veritor_core::{JobId, TenantId};

use crate::validate::Checker;

/// A claim-evaluation job as it travels on the bus.
///
/// Immutable once admitted; the worker consumes it exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ReasoningJob {
    pub job_id: JobId,
    pub tenant_id: TenantId,
    pub claim: String,
    pub context: JobContext,
    pub criteria: Vec<Criterion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct JobContext {
    pub documents: Vec<DocumentRef>,
}

/// A source document the claim is evaluated against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DocumentRef {
    pub id: String,
    pub content: String,
}

/// An evaluation criterion supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Criterion {
    pub id: String,
    pub description: String,
}

impl ReasoningJob {
    pub(crate) fn check(&self, c: &mut Checker) {
        c.non_empty_str("jobId", self.job_id.as_str());
        c.non_empty_str("tenantId", self.tenant_id.as_str());
        c.non_empty_str("claim", &self.claim);
        c.non_empty_list("context.documents", &self.context.documents);
        for (i, doc) in self.context.documents.iter().enumerate() {
            c.non_empty_str(&format!("context.documents[{i}].id"), &doc.id);
            c.non_empty_str(&format!("context.documents[{i}].content"), &doc.content);
        }
        c.non_empty_list("criteria", &self.criteria);
        for (i, cr) in self.criteria.iter().enumerate() {
            c.non_empty_str(&format!("criteria[{i}].id"), &cr.id);
            c.non_empty_str(&format!("criteria[{i}].description"), &cr.description);
        }
    }
}
