//! Usage-event reporting back to admission accounting.
//!
//! The worker posts one lifecycle event per transition. Reporting is
//! best-effort: a failed report is logged and never fails the job.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::warn;

use veritor_admission::{TenantAccounting, UsageEventType};
use veritor_core::TenantId;

/// Lifecycle event channel from the worker to accounting.
#[async_trait]
pub trait UsageReporter: Send + Sync {
    async fn report(&self, tenant_id: &TenantId, event: UsageEventType);
}

/// Posts `{tenantId, type}` to the admission usage-event endpoint.
pub struct HttpUsageReporter {
    endpoint: String,
    secret: Option<String>,
    http: reqwest::Client,
}

impl HttpUsageReporter {
    pub fn new(endpoint: impl Into<String>, secret: Option<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            secret,
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl UsageReporter for HttpUsageReporter {
    async fn report(&self, tenant_id: &TenantId, event: UsageEventType) {
        let mut req = self.http.post(&self.endpoint).json(&json!({
            "tenantId": tenant_id,
            "type": event.as_str(),
        }));
        if let Some(secret) = &self.secret {
            req = req.header("x-usage-secret", secret);
        }

        match req.send().await {
            Ok(res) if res.status().is_success() => {}
            Ok(res) => {
                warn!(
                    tenant_id = %tenant_id,
                    event = event.as_str(),
                    status = res.status().as_u16(),
                    "usage event rejected by admission endpoint"
                );
            }
            Err(e) => {
                warn!(
                    tenant_id = %tenant_id,
                    event = event.as_str(),
                    error = %e,
                    "usage event delivery failed"
                );
            }
        }
    }
}

/// Feeds accounting directly when worker and admission share a process.
pub struct LocalUsageReporter {
    accounting: Arc<TenantAccounting>,
}

impl LocalUsageReporter {
    pub fn new(accounting: Arc<TenantAccounting>) -> Self {
        Self { accounting }
    }
}

#[async_trait]
impl UsageReporter for LocalUsageReporter {
    async fn report(&self, tenant_id: &TenantId, event: UsageEventType) {
        self.accounting.on_usage_event(tenant_id, event);
    }
}

/// Drops every event (worker running without a configured channel).
pub struct NoopUsageReporter;

#[async_trait]
impl UsageReporter for NoopUsageReporter {
    async fn report(&self, tenant_id: &TenantId, event: UsageEventType) {
        warn!(
            tenant_id = %tenant_id,
            event = event.as_str(),
            "usage event dropped: no endpoint configured"
        );
    }
}
