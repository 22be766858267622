//! Per-tenant quota resolution.

use std::collections::HashMap;

use veritor_core::TenantId;

/// Process-wide quota policy, set at boot.
#[derive(Debug, Clone)]
pub struct QuotaPolicy {
    default_quota: u32,
    overrides: HashMap<TenantId, u32>,
}

impl QuotaPolicy {
    pub fn new(default_quota: u32, overrides: HashMap<TenantId, u32>) -> Self {
        debug_assert!(default_quota > 0, "default quota must be positive");
        Self {
            default_quota,
            overrides,
        }
    }

    /// Parse hard-quota overrides from their JSON env representation
    /// (`{"tenant": 3, ...}`). Malformed documents and non-positive entries
    /// are dropped with a warning rather than failing boot.
    pub fn with_overrides_json(default_quota: u32, json: Option<&str>) -> Self {
        let mut overrides = HashMap::new();

        if let Some(raw) = json {
            match serde_json::from_str::<HashMap<String, i64>>(raw) {
                Ok(parsed) => {
                    for (tenant, quota) in parsed {
                        let Ok(tenant_id) = TenantId::parse(tenant.clone()) else {
                            tracing::warn!(tenant = %tenant, "ignoring hard quota for blank tenant id");
                            continue;
                        };
                        if quota <= 0 {
                            tracing::warn!(tenant = %tenant, quota, "ignoring non-positive hard quota");
                            continue;
                        }
                        overrides.insert(tenant_id, quota as u32);
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "ignoring malformed hard-quota JSON");
                }
            }
        }

        Self::new(default_quota, overrides)
    }

    /// Override if present, else the default.
    pub fn quota_for(&self, tenant_id: &TenantId) -> u32 {
        self.overrides
            .get(tenant_id)
            .copied()
            .unwrap_or(self.default_quota)
    }
}
