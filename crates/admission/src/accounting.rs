//! Tenant usage counters and admissibility.
//!
//! All transitions are serialized behind one mutex. Counters never go
//! negative: terminal events on an idle tenant are defensive no-ops reported
//! through the telemetry sink, never errors.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use veritor_core::TenantId;
use veritor_telemetry::{props, TelemetrySink};

use crate::quota::QuotaPolicy;

/// Live counters for one tenant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantUsage {
    pub queued: u32,
    pub active: u32,
}

impl TenantUsage {
    fn is_idle(&self) -> bool {
        self.queued == 0 && self.active == 0
    }
}

/// Outcome of an atomic admission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmitDecision {
    /// Queued counter was incremented; carries post-admission state.
    Admitted { usage: TenantUsage, depth: u32 },
    QuotaExceeded { quota: u32, usage: TenantUsage },
    DepthExceeded { depth: u32, limit: u32 },
}

/// Lifecycle event types reported by the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageEventType {
    Started,
    Completed,
    Failed,
    Rejected,
}

impl UsageEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Started)
    }
}

impl FromStr for UsageEventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "started" => Ok(Self::Started),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "rejected" => Ok(Self::Rejected),
            other => Err(format!("unknown usage event type: {other}")),
        }
    }
}

/// Point-in-time view of all tenant counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSnapshot {
    pub queue_depth: u32,
    pub max_queue_depth: u32,
    pub tenants: Vec<UsageSnapshotEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSnapshotEntry {
    pub tenant_id: TenantId,
    pub queued: u32,
    pub active: u32,
    pub quota: u32,
}

#[derive(Debug, Default)]
struct AccountingState {
    tenants: HashMap<TenantId, TenantUsage>,
    depth: u32,
}

/// Authoritative tenant accounting for the admission process.
pub struct TenantAccounting {
    policy: QuotaPolicy,
    max_queue_depth: u32,
    state: Mutex<AccountingState>,
    telemetry: Arc<dyn TelemetrySink>,
}

impl TenantAccounting {
    pub fn new(
        policy: QuotaPolicy,
        max_queue_depth: u32,
        telemetry: Arc<dyn TelemetrySink>,
    ) -> Self {
        Self {
            policy,
            max_queue_depth,
            state: Mutex::new(AccountingState::default()),
            telemetry,
        }
    }

    pub fn quota_for(&self, tenant_id: &TenantId) -> u32 {
        self.policy.quota_for(tenant_id)
    }

    pub fn usage_for(&self, tenant_id: &TenantId) -> TenantUsage {
        self.state
            .lock()
            .unwrap()
            .tenants
            .get(tenant_id)
            .copied()
            .unwrap_or_default()
    }

    /// Global queued+active total.
    pub fn depth(&self) -> u32 {
        self.state.lock().unwrap().depth
    }

    pub fn max_queue_depth(&self) -> u32 {
        self.max_queue_depth
    }

    /// Atomic check-and-increment of `queued` under both the tenant quota and
    /// the global ceiling.
    pub fn try_admit(&self, tenant_id: &TenantId) -> AdmitDecision {
        let quota = self.policy.quota_for(tenant_id);
        let mut guard = self.state.lock().unwrap();
        let st = &mut *guard;

        if st.depth >= self.max_queue_depth {
            return AdmitDecision::DepthExceeded {
                depth: st.depth,
                limit: self.max_queue_depth,
            };
        }

        let usage = st.tenants.entry(tenant_id.clone()).or_default();
        if usage.queued + usage.active >= quota {
            return AdmitDecision::QuotaExceeded {
                quota,
                usage: *usage,
            };
        }

        usage.queued += 1;
        let usage = *usage;
        st.depth += 1;
        AdmitDecision::Admitted {
            usage,
            depth: st.depth,
        }
    }

    /// Move one job from queued to active (dispatch begins).
    pub fn on_dispatch_start(&self, tenant_id: &TenantId) {
        let moved = {
            let mut st = self.state.lock().unwrap();
            match st.tenants.get_mut(tenant_id) {
                Some(usage) if usage.queued > 0 => {
                    usage.queued -= 1;
                    usage.active += 1;
                    true
                }
                _ => false,
            }
        };
        if !moved {
            self.report_mismatch(tenant_id, "dispatch_start");
        }
    }

    /// Undo a dispatch start after a failed bus send (active back to queued).
    pub fn on_dispatch_revert(&self, tenant_id: &TenantId) {
        let moved = {
            let mut st = self.state.lock().unwrap();
            match st.tenants.get_mut(tenant_id) {
                Some(usage) if usage.active > 0 => {
                    usage.active -= 1;
                    usage.queued += 1;
                    true
                }
                _ => false,
            }
        };
        if !moved {
            self.report_mismatch(tenant_id, "dispatch_revert");
        }
    }

    /// Apply a terminal lifecycle event: decrement `active`, floor at zero.
    pub fn on_terminal(&self, tenant_id: &TenantId, event: UsageEventType) {
        if !event.is_terminal() {
            return;
        }
        let decremented = {
            let mut guard = self.state.lock().unwrap();
            let st = &mut *guard;
            let idle_after = match st.tenants.get_mut(tenant_id) {
                Some(usage) if usage.active > 0 => {
                    usage.active -= 1;
                    Some(usage.is_idle())
                }
                _ => None,
            };
            match idle_after {
                Some(idle) => {
                    st.depth = st.depth.saturating_sub(1);
                    if idle {
                        st.tenants.remove(tenant_id);
                    }
                    true
                }
                None => false,
            }
        };
        if !decremented {
            self.report_mismatch(tenant_id, event.as_str());
        }
    }

    /// Apply a usage event from the worker channel.
    ///
    /// `started` is a no-op: accounting already moved queued to active at
    /// dispatch. Terminal events decrement `active`.
    pub fn on_usage_event(&self, tenant_id: &TenantId, event: UsageEventType) {
        self.on_terminal(tenant_id, event);
    }

    /// Snapshot of all counters, tenants sorted by id.
    pub fn snapshot(&self) -> UsageSnapshot {
        let st = self.state.lock().unwrap();
        let mut tenants: Vec<UsageSnapshotEntry> = st
            .tenants
            .iter()
            .map(|(tenant_id, usage)| UsageSnapshotEntry {
                tenant_id: tenant_id.clone(),
                queued: usage.queued,
                active: usage.active,
                quota: self.policy.quota_for(tenant_id),
            })
            .collect();
        tenants.sort_by(|a, b| a.tenant_id.cmp(&b.tenant_id));

        UsageSnapshot {
            queue_depth: st.depth,
            max_queue_depth: self.max_queue_depth,
            tenants,
        }
    }

    fn report_mismatch(&self, tenant_id: &TenantId, transition: &str) {
        self.telemetry.track_exception(
            "accounting counter mismatch",
            props!("tenantId" => tenant_id, "transition" => transition),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veritor_telemetry::NoopTelemetry;

    fn tenant(s: &str) -> TenantId {
        TenantId::parse(s).unwrap()
    }

    fn accounting(default_quota: u32, max_depth: u32) -> TenantAccounting {
        TenantAccounting::new(
            QuotaPolicy::with_overrides_json(default_quota, None),
            max_depth,
            Arc::new(NoopTelemetry),
        )
    }

    #[test]
    fn admit_within_quota_increments_queued() {
        let acc = accounting(2, 10);
        let t = tenant("t1");

        match acc.try_admit(&t) {
            AdmitDecision::Admitted { usage, depth } => {
                assert_eq!(usage, TenantUsage { queued: 1, active: 0 });
                assert_eq!(depth, 1);
            }
            other => panic!("expected admission, got {other:?}"),
        }
    }

    #[test]
    fn quota_is_enforced_over_queued_plus_active() {
        let acc = accounting(2, 10);
        let t = tenant("t1");

        assert!(matches!(acc.try_admit(&t), AdmitDecision::Admitted { .. }));
        acc.on_dispatch_start(&t);
        assert!(matches!(acc.try_admit(&t), AdmitDecision::Admitted { .. }));

        match acc.try_admit(&t) {
            AdmitDecision::QuotaExceeded { quota, usage } => {
                assert_eq!(quota, 2);
                assert_eq!(usage, TenantUsage { queued: 1, active: 1 });
            }
            other => panic!("expected quota rejection, got {other:?}"),
        }
    }

    #[test]
    fn global_ceiling_is_enforced_across_tenants() {
        let acc = accounting(5, 1);

        assert!(matches!(
            acc.try_admit(&tenant("t1")),
            AdmitDecision::Admitted { .. }
        ));
        match acc.try_admit(&tenant("t2")) {
            AdmitDecision::DepthExceeded { depth, limit } => {
                assert_eq!(depth, 1);
                assert_eq!(limit, 1);
            }
            other => panic!("expected depth rejection, got {other:?}"),
        }
    }

    #[test]
    fn terminal_event_frees_quota_and_depth() {
        let acc = accounting(1, 10);
        let t = tenant("t1");

        acc.try_admit(&t);
        acc.on_dispatch_start(&t);
        assert_eq!(acc.usage_for(&t), TenantUsage { queued: 0, active: 1 });

        acc.on_terminal(&t, UsageEventType::Completed);
        assert_eq!(acc.usage_for(&t), TenantUsage::default());
        assert_eq!(acc.depth(), 0);
        assert!(matches!(acc.try_admit(&t), AdmitDecision::Admitted { .. }));
    }

    #[test]
    fn terminal_on_idle_tenant_is_a_noop() {
        let acc = accounting(1, 10);
        let t = tenant("t1");

        acc.on_terminal(&t, UsageEventType::Failed);
        assert_eq!(acc.usage_for(&t), TenantUsage::default());
        assert_eq!(acc.depth(), 0);
    }

    #[test]
    fn started_event_does_not_change_counters() {
        let acc = accounting(1, 10);
        let t = tenant("t1");

        acc.try_admit(&t);
        acc.on_dispatch_start(&t);
        acc.on_usage_event(&t, UsageEventType::Started);
        assert_eq!(acc.usage_for(&t), TenantUsage { queued: 0, active: 1 });
    }

    #[test]
    fn dispatch_revert_restores_queued() {
        let acc = accounting(1, 10);
        let t = tenant("t1");

        acc.try_admit(&t);
        acc.on_dispatch_start(&t);
        acc.on_dispatch_revert(&t);
        assert_eq!(acc.usage_for(&t), TenantUsage { queued: 1, active: 0 });
        assert_eq!(acc.depth(), 1);
    }

    #[test]
    fn snapshot_sorts_tenants_by_id() {
        let acc = accounting(3, 10);
        acc.try_admit(&tenant("zeta"));
        acc.try_admit(&tenant("alpha"));

        let snap = acc.snapshot();
        assert_eq!(snap.queue_depth, 2);
        assert_eq!(snap.max_queue_depth, 10);
        assert_eq!(snap.tenants[0].tenant_id.as_str(), "alpha");
        assert_eq!(snap.tenants[1].tenant_id.as_str(), "zeta");
        assert_eq!(snap.tenants[0].quota, 3);
    }

    #[test]
    fn counters_stay_non_negative_through_interleavings() {
        let acc = accounting(3, 10);
        let t = tenant("t1");

        // A hostile interleaving: reverts and terminals with nothing pending.
        acc.on_dispatch_revert(&t);
        acc.on_terminal(&t, UsageEventType::Rejected);
        acc.try_admit(&t);
        acc.on_dispatch_start(&t);
        acc.on_terminal(&t, UsageEventType::Completed);
        acc.on_terminal(&t, UsageEventType::Completed);

        assert_eq!(acc.usage_for(&t), TenantUsage::default());
        assert_eq!(acc.depth(), 0);
    }
}
