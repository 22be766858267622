//! `veritor-admission` — quota accounting and the admission queue.
//!
//! Admission is the only writer of tenant counters. Every counter transition
//! happens under one mutex; bus I/O always happens outside it.

pub mod accounting;
pub mod queue;
pub mod quota;

pub use accounting::{
    AdmitDecision, TenantAccounting, TenantUsage, UsageEventType, UsageSnapshot, UsageSnapshotEntry,
};
pub use queue::{AdmissionQueue, EnqueueReceipt, PendingEntry};
pub use quota::QuotaPolicy;
