//! Domain error model.
//!
//! Deterministic, caller-facing failures (validation, quota/ceiling limits,
//! missing context). Infrastructure concerns (bus I/O, HTTP, LLM transport)
//! carry their own error types in the crates that own them.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error (business rule failures).
///
/// Keep this focused on deterministic failures the API layer can map to a
/// status code. Counters and limits carry the observed values so responses
/// can echo them back.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input, schema violation).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier was invalid (e.g. empty tenant id).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// No tenant context could be resolved for the request.
    #[error("tenant id missing from header and token claims")]
    MissingTenantId,

    /// The per-tenant quota would be exceeded.
    #[error("tenant quota exceeded for {tenant_id}: quota {quota}, queued {queued}, active {active}")]
    TenantQuotaExceeded {
        tenant_id: String,
        quota: u32,
        queued: u32,
        active: u32,
    },

    /// The global queue-depth ceiling would be exceeded.
    #[error("queue depth exceeded: depth {depth}, limit {limit}")]
    QueueDepthExceeded { depth: u32, limit: u32 },

    /// The message bus is not configured.
    #[error("message bus unavailable")]
    BusUnavailable,
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}
