//! Process configuration, read from the environment at boot.
//!
//! Malformed optional values fall back to their defaults with a warning
//! rather than failing boot.

use tracing::warn;

/// How the job bus is wired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusMode {
    /// In-process broker; the worker runs colocated when an LLM endpoint is
    /// configured.
    InMemory,
    /// No bus: submissions are refused with 503.
    None,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub jwt_secret: String,
    /// Global admission ceiling (queued + active).
    pub queue_depth_limit: u32,
    /// Max in-flight bus sends on the drain loop.
    pub dispatch_concurrency: usize,
    /// Worker-side concurrent pipeline executions.
    pub worker_concurrency: usize,
    /// Worker-side in-process pending buffer.
    pub worker_buffer: usize,
    pub default_quota: u32,
    pub hard_quotas_json: Option<String>,
    pub usage_event_secret: Option<String>,
    pub bus_mode: BusMode,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            jwt_secret: "dev-secret".to_string(),
            queue_depth_limit: 50,
            dispatch_concurrency: 2,
            worker_concurrency: 4,
            worker_buffer: 50,
            default_quota: 5,
            hard_quotas_json: None,
            usage_event_secret: None,
            bus_mode: BusMode::InMemory,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
            warn!("JWT_SECRET not set; using insecure dev default");
            defaults.jwt_secret.clone()
        });

        let bus_mode = match std::env::var("JOB_BUS_MODE").as_deref() {
            Ok("none") => BusMode::None,
            Ok("in-memory") | Err(_) => BusMode::InMemory,
            Ok(other) => {
                warn!(value = other, "unknown JOB_BUS_MODE; using in-memory");
                BusMode::InMemory
            }
        };

        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            jwt_secret,
            queue_depth_limit: env_or("REASONING_QUEUE_DEPTH_LIMIT", defaults.queue_depth_limit),
            dispatch_concurrency: env_or(
                "REASONING_DISPATCH_CONCURRENCY",
                defaults.dispatch_concurrency,
            ),
            worker_concurrency: env_or("REASONING_CONCURRENCY", defaults.worker_concurrency),
            worker_buffer: env_or("REASONING_WORKER_BUFFER", defaults.worker_buffer),
            default_quota: env_or("TENANT_DEFAULT_QUOTA", defaults.default_quota),
            hard_quotas_json: std::env::var("TENANT_HARD_QUOTAS_JSON").ok(),
            usage_event_secret: std::env::var("USAGE_EVENT_SECRET").ok(),
            bus_mode,
        }
    }
}

fn env_or<T: std::str::FromStr + Copy + std::fmt::Display>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(var = name, value = %raw, %default, "malformed value; using default");
            default
        }),
        Err(_) => default,
    }
}
