//! Tracing, logging, metrics (shared setup).

/// Initialize process-wide observability (tracing/logging).
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}

/// Tracing configuration (filters, layers).
pub mod tracing;

/// Typed metric/event/exception sink.
pub mod sink;

pub use sink::{sink_from_env, NoopTelemetry, Properties, TelemetrySink, TracingTelemetry};
