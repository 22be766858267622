//! Typed metric/event/exception sink.
//!
//! The core never talks to a metrics backend directly; it emits through this
//! trait. When no telemetry target is configured the no-op sink is selected,
//! and callers never branch on its presence.

use std::collections::BTreeMap;
use std::sync::Arc;

/// String-keyed properties attached to a metric/event/exception.
pub type Properties = BTreeMap<String, String>;

/// Abstract telemetry sink.
///
/// Implementations must be thread-safe; emission must never fail the caller.
pub trait TelemetrySink: Send + Sync {
    fn track_metric(&self, name: &str, value: f64, props: Properties);

    fn track_event(&self, name: &str, props: Properties);

    fn track_exception(&self, error: &str, props: Properties);
}

/// Sink that drops everything (used when telemetry is unconfigured).
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTelemetry;

impl TelemetrySink for NoopTelemetry {
    fn track_metric(&self, _name: &str, _value: f64, _props: Properties) {}

    fn track_event(&self, _name: &str, _props: Properties) {}

    fn track_exception(&self, _error: &str, _props: Properties) {}
}

/// Sink that forwards to the process tracing subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingTelemetry;

impl TelemetrySink for TracingTelemetry {
    fn track_metric(&self, name: &str, value: f64, props: Properties) {
        ::tracing::info!(metric = name, value, props = ?props, "metric");
    }

    fn track_event(&self, name: &str, props: Properties) {
        ::tracing::info!(event = name, props = ?props, "event");
    }

    fn track_exception(&self, error: &str, props: Properties) {
        ::tracing::error!(error, props = ?props, "exception");
    }
}

/// Select a sink from the environment.
///
/// `TELEMETRY_SINK=tracing` routes through the tracing subscriber; anything
/// else (including unset) is a no-op.
pub fn sink_from_env() -> Arc<dyn TelemetrySink> {
    match std::env::var("TELEMETRY_SINK").as_deref() {
        Ok("tracing") => Arc::new(TracingTelemetry),
        _ => Arc::new(NoopTelemetry),
    }
}

/// Build a [`Properties`] map from key/value pairs.
#[macro_export]
macro_rules! props {
    () => { $crate::sink::Properties::new() };
    ($($k:expr => $v:expr),+ $(,)?) => {{
        let mut map = $crate::sink::Properties::new();
        $(map.insert($k.to_string(), $v.to_string());)+
        map
    }};
}
