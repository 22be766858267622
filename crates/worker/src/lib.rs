//! `veritor-worker` — the reasoning worker runtime.
//!
//! Pulls jobs from the bus one at a time at the subscription level, fans them
//! into a bounded in-process executor, runs the pipeline, settles every
//! message exactly once, and reports lifecycle usage events back to
//! admission accounting.

pub mod runtime;
pub mod usage;

pub use runtime::{Worker, WorkerConfig};
pub use usage::{HttpUsageReporter, LocalUsageReporter, NoopUsageReporter, UsageReporter};
