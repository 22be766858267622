//! `veritor-bus` — message bus abstraction (mechanics only).
//!
//! The capability traits here are the only path to bus I/O in the system.
//! At-least-once delivery is assumed; consumers must settle every message
//! they receive (complete, abandon, or dead-letter) exactly once.

pub mod envelope;
pub mod error;
pub mod in_memory;
pub mod traits;

pub use envelope::{CompletionEnvelope, RejectionEnvelope, RejectionError, ResultEnvelope};
pub use error::BusError;
pub use in_memory::{DeadLetteredMessage, InMemoryJobBus, InMemoryResultQueue};
pub use traits::{JobReceiver, JobSender, ReceivedMessage, ResultSender};
