//! Capability traits for bus I/O.
//!
//! The core depends on these seams only; concrete adapters (in-memory broker,
//! cloud bus clients) live at the edge. All operations are suspension points;
//! callers must not hold locks across them.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::envelope::ResultEnvelope;
use crate::error::BusError;
use veritor_schemas::ReasoningJob;

/// A message delivered under a peek-lock.
///
/// The message stays invisible to other receivers until it is settled or the
/// lock expires, at which point the bus redelivers it (at-least-once).
#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedMessage {
    /// Broker-assigned delivery handle, unique per delivery attempt.
    pub delivery_id: u64,

    /// Raw JSON body.
    pub body: Value,

    /// Transport properties (`tenantId` is set by dispatch).
    pub application_properties: BTreeMap<String, String>,

    /// Number of times this message has been delivered.
    pub delivery_count: u32,
}

/// Sends admitted jobs to the job queue.
#[async_trait]
pub trait JobSender: Send + Sync {
    /// At-least-once delivery. Sets `applicationProperties.tenantId` from the
    /// job's tenant.
    async fn send(&self, job: &ReasoningJob) -> Result<(), BusError>;
}

/// Emits completion/rejection envelopes to the result queue.
#[async_trait]
pub trait ResultSender: Send + Sync {
    async fn send(&self, envelope: &ResultEnvelope) -> Result<(), BusError>;
}

/// Receives jobs from the job queue with peek-lock settlement.
#[async_trait]
pub trait JobReceiver: Send + Sync {
    /// Wait for the next message. Returns `None` once the receiver is closed
    /// and drained.
    async fn receive(&self) -> Result<Option<ReceivedMessage>, BusError>;

    /// Remove the message from the queue.
    async fn complete(&self, msg: &ReceivedMessage) -> Result<(), BusError>;

    /// Return the message for redelivery.
    async fn abandon(&self, msg: &ReceivedMessage) -> Result<(), BusError>;

    /// Move the message to the dead-letter subqueue.
    async fn dead_letter(
        &self,
        msg: &ReceivedMessage,
        reason: &str,
        description: &str,
    ) -> Result<(), BusError>;
}

#[async_trait]
impl<B: JobSender + ?Sized> JobSender for Arc<B> {
    async fn send(&self, job: &ReasoningJob) -> Result<(), BusError> {
        (**self).send(job).await
    }
}

#[async_trait]
impl<B: ResultSender + ?Sized> ResultSender for Arc<B> {
    async fn send(&self, envelope: &ResultEnvelope) -> Result<(), BusError> {
        (**self).send(envelope).await
    }
}

#[async_trait]
impl<B: JobReceiver + ?Sized> JobReceiver for Arc<B> {
    async fn receive(&self) -> Result<Option<ReceivedMessage>, BusError> {
        (**self).receive().await
    }

    async fn complete(&self, msg: &ReceivedMessage) -> Result<(), BusError> {
        (**self).complete(msg).await
    }

    async fn abandon(&self, msg: &ReceivedMessage) -> Result<(), BusError> {
        (**self).abandon(msg).await
    }

    async fn dead_letter(
        &self,
        msg: &ReceivedMessage,
        reason: &str,
        description: &str,
    ) -> Result<(), BusError> {
        (**self).dead_letter(msg, reason, description).await
    }
}
