//! In-memory bus for tests/dev.
//!
//! One broker instance plays both ends of the job queue: admission sends into
//! it, the worker receives from it with peek-lock settlement. Messages under
//! lock are invisible to other receivers until settled; `abandon` returns a
//! message to the head of the queue for redelivery.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::envelope::ResultEnvelope;
use crate::error::BusError;
use crate::traits::{JobReceiver, JobSender, ReceivedMessage, ResultSender};
use veritor_schemas::ReasoningJob;

/// A message parked in the dead-letter subqueue.
#[derive(Debug, Clone, PartialEq)]
pub struct DeadLetteredMessage {
    pub message: ReceivedMessage,
    pub reason: String,
    pub description: String,
}

#[derive(Debug, Default)]
struct BrokerState {
    queue: VecDeque<ReceivedMessage>,
    locked: HashMap<u64, ReceivedMessage>,
    dead: Vec<DeadLetteredMessage>,
    next_delivery: u64,
    closed: bool,
}

/// In-memory job queue with peek-lock semantics.
#[derive(Debug, Default)]
pub struct InMemoryJobBus {
    state: Mutex<BrokerState>,
    notify: Notify,
    /// Remaining sends to fail (failure injection for dispatch tests).
    fail_sends: AtomicUsize,
}

impl InMemoryJobBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` sends fail with a transport error.
    pub fn fail_next_sends(&self, n: usize) {
        self.fail_sends.store(n, Ordering::SeqCst);
    }

    /// Injected failures not yet consumed.
    pub fn pending_send_failures(&self) -> usize {
        self.fail_sends.load(Ordering::SeqCst)
    }

    /// Stop delivery: pending `receive` calls return `None` once the queue
    /// is drained.
    pub fn close(&self) {
        self.state.lock().unwrap().closed = true;
        self.notify.notify_waiters();
    }

    pub fn queue_len(&self) -> usize {
        self.state.lock().unwrap().queue.len()
    }

    pub fn locked_len(&self) -> usize {
        self.state.lock().unwrap().locked.len()
    }

    pub fn dead_letters(&self) -> Vec<DeadLetteredMessage> {
        self.state.lock().unwrap().dead.clone()
    }

    fn remove_locked(&self, delivery_id: u64) -> Result<ReceivedMessage, BusError> {
        self.state
            .lock()
            .unwrap()
            .locked
            .remove(&delivery_id)
            .ok_or_else(|| BusError::Settle(format!("no locked message with id {delivery_id}")))
    }
}

#[async_trait]
impl JobSender for InMemoryJobBus {
    async fn send(&self, job: &ReasoningJob) -> Result<(), BusError> {
        if self
            .fail_sends
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(BusError::Send("injected transport failure".to_string()));
        }

        let body = serde_json::to_value(job).map_err(|e| BusError::Send(e.to_string()))?;
        let mut props = BTreeMap::new();
        props.insert("tenantId".to_string(), job.tenant_id.to_string());

        let mut st = self.state.lock().unwrap();
        if st.closed {
            return Err(BusError::Closed);
        }
        st.next_delivery += 1;
        let delivery_id = st.next_delivery;
        st.queue.push_back(ReceivedMessage {
            delivery_id,
            body,
            application_properties: props,
            delivery_count: 1,
        });
        drop(st);

        self.notify.notify_one();
        Ok(())
    }
}

#[async_trait]
impl JobReceiver for InMemoryJobBus {
    async fn receive(&self) -> Result<Option<ReceivedMessage>, BusError> {
        loop {
            let notified = self.notify.notified();
            {
                let mut st = self.state.lock().unwrap();
                if let Some(msg) = st.queue.pop_front() {
                    st.locked.insert(msg.delivery_id, msg.clone());
                    return Ok(Some(msg));
                }
                if st.closed {
                    return Ok(None);
                }
            }
            notified.await;
        }
    }

    async fn complete(&self, msg: &ReceivedMessage) -> Result<(), BusError> {
        self.remove_locked(msg.delivery_id).map(|_| ())
    }

    async fn abandon(&self, msg: &ReceivedMessage) -> Result<(), BusError> {
        let mut redelivered = self.remove_locked(msg.delivery_id)?;
        redelivered.delivery_count += 1;

        let mut st = self.state.lock().unwrap();
        st.queue.push_front(redelivered);
        drop(st);

        self.notify.notify_one();
        Ok(())
    }

    async fn dead_letter(
        &self,
        msg: &ReceivedMessage,
        reason: &str,
        description: &str,
    ) -> Result<(), BusError> {
        let message = self.remove_locked(msg.delivery_id)?;
        self.state.lock().unwrap().dead.push(DeadLetteredMessage {
            message,
            reason: reason.to_string(),
            description: description.to_string(),
        });
        Ok(())
    }
}

/// In-memory result queue: records emitted envelopes for inspection.
#[derive(Debug, Default)]
pub struct InMemoryResultQueue {
    envelopes: Mutex<Vec<ResultEnvelope>>,
    notify: Notify,
}

impl InMemoryResultQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn envelopes(&self) -> Vec<ResultEnvelope> {
        self.envelopes.lock().unwrap().clone()
    }

    /// Wait until at least `n` envelopes have been emitted.
    pub async fn wait_for(&self, n: usize) -> Vec<ResultEnvelope> {
        loop {
            let notified = self.notify.notified();
            {
                let envs = self.envelopes.lock().unwrap();
                if envs.len() >= n {
                    return envs.clone();
                }
            }
            notified.await;
        }
    }
}

#[async_trait]
impl ResultSender for InMemoryResultQueue {
    async fn send(&self, envelope: &ResultEnvelope) -> Result<(), BusError> {
        self.envelopes.lock().unwrap().push(envelope.clone());
        self.notify.notify_waiters();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use veritor_schemas::validate_job;

    fn job(job_id: &str, tenant_id: &str) -> ReasoningJob {
        validate_job(&json!({
            "jobId": job_id,
            "tenantId": tenant_id,
            "claim": "c",
            "context": {"documents": [{"id": "d1", "content": "x"}]},
            "criteria": [{"id": "k1", "description": "r"}]
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn send_receive_complete() {
        let bus = InMemoryJobBus::new();
        bus.send(&job("j1", "t1")).await.unwrap();

        let msg = bus.receive().await.unwrap().unwrap();
        assert_eq!(msg.body["jobId"], "j1");
        assert_eq!(msg.application_properties["tenantId"], "t1");
        assert_eq!(bus.locked_len(), 1);

        bus.complete(&msg).await.unwrap();
        assert_eq!(bus.locked_len(), 0);
        assert_eq!(bus.queue_len(), 0);
    }

    #[tokio::test]
    async fn abandon_redelivers_at_head() {
        let bus = InMemoryJobBus::new();
        bus.send(&job("j1", "t1")).await.unwrap();
        bus.send(&job("j2", "t1")).await.unwrap();

        let msg = bus.receive().await.unwrap().unwrap();
        assert_eq!(msg.body["jobId"], "j1");
        bus.abandon(&msg).await.unwrap();

        let again = bus.receive().await.unwrap().unwrap();
        assert_eq!(again.body["jobId"], "j1");
        assert_eq!(again.delivery_count, 2);
    }

    #[tokio::test]
    async fn dead_letter_records_reason() {
        let bus = InMemoryJobBus::new();
        bus.send(&job("j1", "t1")).await.unwrap();

        let msg = bus.receive().await.unwrap().unwrap();
        bus.dead_letter(&msg, "PipelineFailure", "stage blew up")
            .await
            .unwrap();

        let dead = bus.dead_letters();
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].reason, "PipelineFailure");
        assert_eq!(dead[0].description, "stage blew up");
        assert_eq!(bus.locked_len(), 0);
    }

    #[tokio::test]
    async fn settling_twice_fails() {
        let bus = InMemoryJobBus::new();
        bus.send(&job("j1", "t1")).await.unwrap();

        let msg = bus.receive().await.unwrap().unwrap();
        bus.complete(&msg).await.unwrap();
        assert!(bus.complete(&msg).await.is_err());
        assert!(bus.abandon(&msg).await.is_err());
    }

    #[tokio::test]
    async fn injected_send_failures_are_consumed() {
        let bus = InMemoryJobBus::new();
        bus.fail_next_sends(1);

        assert!(bus.send(&job("j1", "t1")).await.is_err());
        assert!(bus.send(&job("j1", "t1")).await.is_ok());
        assert_eq!(bus.queue_len(), 1);
    }

    #[tokio::test]
    async fn closed_bus_drains_then_returns_none() {
        let bus = InMemoryJobBus::new();
        bus.send(&job("j1", "t1")).await.unwrap();
        bus.close();

        assert!(bus.receive().await.unwrap().is_some());
        assert!(bus.receive().await.unwrap().is_none());
    }
}
