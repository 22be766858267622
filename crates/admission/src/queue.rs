//! Admission queue: FIFO pending list with a single-flight drain loop.
//!
//! `enqueue` validates, admits against quota/ceiling, appends, and kicks the
//! drain. The drain pops the head, moves tenant counters queued to active,
//! and sends to the bus with at most `max_dispatch_in_flight` sends
//! outstanding. A failed send reverts the counters, pushes the job back to
//! the head, and stops the loop; the next enqueue retries.
//!
//! The pending list and drain flags live behind one mutex that is never held
//! across bus I/O.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use veritor_bus::JobSender;
use veritor_core::{DomainError, JobId, TenantId};
use veritor_schemas::{validate_job, ReasoningJob};
use veritor_telemetry::{props, TelemetrySink};

use crate::accounting::{AdmitDecision, TenantAccounting, TenantUsage};

/// A job waiting for dispatch.
#[derive(Debug, Clone)]
pub struct PendingEntry {
    pub job: ReasoningJob,
    pub tenant_id: TenantId,
    pub enqueued_at: DateTime<Utc>,
}

/// What the caller gets back from a successful admission.
#[derive(Debug, Clone, PartialEq)]
pub struct EnqueueReceipt {
    pub job_id: JobId,
    pub position: usize,
    pub queue_depth: u32,
    pub quota: u32,
    pub usage: TenantUsage,
}

#[derive(Debug, Default)]
struct QueueState {
    pending: VecDeque<PendingEntry>,
    in_flight: usize,
    draining: bool,
}

/// FIFO admission queue with bounded-concurrency dispatch.
pub struct AdmissionQueue {
    accounting: Arc<TenantAccounting>,
    sender: Arc<dyn JobSender>,
    telemetry: Arc<dyn TelemetrySink>,
    max_dispatch_in_flight: usize,
    state: Mutex<QueueState>,
}

impl AdmissionQueue {
    pub fn new(
        accounting: Arc<TenantAccounting>,
        sender: Arc<dyn JobSender>,
        telemetry: Arc<dyn TelemetrySink>,
        max_dispatch_in_flight: usize,
    ) -> Self {
        Self {
            accounting,
            sender,
            telemetry,
            max_dispatch_in_flight: max_dispatch_in_flight.max(1),
            state: Mutex::new(QueueState::default()),
        }
    }

    pub fn accounting(&self) -> &Arc<TenantAccounting> {
        &self.accounting
    }

    /// Validate, admit, append, and trigger the drain.
    ///
    /// The receipt reflects counters at admission time; dispatch happens
    /// asynchronously after this returns.
    pub fn enqueue(self: &Arc<Self>, job: ReasoningJob) -> Result<EnqueueReceipt, DomainError> {
        let value = serde_json::to_value(&job)
            .map_err(|e| DomainError::validation(format!("job not serializable: {e}")))?;
        validate_job(&value).map_err(|e| DomainError::validation(e.to_string()))?;

        let tenant_id = job.tenant_id.clone();
        let (usage, depth) = match self.accounting.try_admit(&tenant_id) {
            AdmitDecision::Admitted { usage, depth } => (usage, depth),
            AdmitDecision::QuotaExceeded { quota, usage } => {
                self.telemetry.track_event(
                    "reasoning.queue.backpressure",
                    props!(
                        "tenantId" => tenant_id,
                        "reason" => "TenantQuotaExceeded",
                        "quota" => quota,
                    ),
                );
                return Err(DomainError::TenantQuotaExceeded {
                    tenant_id: tenant_id.to_string(),
                    quota,
                    queued: usage.queued,
                    active: usage.active,
                });
            }
            AdmitDecision::DepthExceeded { depth, limit } => {
                self.telemetry.track_event(
                    "reasoning.queue.backpressure",
                    props!(
                        "tenantId" => tenant_id,
                        "reason" => "QueueDepthExceeded",
                        "depth" => depth,
                        "limit" => limit,
                    ),
                );
                return Err(DomainError::QueueDepthExceeded { depth, limit });
            }
        };

        let job_id = job.job_id.clone();
        let position = {
            let mut st = self.state.lock().unwrap();
            st.pending.push_back(PendingEntry {
                job,
                tenant_id: tenant_id.clone(),
                enqueued_at: Utc::now(),
            });
            st.pending.len()
        };

        self.telemetry.track_event(
            "reasoning.queue.enqueued",
            props!("tenantId" => tenant_id, "jobId" => job_id, "position" => position),
        );
        self.telemetry
            .track_metric("reasoning.queue.depth", depth as f64, props!());

        tokio::spawn(Arc::clone(self).drain());

        Ok(EnqueueReceipt {
            job_id,
            position,
            queue_depth: depth,
            quota: self.accounting.quota_for(&tenant_id),
            usage,
        })
    }

    /// Number of jobs waiting for dispatch.
    pub fn pending_len(&self) -> usize {
        self.state.lock().unwrap().pending.len()
    }

    /// Re-entrant single-flight drain: concurrent invocations collapse into
    /// the one already in progress.
    pub async fn drain(self: Arc<Self>) {
        {
            let mut st = self.state.lock().unwrap();
            if st.draining {
                return;
            }
            st.draining = true;
        }

        loop {
            let entry = {
                let mut st = self.state.lock().unwrap();
                if st.in_flight >= self.max_dispatch_in_flight || st.pending.is_empty() {
                    st.draining = false;
                    return;
                }
                st.in_flight += 1;
                st.pending.pop_front().expect("pending head checked above")
            };

            self.accounting.on_dispatch_start(&entry.tenant_id);

            match self.sender.send(&entry.job).await {
                Ok(()) => {
                    self.telemetry.track_event(
                        "reasoning.queue.dispatched",
                        props!(
                            "tenantId" => entry.tenant_id,
                            "jobId" => entry.job.job_id,
                        ),
                    );
                    self.telemetry.track_metric(
                        "reasoning.queue.depth",
                        self.accounting.depth() as f64,
                        props!(),
                    );
                    let mut st = self.state.lock().unwrap();
                    st.in_flight -= 1;
                }
                Err(e) => {
                    // Revert and park the job at the head; the next enqueue
                    // (or an external timer) retries.
                    self.accounting.on_dispatch_revert(&entry.tenant_id);
                    self.telemetry.track_exception(
                        &format!("dispatch failed: {e}"),
                        props!(
                            "tenantId" => entry.tenant_id,
                            "jobId" => entry.job.job_id,
                        ),
                    );
                    let mut st = self.state.lock().unwrap();
                    st.pending.push_front(entry);
                    st.in_flight -= 1;
                    st.draining = false;
                    return;
                }
            }
        }
    }
}
