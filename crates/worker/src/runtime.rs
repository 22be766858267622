//! Worker runtime: bounded executor over the bus subscription.
//!
//! The subscription delivers one message at a time; the runtime fans
//! deliveries into at most `max_concurrent` pipeline executions and parks
//! the rest in a bounded FIFO. When the buffer is full, deliveries are
//! abandoned back to the bus, which is the authoritative backpressure
//! signal. Every received message is settled exactly once.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use veritor_admission::{QuotaPolicy, UsageEventType};
use veritor_bus::{JobReceiver, ReceivedMessage, ResultEnvelope, ResultSender};
use veritor_core::TenantId;
use veritor_pipeline::{run_pipeline, LlmClient};
use veritor_schemas::validate_job;
use veritor_telemetry::{props, TelemetrySink};

use crate::usage::UsageReporter;

/// Worker-side execution bounds.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Max concurrent pipeline executions.
    pub max_concurrent: usize,

    /// In-process pending buffer; deliveries beyond this are abandoned.
    pub buffer_capacity: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 4,
            buffer_capacity: 50,
        }
    }
}

#[derive(Debug, Default)]
struct ExecState {
    pending: VecDeque<ReceivedMessage>,
    active_workers: usize,
}

enum Delivery {
    Run(ReceivedMessage),
    Parked,
    Overflow(ReceivedMessage),
}

/// The reasoning worker.
pub struct Worker {
    receiver: Arc<dyn JobReceiver>,
    results: Arc<dyn ResultSender>,
    llm: Arc<dyn LlmClient>,
    usage: Arc<dyn UsageReporter>,
    telemetry: Arc<dyn TelemetrySink>,
    quotas: QuotaPolicy,
    config: WorkerConfig,
    exec: Mutex<ExecState>,
    active_tenants: Mutex<HashMap<TenantId, u32>>,
    idle: Notify,
    shutdown: CancellationToken,
}

impl Worker {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        receiver: Arc<dyn JobReceiver>,
        results: Arc<dyn ResultSender>,
        llm: Arc<dyn LlmClient>,
        usage: Arc<dyn UsageReporter>,
        telemetry: Arc<dyn TelemetrySink>,
        quotas: QuotaPolicy,
        config: WorkerConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            receiver,
            results,
            llm,
            usage,
            telemetry,
            quotas,
            config,
            exec: Mutex::new(ExecState::default()),
            active_tenants: Mutex::new(HashMap::new()),
            idle: Notify::new(),
            shutdown: CancellationToken::new(),
        })
    }

    /// Stop pulling new messages. In-flight pipelines run to completion.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Current pipeline executions for a tenant (worker-side view).
    pub fn active_for(&self, tenant_id: &TenantId) -> u32 {
        self.active_tenants
            .lock()
            .unwrap()
            .get(tenant_id)
            .copied()
            .unwrap_or(0)
    }

    /// Pull loop. Returns once the receiver closes or shutdown is requested,
    /// after all in-flight pipelines have settled.
    pub async fn run(self: Arc<Self>) {
        info!("reasoning worker started");
        loop {
            let received = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                received = self.receiver.receive() => received,
            };

            let msg = match received {
                Ok(Some(msg)) => msg,
                Ok(None) => break,
                Err(e) => {
                    // Subscription errors are logged; the subscription
                    // attempts to continue.
                    self.telemetry
                        .track_exception(&format!("bus receive failed: {e}"), props!());
                    continue;
                }
            };

            let delivery = {
                let mut st = self.exec.lock().unwrap();
                if st.active_workers < self.config.max_concurrent {
                    st.active_workers += 1;
                    Delivery::Run(msg)
                } else if st.pending.len() < self.config.buffer_capacity {
                    st.pending.push_back(msg);
                    Delivery::Parked
                } else {
                    Delivery::Overflow(msg)
                }
            };

            match delivery {
                Delivery::Run(msg) => {
                    tokio::spawn(Arc::clone(&self).worker_loop(msg));
                }
                Delivery::Parked => {}
                Delivery::Overflow(msg) => {
                    self.telemetry.track_event(
                        "reasoning.queue.backpressure",
                        props!(
                            "component" => "worker",
                            "bufferCapacity" => self.config.buffer_capacity,
                        ),
                    );
                    if let Err(e) = self.receiver.abandon(&msg).await {
                        self.telemetry
                            .track_exception(&format!("abandon failed: {e}"), props!());
                    }
                    // Brief pause so an immediate redelivery does not spin.
                    tokio::time::sleep(Duration::from_millis(50)).await;
                }
            }
        }

        self.wait_idle().await;
        info!("reasoning worker stopped");
    }

    async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            {
                let st = self.exec.lock().unwrap();
                if st.active_workers == 0 && st.pending.is_empty() {
                    return;
                }
            }
            notified.await;
        }
    }

    /// One executor slot: process the first message, then keep draining the
    /// pending buffer until it is empty.
    async fn worker_loop(self: Arc<Self>, first: ReceivedMessage) {
        let mut current = Some(first);
        while let Some(msg) = current {
            self.process(msg).await;
            current = {
                let mut st = self.exec.lock().unwrap();
                match st.pending.pop_front() {
                    Some(next) => Some(next),
                    None => {
                        st.active_workers -= 1;
                        None
                    }
                }
            };
        }
        self.idle.notify_waiters();
    }

    async fn process(&self, msg: ReceivedMessage) {
        let job = match validate_job(&msg.body) {
            Ok(job) => job,
            Err(e) => {
                // Undecodable jobs are poison: dead-letter with no counter
                // change and no usage event.
                let description = e.to_string();
                if let Err(settle) = self
                    .receiver
                    .dead_letter(&msg, "PipelineFailure", &description)
                    .await
                {
                    self.telemetry
                        .track_exception(&format!("dead-letter failed: {settle}"), props!());
                }
                self.telemetry
                    .track_exception(&description, props!("component" => "worker"));
                return;
            }
        };

        let tenant_id = job.tenant_id.clone();
        let job_id = job.job_id.clone();

        let quota = self.quotas.quota_for(&tenant_id);
        let active = self.active_for(&tenant_id);
        if active >= quota {
            let envelope =
                ResultEnvelope::rejected(job_id.clone(), tenant_id.clone(), quota, active);
            if let Err(e) = self.results.send(&envelope).await {
                self.telemetry
                    .track_exception(&format!("rejection emit failed: {e}"), props!());
            }
            if let Err(e) = self.receiver.complete(&msg).await {
                self.telemetry
                    .track_exception(&format!("complete failed: {e}"), props!());
            }
            self.telemetry.track_event(
                "reasoning.job.rejected",
                props!(
                    "tenantId" => tenant_id,
                    "jobId" => job_id,
                    "quota" => quota,
                    "active" => active,
                ),
            );
            self.usage.report(&tenant_id, UsageEventType::Rejected).await;
            return;
        }

        self.incr_active(&tenant_id);
        self.usage.report(&tenant_id, UsageEventType::Started).await;
        self.telemetry.track_event(
            "reasoning.job.started",
            props!("tenantId" => tenant_id, "jobId" => job_id),
        );
        let started_at = Instant::now();

        match run_pipeline(self.llm.as_ref(), &job).await {
            Ok(result) => {
                let envelope =
                    ResultEnvelope::completed(job_id.clone(), tenant_id.clone(), result);
                match self.results.send(&envelope).await {
                    Ok(()) => {
                        if let Err(e) = self.receiver.complete(&msg).await {
                            self.telemetry
                                .track_exception(&format!("complete failed: {e}"), props!());
                        }
                        self.telemetry.track_event(
                            "reasoning.job.completed",
                            props!("tenantId" => tenant_id, "jobId" => job_id),
                        );
                        self.telemetry.track_metric(
                            "reasoning.job.duration_ms",
                            started_at.elapsed().as_millis() as f64,
                            props!("tenantId" => tenant_id, "jobId" => job_id),
                        );
                        self.usage
                            .report(&tenant_id, UsageEventType::Completed)
                            .await;
                    }
                    Err(e) => {
                        self.fail(&msg, &tenant_id, &job_id, format!("result emit failed: {e}"))
                            .await;
                    }
                }
            }
            Err(stage_err) => {
                self.fail(&msg, &tenant_id, &job_id, stage_err.to_string())
                    .await;
            }
        }

        self.decr_active(&tenant_id);
    }

    async fn fail(
        &self,
        msg: &ReceivedMessage,
        tenant_id: &TenantId,
        job_id: &veritor_core::JobId,
        description: String,
    ) {
        warn!(tenant_id = %tenant_id, job_id = %job_id, error = %description, "job failed");
        if let Err(e) = self
            .receiver
            .dead_letter(msg, "PipelineFailure", &description)
            .await
        {
            self.telemetry
                .track_exception(&format!("dead-letter failed: {e}"), props!());
        }
        self.telemetry.track_event(
            "reasoning.job.failed",
            props!(
                "tenantId" => tenant_id,
                "jobId" => job_id,
                "error" => description,
            ),
        );
        self.usage.report(tenant_id, UsageEventType::Failed).await;
    }

    fn incr_active(&self, tenant_id: &TenantId) {
        let mut tenants = self.active_tenants.lock().unwrap();
        *tenants.entry(tenant_id.clone()).or_insert(0) += 1;
    }

    fn decr_active(&self, tenant_id: &TenantId) {
        let mut tenants = self.active_tenants.lock().unwrap();
        if let Some(count) = tenants.get_mut(tenant_id) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                tenants.remove(tenant_id);
            }
        }
    }
}
