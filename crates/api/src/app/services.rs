//! Infrastructure wiring for the admission process.

use std::sync::{Arc, Mutex};

use tracing::{info, warn};

use veritor_admission::{AdmissionQueue, QuotaPolicy, TenantAccounting};
use veritor_bus::{InMemoryJobBus, InMemoryResultQueue};
use veritor_pipeline::{AzureOpenAiClient, LlmConfig};
use veritor_telemetry::{sink_from_env, TelemetrySink};
use veritor_worker::{
    HttpUsageReporter, LocalUsageReporter, UsageReporter, Worker, WorkerConfig,
};

use crate::config::{AppConfig, BusMode};

/// Shared service graph behind the HTTP handlers.
pub struct AppServices {
    pub accounting: Arc<TenantAccounting>,
    /// Absent when no bus is configured; submissions get 503.
    pub queue: Option<Arc<AdmissionQueue>>,
    pub usage_event_secret: Option<String>,
    pub telemetry: Arc<dyn TelemetrySink>,
    bus: Option<Arc<InMemoryJobBus>>,
    pub results: Option<Arc<InMemoryResultQueue>>,
    worker: Option<Arc<Worker>>,
    worker_task: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl AppServices {
    /// Bare services around pre-built parts (callers own any worker).
    pub fn new(
        accounting: Arc<TenantAccounting>,
        queue: Option<Arc<AdmissionQueue>>,
        usage_event_secret: Option<String>,
        telemetry: Arc<dyn TelemetrySink>,
    ) -> Self {
        Self {
            accounting,
            queue,
            usage_event_secret,
            telemetry,
            bus: None,
            results: None,
            worker: None,
            worker_task: Mutex::new(None),
        }
    }

    /// Stop pulling jobs, let in-flight pipelines settle, close the bus.
    pub async fn shutdown(&self) {
        if let Some(worker) = &self.worker {
            worker.shutdown();
        }
        if let Some(bus) = &self.bus {
            bus.close();
        }
        let task = self.worker_task.lock().unwrap().take();
        if let Some(task) = task {
            let _ = task.await;
        }
    }
}

/// Wire services per config.
///
/// In-memory bus mode colocates the worker in this process when an LLM
/// endpoint is configured; usage events then feed accounting directly unless
/// `USAGE_EVENT_ENDPOINT` points at another admission process.
pub fn build_services(config: &AppConfig) -> AppServices {
    let telemetry = sink_from_env();
    let policy =
        QuotaPolicy::with_overrides_json(config.default_quota, config.hard_quotas_json.as_deref());
    let accounting = Arc::new(TenantAccounting::new(
        policy.clone(),
        config.queue_depth_limit,
        telemetry.clone(),
    ));

    match config.bus_mode {
        BusMode::None => {
            warn!("no job bus configured; submissions will be refused");
            AppServices {
                accounting,
                queue: None,
                usage_event_secret: config.usage_event_secret.clone(),
                telemetry,
                bus: None,
                results: None,
                worker: None,
                worker_task: Mutex::new(None),
            }
        }
        BusMode::InMemory => {
            let bus = Arc::new(InMemoryJobBus::new());
            let results = Arc::new(InMemoryResultQueue::new());
            let queue = Arc::new(AdmissionQueue::new(
                accounting.clone(),
                bus.clone(),
                telemetry.clone(),
                config.dispatch_concurrency,
            ));

            let (worker, worker_task) = match LlmConfig::from_env() {
                Some(llm_config) => {
                    let llm = Arc::new(AzureOpenAiClient::new(llm_config));
                    let usage: Arc<dyn UsageReporter> =
                        match std::env::var("USAGE_EVENT_ENDPOINT").ok() {
                            Some(endpoint) => Arc::new(HttpUsageReporter::new(
                                endpoint,
                                config.usage_event_secret.clone(),
                            )),
                            None => Arc::new(LocalUsageReporter::new(accounting.clone())),
                        };
                    let worker = Worker::new(
                        bus.clone(),
                        results.clone(),
                        llm,
                        usage,
                        telemetry.clone(),
                        policy,
                        WorkerConfig {
                            max_concurrent: config.worker_concurrency,
                            buffer_capacity: config.worker_buffer,
                        },
                    );
                    let task = tokio::spawn(worker.clone().run());
                    info!("colocated reasoning worker started");
                    (Some(worker), Some(task))
                }
                None => {
                    warn!("no LLM endpoint configured; jobs will queue without a worker");
                    (None, None)
                }
            };

            AppServices {
                accounting,
                queue: Some(queue),
                usage_event_secret: config.usage_event_secret.clone(),
                telemetry,
                bus: Some(bus),
                results: Some(results),
                worker,
                worker_task: Mutex::new(worker_task),
            }
        }
    }
}
