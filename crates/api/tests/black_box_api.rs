//! Black-box tests against the real router on an ephemeral port.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{json, Value};

use veritor_admission::{AdmissionQueue, QuotaPolicy, TenantAccounting};
use veritor_api::app::services::AppServices;
use veritor_api::app::build_app_with;
use veritor_api::config::AppConfig;
use veritor_auth::{JwtClaims, Role};
use veritor_bus::{InMemoryJobBus, InMemoryResultQueue, ResultEnvelope};
use veritor_pipeline::ScriptedLlm;
use veritor_telemetry::NoopTelemetry;
use veritor_worker::{LocalUsageReporter, Worker, WorkerConfig};

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
    services: Arc<AppServices>,
    bus: Arc<InMemoryJobBus>,
    results: Arc<InMemoryResultQueue>,
}

struct TestSetup {
    config: AppConfig,
    usage_event_secret: Option<String>,
}

impl TestSetup {
    fn new() -> Self {
        Self {
            config: AppConfig {
                jwt_secret: "test-secret".to_string(),
                default_quota: 2,
                queue_depth_limit: 10,
                ..AppConfig::default()
            },
            usage_event_secret: None,
        }
    }

    fn with_default_quota(mut self, quota: u32) -> Self {
        self.config.default_quota = quota;
        self
    }

    fn with_depth_limit(mut self, limit: u32) -> Self {
        self.config.queue_depth_limit = limit;
        self
    }

    fn with_usage_secret(mut self, secret: &str) -> Self {
        self.usage_event_secret = Some(secret.to_string());
        self
    }

    /// Build services around an in-memory bus (no worker attached).
    async fn spawn(self) -> TestServer {
        let bus = Arc::new(InMemoryJobBus::new());
        let results = Arc::new(InMemoryResultQueue::new());
        let accounting = Arc::new(TenantAccounting::new(
            QuotaPolicy::with_overrides_json(self.config.default_quota, None),
            self.config.queue_depth_limit,
            Arc::new(NoopTelemetry),
        ));
        let queue = Arc::new(AdmissionQueue::new(
            accounting.clone(),
            bus.clone(),
            Arc::new(NoopTelemetry),
            self.config.dispatch_concurrency,
        ));
        let services = Arc::new(AppServices::new(
            accounting,
            Some(queue),
            self.usage_event_secret.clone(),
            Arc::new(NoopTelemetry),
        ));

        TestServer::start(services, bus, results, &self.config).await
    }

    /// No bus at all: submissions must get 503.
    async fn spawn_without_bus(self) -> TestServer {
        let accounting = Arc::new(TenantAccounting::new(
            QuotaPolicy::with_overrides_json(self.config.default_quota, None),
            self.config.queue_depth_limit,
            Arc::new(NoopTelemetry),
        ));
        let services = Arc::new(AppServices::new(
            accounting,
            None,
            self.usage_event_secret.clone(),
            Arc::new(NoopTelemetry),
        ));

        let bus = Arc::new(InMemoryJobBus::new());
        let results = Arc::new(InMemoryResultQueue::new());
        TestServer::start(services, bus, results, &self.config).await
    }
}

impl TestServer {
    async fn start(
        services: Arc<AppServices>,
        bus: Arc<InMemoryJobBus>,
        results: Arc<InMemoryResultQueue>,
        config: &AppConfig,
    ) -> Self {
        let app = build_app_with(services.clone(), config);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            handle,
            services,
            bus,
            results,
        }
    }

    /// Attach a colocated worker backed by a scripted LLM.
    fn spawn_worker(&self, llm: Arc<ScriptedLlm>) -> Arc<Worker> {
        let worker = Worker::new(
            self.bus.clone(),
            self.results.clone(),
            llm,
            Arc::new(LocalUsageReporter::new(self.services.accounting.clone())),
            Arc::new(NoopTelemetry),
            QuotaPolicy::with_overrides_json(5, None),
            WorkerConfig::default(),
        );
        tokio::spawn(worker.clone().run());
        worker
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(jwt_secret: &str, tenant_id: Option<&str>, roles: Vec<Role>) -> String {
    let now = Utc::now().timestamp();
    let claims = JwtClaims {
        sub: "user-1".to_string(),
        tenant_id: tenant_id.map(str::to_string),
        oid: None,
        roles,
        iat: now,
        exp: now + 600,
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
    .expect("failed to encode jwt")
}

fn job_body() -> Value {
    json!({
        "claim": "c",
        "context": {"documents": [{"id": "d1", "content": "x"}]},
        "criteria": [{"id": "k1", "description": "r"}]
    })
}

async fn admin_snapshot(client: &reqwest::Client, srv: &TestServer) -> Value {
    let token = mint_jwt("test-secret", None, vec![Role::new("admin")]);
    let res = client
        .get(format!("{}/admin/usage", srv.base_url))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    res.json().await.unwrap()
}

/// Poll until `cond` holds (the dispatch path is async).
async fn wait_until(mut cond: impl FnMut() -> bool) {
    for _ in 0..200 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}

/// Poll the snapshot until `pred` holds (the dispatch path is async).
async fn snapshot_eventually(
    client: &reqwest::Client,
    srv: &TestServer,
    pred: impl Fn(&Value) -> bool,
) -> Value {
    for _ in 0..100 {
        let snap = admin_snapshot(client, srv).await;
        if pred(&snap) {
            return snap;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("snapshot never satisfied predicate");
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestSetup::new().spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/health", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn submission_without_tenant_context_is_rejected() {
    let srv = TestSetup::new().spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/reasoning/jobs", srv.base_url))
        .json(&job_body())
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"]["code"], "MissingTenantId");
}

#[tokio::test]
async fn submission_is_admitted_and_dispatched() {
    let srv = TestSetup::new().spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/reasoning/jobs", srv.base_url))
        .header("X-Tenant-Id", "t1")
        .json(&job_body())
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "queued");
    assert_eq!(body["position"], 1);
    assert_eq!(body["queueDepth"], 1);
    assert_eq!(body["quota"], 2);
    assert_eq!(body["usage"], json!({"queued": 1, "active": 0}));
    assert!(body["jobId"].as_str().is_some());

    // Dispatch moves the job queued -> active and onto the bus.
    let snap = snapshot_eventually(&client, &srv, |s| {
        s["tenants"][0]["active"].as_u64() == Some(1)
    })
    .await;
    assert_eq!(snap["tenants"][0]["tenantId"], "t1");
    assert_eq!(snap["tenants"][0]["queued"], 0);
    wait_until(|| srv.bus.queue_len() == 1).await;
}

#[tokio::test]
async fn invalid_submission_fails_schema_validation() {
    let srv = TestSetup::new().spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/reasoning/jobs", srv.base_url))
        .header("X-Tenant-Id", "t1")
        .json(&json!({
            "claim": "",
            "context": {"documents": []},
            "criteria": [{"id": "k1", "description": "r"}]
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("Job failed schema validation"));
}

#[tokio::test]
async fn tenant_quota_is_enforced() {
    let srv = TestSetup::new().with_default_quota(1).spawn().await;
    let client = reqwest::Client::new();

    let first = client
        .post(format!("{}/reasoning/jobs", srv.base_url))
        .header("X-Tenant-Id", "t1")
        .json(&job_body())
        .send()
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = client
        .post(format!("{}/reasoning/jobs", srv.base_url))
        .header("X-Tenant-Id", "t1")
        .json(&job_body())
        .send()
        .await
        .unwrap();

    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    let body: Value = second.json().await.unwrap();
    assert_eq!(body["error"]["code"], "TenantQuotaExceeded");
    assert_eq!(body["error"]["tenantId"], "t1");
    assert_eq!(body["error"]["quota"], 1);
    let usage = &body["error"]["usage"];
    assert_eq!(
        usage["queued"].as_u64().unwrap() + usage["active"].as_u64().unwrap(),
        1
    );

    // Exactly one bus send: the rejected job never dispatches.
    wait_until(|| srv.bus.queue_len() == 1).await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(srv.bus.queue_len(), 1);
}

#[tokio::test]
async fn global_depth_ceiling_is_enforced() {
    let srv = TestSetup::new().with_depth_limit(1).spawn().await;
    let client = reqwest::Client::new();

    let first = client
        .post(format!("{}/reasoning/jobs", srv.base_url))
        .header("X-Tenant-Id", "t1")
        .json(&job_body())
        .send()
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = client
        .post(format!("{}/reasoning/jobs", srv.base_url))
        .header("X-Tenant-Id", "t2")
        .json(&job_body())
        .send()
        .await
        .unwrap();

    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    let body: Value = second.json().await.unwrap();
    assert_eq!(body["error"]["code"], "QueueDepthExceeded");
    assert_eq!(body["error"]["queueDepth"], 1);
    assert_eq!(body["error"]["limit"], 1);
}

#[tokio::test]
async fn submission_without_bus_returns_503() {
    let srv = TestSetup::new().spawn_without_bus().await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/reasoning/jobs", srv.base_url))
        .header("X-Tenant-Id", "t1")
        .json(&job_body())
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn tenant_header_takes_precedence_over_token_claim() {
    let srv = TestSetup::new().spawn().await;
    let client = reqwest::Client::new();

    let token = mint_jwt("test-secret", Some("claim-tenant"), vec![]);
    let res = client
        .post(format!("{}/reasoning/jobs", srv.base_url))
        .header("X-Tenant-Id", "header-tenant")
        .bearer_auth(token)
        .json(&job_body())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let snap = admin_snapshot(&client, &srv).await;
    assert_eq!(snap["tenants"][0]["tenantId"], "header-tenant");
}

#[tokio::test]
async fn token_claim_resolves_tenant_when_header_is_absent() {
    let srv = TestSetup::new().spawn().await;
    let client = reqwest::Client::new();

    let token = mint_jwt("test-secret", Some("claim-tenant"), vec![]);
    let res = client
        .post(format!("{}/reasoning/jobs", srv.base_url))
        .bearer_auth(token)
        .json(&job_body())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let snap = admin_snapshot(&client, &srv).await;
    assert_eq!(snap["tenants"][0]["tenantId"], "claim-tenant");
}

#[tokio::test]
async fn admin_usage_requires_admin_role() {
    let srv = TestSetup::new().spawn().await;
    let client = reqwest::Client::new();

    let anonymous = client
        .get(format!("{}/admin/usage", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(anonymous.status(), StatusCode::FORBIDDEN);

    let token = mint_jwt("test-secret", Some("t1"), vec![Role::new("user")]);
    let non_admin = client
        .get(format!("{}/admin/usage", srv.base_url))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(non_admin.status(), StatusCode::FORBIDDEN);

    let token = mint_jwt("test-secret", None, vec![Role::new("admin")]);
    let admin = client
        .get(format!("{}/admin/usage", srv.base_url))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(admin.status(), StatusCode::OK);
    let body: Value = admin.json().await.unwrap();
    assert_eq!(body["maxQueueDepth"], 10);
    assert!(body["tenants"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn invalid_bearer_token_is_rejected() {
    let srv = TestSetup::new().spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/admin/usage", srv.base_url))
        .bearer_auth("garbage")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn usage_events_enforce_the_shared_secret() {
    let srv = TestSetup::new().with_usage_secret("s3cret").spawn().await;
    let client = reqwest::Client::new();
    let event = json!({"tenantId": "t1", "type": "completed"});

    let missing = client
        .post(format!("{}/admin/usage/events", srv.base_url))
        .json(&event)
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

    let wrong = client
        .post(format!("{}/admin/usage/events", srv.base_url))
        .header("x-usage-secret", "nope")
        .json(&event)
        .send()
        .await
        .unwrap();
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

    let ok = client
        .post(format!("{}/admin/usage/events", srv.base_url))
        .header("x-usage-secret", "s3cret")
        .json(&event)
        .send()
        .await
        .unwrap();
    assert_eq!(ok.status(), StatusCode::OK);
    let body: Value = ok.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn usage_events_validate_type_and_apply_decrements() {
    let srv = TestSetup::new().spawn().await;
    let client = reqwest::Client::new();

    let bad_type = client
        .post(format!("{}/admin/usage/events", srv.base_url))
        .json(&json!({"tenantId": "t1", "type": "finished"}))
        .send()
        .await
        .unwrap();
    assert_eq!(bad_type.status(), StatusCode::BAD_REQUEST);

    let blank_tenant = client
        .post(format!("{}/admin/usage/events", srv.base_url))
        .json(&json!({"tenantId": "  ", "type": "completed"}))
        .send()
        .await
        .unwrap();
    assert_eq!(blank_tenant.status(), StatusCode::BAD_REQUEST);

    // Admit + dispatch one job, then complete it via the event channel.
    client
        .post(format!("{}/reasoning/jobs", srv.base_url))
        .header("X-Tenant-Id", "t1")
        .json(&job_body())
        .send()
        .await
        .unwrap();
    snapshot_eventually(&client, &srv, |s| {
        s["tenants"][0]["active"].as_u64() == Some(1)
    })
    .await;

    let ok = client
        .post(format!("{}/admin/usage/events", srv.base_url))
        .json(&json!({"tenantId": "t1", "type": "completed"}))
        .send()
        .await
        .unwrap();
    assert_eq!(ok.status(), StatusCode::OK);

    let snap = admin_snapshot(&client, &srv).await;
    assert!(snap["tenants"].as_array().unwrap().is_empty());
    assert_eq!(snap["queueDepth"], 0);
}

#[tokio::test]
async fn full_pipeline_end_to_end() {
    let srv = TestSetup::new().spawn().await;
    let client = reqwest::Client::new();

    let llm = Arc::new(ScriptedLlm::new());
    llm.push_json(json!({"passages": [{"documentId": "d1", "excerpt": "x", "relevance": 0.9}]}));
    llm.push_json(json!({"matches": [{"criterionId": "k1", "matched": true, "relevance": 0.8, "rationale": "r"}]}));
    llm.push_json(json!({"findings": [{"id": "f1", "statement": "s", "severity": "low", "confidence": 0.7}]}));
    llm.push_json(json!({"agreements": [{"findingId": "f1", "agreement": 0.6, "rationale": "r"}]}));
    llm.push_json(json!({"categories": [{"name": "safety", "riskLevel": "medium", "summary": "s"}]}));
    llm.push_json(json!({"verdict": "supported", "riskLevel": "low", "confidence": 0.8, "summary": "s"}));
    let worker = srv.spawn_worker(llm);

    let res = client
        .post(format!("{}/reasoning/jobs", srv.base_url))
        .header("X-Tenant-Id", "t1")
        .json(&job_body())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let submitted: Value = res.json().await.unwrap();
    let job_id = submitted["jobId"].as_str().unwrap().to_string();

    let envelopes = srv.results.wait_for(1).await;
    match &envelopes[0] {
        ResultEnvelope::Completed(env) => {
            assert_eq!(env.job_id.as_str(), job_id);
            assert_eq!(env.status, "completed");
            assert_eq!(env.result.job_id.as_str(), job_id);
            assert_eq!(env.result.overall_assessment.verdict, "supported");
        }
        other => panic!("expected completion envelope, got {other:?}"),
    }

    // The `completed` usage event returns accounting to idle.
    let snap = snapshot_eventually(&client, &srv, |s| {
        s["tenants"].as_array().unwrap().is_empty()
    })
    .await;
    assert_eq!(snap["queueDepth"], 0);

    worker.shutdown();
    srv.bus.close();
}
