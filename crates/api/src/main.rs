use std::sync::Arc;

use veritor_api::app::{build_app_with, services::build_services, services::AppServices};
use veritor_api::config::AppConfig;

#[tokio::main]
async fn main() {
    veritor_telemetry::init();

    let config = AppConfig::from_env();
    let services = Arc::new(build_services(&config));
    let app = build_app_with(services.clone(), &config);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {e}", config.bind_addr));

    tracing::info!("listening on {}", listener.local_addr().unwrap());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(services))
        .await
        .unwrap();
}

/// Wait for SIGINT/SIGTERM, then stop the subscription and drain in-flight
/// pipelines before the server exits.
async fn shutdown_signal(services: Arc<AppServices>) {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => {}
            _ = terminate.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
    }

    tracing::info!("shutdown signal received; draining worker");
    services.shutdown().await;
}
