//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: infrastructure wiring (bus, accounting, admission queue,
//!   colocated worker)
//! - `routes/`: HTTP routes + handlers
//! - `dto.rs`: request/response JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

use crate::config::AppConfig;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router from environment-derived config.
pub fn build_app(config: AppConfig) -> Router {
    let services = Arc::new(services::build_services(&config));
    build_app_with(services, &config)
}

/// Build the router around pre-built services (tests compose their own).
pub fn build_app_with(services: Arc<services::AppServices>, config: &AppConfig) -> Router {
    let jwt = Arc::new(veritor_auth::Hs256JwtValidator::new(
        config.jwt_secret.as_bytes(),
    ));
    let auth_state = middleware::AuthState { jwt };

    // Context-resolving routes: tenant/principal extracted from header/token.
    let resolved = routes::router()
        .layer(Extension(services))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(resolved)
        .layer(ServiceBuilder::new())
}
