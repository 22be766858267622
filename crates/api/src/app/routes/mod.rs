use axum::Router;

pub mod admin;
pub mod jobs;
pub mod system;

/// Router for all context-resolving endpoints.
pub fn router() -> Router {
    Router::new()
        .nest("/reasoning", jobs::router())
        .nest("/admin", admin::router())
}
