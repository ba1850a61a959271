//! API Router configuration

use super::handlers;
use super::state::AppState;
use crate::config::ServerConfig;
use crate::error::ApiError;
use axum::{
    error_handling::HandleErrorLayer,
    extract::DefaultBodyLimit,
    routing::{get, post},
    BoxError, Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// Create the main API router
///
/// The body limit is enforced by the `Json` extractor and timeouts are
/// mapped onto [`ApiError`], so every rejection carries the JSON error body.
pub fn create_router(state: AppState, server: &ServerConfig) -> Router {
    Router::new()
        .route("/", post(handlers::exchange_token))
        .route("/health", get(handlers::health_check))
        .layer(DefaultBodyLimit::max(server.max_body_size))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(HandleErrorLayer::new(handle_middleware_error))
                .timeout(Duration::from_secs(server.request_timeout_secs)),
        )
        .with_state(state)
}

async fn handle_middleware_error(err: BoxError) -> ApiError {
    if err.is::<tower::timeout::error::Elapsed>() {
        ApiError::Timeout
    } else {
        ApiError::Internal(err.to_string())
    }
}
