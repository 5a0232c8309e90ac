// HTTP API for the backend
// This file assembles the axum router: routes, request tracking,
// panic handling, tracing and CORS layers
//
// Numan Thabit 2025 Nov

pub mod handlers;
pub mod tracking;

use crate::analytics::snapshot::{CHAT_ROUTE, DIAGNOSTIC_ROUTE, HEALTH_ROUTE};
use crate::state::AppState;
use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use chrono::{SecondsFormat, Utc};
use tower::ServiceBuilder;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};

pub const METRICS_ROUTE: &str = "/api/metrics";
pub const PROMETHEUS_ROUTE: &str = "/metrics";
/// Chat path used by earlier clients; served but not counted under the chat tag
pub const LEGACY_CHAT_ROUTE: &str = "/api/llama3-chat";

/// Create the HTTP router with API endpoints
pub fn create_api_router(state: AppState) -> Router {
    Router::new()
        .route(HEALTH_ROUTE, get(handlers::health))
        .route(METRICS_ROUTE, get(handlers::analytics_snapshot))
        .route(PROMETHEUS_ROUTE, get(handlers::prometheus))
        .route(CHAT_ROUTE, post(handlers::chat))
        .route(LEGACY_CHAT_ROUTE, post(handlers::chat))
        .route(DIAGNOSTIC_ROUTE, get(handlers::model_diagnostic))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(from_fn_with_state(state.clone(), tracking::track_requests))
                .layer(CatchPanicLayer::custom(tracking::panic_response)),
        )
        .with_state(state)
}

/// RFC 3339 UTC timestamp with millisecond precision
pub(crate) fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
