// Request tracking middleware
// Feeds every completed request into the analytics aggregator and the
// Prometheus collectors, and turns handler panics into JSON 500s
//
// Numan Thabit 2025 Nov

use crate::metrics;
use crate::state::AppState;
use axum::{
    extract::{MatchedPath, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use std::any::Any;
use std::time::Instant;
use tracing::{error, info, warn};

/// Header carrying an opaque client identifier for active-user counting
pub const USER_ID_HEADER: &str = "x-user-id";

pub async fn track_requests(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let start = Instant::now();
    let endpoint = req.uri().path().to_string();
    let method = req.method().to_string();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    if let Some(user_id) = req
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        state.analytics.record_user(user_id);
    }

    let response = next.run(req).await;

    let elapsed = start.elapsed();
    let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
    let status = response.status().as_u16();
    metrics::observe_request(&route, &method, elapsed.as_secs_f64(), status);

    match state
        .analytics
        .record_request(&endpoint, &method, elapsed_ms, status)
    {
        Ok(()) => info!(
            endpoint = %endpoint,
            method = %method,
            response_time_ms = elapsed_ms,
            status = status,
            "request tracked"
        ),
        Err(err) => warn!(
            error = %err,
            endpoint = %endpoint,
            method = %method,
            "dropped request observation"
        ),
    }

    response
}

pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    error!(error = %detail, "unhandled error");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({
            "error": "Internal server error",
            "timestamp": super::timestamp(),
        })),
    )
        .into_response()
}
