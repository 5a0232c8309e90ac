// HTTP handlers for health, metrics, and the assistant proxy
//
// Numan Thabit 2025 Nov

use super::timestamp;
use crate::analytics::{HealthStatus, Metrics};
use crate::errors::ProxyError;
use crate::knowledge;
use crate::metrics;
use crate::state::AppState;
use crate::transport::ollama::{GenerateOptions, GenerateResp};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::warn;

const EMPTY_REPLY: &str = "Sorry, I could not generate a response.";

const FALLBACK_REPLY: &str = "I'm BreatheAI, your air quality health assistant for the Mon Valley region. \
I'm currently experiencing technical difficulties, but I can help you with:

- Air quality information for the Mon Valley area
- Health effects of air pollution
- Steel mill emissions and their impacts
- Local air quality monitoring data

Please try again in a moment, or contact support if the issue persists.";

const DIAGNOSTIC_PROMPT: &str =
    "Hello, this is a test message. Please respond with \"Ollama is working correctly.\"";

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub uptime: u64,
    pub services: ServiceHealth,
    pub metrics: HealthMetrics,
}

#[derive(Debug, Serialize)]
pub struct ServiceHealth {
    pub backend: &'static str,
    pub ollama: HealthStatus,
    pub database: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthMetrics {
    pub requests: u64,
    pub error_rate: String,
    pub avg_response_time: String,
    pub ollama_success_rate: String,
    pub active_users: usize,
}

impl HealthResponse {
    pub fn from_metrics(metrics: &Metrics) -> Self {
        Self {
            status: "healthy",
            timestamp: timestamp(),
            uptime: metrics.uptime_millis,
            services: ServiceHealth {
                backend: "running",
                ollama: metrics.health_verdict(),
                database: "connected",
            },
            metrics: HealthMetrics {
                requests: metrics.requests,
                error_rate: format!("{:.2}%", metrics.error_rate_percent),
                avg_response_time: format!("{:.2}ms", metrics.avg_response_time_millis),
                ollama_success_rate: format!("{:.2}%", metrics.external_call_success_rate_percent),
                active_users: metrics.active_users,
            },
        }
    }
}

/// Health check combining the downstream verdict with headline metrics
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::from_metrics(&state.analytics.snapshot()))
}

/// Full analytics snapshot
pub async fn analytics_snapshot(State(state): State<AppState>) -> Json<Metrics> {
    Json(state.analytics.snapshot())
}

/// Prometheus text exposition
pub async fn prometheus() -> Response {
    match metrics::render() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(err) => {
            warn!(error = %err, "prometheus encode failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub context_used: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Assistant chat: enrich the prompt from the knowledge base and forward to the model.
/// Model failures answer with a canned reply rather than an error status.
pub async fn chat(State(state): State<AppState>, Json(req): Json<ChatRequest>) -> Json<ChatResponse> {
    let context = knowledge::retrieve(&req.message);
    let prompt = knowledge::build_prompt(&req.message, &context);
    let options = GenerateOptions::default();

    match call_model(&state, &prompt, Some(&options)).await {
        Ok(resp) => Json(ChatResponse {
            response: reply_text(resp),
            context_used: !context.is_empty(),
            sources: Some(knowledge::sources(&context)),
            error: None,
        }),
        Err(err) => {
            warn!(error = %err, "model call failed; sending fallback reply");
            Json(ChatResponse {
                response: FALLBACK_REPLY.to_string(),
                context_used: false,
                sources: None,
                error: Some(err.to_string()),
            })
        }
    }
}

/// Connectivity probe against the configured model
pub async fn model_diagnostic(State(state): State<AppState>) -> Response {
    match call_model(&state, DIAGNOSTIC_PROMPT, None).await {
        Ok(resp) => Json(serde_json::json!({
            "status": "success",
            "message": "Ollama connection successful",
            "response": resp.response,
            "model": state.model.model(),
        }))
        .into_response(),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({
                "status": "error",
                "message": "Ollama connection failed",
                "error": err.to_string(),
            })),
        )
            .into_response(),
    }
}

async fn call_model(
    state: &AppState,
    prompt: &str,
    options: Option<&GenerateOptions>,
) -> Result<GenerateResp, ProxyError> {
    let start = Instant::now();
    let result = state.model.generate(prompt, options).await;
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
    let succeeded = result.is_ok();

    metrics::observe_model_call(succeeded);
    if let Err(err) = state.analytics.record_external_call(succeeded, elapsed_ms) {
        warn!(error = %err, "dropped model call observation");
    }
    result
}

fn reply_text(resp: GenerateResp) -> String {
    resp.response
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| EMPTY_REPLY.to_string())
}
