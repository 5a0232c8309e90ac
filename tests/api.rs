//! Integration tests for the HTTP API
//!
//! Drives the real router with `oneshot` requests; a throwaway axum server
//! on 127.0.0.1:0 stands in for Ollama.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use breathe_backend::analytics::{HealthStatus, RequestAnalyticsAggregator};
use breathe_backend::server::{create_api_router, tracking};
use breathe_backend::state::AppState;
use breathe_backend::transport::OllamaClient;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tower::util::ServiceExt; // for `oneshot`
use url::Url;

#[derive(Clone)]
struct FakeOllama {
    status: StatusCode,
    reply: &'static str,
    seen: Arc<Mutex<Vec<Value>>>,
}

async fn generate(State(fake): State<FakeOllama>, Json(body): Json<Value>) -> impl IntoResponse {
    let model = body["model"].clone();
    fake.seen.lock().unwrap().push(body);
    if fake.status.is_success() {
        (
            fake.status,
            Json(json!({ "model": model, "response": fake.reply, "done": true })),
        )
    } else {
        (fake.status, Json(json!({ "error": "model unavailable" })))
    }
}

/// Spawn a fake Ollama and return its base URL plus the captured request bodies
async fn spawn_fake_ollama(status: StatusCode, reply: &'static str) -> (Url, Arc<Mutex<Vec<Value>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let fake = FakeOllama {
        status,
        reply,
        seen: seen.clone(),
    };
    let app = Router::new()
        .route("/api/generate", post(generate))
        .with_state(fake);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (Url::parse(&format!("http://{addr}")).unwrap(), seen)
}

fn test_app(ollama: Url) -> (Router, Arc<RequestAnalyticsAggregator>) {
    let analytics = Arc::new(RequestAnalyticsAggregator::new());
    let model = OllamaClient::new(ollama, "llama3:latest", Duration::from_secs(5)).unwrap();
    let state = AppState::new(analytics.clone(), model);
    (create_api_router(state), analytics)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap_or(json!({}));
    (status, json)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .method("POST")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

#[tokio::test]
async fn health_reports_shape_and_counts_itself() {
    let (url, _) = spawn_fake_ollama(StatusCode::OK, "ok").await;
    let (app, analytics) = test_app(url);

    let (status, body) = send(&app, get("/api/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert!(body["timestamp"].as_str().unwrap().ends_with('Z'));
    assert!(body["uptime"].is_u64());
    assert_eq!(body["services"]["backend"], "running");
    assert_eq!(body["services"]["ollama"], "healthy");
    assert_eq!(body["services"]["database"], "connected");
    assert_eq!(body["metrics"]["requests"], 0);
    assert_eq!(body["metrics"]["errorRate"], "0.00%");
    assert_eq!(body["metrics"]["ollamaSuccessRate"], "100.00%");

    let (_, body) = send(&app, get("/api/health")).await;
    assert_eq!(body["metrics"]["requests"], 1);

    let metrics = analytics.snapshot();
    assert_eq!(metrics.requests, 2);
    assert_eq!(metrics.errors, 0);
    assert_eq!(metrics.features.health, 2);
}

#[tokio::test]
async fn metrics_endpoint_returns_snapshot_fields() {
    let (url, _) = spawn_fake_ollama(StatusCode::OK, "ok").await;
    let (app, _) = test_app(url);
    send(&app, get("/api/health")).await;

    let (status, body) = send(&app, get("/api/metrics")).await;
    assert_eq!(status, StatusCode::OK);
    for field in [
        "uptimeMillis",
        "requests",
        "errors",
        "errorRatePercent",
        "avgResponseTimeMillis",
        "externalCallSuccessRatePercent",
        "activeUsers",
        "features",
    ] {
        assert!(body.get(field).is_some(), "missing {field}");
    }
    assert_eq!(body["requests"], 1);
    assert_eq!(body["features"]["health"], 1);
    assert_eq!(body["features"]["chat"], 0);
    assert_eq!(body["features"]["diagnostic"], 0);
    assert_eq!(body["externalCallSuccessRatePercent"], 100.0);
}

#[tokio::test]
async fn chat_forwards_enriched_prompt_and_records_call() {
    let (url, seen) = spawn_fake_ollama(StatusCode::OK, "  Air quality is moderate today.\n").await;
    let (app, analytics) = test_app(url);

    let (status, body) = send(
        &app,
        post_json("/api/chat", json!({ "message": "How is the air quality?" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], "Air quality is moderate today.");
    assert_eq!(body["context_used"], true);
    let sources: Vec<&str> = body["sources"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert!(sources.contains(&"purpleair"));
    assert!(body.get("error").is_none());

    let requests = seen.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0]["model"], "llama3:latest");
    assert_eq!(requests[0]["stream"], false);
    assert!(requests[0]["prompt"]
        .as_str()
        .unwrap()
        .contains("Relevant context for this query"));
    assert_eq!(requests[0]["options"]["num_predict"], 500);

    let metrics = analytics.snapshot();
    assert_eq!(metrics.external_calls, 1);
    assert_eq!(metrics.external_call_errors, 0);
    assert_eq!(metrics.features.chat, 1);
}

#[tokio::test]
async fn chat_without_context_reports_empty_sources() {
    let (url, _) = spawn_fake_ollama(StatusCode::OK, "Hello!").await;
    let (app, _) = test_app(url);

    let (_, body) = send(&app, post_json("/api/chat", json!({ "message": "hi there" }))).await;
    assert_eq!(body["response"], "Hello!");
    assert_eq!(body["context_used"], false);
    assert_eq!(body["sources"], json!([]));
}

#[tokio::test]
async fn chat_falls_back_when_model_fails() {
    let (url, _) = spawn_fake_ollama(StatusCode::SERVICE_UNAVAILABLE, "").await;
    let (app, analytics) = test_app(url);

    let (status, body) = send(
        &app,
        post_json("/api/chat", json!({ "message": "health effects of pm2.5" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["response"].as_str().unwrap().starts_with("I'm BreatheAI"));
    assert_eq!(body["context_used"], false);
    assert!(body["error"].as_str().unwrap().contains("503"));
    assert!(body.get("sources").is_none());

    let metrics = analytics.snapshot();
    assert_eq!(metrics.external_calls, 1);
    assert_eq!(metrics.external_call_errors, 1);
    assert_eq!(metrics.external_call_success_rate_percent, 0.0);
    assert_eq!(metrics.errors, 0);
    assert_eq!(analytics.health_verdict(), HealthStatus::Degraded);

    let (_, health) = send(&app, get("/api/health")).await;
    assert_eq!(health["services"]["ollama"], "degraded");
    assert_eq!(health["metrics"]["ollamaSuccessRate"], "0.00%");
}

#[tokio::test]
async fn diagnostic_reports_success() {
    let (url, seen) = spawn_fake_ollama(StatusCode::OK, "Ollama is working correctly.").await;
    let (app, analytics) = test_app(url);

    let (status, body) = send(&app, get("/api/ollama-test")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["response"], "Ollama is working correctly.");
    assert_eq!(body["model"], "llama3:latest");
    assert!(seen.lock().unwrap()[0].get("options").is_none());

    let metrics = analytics.snapshot();
    assert_eq!(metrics.features.diagnostic, 1);
    assert_eq!(metrics.external_calls, 1);
}

#[tokio::test]
async fn diagnostic_failure_is_a_tracked_error() {
    let (url, _) = spawn_fake_ollama(StatusCode::INTERNAL_SERVER_ERROR, "").await;
    let (app, analytics) = test_app(url);

    let (status, body) = send(&app, get("/api/ollama-test")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], "error");
    assert_eq!(body["message"], "Ollama connection failed");

    let metrics = analytics.snapshot();
    assert_eq!(metrics.requests, 1);
    assert_eq!(metrics.errors, 1);
    assert_eq!(metrics.error_rate_percent, 100.0);
    assert_eq!(metrics.features.diagnostic, 1);
    assert_eq!(metrics.external_call_errors, 1);
}

#[tokio::test]
async fn malformed_chat_body_counts_as_error() {
    let (url, seen) = spawn_fake_ollama(StatusCode::OK, "unused").await;
    let (app, analytics) = test_app(url);

    let request = Request::builder()
        .uri("/api/chat")
        .method("POST")
        .header("content-type", "application/json")
        .body(Body::from("not json"))
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert!(status.is_client_error());

    let metrics = analytics.snapshot();
    assert_eq!(metrics.errors, 1);
    assert_eq!(metrics.features.chat, 1);
    assert_eq!(metrics.external_calls, 0);
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn user_header_feeds_active_users() {
    let (url, _) = spawn_fake_ollama(StatusCode::OK, "ok").await;
    let (app, analytics) = test_app(url);

    for user in ["u1", "u1", "u2", " "] {
        let request = Request::builder()
            .uri("/api/health")
            .header(tracking::USER_ID_HEADER, user)
            .body(Body::empty())
            .unwrap();
        send(&app, request).await;
    }
    send(&app, get("/api/health")).await;

    let metrics = analytics.snapshot();
    assert_eq!(metrics.active_users, 2);
    assert_eq!(metrics.requests, 5);
}

#[tokio::test]
async fn prometheus_exposes_request_histogram() {
    let (url, _) = spawn_fake_ollama(StatusCode::OK, "ok").await;
    let (app, _) = test_app(url);
    send(&app, get("/api/health")).await;

    let response = app.clone().oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("breathe_http_request_duration_seconds"));
    assert!(text.contains("route=\"/api/health\""));
}

#[tokio::test]
async fn panics_render_json_500() {
    let response = tracking::panic_response(Box::new("boom"));
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "Internal server error");
    assert!(json["timestamp"].is_string());
}

#[tokio::test]
async fn legacy_chat_path_is_served_but_uncategorized() {
    let (url, seen) = spawn_fake_ollama(StatusCode::OK, "Hello from the old path").await;
    let (app, analytics) = test_app(url);

    let (status, body) = send(&app, post_json("/api/llama3-chat", json!({ "message": "hi" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], "Hello from the old path");
    assert_eq!(seen.lock().unwrap().len(), 1);

    let metrics = analytics.snapshot();
    assert_eq!(metrics.requests, 1);
    assert_eq!(metrics.errors, 0);
    assert_eq!(metrics.external_calls, 1);
    assert_eq!(metrics.features.chat, 0);
}

#[tokio::test]
async fn unrouted_path_is_an_uncategorized_error() {
    let (url, _) = spawn_fake_ollama(StatusCode::OK, "ok").await;
    let (app, analytics) = test_app(url);

    let (status, _) = send(&app, get("/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let metrics = analytics.snapshot();
    assert_eq!(metrics.requests, 1);
    assert_eq!(metrics.errors, 1);
    assert_eq!(metrics.features.chat, 0);
    assert_eq!(metrics.features.health, 0);
    assert_eq!(metrics.features.diagnostic, 0);
}

#[tokio::test]
async fn cors_headers_are_added() {
    let (url, _) = spawn_fake_ollama(StatusCode::OK, "ok").await;
    let (app, analytics) = test_app(url);

    let request = Request::builder()
        .uri("/api/health")
        .header("origin", "https://mv-pollution-tracking-system.web.app")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "*"
    );
    assert_eq!(analytics.snapshot().features.health, 1);
}
