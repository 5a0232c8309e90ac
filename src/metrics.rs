// Metrics and observability module
// This file holds the Prometheus collectors mirroring the analytics
// observations, and the text exposition used by the /metrics endpoint
//
// Numan Thabit 2025 Nov

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};

pub static HTTP_LATENCY: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "breathe_http_request_duration_seconds",
        "latency of served HTTP requests",
        &["route", "method"]
    )
    .unwrap()
});

pub static HTTP_ERRORS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "breathe_http_request_errors_total",
        "HTTP responses with status >= 400",
        &["route", "method"]
    )
    .unwrap()
});

pub static MODEL_CALLS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "breathe_model_calls_total",
        "calls to the downstream language model by outcome",
        &["outcome"]
    )
    .unwrap()
});

pub fn observe_request(route: &str, method: &str, elapsed_secs: f64, status: u16) {
    HTTP_LATENCY
        .with_label_values(&[route, method])
        .observe(elapsed_secs);
    if status >= 400 {
        HTTP_ERRORS.with_label_values(&[route, method]).inc();
    }
}

pub fn observe_model_call(succeeded: bool) {
    let outcome = if succeeded { "success" } else { "failure" };
    MODEL_CALLS.with_label_values(&[outcome]).inc();
}

/// Render every registered collector in the Prometheus text format
pub fn render() -> Result<String, prometheus::Error> {
    let mut buf = Vec::new();
    TextEncoder::new().encode(&prometheus::gather(), &mut buf)?;
    String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
}
