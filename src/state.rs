// Shared application state
//
// Handed to every axum handler and middleware. The analytics aggregator is
// constructed once at startup and shared by reference count, so tests can
// build isolated instances.
//
// Numan Thabit 2025 Nov

use crate::analytics::RequestAnalyticsAggregator;
use crate::config::AppConfig;
use crate::transport::OllamaClient;
use anyhow::Result;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub analytics: Arc<RequestAnalyticsAggregator>,
    pub model: Arc<OllamaClient>,
}

impl AppState {
    pub fn new(analytics: Arc<RequestAnalyticsAggregator>, model: OllamaClient) -> Self {
        Self {
            analytics,
            model: Arc::new(model),
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let model = OllamaClient::new(
            config.ollama_endpoint.clone(),
            config.ollama_model.clone(),
            config.ollama_timeout(),
        )?;
        Ok(Self::new(Arc::new(RequestAnalyticsAggregator::new()), model))
    }
}
