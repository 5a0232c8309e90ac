// Ollama transport layer implementation
// This file implements the JSON-over-HTTP client for a local Ollama
// server's non-streaming /api/generate endpoint
//
// Numan Thabit 2025 Nov

use crate::errors::ProxyError;
use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Sampling options forwarded with chat prompts
#[derive(Debug, Clone, Serialize)]
pub struct GenerateOptions {
    pub temperature: f64,
    pub top_p: f64,
    pub num_predict: u32,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.9,
            num_predict: 500,
        }
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<&'a GenerateOptions>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateResp {
    pub response: Option<String>,
    pub model: Option<String>,
    pub done: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct OllamaClient {
    http: Client,
    base: Url,
    generate_url: Url,
    model: String,
}

impl OllamaClient {
    pub fn new(mut base: Url, model: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .gzip(true)
            .build()
            .context("build HTTP client for Ollama")?;
        // `join` replaces the last segment unless the base path ends in '/'.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let generate_url = base
            .join("api/generate")
            .with_context(|| format!("derive generate URL from {base}"))?;

        Ok(Self {
            http,
            base,
            generate_url,
            model: model.into(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.base
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Run a single non-streaming completion and return the generated text.
    pub async fn generate(
        &self,
        prompt: &str,
        options: Option<&GenerateOptions>,
    ) -> Result<GenerateResp, ProxyError> {
        let payload = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options,
        };
        let resp = self
            .http
            .post(self.generate_url.clone())
            .json(&payload)
            .send()
            .await
            .map_err(|e| ProxyError::Transport(format!("ollama send: {e}")))?;
        if !resp.status().is_success() {
            return Err(ProxyError::Provider(format!("http {}", resp.status())));
        }
        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| ProxyError::Decode(format!("json parse: {e}")))?;
        if let Some(err) = body.get("error") {
            return Err(ProxyError::Provider(err.to_string()));
        }
        serde_json::from_value(body).map_err(|e| ProxyError::Decode(format!("decode result: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_url_is_derived_from_base() {
        let client = OllamaClient::new(
            Url::parse("http://127.0.0.1:11434").unwrap(),
            "llama3:latest",
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(client.generate_url.as_str(), "http://127.0.0.1:11434/api/generate");
        assert_eq!(client.model(), "llama3:latest");
    }

    #[test]
    fn base_path_is_kept_when_deriving_generate_url() {
        let client = OllamaClient::new(
            Url::parse("http://models.local/ollama").unwrap(),
            "llama3:latest",
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(client.generate_url.as_str(), "http://models.local/ollama/api/generate");

        let client = OllamaClient::new(
            Url::parse("http://models.local/ollama/").unwrap(),
            "llama3:latest",
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(client.generate_url.as_str(), "http://models.local/ollama/api/generate");
    }

    #[test]
    fn request_omits_missing_options() {
        let req = GenerateRequest {
            model: "m",
            prompt: "p",
            stream: false,
            options: None,
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value, serde_json::json!({"model": "m", "prompt": "p", "stream": false}));

        let opts = GenerateOptions::default();
        let req = GenerateRequest {
            options: Some(&opts),
            ..req
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["options"]["num_predict"], 500);
    }
}
