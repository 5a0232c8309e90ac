// Configuration management module
// This file handles loading and parsing of configuration settings
// from defaults and APP__* environment variables
//
// Numan Thabit 2025 Nov

use anyhow::{bail, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Listen address for the HTTP API, e.g. 0.0.0.0:5001
    pub bind_address: SocketAddr,
    /// Ollama base URL, e.g. http://127.0.0.1:11434
    pub ollama_endpoint: Url,
    /// Model tag passed to /api/generate
    pub ollama_model: String,
    /// Per-call timeout for the model proxy
    pub ollama_timeout_secs: u64,
    /// Interval between heartbeat log lines
    pub heartbeat_secs: u64,
    /// `pretty` or `json`
    pub log_format: LogFormat,
    /// Directory for combined.log / error.log; console only when unset
    pub log_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let cfg = config::Config::builder()
            .set_default("bind_address", "0.0.0.0:5001")?
            .set_default("ollama_endpoint", "http://127.0.0.1:11434")?
            .set_default("ollama_model", "llama3:latest")?
            .set_default("ollama_timeout_secs", 60)?
            .set_default("heartbeat_secs", 30)?
            .set_default("log_format", "pretty")?
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;
        let app: Self = cfg.try_deserialize()?;
        app.validate()?;
        Ok(app)
    }

    pub fn validate(&self) -> Result<()> {
        if self.heartbeat_secs == 0 {
            bail!("APP__HEARTBEAT_SECS must be greater than zero");
        }
        if self.ollama_timeout_secs == 0 {
            bail!("APP__OLLAMA_TIMEOUT_SECS must be greater than zero");
        }
        if !matches!(self.ollama_endpoint.scheme(), "http" | "https") {
            bail!(
                "unsupported Ollama endpoint scheme: {}",
                self.ollama_endpoint.scheme()
            );
        }
        Ok(())
    }

    pub fn ollama_timeout(&self) -> Duration {
        Duration::from_secs(self.ollama_timeout_secs)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_secs)
    }
}
