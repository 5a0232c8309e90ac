use anyhow::{Context, Result};
use breathe_backend::config::AppConfig;
use breathe_backend::knowledge;
use breathe_backend::logging;
use breathe_backend::server::create_api_router;
use breathe_backend::state::AppState;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load().context("load configuration from environment")?;
    let log_guards = logging::init_tracing(config.log_format, config.log_dir.as_deref())
        .context("initialize tracing subscriber")?;

    if let Err(err) = run(config).await {
        tracing::error!(error = ?err, "fatal backend error");
        drop(log_guards);
        std::process::exit(1);
    }
    Ok(())
}

async fn run(config: AppConfig) -> Result<()> {
    let state = AppState::from_config(&config).context("initialize application state")?;
    let app = App { config, state };
    app.run().await
}

struct App {
    config: AppConfig,
    state: AppState,
}

impl App {
    async fn run(self) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(self.config.bind_address)
            .await
            .with_context(|| format!("bind API server address {}", self.config.bind_address))?;

        info!(
            address = %self.config.bind_address,
            ollama = %self.state.model.endpoint(),
            model = %self.state.model.model(),
            knowledge_categories = knowledge::Category::ALL.len(),
            "BreatheAI backend online"
        );

        let api_router = create_api_router(self.state.clone());
        let _api_handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, api_router).await {
                warn!(error = %e, "API server error");
            }
        });

        let mut ticker = tokio::time::interval(self.config.heartbeat_interval());
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let metrics = self.state.analytics.snapshot();
                    info!(
                        uptime_ms = metrics.uptime_millis,
                        requests = metrics.requests,
                        errors = metrics.errors,
                        error_rate = metrics.error_rate_percent,
                        avg_response_ms = metrics.avg_response_time_millis,
                        model_calls = metrics.external_calls,
                        model_success_rate = metrics.external_call_success_rate_percent,
                        active_users = metrics.active_users,
                        ollama = %metrics.health_verdict(),
                        "BreatheAI heartbeat"
                    );
                }
                res = tokio::signal::ctrl_c() => {
                    if let Err(err) = res {
                        warn!(error = %err, "ctrl_c listener error");
                    }
                    info!("Shutdown signal received, exiting");
                    break;
                }
            }
        }
        Ok(())
    }
}
