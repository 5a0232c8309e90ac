// Logging setup
// Console output plus optional JSON file sinks: combined.log receives
// every event, error.log only ERROR events
//
// Numan Thabit 2025 Nov

use crate::config::LogFormat;
use anyhow::{anyhow, Context, Result};
use std::path::Path;
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

pub const COMBINED_LOG: &str = "combined.log";
pub const ERROR_LOG: &str = "error.log";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Flushes the file writers when dropped; hold it for the process lifetime.
pub struct LogGuards {
    _guards: Vec<WorkerGuard>,
}

pub fn init_tracing(format: LogFormat, log_dir: Option<&Path>) -> Result<LogGuards> {
    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "info,hyper=warn,tower_http=warn".to_string());

    let console = tracing_subscriber::fmt::layer().with_target(false);
    let mut layers: Vec<BoxedLayer> = vec![match format {
        LogFormat::Pretty => console.boxed(),
        LogFormat::Json => console.json().boxed(),
    }];

    let mut guards = Vec::new();
    if let Some(dir) = log_dir {
        let (file_layers, file_guards) = file_sinks(dir)?;
        layers.extend(file_layers);
        guards.extend(file_guards);
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(EnvFilter::new(env_filter))
        .try_init()
        .map_err(|err| anyhow!("tracing subscriber init: {err}"))?;
    Ok(LogGuards { _guards: guards })
}

/// JSON file layers writing into `dir`, created if missing
pub fn file_sinks(dir: &Path) -> Result<(Vec<BoxedLayer>, Vec<WorkerGuard>)> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("create log directory {}", dir.display()))?;

    let combined = open_appender(dir, COMBINED_LOG)?;
    let errors = open_appender(dir, ERROR_LOG)?;
    let (combined_writer, combined_guard) = tracing_appender::non_blocking(combined);
    let (error_writer, error_guard) = tracing_appender::non_blocking(errors);

    let layers: Vec<BoxedLayer> = vec![
        tracing_subscriber::fmt::layer()
            .json()
            .with_ansi(false)
            .with_writer(combined_writer)
            .boxed(),
        tracing_subscriber::fmt::layer()
            .json()
            .with_ansi(false)
            .with_writer(error_writer)
            .with_filter(LevelFilter::ERROR)
            .boxed(),
    ];
    Ok((layers, vec![combined_guard, error_guard]))
}

fn open_appender(dir: &Path, file: &str) -> Result<RollingFileAppender> {
    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file)
        .build(dir)
        .with_context(|| format!("open log file {}", dir.join(file).display()))
}
