// ABOUTME: Tracing subscriber setup: env filter, pretty or JSON stdout, optional daily log file.
// ABOUTME: The returned guard must live as long as the process so file output is flushed.

use anyhow::{Context, Result};
use std::path::Path;
use threadline_core::config::{LogFormat, LoggingConfig};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

pub const LOG_FILE_PREFIX: &str = "threadline.log";
const DEFAULT_FILTER: &str = "info";

fn build_env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber
pub fn init_tracing(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

    match config.format {
        LogFormat::Pretty => layers.push(tracing_subscriber::fmt::layer().boxed()),
        LogFormat::Json => layers.push(tracing_subscriber::fmt::layer().json().boxed()),
    }

    let guard = match config.dir.as_deref() {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir))?;
            let file_appender = tracing_appender::rolling::daily(Path::new(dir), LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(file_appender);
            layers.push(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(writer)
                    .boxed(),
            );
            Some(guard)
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(layers)
        .with(build_env_filter())
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}
