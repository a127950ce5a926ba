//! Tracing subscriber setup
//!
//! `RUST_LOG` overrides the configured level when set. JSON output carries
//! span context so playlist and resolver events can be grouped by room.

use std::fs::{File, OpenOptions};
use std::sync::Arc;

use anyhow::Context;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

use crate::config::LoggingConfig;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let level = parse_log_level(&config.level)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    let file = config
        .file_path
        .as_deref()
        .map(open_log_file)
        .transpose()?;
    let layer = output_layer(&config.format, file)?;

    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .try_init()
        .context("logging already initialized")?;
    Ok(())
}

fn output_layer(format: &str, file: Option<File>) -> anyhow::Result<BoxedLayer> {
    let layer: BoxedLayer = match (format, file) {
        ("json", Some(file)) => json_layer().with_writer(Arc::new(file)).boxed(),
        ("json", None) => json_layer().boxed(),
        ("pretty", Some(file)) => fmt::layer()
            .with_ansi(false)
            .with_target(true)
            .with_writer(Arc::new(file))
            .boxed(),
        ("pretty", None) => fmt::layer()
            .pretty()
            .with_target(true)
            .with_line_number(true)
            .with_file(false)
            .boxed(),
        (other, _) => anyhow::bail!("unknown log format: {other}"),
    };
    Ok(layer)
}

fn json_layer<S>() -> fmt::Layer<S, fmt::format::JsonFields, fmt::format::Format<fmt::format::Json>> {
    fmt::layer()
        .json()
        .with_span_events(FmtSpan::CLOSE)
        .with_current_span(true)
        .with_span_list(true)
        .with_target(true)
        .with_line_number(true)
}

fn open_log_file(path: &str) -> anyhow::Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {path}"))
}

fn parse_log_level(level: &str) -> anyhow::Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" | "warning" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => Err(anyhow::anyhow!("Invalid log level: {level}")),
    }
}
