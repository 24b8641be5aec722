//! Structured logging for comparison runs
//!
//! Spans per pipeline stage, stage timing metrics, and a per-thread
//! correlation id that ties every event of one run together.

pub mod config;
pub mod metrics;
pub mod spans;

use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};
use uuid::Uuid;

pub use config::LoggingConfig;
pub use metrics::{MetricsCollector, PerformanceMeasurement, PerformanceStats, Timer};
pub use spans::{BatchSpan, PipelineSpan};

thread_local! {
    static CORRELATION_ID: std::cell::RefCell<Option<Uuid>> = const { std::cell::RefCell::new(None) };
}

/// `EnvFilter` directives for the configured component levels
pub fn filter_directives(config: &LoggingConfig) -> String {
    let krate = env!("CARGO_PKG_NAME").replace('-', "_");
    format!(
        "{krate}={},{krate}::pipeline={},{krate}::algorithms={},{krate}::data={}",
        config.global_level,
        config.get_component_level("pipeline"),
        config.get_component_level("algorithms"),
        config.get_component_level("io"),
    )
}

/// Initialize the logging system with the provided configuration.
///
/// `RUST_LOG` takes precedence over the configured levels. Console output
/// goes to stderr. When file logging is enabled the returned guard must be
/// kept alive for buffered lines to be flushed.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    config.validate().map_err(anyhow::Error::msg)?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(config)));

    let mut layers = Vec::new();
    let mut guard = None;

    if config.console_output {
        let console_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(true)
            .with_line_number(config.include_file_location)
            .with_file(config.include_file_location);
        if config.json_console {
            layers.push(console_layer.json().boxed());
        } else {
            layers.push(console_layer.boxed());
        }
    }

    if let Some(ref log_dir) = config.log_directory {
        let file_appender = tracing_appender::rolling::daily(log_dir, "volume-compare.log");
        let (non_blocking, worker_guard) = tracing_appender::non_blocking(file_appender);
        guard = Some(worker_guard);

        let file_layer = fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .json();
        layers.push(file_layer.boxed());
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {}", e))?;

    tracing::debug!(config = ?config, "Logging system initialized");
    Ok(guard)
}

/// Set a correlation ID for the current thread
pub fn set_correlation_id(id: Uuid) {
    CORRELATION_ID.with(|correlation_id| {
        *correlation_id.borrow_mut() = Some(id);
    });
}

/// Get the current correlation ID for this thread
pub fn get_correlation_id() -> Option<Uuid> {
    CORRELATION_ID.with(|correlation_id| *correlation_id.borrow())
}

/// Generate a new correlation ID and set it for the current thread
pub fn new_correlation_id() -> Uuid {
    let id = Uuid::new_v4();
    set_correlation_id(id);
    id
}

/// Clear the correlation ID for the current thread
pub fn clear_correlation_id() {
    CORRELATION_ID.with(|correlation_id| {
        *correlation_id.borrow_mut() = None;
    });
}
