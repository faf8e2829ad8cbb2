//! # Structured Logging Module
//!
//! Environment-aware structured logging for the receiver and the sweep.
//! Components never own a logger: they emit through `tracing`, and whoever
//! hosts them decides where records go (the process subscriber installed
//! here, or a scoped subscriber in tests).

use std::sync::OnceLock;

use chrono::Utc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::{LogFormat, LoggingConfig};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging from configuration
///
/// `RUST_LOG` takes precedence over the configured level. Safe to call more
/// than once; only the first call installs a subscriber, and an already
/// installed global subscriber is left in place.
pub fn init_structured_logging(config: &LoggingConfig) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.level.clone()));

        let layer = match config.format {
            LogFormat::Pretty => fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(true)
                .with_filter(filter)
                .boxed(),
            LogFormat::Json => fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(false)
                .json()
                .with_filter(filter)
                .boxed(),
        };

        if tracing_subscriber::registry().with(layer).try_init().is_err() {
            tracing::debug!("Global tracing subscriber already initialized - keeping it");
        }

        tracing::info!(
            pid = std::process::id(),
            level = %config.level,
            format = ?config.format,
            "Structured logging initialized"
        );
    });
}

/// Get current environment name from environment variables
pub fn get_environment() -> String {
    std::env::var("DISTILL_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

/// Default log level for an environment
pub fn default_log_level(environment: &str) -> &'static str {
    match environment {
        "production" => "info",
        _ => "debug",
    }
}

/// Log structured data for a dispatch decision
pub fn log_dispatch_operation(
    operation: &str,
    routing_key: &str,
    collection: Option<&str>,
    doc_id: Option<&str>,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        routing_key = %routing_key,
        collection = collection,
        doc_id = doc_id,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "DISPATCH_OPERATION"
    );
}

/// Log structured data for monitor state changes
pub fn log_monitor_operation(
    operation: &str,
    monitor: &str,
    from_status: Option<&str>,
    to_status: &str,
    inactive_seconds: Option<i64>,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        monitor = %monitor,
        from_status = from_status,
        to_status = %to_status,
        inactive_seconds = inactive_seconds,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "MONITOR_OPERATION"
    );
}

/// Log structured data for alert creation and suppression
pub fn log_alert_operation(
    operation: &str,
    alarm: &str,
    level: &str,
    distillery: Option<&str>,
    alert_id: Option<&str>,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        alarm = %alarm,
        level = %level,
        distillery = distillery,
        alert_id = alert_id,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "ALERT_OPERATION"
    );
}

/// Log error with full context
pub fn log_error(component: &str, operation: &str, error: &str, context: Option<&str>) {
    tracing::error!(
        component = %component,
        operation = %operation,
        error = %error,
        context = context,
        timestamp = %Utc::now().to_rfc3339(),
        "ERROR"
    );
}
