//! Logging configuration and setup
//!
//! This module provides logging initialization and structured logging utilities
//! for the admission engine.

use tracing::{debug, error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use crate::config::LoggingConfig;
use crate::utils::errors::{AdmissionError, EngineError, Result};

/// Initialize logging based on configuration
///
/// The returned guard flushes the file writer on drop and must be kept alive
/// for as long as the process logs.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = tracing_subscriber::EnvFilter::try_new(&config.level)
        .map_err(|e| EngineError::Config(format!("Invalid log filter: {}", e)))?;

    let stdout_layer = if config.json {
        tracing_subscriber::fmt::layer().json().with_writer(std::io::stdout).boxed()
    } else {
        tracing_subscriber::fmt::layer().with_writer(std::io::stdout).boxed()
    };

    let (file_layer, guard) = match &config.directory {
        Some(directory) => {
            let file_appender = tracing_appender::rolling::daily(directory, &config.file_prefix);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(non_blocking)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| EngineError::Config(format!("Logging already initialized: {}", e)))?;

    info!("Logging initialized with level: {}", config.level);
    Ok(guard)
}

/// Log the outcome of an admission-affecting operation
pub fn log_admission_decision(event_id: i64, user_id: i64, action: &str, outcome: &str) {
    info!(
        event_id = event_id,
        user_id = user_id,
        action = action,
        outcome = outcome,
        "Admission decision"
    );
}

/// Log a rejected operation; transient failures are raised to warn
pub fn log_admission_rejection(event_id: i64, user_id: Option<i64>, action: &str, err: &AdmissionError) {
    if err.is_retryable() {
        warn!(
            event_id = event_id,
            user_id = user_id,
            action = action,
            error = %err,
            "Admission operation failed"
        );
    } else {
        debug!(
            event_id = event_id,
            user_id = user_id,
            action = action,
            code = err.code(),
            "Admission operation rejected"
        );
    }
}

/// Log check-in token lifecycle actions
pub fn log_token_action(event_id: i64, action: &str, details: Option<&str>) {
    info!(
        event_id = event_id,
        action = action,
        details = details,
        "Check-in token action performed"
    );
}

/// Log store operations
pub fn log_store_operation(operation: &str, event_id: i64, duration_ms: u64, success: bool) {
    if success {
        debug!(
            operation = operation,
            event_id = event_id,
            duration_ms = duration_ms,
            "Store operation completed"
        );
    } else {
        error!(
            operation = operation,
            event_id = event_id,
            duration_ms = duration_ms,
            "Store operation failed"
        );
    }
}
