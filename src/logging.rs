//! # Tracing Module
//!
//! Environment-aware console logging using the tracing ecosystem. The bridge is
//! meant to run in a container, so everything goes to stdout.
//!
//! - `CAMUNDA_BRIDGE_ENV` (fallback `APP_ENV`, default `development`) picks the
//!   default level: `debug` for `test`/`development`, `info` for `production`
//! - `LOG_LEVEL` or `RUST_LOG` overrides the level (full `EnvFilter` syntax)
//! - `CAMUNDA_BRIDGE_LOG_FORMAT=json` switches to one JSON object per line
//! - ANSI colors only when stdout is a terminal

use std::io::IsTerminal;
use std::sync::OnceLock;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static TRACING_INITIALIZED: OnceLock<()> = OnceLock::new();

pub const LOG_FORMAT_ENV: &str = "CAMUNDA_BRIDGE_LOG_FORMAT";

/// Initialize the global subscriber once; later calls are no-ops
pub fn init_tracing() {
    TRACING_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let explicit_level = std::env::var("LOG_LEVEL")
            .or_else(|_| std::env::var("RUST_LOG"))
            .ok();
        let log_level = get_log_level(&environment, explicit_level.as_deref());
        let json = std::env::var(LOG_FORMAT_ENV)
            .map(|format| format.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let use_ansi = IsTerminal::is_terminal(&std::io::stdout());

        let initialized = if json {
            let layer = fmt::layer()
                .json()
                .with_target(true)
                .with_thread_ids(true)
                .with_filter(EnvFilter::new(&log_level));
            tracing_subscriber::registry().with(layer).try_init()
        } else {
            let layer = fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(use_ansi)
                .with_filter(EnvFilter::new(&log_level));
            tracing_subscriber::registry().with(layer).try_init()
        };

        if initialized.is_err() {
            tracing::debug!(
                "Global tracing subscriber already initialized - continuing with existing subscriber"
            );
        } else {
            tracing::info!(
                environment = %environment,
                log_level = %log_level,
                json_format = json,
                ansi_colors = use_ansi,
                "Console logging initialized"
            );
        }
    });
}

/// Get current environment from environment variables
fn get_environment() -> String {
    std::env::var("CAMUNDA_BRIDGE_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

/// Explicit filter wins, otherwise the environment default
fn get_log_level(environment: &str, explicit: Option<&str>) -> String {
    if let Some(level) = explicit {
        return level.to_lowercase();
    }

    match environment {
        "production" => "info".to_string(),
        _ => "debug".to_string(),
    }
}

/// Structured log line for a task lifecycle event
pub fn log_task_operation(
    operation: &str,
    task_id: &str,
    topic: &str,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        task_id = %task_id,
        topic = %topic,
        status = %status,
        details = ?details,
        timestamp = %chrono::Utc::now().to_rfc3339(),
        "{}", operation
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_mapping() {
        assert_eq!(get_log_level("test", None), "debug");
        assert_eq!(get_log_level("development", None), "debug");
        assert_eq!(get_log_level("production", None), "info");
        assert_eq!(get_log_level("staging", None), "debug");
    }

    #[test]
    fn test_explicit_level_overrides_environment() {
        assert_eq!(get_log_level("production", Some("WARN")), "warn");
        assert_eq!(
            get_log_level("development", Some("camunda_bridge=trace")),
            "camunda_bridge=trace"
        );
    }

    #[test]
    fn test_init_tracing_is_idempotent() {
        init_tracing();
        init_tracing();
        log_task_operation("dispatch", "task-1", "send_invoice", "routed", None);
    }
}
