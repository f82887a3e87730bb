//! # Structured Logging Module
//!
//! Environment-aware structured console logging for dispatch, resolution and
//! notification fan-out. The crate itself only emits `tracing` events; installing a
//! subscriber is left to the application, and [`init_structured_logging`] is a
//! ready-made one.

use chrono::Utc;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Environment variable selecting JSON output when set to `json`
pub const LOG_FORMAT_ENV: &str = "MEDIATOR_LOG_FORMAT";

/// Initialize structured logging with environment-specific configuration.
///
/// Safe to call more than once, and a no-op if another global subscriber is
/// already installed. `RUST_LOG` takes precedence over the environment default.
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let log_level = get_log_level(&environment);
        let json = use_json_format(std::env::var(LOG_FORMAT_ENV).ok().as_deref());

        let filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

        let subscriber = tracing_subscriber::registry()
            .with(json.then(|| {
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_level(true)
                    .with_ansi(false)
                    .json()
                    .with_filter(filter())
            }))
            .with((!json).then(|| {
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_level(true)
                    .with_ansi(true)
                    .with_filter(filter())
            }));

        if subscriber.try_init().is_err() {
            tracing::debug!(
                "Global tracing subscriber already initialized - continuing with existing subscriber"
            );
            return;
        }

        tracing::info!(
            environment = %environment,
            json = json,
            "Structured logging initialized"
        );
    });
}

fn get_environment() -> String {
    std::env::var("MEDIATOR_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

fn get_log_level(environment: &str) -> &'static str {
    match environment {
        "production" => "info",
        _ => "debug",
    }
}

fn use_json_format(format: Option<&str>) -> bool {
    format.is_some_and(|value| value.eq_ignore_ascii_case("json"))
}

/// Log structured data for a dispatch operation
pub fn log_dispatch_operation(
    operation: &str,
    message_type: &str,
    status: &str,
    handlers: Option<usize>,
    details: Option<&str>,
) {
    tracing::debug!(
        operation = %operation,
        message_type = %message_type,
        status = %status,
        handlers = handlers,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "DISPATCH_OPERATION"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn test_log_level_mapping() {
        assert_eq!(get_log_level("test"), "debug");
        assert_eq!(get_log_level("development"), "debug");
        assert_eq!(get_log_level("production"), "info");
        assert_eq!(get_log_level("unknown"), "debug");
    }

    #[test]
    fn test_json_format_detection() {
        assert!(use_json_format(Some("json")));
        assert!(use_json_format(Some("JSON")));
        assert!(!use_json_format(Some("pretty")));
        assert!(!use_json_format(None));
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_dispatch_operation_fields() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            log_dispatch_operation("publish", "Pinged", "failed", Some(2), Some("boom"));
        });

        let output = String::from_utf8(captured.0.lock().clone()).unwrap();
        assert!(output.contains("DISPATCH_OPERATION"));
        assert!(output.contains("operation=publish"));
        assert!(output.contains("message_type=Pinged"));
        assert!(output.contains("handlers=2"));
    }
}
