//! Logging and observability
//!
//! This module provides structured logging via tracing-subscriber. It supports
//! both text-based logging and JSON formatting, controlled at runtime via
//! environment variables and CLI flags.
//!
//! All logging output is directed to stderr so that job-runner workflow
//! commands written to stdout stay parseable.

use anyhow::Result;
use std::{io, sync::Once};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

/// Initialize the logging system with optional format specification
///
/// Subsequent calls are no-ops.
///
/// ## Arguments
///
/// * `format` - `None` or `"text"` for human-readable output, `"json"` for structured output
///
/// ## Environment Variables
///
/// * `RIGGER_LOG_FORMAT` - Controls the log output format when `format` is `None`
/// * `RIGGER_LOG` - Controls the logging filter level
/// * `RUST_LOG` - Standard Rust logging environment variable (used as fallback)
///
/// ## Example
///
/// ```rust
/// use rigger_core::logging;
///
/// logging::init(None).expect("Failed to initialize logging");
/// // A second call is a no-op
/// logging::init(Some("json")).expect("Failed to initialize logging");
/// ```
pub fn init(format: Option<&str>) -> Result<()> {
    INIT.call_once(|| {
        let filter = create_env_filter();

        let env_format = std::env::var("RIGGER_LOG_FORMAT").ok();
        let effective_format = format.or(env_format.as_deref()).unwrap_or("text");

        match effective_format {
            "json" => {
                tracing_subscriber::registry()
                    .with(
                        fmt::layer()
                            .json()
                            .with_target(true)
                            .with_span_events(fmt::format::FmtSpan::NEW | fmt::format::FmtSpan::CLOSE)
                            .with_writer(io::stderr),
                    )
                    .with(filter)
                    .init();
            }
            _ => {
                tracing_subscriber::registry()
                    .with(fmt::layer().with_target(false).with_writer(io::stderr))
                    .with(filter)
                    .init();
            }
        }

        tracing::debug!("Logging initialized with format: {}", effective_format);
    });

    Ok(())
}

/// Create an EnvFilter based on environment variables
fn create_env_filter() -> EnvFilter {
    if let Ok(spec) = std::env::var("RIGGER_LOG") {
        EnvFilter::try_new(&spec).unwrap_or_else(|_| {
            tracing::warn!(
                "Invalid RIGGER_LOG specification '{}', using default 'info'",
                spec
            );
            EnvFilter::new("info")
        })
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// Check if logging has been initialized
pub fn is_initialized() -> bool {
    INIT.is_completed()
}
