//! rMQTT-Values library
//!
//! This crate provides the label and value transformation core of an
//! MQTT telemetry to metrics bridge: every inbound message (topic and
//! payload value) is turned into a metric record with a location and a set
//! of labels by running configured actions.

pub mod cli;
pub mod config;
pub mod error;
pub mod topics;
pub mod transformer;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the logging subsystem
///
/// Logs are written to stderr so command output on stdout stays clean.
///
/// # Arguments
/// * `level` - Log level string (trace, debug, info, warn, error)
/// * `json` - Emit one JSON object per log line
///
/// # Errors
/// Returns an error if the logging system fails to initialize
pub fn init_logging(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let registry = tracing_subscriber::registry().with(filter);
    let result = if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };

    result.map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}
