//! CLI argument parsing for rMQTT-Values
//!
//! This module provides the command-line interface using clap derive macros.
//!
//! # Options
//!
//! - `--config` / `-c`: Configuration file path (default: config.yaml, env: RMQTT_CONFIG)
//! - `--validate`: Validate configuration and exit
//! - `--dry-run`: Show the metrics built from the configuration
//! - `--handler`: Only run metrics of this handler (env: RMQTT_HANDLER)
//! - `--topic`: Topic of a message to run through the metrics
//! - `--value`: Payload value of that message
//! - `--value-type`: Declared type of the value
//! - `--timestamp`: Message timestamp in milliseconds (default: now)
//! - `--log-level` / `-l`: Log level (trace/debug/info/warn/error, env: RMQTT_LOG_LEVEL)
//! - `--log-format`: Log output format (text/json, env: RMQTT_LOG_FORMAT)
//! - `--output-format`: Output format for results (text/json/yaml)
//!
//! # Precedence
//!
//! Values are resolved in the following order (highest to lowest priority):
//! 1. CLI arguments
//! 2. Environment variables
//! 3. Default values

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::transformer::{RecordFormat, ValueType};

/// rMQTT-Values - MQTT telemetry label and value transformer
///
/// Builds metrics from a values configuration and runs MQTT messages
/// through them, printing the resulting labelled records.
#[derive(Parser, Debug)]
#[command(name = "rmqtt-values")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = "config.yaml",
        env = "RMQTT_CONFIG"
    )]
    pub config: PathBuf,

    /// Validate configuration and exit
    #[arg(long)]
    pub validate: bool,

    /// Show the metrics built from the configuration
    #[arg(long)]
    pub dry_run: bool,

    /// Only run metrics configured for this handler
    #[arg(long, value_name = "ID", env = "RMQTT_HANDLER")]
    pub handler: Option<String>,

    /// Topic of a message to transform
    #[arg(long, value_name = "TOPIC", requires = "value")]
    pub topic: Option<String>,

    /// Payload value of the message
    #[arg(long, value_name = "VALUE", requires = "topic")]
    pub value: Option<String>,

    /// Declared type of the value
    #[arg(long, value_enum, default_value = "unknown")]
    pub value_type: ValueTypeArg,

    /// Message timestamp in milliseconds since the Unix epoch
    #[arg(long, value_name = "MS")]
    pub timestamp: Option<i64>,

    /// Log level
    #[arg(
        short,
        long,
        value_enum,
        default_value = "info",
        env = "RMQTT_LOG_LEVEL"
    )]
    pub log_level: LogLevel,

    /// Log output format
    #[arg(long, value_enum, default_value = "text", env = "RMQTT_LOG_FORMAT")]
    pub log_format: LogFormat,

    /// Output format for results
    #[arg(long, value_enum, default_value = "text")]
    pub output_format: OutputFormat,
}

/// Log level options
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// Trace level - most verbose
    Trace,
    /// Debug level
    Debug,
    /// Info level - default
    Info,
    /// Warn level
    Warn,
    /// Error level - least verbose
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Log output format
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per line
    Json,
}

/// Output format options for results
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output
    Json,
    /// YAML output
    Yaml,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Yaml => write!(f, "yaml"),
        }
    }
}

impl From<OutputFormat> for RecordFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Text => RecordFormat::Text,
            OutputFormat::Json => RecordFormat::Json,
            OutputFormat::Yaml => RecordFormat::Yaml,
        }
    }
}

/// Value type options
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ValueTypeArg {
    Unknown,
    Numeric,
    Integer,
    Float,
    Bool,
    String,
}

impl From<ValueTypeArg> for ValueType {
    fn from(value_type: ValueTypeArg) -> Self {
        match value_type {
            ValueTypeArg::Unknown => ValueType::Unknown,
            ValueTypeArg::Numeric => ValueType::Numeric,
            ValueTypeArg::Integer => ValueType::Integer,
            ValueTypeArg::Float => ValueType::Float,
            ValueTypeArg::Bool => ValueType::Bool,
            ValueTypeArg::String => ValueType::String,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_display() {
        assert_eq!(LogLevel::Trace.to_string(), "trace");
        assert_eq!(LogLevel::Info.to_string(), "info");
        assert_eq!(LogLevel::Error.to_string(), "error");
    }

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(tracing::Level::from(LogLevel::Trace), tracing::Level::TRACE);
        assert_eq!(tracing::Level::from(LogLevel::Debug), tracing::Level::DEBUG);
        assert_eq!(tracing::Level::from(LogLevel::Warn), tracing::Level::WARN);
    }

    #[test]
    fn test_output_format_conversion() {
        assert_eq!(OutputFormat::Yaml.to_string(), "yaml");
        assert_eq!(RecordFormat::from(OutputFormat::Text), RecordFormat::Text);
        assert_eq!(RecordFormat::from(OutputFormat::Json), RecordFormat::Json);
    }

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::parse_from(["rmqtt-values"]);
        assert_eq!(cli.config, PathBuf::from("config.yaml"));
        assert!(!cli.validate);
        assert!(!cli.dry_run);
        assert_eq!(cli.topic, None);
        assert_eq!(cli.value, None);
        assert_eq!(cli.timestamp, None);
        assert_eq!(cli.value_type, ValueTypeArg::Unknown);
        assert_eq!(cli.log_level, LogLevel::Info);
        assert_eq!(cli.log_format, LogFormat::Text);
        assert_eq!(cli.output_format, OutputFormat::Text);
    }

    #[test]
    fn test_cli_event_options() {
        let cli = Cli::parse_from([
            "rmqtt-values",
            "-c",
            "values.yaml",
            "--topic",
            "sensors/kitchen",
            "--value",
            "23.5",
            "--value-type",
            "float",
            "--timestamp",
            "1700000000000",
            "--handler",
            "sensors",
        ]);
        assert_eq!(cli.config, PathBuf::from("values.yaml"));
        assert_eq!(cli.topic.as_deref(), Some("sensors/kitchen"));
        assert_eq!(cli.value.as_deref(), Some("23.5"));
        assert_eq!(ValueType::from(cli.value_type), ValueType::Float);
        assert_eq!(cli.timestamp, Some(1_700_000_000_000));
        assert_eq!(cli.handler.as_deref(), Some("sensors"));
    }

    #[test]
    fn test_cli_topic_requires_value() {
        let result = Cli::try_parse_from(["rmqtt-values", "--topic", "a/b"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_dry_run() {
        let cli = Cli::parse_from(["rmqtt-values", "--dry-run", "--output-format", "json"]);
        assert!(cli.dry_run);
        assert_eq!(cli.output_format, OutputFormat::Json);
    }

    #[test]
    fn test_cli_log_format() {
        let cli = Cli::parse_from(["rmqtt-values", "--log-format", "json", "-l", "debug"]);
        assert_eq!(cli.log_format, LogFormat::Json);
        assert_eq!(cli.log_level, LogLevel::Debug);
    }
}
