//! rMQTT-Values - MQTT telemetry label and value transformer
//!
//! This binary validates a values configuration, shows the metrics built
//! from it, and runs single messages through them.

use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;
use clap::Parser;
use serde::Serialize;
use tracing::info;

use rmqtt_values::cli::{Cli, LogFormat, OutputFormat};
use rmqtt_values::config::{configure_values, Config};
use rmqtt_values::error::{AppError, AppResult};
use rmqtt_values::topics::TopicLevels;
use rmqtt_values::transformer::{
    LabelAction, Metric, MetricDataVector, MetricsMap, RecordFormatter, Timestamp,
};

fn main() -> Result<()> {
    let cli = Cli::parse();

    rmqtt_values::init_logging(&cli.log_level.to_string(), cli.log_format == LogFormat::Json)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        "Starting rMQTT-Values"
    );

    if cli.validate {
        let config = Config::load(&cli.config).map_err(AppError::from)?;
        let metrics = config.validate().map_err(AppError::from)?;
        print!("{}", render_validation(&metrics, cli.output_format)?);
        return Ok(());
    }

    let config = Config::load_or_default(&cli.config).map_err(AppError::from)?;
    let mut metrics = configure_values(&config);

    if cli.dry_run {
        print!("{}", render_dry_run(&metrics, cli.output_format)?);
        return Ok(());
    }

    match (&cli.topic, &cli.value) {
        (Some(topic), Some(value)) => {
            let timestamp = cli.timestamp.unwrap_or_else(now_millis);
            let out = run_event(
                &mut metrics,
                cli.handler.as_deref(),
                topic,
                value,
                timestamp,
                &cli,
            )?;
            let formatter = RecordFormatter::new().with_timestamps(cli.timestamp.is_some());
            print!("{}", formatter.format(out.as_slice(), cli.output_format.into())?);
        }
        _ => {
            info!("No message given; pass --topic and --value to transform one");
        }
    }

    Ok(())
}

/// Run one message through every selected metric
fn run_event(
    metrics: &mut MetricsMap,
    handler: Option<&str>,
    topic: &str,
    value: &str,
    timestamp: Timestamp,
    cli: &Cli,
) -> AppResult<MetricDataVector> {
    let levels = TopicLevels::new(topic);
    let mut out = MetricDataVector::new();

    let mut run = |metrics: &mut Vec<Metric>| {
        for metric in metrics.iter_mut() {
            metric.event(value, topic, &levels, timestamp, cli.value_type.into(), &mut out);
        }
    };

    match handler {
        Some(handler) => {
            let handler_metrics = metrics
                .get_mut(handler)
                .ok_or_else(|| AppError::UnknownHandler(handler.to_string()))?;
            run(handler_metrics);
        }
        None => metrics.values_mut().for_each(run),
    }

    info!(topic = %topic, records = out.len(), "Transformed message");
    Ok(out)
}

fn now_millis() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis() as Timestamp)
}

#[derive(Serialize)]
struct ValidationSummary {
    valid: bool,
    handlers: usize,
    metrics: usize,
}

#[derive(Serialize)]
struct MetricSummary<'a> {
    handler: &'a str,
    name: &'a str,
    property: &'a str,
    property_actions: Vec<String>,
    label_actions: Vec<String>,
    value_actions: Vec<&'static str>,
}

fn render_validation(metrics: &MetricsMap, format: OutputFormat) -> AppResult<String> {
    let summary = ValidationSummary {
        valid: true,
        handlers: metrics.len(),
        metrics: metrics.values().map(Vec::len).sum(),
    };

    Ok(match format {
        OutputFormat::Text => format!(
            "Configuration is valid\n  handlers: {}\n  metrics: {}\n",
            summary.handlers, summary.metrics
        ),
        OutputFormat::Json => serde_json::to_string_pretty(&summary)? + "\n",
        OutputFormat::Yaml => serde_yaml::to_string(&summary)?,
    })
}

fn describe_label_action(action: &LabelAction) -> String {
    format!("{}({})", action.name(), action.target())
}

fn render_dry_run(metrics: &MetricsMap, format: OutputFormat) -> AppResult<String> {
    let summaries: Vec<MetricSummary<'_>> = metrics
        .iter()
        .flat_map(|(handler, handler_metrics)| {
            handler_metrics.iter().map(move |metric| MetricSummary {
                handler,
                name: metric.id().name(),
                property: metric.property(),
                property_actions: metric
                    .property_actions()
                    .iter()
                    .map(describe_label_action)
                    .collect(),
                label_actions: metric
                    .label_actions()
                    .iter()
                    .map(describe_label_action)
                    .collect(),
                value_actions: metric.value_actions().iter().map(|a| a.name()).collect(),
            })
        })
        .collect();

    Ok(match format {
        OutputFormat::Text => {
            let mut output = String::new();
            let mut current_handler = None;
            for summary in &summaries {
                if current_handler != Some(summary.handler) {
                    output.push_str(&format!("handler {}\n", summary.handler));
                    current_handler = Some(summary.handler);
                }
                output.push_str(&format!(
                    "  {} (property: {})\n",
                    summary.name, summary.property
                ));
                for (label, actions) in [
                    ("property actions", summary.property_actions.join(", ")),
                    ("label actions", summary.label_actions.join(", ")),
                    ("value actions", summary.value_actions.join(", ")),
                ] {
                    if !actions.is_empty() {
                        output.push_str(&format!("    {}: {}\n", label, actions));
                    }
                }
            }
            output
        }
        OutputFormat::Json => serde_json::to_string_pretty(&summaries)? + "\n",
        OutputFormat::Yaml => serde_yaml::to_string(&summaries)?,
    })
}
