//! Published record output
//!
//! Renders [`MetricData`] records for display. The text form follows the
//! Prometheus exposition line layout:
//!
//! ```text
//! <metric_name>{<label1>="<value1>",<label2>="<value2>"} <value> [<timestamp>]
//! ```
//!
//! JSON and YAML forms serialize the records directly.

use std::collections::HashMap;

use serde::Serialize;

use super::data::{MetricData, Timestamp, ValueType};
use super::labels::Labels;
use crate::error::AppResult;

/// Output encoding for published records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RecordFormat {
    #[default]
    Text,
    Json,
    Yaml,
}

/// Formatter for published records
///
/// # Example
///
/// ```ignore
/// use rmqtt_values::transformer::{RecordFormat, RecordFormatter};
///
/// let formatter = RecordFormatter::new().with_timestamps(true);
/// let output = formatter.format(out.as_slice(), RecordFormat::Text)?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct RecordFormatter {
    include_timestamp: bool,
}

/// Serialized view of a record
#[derive(Serialize)]
struct RecordView<'a> {
    name: &'a str,
    location: &'a str,
    labels: &'a Labels,
    value: &'a str,
    value_type: ValueType,
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<Timestamp>,
}

impl RecordFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether to include timestamps in output
    pub fn with_timestamps(mut self, include: bool) -> Self {
        self.include_timestamp = include;
        self
    }

    /// Render records in the requested encoding
    pub fn format(&self, records: &[MetricData], format: RecordFormat) -> AppResult<String> {
        match format {
            RecordFormat::Text => Ok(self.format_text(records)),
            RecordFormat::Json => Ok(serde_json::to_string_pretty(&self.views(records))?),
            RecordFormat::Yaml => Ok(serde_yaml::to_string(&self.views(records))?),
        }
    }

    /// Render records as exposition lines
    ///
    /// Records sharing a name are grouped together, in order of first
    /// occurrence. Labels come out in name order.
    pub fn format_text(&self, records: &[MetricData]) -> String {
        if records.is_empty() {
            return String::new();
        }

        let mut output = String::with_capacity(records.len() * 100);
        for (_, group) in Self::group_by_name(records) {
            for record in group {
                self.write_record_line(record, &mut output);
                output.push('\n');
            }
        }

        output
    }

    fn views<'a>(&self, records: &'a [MetricData]) -> Vec<RecordView<'a>> {
        records
            .iter()
            .map(|record| RecordView {
                name: record.id().name(),
                location: record.id().location(),
                labels: record.labels(),
                value: record.value(),
                value_type: record.value_type(),
                timestamp: self.include_timestamp.then(|| record.timestamp()),
            })
            .collect()
    }

    fn group_by_name(records: &[MetricData]) -> Vec<(&str, Vec<&MetricData>)> {
        let mut groups: HashMap<&str, Vec<&MetricData>> = HashMap::new();
        let mut order: Vec<&str> = Vec::new();

        for record in records {
            let name = record.id().name();
            if !groups.contains_key(name) {
                order.push(name);
            }
            groups.entry(name).or_default().push(record);
        }

        order
            .into_iter()
            .filter_map(|name| groups.remove(name).map(|g| (name, g)))
            .collect()
    }

    fn write_record_line(&self, record: &MetricData, line: &mut String) {
        line.push_str(record.id().name());

        if !record.labels().is_empty() {
            let label_pairs: Vec<String> = record
                .labels()
                .iter()
                .map(|(k, v)| format!("{}=\"{}\"", k, Self::escape_label_value(v)))
                .collect();

            line.push('{');
            line.push_str(&label_pairs.join(","));
            line.push('}');
        }

        line.push(' ');
        line.push_str(&Self::format_value(record.value()));

        if self.include_timestamp {
            line.push(' ');
            line.push_str(&record.timestamp().to_string());
        }
    }

    /// Format a value for display
    ///
    /// Numeric text is normalised the way Prometheus writes samples; any
    /// other text is passed through, with an empty value shown as `NaN`.
    fn format_value(value: &str) -> String {
        let Ok(number) = value.trim().parse::<f64>() else {
            return if value.is_empty() {
                "NaN".to_string()
            } else {
                value.to_string()
            };
        };

        if number.is_nan() {
            "NaN".to_string()
        } else if number.is_infinite() {
            if number.is_sign_positive() {
                "+Inf".to_string()
            } else {
                "-Inf".to_string()
            }
        } else if number.fract() == 0.0 && number.abs() < 1e15 {
            format!("{}", number as i64)
        } else {
            format!("{}", number)
        }
    }

    /// Escape backslash, double-quote and newline characters
    fn escape_label_value(value: &str) -> String {
        let mut escaped = String::with_capacity(value.len());
        for c in value.chars() {
            match c {
                '\\' => escaped.push_str("\\\\"),
                '"' => escaped.push_str("\\\""),
                '\n' => escaped.push_str("\\n"),
                _ => escaped.push(c),
            }
        }
        escaped
    }
}
