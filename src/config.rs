//! Configuration management for rMQTT-Values
//!
//! Handles loading the YAML configuration and building the configured
//! metrics from it.
//!
//! Action entries are read permissively: every field is optional and any
//! YAML scalar is accepted as a string. An entry that cannot produce a
//! working action is skipped with a warning instead of failing the load.
//!
//! # Example
//!
//! ```ignore
//! use rmqtt_values::config::{configure_values, Config};
//!
//! let config = Config::load("config.yaml")?;
//! let metrics = configure_values(&config);
//! ```

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::Value;
use thiserror::Error;

use crate::topics::{topic_validate, TopicType, MULTI_LEVEL_WILDCARD};
use crate::transformer::{
    compile_format, LabelAction, LabelActionType, LabelActions, Metric, MetricId, MetricsMap,
    ReplacementTopics, ReplacementTopicsConfig, ValueAction, ValueActionType, ValueActions,
    LABEL_LOCATION,
};

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Error reading the configuration file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Error parsing the configuration file
    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// Configuration validation error
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Configured values
    #[serde(default)]
    pub values: Vec<ValueConfig>,
}

/// One value and the handlers publishing it
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValueConfig {
    /// Metric name
    #[serde(default, deserialize_with = "scalar")]
    pub value: Option<String>,

    #[serde(default)]
    pub handlers: Vec<HandlerConfig>,
}

/// How one handler turns a property into the value's metric
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HandlerConfig {
    #[serde(default, deserialize_with = "scalar")]
    pub handler_id: Option<String>,

    /// Property the metric is read from
    #[serde(default, deserialize_with = "scalar")]
    pub property: Option<String>,

    /// Location format: a scalar or a list of replace entries
    #[serde(default)]
    pub location: Option<Value>,

    #[serde(default)]
    pub label_actions: Vec<ActionConfig>,

    #[serde(default)]
    pub value_actions: Vec<ActionConfig>,
}

/// A label or value action entry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionConfig {
    #[serde(default, deserialize_with = "scalar")]
    pub action: Option<String>,

    #[serde(default, deserialize_with = "scalar")]
    pub source: Option<String>,

    #[serde(default, deserialize_with = "scalar")]
    pub target: Option<String>,

    /// `replace-path` entries
    #[serde(default)]
    pub replace: Option<Value>,

    /// `switch` fallback value
    #[serde(default, deserialize_with = "scalar")]
    pub default: Option<String>,

    /// `switch` input to output table
    #[serde(default)]
    pub mappings: Option<Value>,
}

impl ActionConfig {
    /// Action name, trimmed and lower-cased
    pub fn action_name(&self) -> String {
        trimmed(&self.action).to_lowercase()
    }
}

/// Accept any YAML scalar as a string; anything else reads as absent
fn scalar<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(scalar_to_string(&value))
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Tagged(tagged) => scalar_to_string(&tagged.value),
        Value::Null | Value::Sequence(_) | Value::Mapping(_) => None,
    }
}

fn trimmed(value: &Option<String>) -> &str {
    value.as_deref().map(str::trim).unwrap_or("")
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed
    ///
    /// # Note
    /// - If the file doesn't exist, returns `ConfigError::ReadError`
    /// - Use `Config::load_or_default()` if you want fallback to defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&contents)
    }

    /// Load configuration from a YAML file, falling back to defaults if not found
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::warn!(
                path = %path.display(),
                "Config file not found, using defaults"
            );
            return Ok(Self::default());
        }

        Self::load(path)
    }

    /// Parse configuration from YAML text
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        // An empty document is an empty configuration
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Build the metrics and fail if none could be configured
    pub fn validate(&self) -> Result<MetricsMap, ConfigError> {
        let metrics = configure_values(self);
        if metrics.is_empty() {
            return Err(ConfigError::ValidationError(
                "No metrics configured".to_string(),
            ));
        }
        Ok(metrics)
    }
}

// =============================================================================
// Metric construction
// =============================================================================

/// Build every configured metric, keyed by handler id
///
/// A handler id appearing twice under one value is configured once.
/// Handlers without a property are skipped.
pub fn configure_values(config: &Config) -> MetricsMap {
    let mut metrics = MetricsMap::new();

    for value_config in &config.values {
        let value_id = trimmed(&value_config.value);
        tracing::info!(value = %value_id, "Configuring value");

        let mut handlers: HashSet<&str> = HashSet::with_capacity(value_config.handlers.len());

        for handler in &value_config.handlers {
            let handler_id = trimmed(&handler.handler_id);
            tracing::info!(handler = %handler_id, "Configuring handler");

            if !handlers.insert(handler_id) {
                tracing::warn!(
                    value = %value_id,
                    handler = %handler_id,
                    "Duplicate handler ignored"
                );
                continue;
            }

            let property = match handler.property.as_deref() {
                Some(property) if !property.is_empty() => property,
                _ => {
                    tracing::warn!(
                        value = %value_id,
                        handler = %handler_id,
                        "Handler has no 'property' setting"
                    );
                    continue;
                }
            };

            let metric = Metric::new(
                MetricId::new(value_id, ""),
                property,
                configure_label_actions(&handler.label_actions),
                configure_value_actions(&handler.value_actions),
                configure_property_actions(handler),
            );

            tracing::info!(
                metric = %metric.id().name(),
                handler = %handler_id,
                property = %metric.property(),
                "Added metric"
            );

            metrics
                .entry(handler_id.to_string())
                .or_default()
                .push(metric);
        }
    }

    metrics
}

/// Build label actions in configuration order
pub fn configure_label_actions(configs: &[ActionConfig]) -> LabelActions {
    let mut label_actions = LabelActions::with_capacity(configs.len());

    for config in configs {
        let action_name = config.action_name();
        tracing::info!(action = %action_name, "Configuring label action");

        let target = trimmed(&config.target);
        let action = match LabelActionType::from_name(&action_name) {
            Some(LabelActionType::Copy) => LabelAction::copy(trimmed(&config.source), target),
            Some(LabelActionType::Drop) => LabelAction::drop(target),
            Some(LabelActionType::Keep) => LabelAction::keep(target),
            Some(LabelActionType::ReplacePath) => {
                let topics = config
                    .replace
                    .as_ref()
                    .map(configure_replace_path)
                    .unwrap_or_default();
                LabelAction::replace_path(target, topics)
            }
            None => {
                tracing::warn!(action = %action_name, "Unrecognized label action");
                continue;
            }
        };

        match action {
            Some(action) => label_actions.push(action),
            None => {
                tracing::warn!(action = %action_name, "Label action missing 'source' or 'target'");
            }
        }
    }

    label_actions
}

/// Build value actions in configuration order
///
/// `keep` does nothing and is not added.
pub fn configure_value_actions(configs: &[ActionConfig]) -> ValueActions {
    let mut value_actions = ValueActions::with_capacity(configs.len());

    for config in configs {
        let action_name = config.action_name();
        tracing::info!(action = %action_name, "Configuring value action");

        match ValueActionType::from_name(&action_name) {
            Some(ValueActionType::Keep) => {}
            Some(ValueActionType::Switch) => {
                let default_value = config.default.clone();
                let mapping = configure_switch_mapping(config.mappings.as_ref());

                let (has_default, has_mapping) = (default_value.is_some(), !mapping.is_empty());
                match ValueAction::switch(default_value, mapping) {
                    Some(action) => value_actions.push(action),
                    None => tracing::warn!(
                        action = %action_name,
                        default_present = has_default,
                        mappings_present = has_mapping,
                        "Value action not created"
                    ),
                }
            }
            None => {
                tracing::warn!(action = %action_name, "Unrecognized value action");
            }
        }
    }

    value_actions
}

/// Build the `location` property action of a handler
pub fn configure_property_actions(handler: &HandlerConfig) -> LabelActions {
    let Some(location) = &handler.location else {
        return LabelActions::new();
    };

    let mut topics_config = ReplacementTopicsConfig::new();
    match location {
        Value::Sequence(entries) => {
            for entry in entries {
                configure_replace_format(entry, &mut topics_config);
            }
        }
        Value::Mapping(_) => {
            tracing::warn!("'location' must be a format or a list of formats");
        }
        scalar => configure_replace_format(scalar, &mut topics_config),
    }

    LabelAction::replace_path(LABEL_LOCATION, topics_config.create_automaton())
        .into_iter()
        .collect()
}

/// Build a replacement table from a `replace` list
pub fn configure_replace_path(replace: &Value) -> ReplacementTopics {
    let mut topics_config = ReplacementTopicsConfig::new();

    match replace {
        Value::Sequence(entries) => {
            for entry in entries {
                configure_replace_format(entry, &mut topics_config);
            }
        }
        _ => tracing::warn!("'replace' must be a list"),
    }

    topics_config.create_automaton()
}

/// Add one replace entry to a replacement table
///
/// A scalar entry is a format applied to every topic. A mapping entry has
/// a `pattern` (default `#`) and a `format`.
fn configure_replace_format(entry: &Value, topics_config: &mut ReplacementTopicsConfig) {
    let (pattern, format) = match entry {
        Value::Mapping(mapping) => {
            let pattern = mapping
                .get("pattern")
                .and_then(scalar_to_string)
                .map(|p| p.trim().to_string())
                .unwrap_or_else(|| MULTI_LEVEL_WILDCARD.to_string());
            let format = mapping
                .get("format")
                .and_then(scalar_to_string)
                .map(|f| f.trim().to_string())
                .unwrap_or_default();
            (pattern, format)
        }
        other => match scalar_to_string(other) {
            Some(format) => (MULTI_LEVEL_WILDCARD.to_string(), format),
            None => {
                tracing::warn!("Replace entry must be a format or a pattern/format mapping");
                return;
            }
        },
    };

    let status = topic_validate(&pattern, TopicType::Filter);
    if !status.is_valid() {
        tracing::warn!(pattern = %pattern, status = ?status, "Invalid replace pattern");
        return;
    }

    tracing::debug!(pattern = %pattern, format = %format, "Replace path");
    if let Some(compiled) = compile_format(&format) {
        if !topics_config.add(&pattern, compiled) {
            tracing::warn!(pattern = %pattern, "Duplicate replace pattern ignored");
        }
    }
}

fn configure_switch_mapping(mappings: Option<&Value>) -> BTreeMap<String, String> {
    let mut mapping = BTreeMap::new();

    match mappings {
        Some(Value::Mapping(entries)) => {
            for (input, output) in entries {
                match (scalar_to_string(input), scalar_to_string(output)) {
                    (Some(input), Some(output)) => {
                        tracing::info!(input = %input, output = %output, "Switch mapping");
                        mapping.insert(input, output);
                    }
                    _ => tracing::warn!("Switch mapping entries must be scalars"),
                }
            }
        }
        Some(Value::Null) | None => {}
        Some(_) => tracing::warn!("'mappings' must be a mapping"),
    }

    mapping
}
