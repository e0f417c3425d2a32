//! Metric transformation module
//!
//! This module turns inbound MQTT messages into labelled metric records.
//!
//! # Components
//!
//! - [`format`]: compiler for `replace-path` format strings
//! - [`labels`]: ordered label store
//! - [`data`]: metric identity and published records
//! - [`actions`]: label and value actions
//! - [`metric`]: the per-message pipeline
//! - [`formatter`]: rendering of published records

pub mod actions;
pub mod data;
pub mod format;
pub mod formatter;
pub mod labels;
pub mod metric;

pub use actions::{
    LabelAction, LabelActionType, ReplacementTopics, ReplacementTopicsConfig, SwitchValueAction,
    ValueAction, ValueActionType,
};
pub use data::{BinaryValue, MetricData, MetricDataVector, MetricId, Timestamp, ValueType};
pub use format::{apply_element, apply_format, compile_format, FormatElement, ReplaceFormat};
pub use formatter::{RecordFormat, RecordFormatter};
pub use labels::{ClearAction, Labels, LABEL_LOCATION, LABEL_TOPIC};
pub use metric::{LabelActions, Metric, Metrics, MetricsMap, ValueActions};
