//! Label and value actions
//!
//! Label actions derive the labels of a record from the property labels of
//! a message. Value actions rewrite the record's value. Both are closed sets
//! dispatched by `match`.
//!
//! Factories return `None` when their arguments cannot produce a useful
//! action. Configuration treats that as "skip this entry".

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use once_cell::sync::Lazy;

use super::data::{MetricData, ValueType};
use super::format::{apply_format, ReplaceFormat};
use super::labels::{Labels, LABEL_TOPIC};
use crate::topics::{TopicLevels, Topics, TopicsConfig};

/// Builder for a [`ReplacementTopics`] table
pub type ReplacementTopicsConfig = TopicsConfig<ReplaceFormat>;

/// Topic filters mapped to replacement programs
pub type ReplacementTopics = Topics<ReplaceFormat>;

/// Kind of label action, as named in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LabelActionType {
    Copy,
    Drop,
    Keep,
    ReplacePath,
}

static LABEL_ACTION_TYPES: Lazy<HashMap<&'static str, LabelActionType>> = Lazy::new(|| {
    [
        LabelActionType::Copy,
        LabelActionType::Drop,
        LabelActionType::Keep,
        LabelActionType::ReplacePath,
    ]
    .into_iter()
    .map(|action_type| (action_type.as_str(), action_type))
    .collect()
});

impl LabelActionType {
    /// Look up an action by its configured name
    pub fn from_name(name: &str) -> Option<Self> {
        LABEL_ACTION_TYPES.get(name).copied()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LabelActionType::Copy => "copy",
            LabelActionType::Drop => "drop",
            LabelActionType::Keep => "keep",
            LabelActionType::ReplacePath => "replace-path",
        }
    }
}

impl fmt::Display for LabelActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of value action, as named in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueActionType {
    Keep,
    Switch,
}

static VALUE_ACTION_TYPES: Lazy<HashMap<&'static str, ValueActionType>> = Lazy::new(|| {
    [ValueActionType::Keep, ValueActionType::Switch]
        .into_iter()
        .map(|action_type| (action_type.as_str(), action_type))
        .collect()
});

impl ValueActionType {
    /// Look up an action by its configured name
    pub fn from_name(name: &str) -> Option<Self> {
        VALUE_ACTION_TYPES.get(name).copied()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ValueActionType::Keep => "keep",
            ValueActionType::Switch => "switch",
        }
    }
}

impl fmt::Display for ValueActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Label actions
// =============================================================================

/// A label transformation
#[derive(Debug, Clone)]
pub enum LabelAction {
    /// Copy the value of `source` to `target`
    Copy { source: String, target: String },
    /// Remove `target`
    Drop { target: String },
    /// Carry `target` over unchanged
    Keep { target: String },
    /// Compute `target` from the levels of the message topic
    ReplacePath {
        target: String,
        topics: ReplacementTopics,
    },
}

impl LabelAction {
    /// Create a copy action; at least one of the names must be non-empty
    pub fn copy(source: &str, target: &str) -> Option<Self> {
        if source.is_empty() && target.is_empty() {
            return None;
        }
        Some(LabelAction::Copy {
            source: source.to_string(),
            target: target.to_string(),
        })
    }

    pub fn drop(target: &str) -> Option<Self> {
        (!target.is_empty()).then(|| LabelAction::Drop {
            target: target.to_string(),
        })
    }

    pub fn keep(target: &str) -> Option<Self> {
        (!target.is_empty()).then(|| LabelAction::Keep {
            target: target.to_string(),
        })
    }

    pub fn replace_path(target: &str, topics: ReplacementTopics) -> Option<Self> {
        (!target.is_empty()).then(|| LabelAction::ReplacePath {
            target: target.to_string(),
            topics,
        })
    }

    /// Configured name of the action
    pub fn name(&self) -> &'static str {
        self.action_type().as_str()
    }

    pub fn action_type(&self) -> LabelActionType {
        match self {
            LabelAction::Copy { .. } => LabelActionType::Copy,
            LabelAction::Drop { .. } => LabelActionType::Drop,
            LabelAction::Keep { .. } => LabelActionType::Keep,
            LabelAction::ReplacePath { .. } => LabelActionType::ReplacePath,
        }
    }

    /// The label the action writes
    pub fn target(&self) -> &str {
        match self {
            LabelAction::Copy { target, .. }
            | LabelAction::Drop { target }
            | LabelAction::Keep { target }
            | LabelAction::ReplacePath { target, .. } => target,
        }
    }

    /// Apply to `labels_out`, reading from `labels_in`
    pub fn apply(&self, labels_in: &Labels, levels: &TopicLevels<'_>, labels_out: &mut Labels) {
        match self {
            LabelAction::Copy { source, target } => {
                if let Some(value) = labels_in.find_label(source) {
                    labels_out.set_label(target, value);
                }
            }
            LabelAction::Drop { target } => {
                labels_out.erase(target);
            }
            LabelAction::Keep { target } => {
                if let Some(value) = labels_in.find_label(target) {
                    labels_out.set_label(target, value);
                }
            }
            LabelAction::ReplacePath { target, topics } => {
                let out = labels_out.set_label(target, "");
                replace_path(topics, labels_in, levels, out);
            }
        }
    }

    /// Apply to a single output value, reading from `labels_in`
    ///
    /// `Drop` has no scalar meaning and leaves `out` alone.
    pub fn apply_value(&self, labels_in: &Labels, levels: &TopicLevels<'_>, out: &mut String) {
        match self {
            LabelAction::Copy { source, .. } => {
                if let Some(value) = labels_in.find_label(source) {
                    out.clear();
                    out.push_str(value);
                }
            }
            LabelAction::Drop { .. } => {}
            LabelAction::Keep { target } => {
                if let Some(value) = labels_in.find_label(target) {
                    out.clear();
                    out.push_str(value);
                }
            }
            LabelAction::ReplacePath { topics, .. } => {
                out.clear();
                replace_path(topics, labels_in, levels, out);
            }
        }
    }

    /// Apply to a label set that is both input and output
    ///
    /// `scratch` holds the computed value while `labels` is borrowed for
    /// reading; its allocation is reused across calls.
    pub fn apply_in_place(
        &self,
        labels: &mut Labels,
        levels: &TopicLevels<'_>,
        scratch: &mut String,
    ) {
        match self {
            LabelAction::Copy { source, target } => {
                if let Some(value) = labels.find_label(source) {
                    scratch.clear();
                    scratch.push_str(value);
                    labels.set_label(target, scratch);
                }
            }
            LabelAction::Drop { target } => {
                labels.erase(target);
            }
            LabelAction::Keep { .. } => {}
            LabelAction::ReplacePath { target, topics } => {
                labels.set_label(target, "");
                scratch.clear();
                replace_path(topics, labels, levels, scratch);
                labels.set_label(target, scratch);
            }
        }
    }
}

/// Run the first program matching the `topic` label, appending to `out`
fn replace_path(
    topics: &ReplacementTopics,
    labels_in: &Labels,
    levels: &TopicLevels<'_>,
    out: &mut String,
) {
    if let Some(format) = topics.find_first(labels_in.get_label(LABEL_TOPIC)) {
        apply_format(format, levels, out);
    }
}

// =============================================================================
// Value actions
// =============================================================================

/// Maps raw values to replacement values
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SwitchValueAction {
    default: Option<String>,
    mapping: BTreeMap<String, String>,
}

impl SwitchValueAction {
    pub fn default_value(&self) -> Option<&str> {
        self.default.as_deref()
    }

    pub fn mapping(&self) -> &BTreeMap<String, String> {
        &self.mapping
    }

    fn apply(&self, data: &mut MetricData) {
        if let Some(mapped) = self.mapping.get(data.value()) {
            data.set_value(mapped);
        } else if let Some(default) = &self.default {
            data.set_value(default);
        }
    }
}

/// A value transformation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueAction {
    /// Leave the value unchanged
    Keep,
    /// Replace the value through a lookup table
    Switch(SwitchValueAction),
}

impl ValueAction {
    /// Create a switch action; needs a default and at least one mapping
    pub fn switch(default: Option<String>, mapping: BTreeMap<String, String>) -> Option<Self> {
        if default.is_none() || mapping.is_empty() {
            return None;
        }
        Some(ValueAction::Switch(SwitchValueAction { default, mapping }))
    }

    pub fn name(&self) -> &'static str {
        self.action_type().as_str()
    }

    pub fn action_type(&self) -> ValueActionType {
        match self {
            ValueAction::Keep => ValueActionType::Keep,
            ValueAction::Switch(_) => ValueActionType::Switch,
        }
    }

    pub fn apply(&self, data: &mut MetricData, _value_type: ValueType) {
        match self {
            ValueAction::Keep => {}
            ValueAction::Switch(switch) => switch.apply(data),
        }
    }
}
