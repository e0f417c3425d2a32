//! Per-message metric pipeline
//!
//! A [`Metric`] owns the actions configured for one (value, handler,
//! property) triple together with the scratch buffers they run on.
//! [`Metric::event`] turns one message into one published record:
//!
//! 1. reset the scratch record from the message
//! 2. seed the property labels with the topic
//! 3. run the property actions on the property labels
//! 4. take the record location from the `location` property
//! 5. seed the record labels with `location` and `topic`
//! 6. run the label actions from property labels into record labels
//! 7. run the value actions on the record
//! 8. swap the record into the output buffer
//!
//! # Example
//!
//! ```ignore
//! use rmqtt_values::topics::TopicLevels;
//! use rmqtt_values::transformer::{LabelAction, Metric, MetricDataVector, MetricId, ValueType};
//!
//! let mut metric = Metric::new(
//!     MetricId::new("temperature", ""),
//!     "temp",
//!     vec![LabelAction::keep("topic").unwrap()],
//!     vec![],
//!     vec![],
//! );
//!
//! let mut out = MetricDataVector::new();
//! let topic = "sensors/kitchen";
//! metric.event("23.5", topic, &TopicLevels::new(topic), 0, ValueType::Float, &mut out);
//! ```

use std::collections::BTreeMap;

use tracing::Level;

use super::actions::{LabelAction, ValueAction};
use super::data::{MetricData, MetricDataVector, MetricId, Timestamp, ValueType};
use super::labels::{ClearAction, Labels, LABEL_LOCATION, LABEL_TOPIC};
use crate::topics::TopicLevels;

pub type LabelActions = Vec<LabelAction>;
pub type ValueActions = Vec<ValueAction>;
pub type Metrics = Vec<Metric>;

/// Metrics keyed by handler id
pub type MetricsMap = BTreeMap<String, Metrics>;

/// A configured metric and its scratch state
#[derive(Debug, Clone)]
pub struct Metric {
    id: MetricId,
    property: String,
    label_actions: LabelActions,
    value_actions: ValueActions,
    property_actions: LabelActions,
    properties: Labels,
    metric_data: MetricData,
    scratch: String,
}

impl Metric {
    pub fn new(
        id: MetricId,
        property: impl Into<String>,
        label_actions: LabelActions,
        value_actions: ValueActions,
        property_actions: LabelActions,
    ) -> Self {
        // Room for every property action target plus the topic
        let properties = Labels::with_capacity(property_actions.len() + 1);

        Self {
            id,
            property: property.into(),
            label_actions,
            value_actions,
            property_actions,
            properties,
            metric_data: MetricData::default(),
            scratch: String::new(),
        }
    }

    pub fn id(&self) -> &MetricId {
        &self.id
    }

    pub fn property(&self) -> &str {
        &self.property
    }

    pub fn label_actions(&self) -> &[LabelAction] {
        &self.label_actions
    }

    pub fn value_actions(&self) -> &[ValueAction] {
        &self.value_actions
    }

    pub fn property_actions(&self) -> &[LabelAction] {
        &self.property_actions
    }

    /// Transform one message and publish the result into `out`
    pub fn event(
        &mut self,
        value: &str,
        topic: &str,
        levels: &TopicLevels<'_>,
        timestamp: Timestamp,
        value_type: ValueType,
        out: &mut MetricDataVector,
    ) {
        tracing::debug!(
            metric = %self.id.name(),
            property = %self.property,
            value = %value,
            "Metric event"
        );

        self.metric_data.reset(&self.id, value, timestamp, value_type);

        self.properties.clear_with(ClearAction::Keep);
        self.properties.set_label(LABEL_TOPIC, topic);
        for action in &self.property_actions {
            action.apply_in_place(&mut self.properties, levels, &mut self.scratch);
        }

        self.metric_data
            .id_mut()
            .set_location(self.properties.get_label(LABEL_LOCATION));

        let Self {
            metric_data,
            properties,
            label_actions,
            value_actions,
            ..
        } = self;

        let labels = metric_data.labels_mut();
        labels.clear_with(ClearAction::Keep);
        labels.set_label(LABEL_LOCATION, properties.get_label(LABEL_LOCATION));
        labels.set_label(LABEL_TOPIC, topic);

        for action in label_actions.iter() {
            action.apply(properties, levels, metric_data.labels_mut());
        }

        for action in value_actions.iter() {
            action.apply(metric_data, value_type);
        }

        if tracing::enabled!(Level::DEBUG) {
            metric_data.labels().visit(|label, value| {
                tracing::debug!(label = %label, value = %value, "Metric label");
            });
        }

        out.swap_data_back(metric_data);
    }
}
