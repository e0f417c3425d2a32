//! Metric identity and published records
//!
//! [`MetricData`] is the record a [`Metric`](super::Metric) fills for every
//! message. Records are published by swapping them into a caller-owned
//! [`MetricDataVector`], whose slots are kept between batches so the
//! strings and label sets inside them are reused.

use std::cmp::Ordering;
use std::fmt;
use std::ops::Index;

use serde::{Deserialize, Serialize};

use super::labels::Labels;

/// Milliseconds since the Unix epoch
pub type Timestamp = i64;

/// Separator between name and location in a textual metric id
pub const METRIC_ID_SEPARATOR: char = ':';

/// Identity of a metric
#[derive(Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct MetricId {
    name: String,
    location: String,
}

impl MetricId {
    /// Create an id from its parts
    pub fn new(name: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
        }
    }

    /// Parse `name:location`, splitting at the first colon
    ///
    /// The location is empty when there is no colon.
    pub fn parse(id: &str) -> Self {
        match id.split_once(METRIC_ID_SEPARATOR) {
            Some((name, location)) => Self::new(name, location),
            None => Self::new(id, ""),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// Overwrite the location, reusing its buffer
    pub fn set_location(&mut self, location: &str) {
        self.location.clear();
        self.location.push_str(location);
    }
}

impl Clone for MetricId {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            location: self.location.clone(),
        }
    }

    fn clone_from(&mut self, source: &Self) {
        self.name.clone_from(&source.name);
        self.location.clone_from(&source.location);
    }
}

impl fmt::Display for MetricId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.name, METRIC_ID_SEPARATOR, self.location)
    }
}

impl From<&str> for MetricId {
    fn from(id: &str) -> Self {
        Self::parse(id)
    }
}

/// Declared type of a payload value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    #[default]
    Unknown,
    Numeric,
    Integer,
    Float,
    Bool,
    String,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Unknown => "unknown",
            ValueType::Numeric => "numeric",
            ValueType::Integer => "integer",
            ValueType::Float => "float",
            ValueType::Bool => "bool",
            ValueType::String => "string",
        };
        write!(f, "{}", name)
    }
}

/// Decoded form of a value, carried alongside its text
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BinaryValue {
    Float(f64),
    Int(i64),
    Bool(bool),
}

impl Default for BinaryValue {
    fn default() -> Self {
        BinaryValue::Float(0.0)
    }
}

/// A metric record
#[derive(Debug, Clone, Default, Serialize)]
pub struct MetricData {
    id: MetricId,
    labels: Labels,
    timestamp: Timestamp,
    value: String,
    binary: BinaryValue,
    value_type: ValueType,
}

impl MetricData {
    /// Create a record with no labels
    pub fn new(id: MetricId, value: impl Into<String>, timestamp: Timestamp) -> Self {
        Self {
            id,
            value: value.into(),
            timestamp,
            ..Default::default()
        }
    }

    /// Refill every field except the labels, reusing existing buffers
    ///
    /// The binary value is reset to its default as well.
    pub fn reset(
        &mut self,
        id: &MetricId,
        value: &str,
        timestamp: Timestamp,
        value_type: ValueType,
    ) {
        self.id.clone_from(id);
        self.set_value(value);
        self.timestamp = timestamp;
        self.value_type = value_type;
        self.binary = BinaryValue::default();
    }

    pub fn id(&self) -> &MetricId {
        &self.id
    }

    pub fn id_mut(&mut self) -> &mut MetricId {
        &mut self.id
    }

    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    pub fn labels_mut(&mut self) -> &mut Labels {
        &mut self.labels
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn set_timestamp(&mut self, timestamp: Timestamp) {
        self.timestamp = timestamp;
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Overwrite the value, reusing its buffer
    pub fn set_value(&mut self, value: &str) {
        self.value.clear();
        self.value.push_str(value);
    }

    pub fn binary(&self) -> BinaryValue {
        self.binary
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn set_value_type(&mut self, value_type: ValueType) {
        self.value_type = value_type;
    }

    /// Exchange the whole contents with another record
    pub fn swap(&mut self, other: &mut MetricData) {
        std::mem::swap(self, other);
    }
}

impl PartialEq for MetricData {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for MetricData {}

impl PartialOrd for MetricData {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MetricData {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

/// Output buffer of published records
///
/// Only the first [`len`](Self::len) slots are published. Slots past that
/// are left over from earlier batches and get recycled by
/// [`swap_data_back`](Self::swap_data_back).
#[derive(Debug, Clone, Default)]
pub struct MetricDataVector {
    slots: Vec<MetricData>,
    len: usize,
}

impl MetricDataVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            len: 0,
        }
    }

    /// Publish `data` by exchanging it with the next free slot
    ///
    /// On return `data` holds whatever the slot held before, which is stale
    /// and must be reset before use.
    pub fn swap_data_back(&mut self, data: &mut MetricData) {
        if self.len < self.slots.len() {
            self.slots[self.len].swap(data);
        } else {
            self.slots.push(std::mem::take(data));
        }
        self.len += 1;
    }

    /// Unpublish every record, keeping the slots for reuse
    pub fn clear(&mut self) {
        self.len = 0;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of slots including recycled ones
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn get(&self, index: usize) -> Option<&MetricData> {
        self.as_slice().get(index)
    }

    pub fn as_slice(&self) -> &[MetricData] {
        &self.slots[..self.len]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MetricData> {
        self.as_slice().iter()
    }
}

impl Index<usize> for MetricDataVector {
    type Output = MetricData;

    fn index(&self, index: usize) -> &MetricData {
        &self.as_slice()[index]
    }
}

impl<'a> IntoIterator for &'a MetricDataVector {
    type Item = &'a MetricData;
    type IntoIter = std::slice::Iter<'a, MetricData>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
