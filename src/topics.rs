//! MQTT topic utilities
//!
//! This module provides the topic plumbing the transformer relies on:
//! splitting a topic into its levels, validating topic names and filters,
//! and a table that maps topic filters to payloads.
//!
//! # Example
//!
//! ```ignore
//! use rmqtt_values::topics::{TopicLevels, TopicsConfig};
//!
//! let mut config = TopicsConfig::new();
//! config.add("sensors/+/temperature", "room");
//! let topics = config.create_automaton();
//!
//! assert_eq!(topics.find_first("sensors/kitchen/temperature"), Some(&"room"));
//! assert_eq!(TopicLevels::new("sensors/kitchen").get(1), Some("kitchen"));
//! ```

use std::ops::Index;

/// Separator between topic levels
pub const TOPIC_SEPARATOR: char = '/';

/// Wildcard matching exactly one topic level
pub const SINGLE_LEVEL_WILDCARD: &str = "+";

/// Wildcard matching any number of trailing topic levels
pub const MULTI_LEVEL_WILDCARD: &str = "#";

/// Maximum encoded length of a topic
pub const MAX_TOPIC_LEN: usize = 65_535;

/// The levels of a single MQTT topic
///
/// Borrowed slices into the original topic string, indexed from zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicLevels<'a> {
    levels: Vec<&'a str>,
}

impl<'a> TopicLevels<'a> {
    /// Split a topic on `/` into its levels
    pub fn new(topic: &'a str) -> Self {
        Self {
            levels: topic.split(TOPIC_SEPARATOR).collect(),
        }
    }

    /// Re-split into the existing buffer, reusing its allocation
    pub fn assign(&mut self, topic: &'a str) {
        self.levels.clear();
        self.levels.extend(topic.split(TOPIC_SEPARATOR));
    }

    /// Number of levels
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Check if there are no levels
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Get the level at a zero-based index
    pub fn get(&self, index: usize) -> Option<&'a str> {
        self.levels.get(index).copied()
    }

    /// Iterate over the levels in order
    pub fn iter(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.levels.iter().copied()
    }
}

impl Index<usize> for TopicLevels<'_> {
    type Output = str;

    fn index(&self, index: usize) -> &str {
        self.levels[index]
    }
}

/// Kind of topic being validated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicType {
    /// A concrete topic a message is published on
    Name,
    /// A subscription filter that may contain wildcards
    Filter,
}

/// Result of [`topic_validate`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicValidStatus {
    /// Topic is valid for the requested type
    Valid,
    /// Topic is empty
    Empty,
    /// Topic exceeds [`MAX_TOPIC_LEN`]
    TooLong,
    /// Topic contains a NUL character
    InvalidCharacter,
    /// Wildcard used in a topic name, or not occupying a whole filter level,
    /// or `#` not in the last level
    InvalidWildcard,
}

impl TopicValidStatus {
    /// Check if the status is [`TopicValidStatus::Valid`]
    pub fn is_valid(&self) -> bool {
        matches!(self, TopicValidStatus::Valid)
    }
}

/// Validate a topic name or topic filter
pub fn topic_validate(topic: &str, topic_type: TopicType) -> TopicValidStatus {
    if topic.is_empty() {
        return TopicValidStatus::Empty;
    }

    if topic.len() > MAX_TOPIC_LEN {
        return TopicValidStatus::TooLong;
    }

    if topic.contains('\0') {
        return TopicValidStatus::InvalidCharacter;
    }

    let mut levels = topic.split(TOPIC_SEPARATOR).peekable();
    while let Some(level) = levels.next() {
        if !level.contains(['+', '#']) {
            continue;
        }

        match topic_type {
            TopicType::Name => return TopicValidStatus::InvalidWildcard,
            TopicType::Filter => match level {
                SINGLE_LEVEL_WILDCARD => {}
                MULTI_LEVEL_WILDCARD if levels.peek().is_none() => {}
                _ => return TopicValidStatus::InvalidWildcard,
            },
        }
    }

    TopicValidStatus::Valid
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum FilterLevel {
    Exact(String),
    SingleWildcard,
    MultiWildcard,
}

/// A parsed topic filter
#[derive(Debug, Clone)]
struct TopicFilter {
    pattern: String,
    levels: Vec<FilterLevel>,
}

impl TopicFilter {
    fn parse(pattern: &str) -> Self {
        let levels = pattern
            .split(TOPIC_SEPARATOR)
            .map(|level| match level {
                SINGLE_LEVEL_WILDCARD => FilterLevel::SingleWildcard,
                MULTI_LEVEL_WILDCARD => FilterLevel::MultiWildcard,
                exact => FilterLevel::Exact(exact.to_string()),
            })
            .collect();

        Self {
            pattern: pattern.to_string(),
            levels,
        }
    }

    fn matches(&self, topic: &str) -> bool {
        // Topics starting with '$' are never matched by a leading wildcard.
        if topic.starts_with('$')
            && matches!(
                self.levels.first(),
                Some(FilterLevel::SingleWildcard | FilterLevel::MultiWildcard)
            )
        {
            return false;
        }

        let mut topic_levels = topic.split(TOPIC_SEPARATOR);
        for filter_level in &self.levels {
            match filter_level {
                // '#' also matches the parent level: "a/#" matches "a".
                FilterLevel::MultiWildcard => return true,
                FilterLevel::SingleWildcard => {
                    if topic_levels.next().is_none() {
                        return false;
                    }
                }
                FilterLevel::Exact(level) => match topic_levels.next() {
                    Some(topic_level) if topic_level == level => {}
                    _ => return false,
                },
            }
        }

        topic_levels.next().is_none()
    }
}

/// Builder for a [`Topics`] table
///
/// Patterns are kept in insertion order, which is the order [`Topics::find`]
/// reports matches in.
#[derive(Debug, Clone)]
pub struct TopicsConfig<T> {
    entries: Vec<(TopicFilter, T)>,
}

impl<T> TopicsConfig<T> {
    /// Create an empty configuration
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Add a filter pattern with its payload
    ///
    /// Returns `false` and discards `payload` if `pattern` was already added.
    pub fn add(&mut self, pattern: &str, payload: T) -> bool {
        if self.entries.iter().any(|(filter, _)| filter.pattern == pattern) {
            tracing::debug!(pattern = %pattern, "Duplicate topic pattern ignored");
            return false;
        }

        self.entries.push((TopicFilter::parse(pattern), payload));
        true
    }

    /// Number of patterns added
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no patterns were added
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Freeze the configuration into a lookup table
    pub fn create_automaton(self) -> Topics<T> {
        Topics {
            entries: self.entries,
        }
    }
}

impl<T> Default for TopicsConfig<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable table mapping topic filters to payloads
#[derive(Debug, Clone)]
pub struct Topics<T> {
    entries: Vec<(TopicFilter, T)>,
}

impl<T> Topics<T> {
    /// Find the payloads of every filter matching `topic`, in table order
    pub fn find(&self, topic: &str) -> Vec<&T> {
        self.entries
            .iter()
            .filter(|(filter, _)| filter.matches(topic))
            .map(|(_, payload)| payload)
            .collect()
    }

    /// Find the payload of the first filter matching `topic`
    ///
    /// Equivalent to `find(topic).first()` without allocating.
    pub fn find_first(&self, topic: &str) -> Option<&T> {
        self.entries
            .iter()
            .find(|(filter, _)| filter.matches(topic))
            .map(|(_, payload)| payload)
    }

    /// Iterate over the filter patterns in table order
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(filter, _)| filter.pattern.as_str())
    }

    /// Number of filters in the table
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> Default for Topics<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}
