//! Ordered label store
//!
//! [`Labels`] is a sorted, string-keyed map used both as the scratch
//! workspace of the pipeline and as the label set of every published record.
//!
//! Entries live in a vector sorted by label name. Clearing with
//! [`ClearAction::Keep`] only resets the live length: the vector and the
//! strings past it are kept and overwritten by later inserts, so a label set
//! that is refilled on every message stops allocating once warmed up.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Reserved label holding the location computed from the topic
pub const LABEL_LOCATION: &str = "location";

/// Reserved label holding the inbound topic
pub const LABEL_TOPIC: &str = "topic";

/// How [`Labels::clear_with`] treats allocated storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClearAction {
    /// Release all storage
    #[default]
    Clear,
    /// Keep storage for reuse
    Keep,
}

/// Ordered mapping from label name to label value
#[derive(Clone, Default)]
pub struct Labels {
    /// Sorted by name up to `len`; entries past `len` are stale and reusable
    entries: Vec<(String, String)>,
    len: usize,
}

impl Labels {
    /// Create an empty label set
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty label set with room for `capacity` labels
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            len: 0,
        }
    }

    /// Remove all labels and release storage
    pub fn clear(&mut self) {
        self.clear_with(ClearAction::Clear);
    }

    /// Remove all labels
    pub fn clear_with(&mut self, action: ClearAction) {
        match action {
            ClearAction::Clear => self.entries = Vec::new(),
            ClearAction::Keep => {}
        }
        self.len = 0;
    }

    fn live(&self) -> &[(String, String)] {
        &self.entries[..self.len]
    }

    fn position(&self, label: &str) -> Result<usize, usize> {
        self.live()
            .binary_search_by(|(name, _)| name.as_str().cmp(label))
    }

    /// Insert or overwrite a label, returning the stored value
    pub fn set_label(&mut self, label: &str, value: &str) -> &mut String {
        let index = match self.position(label) {
            Ok(index) => {
                let stored = &mut self.entries[index].1;
                stored.clear();
                stored.push_str(value);
                index
            }
            Err(index) => {
                if self.len < self.entries.len() {
                    let (name, stored) = &mut self.entries[self.len];
                    name.clear();
                    name.push_str(label);
                    stored.clear();
                    stored.push_str(value);
                    self.entries[index..=self.len].rotate_right(1);
                } else {
                    self.entries
                        .insert(index, (label.to_string(), value.to_string()));
                }
                self.len += 1;
                index
            }
        };

        &mut self.entries[index].1
    }

    /// Get a label value, or `""` if the label is absent
    pub fn get_label(&self, label: &str) -> &str {
        self.find_label(label).unwrap_or("")
    }

    /// Get a label value if present
    pub fn find_label(&self, label: &str) -> Option<&str> {
        self.position(label)
            .ok()
            .map(|index| self.entries[index].1.as_str())
    }

    /// Check if a label is present
    pub fn contains_label(&self, label: &str) -> bool {
        self.position(label).is_ok()
    }

    /// Remove a label, returning whether it was present
    pub fn erase(&mut self, label: &str) -> bool {
        match self.position(label) {
            Ok(index) => {
                self.entries[index..self.len].rotate_left(1);
                self.len -= 1;
                true
            }
            Err(_) => false,
        }
    }

    /// Number of labels
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if there are no labels
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterate over `(name, value)` pairs in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.live()
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Call `visitor` for every label in name order
    pub fn visit<F>(&self, mut visitor: F)
    where
        F: FnMut(&str, &str),
    {
        for (name, value) in self.iter() {
            visitor(name, value);
        }
    }

    /// Exchange contents with another label set
    pub fn swap(&mut self, other: &mut Labels) {
        std::mem::swap(self, other);
    }
}

impl PartialEq for Labels {
    fn eq(&self, other: &Self) -> bool {
        self.live() == other.live()
    }
}

impl Eq for Labels {}

impl PartialOrd for Labels {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Labels {
    fn cmp(&self, other: &Self) -> Ordering {
        self.live().cmp(other.live())
    }
}

impl Hash for Labels {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.live().hash(state);
    }
}

impl fmt::Debug for Labels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V> FromIterator<(K, V)> for Labels
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut labels = Labels::new();
        for (name, value) in iter {
            labels.set_label(name.as_ref(), value.as_ref());
        }
        labels
    }
}

impl Serialize for Labels {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.len))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use proptest::prelude::*;

    use super::*;

    fn names(labels: &Labels) -> Vec<&str> {
        labels.iter().map(|(name, _)| name).collect()
    }

    #[test]
    fn test_set_then_get() {
        let mut labels = Labels::new();
        labels.set_label("room", "kitchen");
        assert_eq!(labels.get_label("room"), "kitchen");
        assert_eq!(labels.find_label("room"), Some("kitchen"));
        assert_eq!(labels.len(), 1);
    }

    #[test]
    fn test_get_missing_is_empty() {
        let labels = Labels::new();
        assert_eq!(labels.get_label("missing"), "");
        assert_eq!(labels.find_label("missing"), None);
        assert!(!labels.contains_label("missing"));
    }

    #[test]
    fn test_set_overwrites() {
        let mut labels = Labels::new();
        labels.set_label("room", "kitchen");
        labels.set_label("room", "hall");
        assert_eq!(labels.get_label("room"), "hall");
        assert_eq!(labels.len(), 1);
    }

    #[test]
    fn test_set_returns_stored_value() {
        let mut labels = Labels::new();
        labels.set_label("room", "").push_str("attic");
        assert_eq!(labels.get_label("room"), "attic");
    }

    #[test]
    fn test_iteration_is_sorted() {
        let mut labels = Labels::new();
        labels.set_label("topic", "t");
        labels.set_label("area", "a");
        labels.set_label("location", "l");
        assert_eq!(names(&labels), vec!["area", "location", "topic"]);
    }

    #[test]
    fn test_erase() {
        let mut labels: Labels = [("a", "1"), ("b", "2"), ("c", "3")].into_iter().collect();
        assert!(labels.erase("b"));
        assert!(!labels.erase("b"));
        assert_eq!(labels.get_label("b"), "");
        assert_eq!(names(&labels), vec!["a", "c"]);
    }

    #[test]
    fn test_clear_keep_then_refill() {
        let mut labels: Labels = [("x", "1"), ("y", "2"), ("z", "3")].into_iter().collect();
        labels.clear_with(ClearAction::Keep);
        assert!(labels.is_empty());
        assert_eq!(labels.get_label("x"), "");

        labels.set_label("b", "two");
        labels.set_label("a", "one");
        assert_eq!(names(&labels), vec!["a", "b"]);
        assert_eq!(labels.get_label("a"), "one");
        assert_eq!(labels.get_label("b"), "two");
        assert_eq!(labels.get_label("z"), "");
    }

    #[test]
    fn test_erase_then_insert_reuses_slot() {
        let mut labels: Labels = [("a", "1"), ("b", "2"), ("c", "3")].into_iter().collect();
        labels.erase("a");
        labels.set_label("d", "4");
        labels.set_label("0", "0");
        assert_eq!(names(&labels), vec!["0", "b", "c", "d"]);
        assert_eq!(labels.get_label("d"), "4");
    }

    #[test]
    fn test_full_clear() {
        let mut labels: Labels = [("a", "1")].into_iter().collect();
        labels.clear();
        assert!(labels.is_empty());
        labels.set_label("b", "2");
        assert_eq!(names(&labels), vec!["b"]);
    }

    #[test]
    fn test_equality_ignores_stale_entries() {
        let mut reused: Labels = [("a", "1"), ("b", "2"), ("c", "3")].into_iter().collect();
        reused.clear_with(ClearAction::Keep);
        reused.set_label("a", "1");

        let fresh: Labels = [("a", "1")].into_iter().collect();
        assert_eq!(reused, fresh);
    }

    #[test]
    fn test_ordering() {
        let a: Labels = [("a", "1")].into_iter().collect();
        let b: Labels = [("a", "2")].into_iter().collect();
        let c: Labels = [("a", "1"), ("b", "1")].into_iter().collect();
        assert!(a < b);
        assert!(a < c);
        assert_eq!(a.cmp(&a.clone()), Ordering::Equal);
    }

    #[test]
    fn test_visit_in_order() {
        let labels: Labels = [("b", "2"), ("a", "1")].into_iter().collect();
        let mut seen = Vec::new();
        labels.visit(|name, value| seen.push(format!("{}={}", name, value)));
        assert_eq!(seen, vec!["a=1", "b=2"]);
    }

    #[test]
    fn test_swap() {
        let mut left: Labels = [("a", "1")].into_iter().collect();
        let mut right: Labels = [("b", "2")].into_iter().collect();
        left.swap(&mut right);
        assert_eq!(left.get_label("b"), "2");
        assert_eq!(right.get_label("a"), "1");
    }

    #[test]
    fn test_serialize_as_map() {
        let labels: Labels = [("topic", "a/b"), ("location", "hall")].into_iter().collect();
        let json = serde_json::to_string(&labels).unwrap();
        assert_eq!(json, r#"{"location":"hall","topic":"a/b"}"#);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Set(String, String),
        Append(String, String),
        Erase(String),
        ClearKeep,
    }

    fn arb_name() -> impl Strategy<Value = String> {
        // A small name pool so sets and erases hit existing labels often
        "[a-f]{1,2}"
    }

    fn arb_op() -> impl Strategy<Value = Op> {
        prop_oneof![
            4 => (arb_name(), "[a-z0-9]{0,4}").prop_map(|(name, value)| Op::Set(name, value)),
            2 => (arb_name(), "[a-z0-9]{1,3}").prop_map(|(name, value)| Op::Append(name, value)),
            2 => arb_name().prop_map(Op::Erase),
            1 => Just(Op::ClearKeep),
        ]
    }

    proptest! {
        #[test]
        fn property_test_matches_ordered_map(ops in prop::collection::vec(arb_op(), 1..80)) {
            let mut labels = Labels::new();
            let mut model: BTreeMap<String, String> = BTreeMap::new();

            for op in ops {
                match op {
                    Op::Set(name, value) => {
                        labels.set_label(&name, &value);
                        model.insert(name, value);
                    }
                    Op::Append(name, value) => {
                        labels.set_label(&name, "").push_str(&value);
                        model.insert(name, value);
                    }
                    Op::Erase(name) => {
                        prop_assert_eq!(labels.erase(&name), model.remove(&name).is_some());
                    }
                    Op::ClearKeep => {
                        labels.clear_with(ClearAction::Keep);
                        model.clear();
                    }
                }

                let actual: Vec<(&str, &str)> = labels.iter().collect();
                let expected: Vec<(&str, &str)> =
                    model.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
                prop_assert_eq!(actual, expected);
                prop_assert_eq!(labels.len(), model.len());

                for name in ["a", "b", "c", "d", "e", "f", "aa", "fe"] {
                    let expected = model.get(name).map_or("", String::as_str);
                    prop_assert_eq!(labels.get_label(name), expected);
                    prop_assert_eq!(labels.contains_label(name), model.contains_key(name));
                }
            }
        }
    }
}
