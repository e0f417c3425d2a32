//! Replacement format compiler
//!
//! Compiles `replace-path` format strings into a [`ReplaceFormat`] program
//! which is later run against the levels of a matched topic.
//!
//! # Syntax
//!
//! - `\1` .. `\99` - the topic level at the given 1-based index
//! - `\n`, `\t` - newline and tab
//! - `\c` - any other escaped character is inserted as-is
//!
//! Everything else is literal text.
//!
//! # Example
//!
//! ```ignore
//! use rmqtt_values::topics::TopicLevels;
//! use rmqtt_values::transformer::{apply_format, compile_format};
//!
//! let format = compile_format(r"room_\2").unwrap();
//! let mut out = String::new();
//! apply_format(&format, &TopicLevels::new("sensors/kitchen"), &mut out);
//! assert_eq!(out, "room_kitchen");
//! ```

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::FormatError;
use crate::topics::TopicLevels;

/// Scans one `(literal)(escape)?` segment
///
/// Group 1 is the literal run, group 2 a 1-2 digit ASCII level index and
/// group 3 an escaped character.
static FORMAT_SEGMENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)([^\\]*)(?:\\(?:([0-9]{1,2})|(.)))?").expect("invalid format segment regex")
});

static ESCAPES: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| HashMap::from([("n", "\n"), ("t", "\t")]));

/// One instruction of a replacement program
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatElement {
    /// Emit the text verbatim
    Literal { text: String },
    /// Emit the prefix, then the topic level at the zero-based index if present
    LevelRef { prefix: String, index: usize },
}

/// A compiled replacement program
///
/// Never empty when produced by [`compile_format`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaceFormat {
    elements: Vec<FormatElement>,
}

impl ReplaceFormat {
    /// Create a program from its instructions
    pub fn new(elements: Vec<FormatElement>) -> Self {
        Self { elements }
    }

    /// The instructions in execution order
    pub fn elements(&self) -> &[FormatElement] {
        &self.elements
    }

    /// Number of instructions
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Check if the program has no instructions
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Iterate over the instructions
    pub fn iter(&self) -> std::slice::Iter<'_, FormatElement> {
        self.elements.iter()
    }
}

impl From<Vec<FormatElement>> for ReplaceFormat {
    fn from(elements: Vec<FormatElement>) -> Self {
        Self::new(elements)
    }
}

impl<'a> IntoIterator for &'a ReplaceFormat {
    type Item = &'a FormatElement;
    type IntoIter = std::slice::Iter<'a, FormatElement>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}

/// Compile a format string into a replacement program
///
/// Returns `None` when the format is empty or nothing survives compilation;
/// such programs are never registered. Malformed escapes are logged and
/// dropped without failing the rest of the format.
pub fn compile_format(format: &str) -> Option<ReplaceFormat> {
    if format.is_empty() {
        return None;
    }

    let mut elements = Vec::new();
    let mut prefix = String::new();
    let mut pos = 0;

    while pos < format.len() {
        let Some(caps) = FORMAT_SEGMENT_RE.captures_at(format, pos) else {
            break;
        };

        let end = caps.get(0).map_or(pos, |m| m.end());
        if end == pos {
            // Only a lone trailing '\' fails to make progress.
            let err = FormatError::DanglingEscape { offset: pos };
            tracing::warn!(format = %format, error = %err, "Format error");
            break;
        }
        pos = end;

        if let Some(literal) = caps.get(1) {
            prefix.push_str(literal.as_str());
        }

        if let Some(index) = caps.get(2) {
            match parse_level_index(index.as_str()) {
                Ok(index) => elements.push(FormatElement::LevelRef {
                    prefix: std::mem::take(&mut prefix),
                    index,
                }),
                Err(err) => {
                    tracing::warn!(format = %format, error = %err, "Format error");
                }
            }
        } else if let Some(escape) = caps.get(3) {
            prefix.push_str(resolve_escape(escape.as_str()));
        }
    }

    if !prefix.is_empty() {
        elements.push(FormatElement::Literal { text: prefix });
    }

    if elements.is_empty() {
        None
    } else {
        Some(ReplaceFormat::new(elements))
    }
}

/// Convert a 1-based level index to a zero-based one
fn parse_level_index(index: &str) -> Result<usize, FormatError> {
    match index.parse::<usize>() {
        Ok(value) if value > 0 => Ok(value - 1),
        _ => Err(FormatError::InvalidLevelIndex {
            index: index.to_string(),
        }),
    }
}

fn resolve_escape(escape: &str) -> &str {
    ESCAPES.get(escape).copied().unwrap_or(escape)
}

/// Run one instruction, appending its output to `out`
pub fn apply_element(element: &FormatElement, levels: &TopicLevels<'_>, out: &mut String) {
    match element {
        FormatElement::Literal { text } => out.push_str(text),
        FormatElement::LevelRef { prefix, index } => {
            out.push_str(prefix);
            if let Some(level) = levels.get(*index) {
                out.push_str(level);
            }
        }
    }
}

/// Run a whole program, appending its output to `out`
pub fn apply_format(format: &ReplaceFormat, levels: &TopicLevels<'_>, out: &mut String) {
    for element in format {
        apply_element(element, levels, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn literal(text: &str) -> FormatElement {
        FormatElement::Literal {
            text: text.to_string(),
        }
    }

    fn level(prefix: &str, index: usize) -> FormatElement {
        FormatElement::LevelRef {
            prefix: prefix.to_string(),
            index,
        }
    }

    fn run(format: &str, topic: &str) -> String {
        let format = compile_format(format).unwrap();
        let mut out = String::new();
        apply_format(&format, &TopicLevels::new(topic), &mut out);
        out
    }

    // ==========================================================================
    // Compile tests
    // ==========================================================================

    #[test]
    fn test_compile_empty() {
        assert!(compile_format("").is_none());
    }

    #[test]
    fn test_compile_literal_only() {
        let format = compile_format("kitchen").unwrap();
        assert_eq!(format.elements(), &[literal("kitchen")]);
    }

    #[test]
    fn test_compile_level_consumes_prefix() {
        let format = compile_format(r"prefix\1suffix").unwrap();
        assert_eq!(format.elements(), &[level("prefix", 0), literal("suffix")]);
    }

    #[test]
    fn test_compile_adjacent_levels() {
        let format = compile_format(r"\1\2/\3").unwrap();
        assert_eq!(
            format.elements(),
            &[level("", 0), level("", 1), level("/", 2)]
        );
    }

    #[test]
    fn test_compile_two_digit_index() {
        let format = compile_format(r"\12").unwrap();
        assert_eq!(format.elements(), &[level("", 11)]);

        // Only two digits belong to the index
        let format = compile_format(r"\123").unwrap();
        assert_eq!(format.elements(), &[level("", 11), literal("3")]);
    }

    #[test]
    fn test_compile_zero_index_dropped() {
        let format = compile_format(r"a\0b\1").unwrap();
        assert_eq!(format.elements(), &[level("ab", 0)]);

        let format = compile_format(r"\00x").unwrap();
        assert_eq!(format.elements(), &[literal("x")]);

        assert!(compile_format(r"\0").is_none());
    }

    #[test]
    fn test_compile_character_escapes() {
        let format = compile_format(r"a\tb\nc").unwrap();
        assert_eq!(format.elements(), &[literal("a\tb\nc")]);
    }

    #[test]
    fn test_compile_identity_escapes() {
        let format = compile_format(r"a\\b\xc\/").unwrap();
        assert_eq!(format.elements(), &[literal(r"a\bxc/")]);
    }

    #[test]
    fn test_compile_escaped_newline_character() {
        let format = compile_format("a\\\nb").unwrap();
        assert_eq!(format.elements(), &[literal("a\nb")]);
    }

    #[test]
    fn test_compile_non_ascii_digits_are_characters() {
        let format = compile_format("x\\1\u{0663}").unwrap();
        assert_eq!(format.elements(), &[level("x", 0), literal("\u{0663}")]);

        let format = compile_format("a\\\u{0663}b").unwrap();
        assert_eq!(format.elements(), &[literal("a\u{0663}b")]);
    }

    #[test]
    fn test_compile_trailing_backslash_dropped() {
        let format = compile_format(r"abc\").unwrap();
        assert_eq!(format.elements(), &[literal("abc")]);

        assert!(compile_format(r"\").is_none());
    }

    #[test]
    fn test_parse_level_index() {
        assert_eq!(parse_level_index("1"), Ok(0));
        assert_eq!(parse_level_index("99"), Ok(98));
        assert!(matches!(
            parse_level_index("0"),
            Err(FormatError::InvalidLevelIndex { .. })
        ));
    }

    // ==========================================================================
    // Apply tests
    // ==========================================================================

    #[test]
    fn test_apply_levels() {
        assert_eq!(run(r"room\2", "sensors/kitchen"), "roomkitchen");
        assert_eq!(run(r"\2-\1", "a/b"), "b-a");
    }

    #[test]
    fn test_apply_out_of_range_emits_prefix_only() {
        assert_eq!(run(r"x\5y", "a/b"), "xy");
        assert_eq!(run(r"pre\9", "a"), "pre");
    }

    #[test]
    fn test_apply_appends_to_output() {
        let format = compile_format(r"-\1").unwrap();
        let mut out = String::from("start");
        apply_format(&format, &TopicLevels::new("a"), &mut out);
        assert_eq!(out, "start-a");
    }

    #[test]
    fn test_apply_element_literal_ignores_levels() {
        let mut out = String::new();
        apply_element(&literal("fixed"), &TopicLevels::new("a/b"), &mut out);
        assert_eq!(out, "fixed");
    }
}
