use regex::Regex;

use crate::model::{Field, Record};
use crate::patterns::PatternTable;

/// Returns the first acceptable capture of `patterns` over `text`.
///
/// Patterns are tried strictly in order. A capture is accepted when its
/// trimmed value is non-empty and at most `max_chars` characters long;
/// otherwise the next pattern is tried.
pub fn extract_field(text: &str, patterns: &[Regex], max_chars: usize) -> Option<String> {
    for pattern in patterns {
        let Some(captures) = pattern.captures(text) else {
            continue;
        };
        let Some(value) = captures.get(1) else {
            continue;
        };

        let value = value.as_str().trim();
        if !value.is_empty() && value.chars().count() <= max_chars {
            return Some(value.to_string());
        }
    }

    None
}

/// Fills every scalar field of `record` from `text`.
pub fn extract_fields(
    text: &str,
    table: &PatternTable<Field>,
    max_chars: usize,
    record: &mut Record,
) {
    for field in Field::ALL {
        let value = extract_field(text, table.patterns(field), max_chars);
        record.set_field(field, value);
    }
}
