use regex::Captures;

use crate::model::Entry;
use crate::patterns::RuleSet;

/// Outcome of reading a captured `start – end` string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeRange {
    Bounded { start: String, end: String },
    /// Kept verbatim when no split could be made.
    Verbatim(String),
}

impl TimeRange {
    pub fn apply_to(self, entry: &mut Entry) {
        match self {
            TimeRange::Bounded { start, end } => {
                entry.start_time = Some(start);
                entry.end_time = Some(end);
            }
            TimeRange::Verbatim(raw) => entry.time_range = Some(raw),
        }
    }
}

/// Splits a captured range into start and end.
///
/// The precise `YYYY-MM <dash> (YYYY-MM | token)` form is tried first so the
/// hyphen inside a `YYYY-MM` token is never mistaken for the separator. Then
/// a string that is exactly one time anchor is read from the anchor's own
/// groups, which also covers `至今` without a dash and `～` / `到`
/// separators. Last, the raw string is split on any dash with optional
/// surrounding spaces; exactly two non-empty parts become start and end.
/// Anything else is kept verbatim.
pub fn parse_time_range(raw: &str, rules: &RuleSet) -> Option<TimeRange> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Some(captures) = rules.precise_range.captures(raw)
        && let (Some(start), Some(end)) = (captures.get(1), captures.get(2))
    {
        return Some(TimeRange::Bounded {
            start: start.as_str().trim().to_string(),
            end: end.as_str().trim().to_string(),
        });
    }

    if let Some(captures) = rules.time_anchor.captures(raw)
        && captures.get(0).is_some_and(|whole| whole.len() == raw.len())
        && let Some(range) = anchor_time_range(&captures)
    {
        return Some(range);
    }

    let parts = rules
        .dash_split
        .split(raw)
        .map(str::trim)
        .collect::<Vec<&str>>();
    if let [start, end] = parts.as_slice()
        && !start.is_empty()
        && !end.is_empty()
    {
        return Some(TimeRange::Bounded {
            start: start.to_string(),
            end: end.to_string(),
        });
    }

    Some(TimeRange::Verbatim(raw.to_string()))
}

/// Reads a time-anchor match from its `start` group and its `end` or
/// `open` group.
pub fn anchor_time_range(captures: &Captures<'_>) -> Option<TimeRange> {
    let start = captures.name("start")?.as_str().trim();
    let end = captures
        .name("end")
        .or_else(|| captures.name("open"))?
        .as_str()
        .trim();

    Some(TimeRange::Bounded {
        start: start.to_string(),
        end: end.to_string(),
    })
}
