//! Encodings of a [`Record`] for persistence and export.
//!
//! A persisted row keeps scalars on one line and stores entry lists as JSON
//! strings. Export decodes those strings back and renders entries in the
//! labeled text form the entry reconstructor reads.

use anyhow::{Context, Result};

use crate::model::{Entry, EntryRole, Field, Record, Section};
use crate::util::now_local_row_string;

pub const CAPTURED_AT_COLUMN: &str = "captured_at";

/// Column order of a persisted row, without the trailing timestamp.
pub const ROW_COLUMNS: [&str; 20] = [
    "name",
    "gender",
    "age",
    "political_affiliation",
    "weight",
    "hometown",
    "health_status",
    "height",
    "education_level",
    "graduating_institution",
    "major",
    "job_target",
    "phone",
    "email",
    "education_history",
    "honors",
    "certifications",
    "employment_history",
    "hobbies",
    "self_assessment",
];

/// Encodes `record` as ordered `(column, value)` pairs stamped with the
/// current local time.
pub fn to_row(record: &Record) -> Result<Vec<(&'static str, Option<String>)>> {
    to_row_at(record, now_local_row_string())
}

pub fn to_row_at(
    record: &Record,
    captured_at: String,
) -> Result<Vec<(&'static str, Option<String>)>> {
    let mut row = Vec::with_capacity(ROW_COLUMNS.len() + 1);

    for field in Field::ALL {
        row.push((field.as_str(), record.field(field).map(single_line)));
    }
    for section in Section::ALL {
        let value = match section.entry_role() {
            Some(role) => encode_entries(record.entries(role))?,
            None => record.section_text(section).map(single_line),
        };
        row.push((section.as_str(), value));
    }
    row.push((CAPTURED_AT_COLUMN, Some(captured_at)));

    Ok(row)
}

/// Collapses newlines and whitespace runs to single spaces.
fn single_line(value: &str) -> String {
    value.split_whitespace().collect::<Vec<&str>>().join(" ")
}

/// JSON array of entries on one line; `None` when there are no entries.
pub fn encode_entries(entries: &[Entry]) -> Result<Option<String>> {
    if entries.is_empty() {
        return Ok(None);
    }
    serde_json::to_string(entries)
        .map(Some)
        .context("failed to encode entries as json")
}

/// Decodes a persisted entry list. Doubled quotes left by CSV escaping are
/// undone first; blank input is an empty list.
pub fn decode_entries(raw: &str) -> Result<Vec<Entry>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(Vec::new());
    }

    let unescaped = raw.replace("\"\"", "\"");
    serde_json::from_str(&unescaped)
        .or_else(|_| serde_json::from_str(raw))
        .with_context(|| format!("failed to decode entry list: {raw}"))
}

/// Renders entries as labeled lines, one blank line between entries.
pub fn render_entries(entries: &[Entry], role: EntryRole) -> String {
    entries
        .iter()
        .map(|entry| render_entry(entry, role))
        .filter(|block| !block.is_empty())
        .collect::<Vec<String>>()
        .join("\n\n")
}

fn render_entry(entry: &Entry, role: EntryRole) -> String {
    let mut lines = Vec::new();

    match (&entry.start_time, &entry.end_time, &entry.time_range) {
        (Some(start), Some(end), _) => lines.push(format!("起止时间：{start} – {end}")),
        (_, _, Some(range)) => lines.push(format!("起止时间：{range}")),
        (Some(start), None, None) => lines.push(format!("起止时间：{start}")),
        (None, Some(end), None) => lines.push(format!("起止时间：{end}")),
        (None, None, None) => {}
    }

    for attribute in role.attributes() {
        if let Some(value) = entry.get(*attribute) {
            lines.push(format!("{}：{}", attribute.label(), value));
        }
    }

    lines.join("\n")
}

/// Renders a whole section: its header line followed by the entries.
pub fn render_section(entries: &[Entry], role: EntryRole) -> String {
    let header = match role {
        EntryRole::Education => "教育经历",
        EntryRole::Employment => "工作经历",
    };
    format!("{header}\n{}", render_entries(entries, role))
}
