//! Reconstruction of repeated education / employment entries.
//!
//! Two strategies exist. When the section span was isolated, the span is
//! cut into blocks and each block is read with labeled patterns. Without a
//! span, every time anchor in the whole document opens a window that runs to
//! the next anchor or section header, and windows are read with labeled
//! patterns first and keyword fallbacks second.

use tracing::debug;

use crate::extract::fields::extract_field;
use crate::extract::sections::{SectionSpan, header_offsets};
use crate::extract::time_range::{anchor_time_range, parse_time_range};
use crate::model::{Attribute, Entry, EntryRole};
use crate::patterns::RuleSet;

/// Builds the ordered entry list for `role`.
///
/// `span` is the role's own isolated section, if any; its raw byte range is
/// read so section truncation never cuts an entry. `claimed` lists every
/// isolated section span; anchors inside them are never read by the
/// whole-document fallback.
pub fn reconstruct(
    text: &str,
    role: EntryRole,
    span: Option<&SectionSpan>,
    claimed: &[SectionSpan],
    rules: &RuleSet,
) -> Vec<Entry> {
    let entries = match span {
        Some(span) => segmented_entries(&text[span.start..span.end], role, rules),
        None => anchored_entries(text, role, claimed, rules),
    };

    debug!(
        role = role.as_str(),
        strategy = if span.is_some() { "segmented" } else { "anchored" },
        entries = entries.len(),
        "reconstructed entries"
    );

    entries
}

/// Reads entries from an isolated section span.
pub fn segmented_entries(span_text: &str, role: EntryRole, rules: &RuleSet) -> Vec<Entry> {
    split_blocks(span_text, rules)
        .iter()
        .filter_map(|block| block_entry(block, role, rules))
        .collect()
}

/// Cuts a span at blank lines and right before every line that opens with a
/// time label or a bare time range.
fn split_blocks(text: &str, rules: &RuleSet) -> Vec<String> {
    let mut blocks = Vec::<String>::new();
    let mut current = Vec::<&str>::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            flush_block(&mut current, &mut blocks);
            continue;
        }

        if rules.time_line.is_match(line) {
            flush_block(&mut current, &mut blocks);
        }
        current.push(line);
    }
    flush_block(&mut current, &mut blocks);

    blocks
}

fn flush_block(current: &mut Vec<&str>, blocks: &mut Vec<String>) {
    if current.is_empty() {
        return;
    }
    blocks.push(current.join("\n"));
    current.clear();
}

fn block_entry(block: &str, role: EntryRole, rules: &RuleSet) -> Option<Entry> {
    let mut entry = Entry::default();

    let range = match rules
        .time_label
        .captures(block)
        .and_then(|captures| captures.get(1))
    {
        Some(labeled) => parse_time_range(labeled.as_str(), rules),
        None => rules
            .time_anchor
            .captures(block)
            .and_then(|captures| anchor_time_range(&captures)),
    };
    if let Some(range) = range {
        range.apply_to(&mut entry);
    }

    for attribute in role.attributes() {
        if let Some(value) = labeled_attribute(block, *attribute, rules) {
            entry.set(*attribute, value);
        }
    }

    (!entry.is_empty()).then_some(entry)
}

/// Reads entries anchored on every time range of the whole document.
pub fn anchored_entries(
    text: &str,
    role: EntryRole,
    claimed: &[SectionSpan],
    rules: &RuleSet,
) -> Vec<Entry> {
    let headers = header_offsets(text, rules);
    let anchors = rules
        .time_anchor
        .captures_iter(text)
        .filter_map(|captures| Some((captures.get(0)?, captures)))
        .filter(|(anchor, _)| !claimed.iter().any(|span| span.contains(anchor.start())))
        .collect::<Vec<_>>();

    let mut entries = Vec::new();
    for (index, (anchor, captures)) in anchors.iter().enumerate() {
        let next_anchor = anchors
            .get(index + 1)
            .map(|(next, _)| next.start())
            .unwrap_or(text.len());
        let next_header = headers
            .iter()
            .copied()
            .find(|offset| *offset >= anchor.end())
            .unwrap_or(text.len());
        let window_end = next_anchor.min(next_header).max(anchor.end());
        let body = &text[anchor.end()..window_end];

        if classify_window(body, rules) != role {
            continue;
        }

        let mut entry = Entry::default();
        let range = anchor_time_range(captures)
            .or_else(|| parse_time_range(anchor.as_str(), rules));
        if let Some(range) = range {
            range.apply_to(&mut entry);
        }
        for attribute in role.attributes() {
            let value = labeled_attribute(body, *attribute, rules)
                .or_else(|| keyword_attribute(body, *attribute, rules));
            if let Some(value) = value {
                entry.set(*attribute, value);
            }
        }

        entries.push(entry);
    }

    entries
}

/// Decides which role a window belongs to by counting the attributes each
/// role can read from it. Ties go to employment.
fn classify_window(body: &str, rules: &RuleSet) -> EntryRole {
    let count = |role: EntryRole| {
        role.attributes()
            .iter()
            .filter(|attribute| {
                labeled_attribute(body, **attribute, rules).is_some()
                    || keyword_attribute(body, **attribute, rules).is_some()
            })
            .count()
    };

    if count(EntryRole::Education) > count(EntryRole::Employment) {
        EntryRole::Education
    } else {
        EntryRole::Employment
    }
}

fn labeled_attribute(text: &str, attribute: Attribute, rules: &RuleSet) -> Option<String> {
    if attribute == Attribute::Responsibilities {
        return responsibilities(text, rules);
    }
    extract_field(text, rules.attribute_labels.patterns(attribute), usize::MAX)
}

fn keyword_attribute(text: &str, attribute: Attribute, rules: &RuleSet) -> Option<String> {
    extract_field(text, rules.attribute_keywords.patterns(attribute), usize::MAX)
}

/// Responsibilities run from their label across following lines until a
/// line opens with another recognized label or a time range. Lines are
/// joined with single spaces.
fn responsibilities(text: &str, rules: &RuleSet) -> Option<String> {
    let start = rules.responsibilities_start.find(text)?;
    let mut lines = text[start.end()..].lines();

    let mut parts = Vec::<&str>::new();
    if let Some(first) = lines.next() {
        parts.push(first.trim());
    }
    for line in lines {
        if rules.entry_label_line.is_match(line) || rules.time_line.is_match(line) {
            break;
        }
        parts.push(line.trim());
    }

    let value = parts
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<&str>>()
        .join(" ");
    (!value.is_empty()).then_some(value)
}
