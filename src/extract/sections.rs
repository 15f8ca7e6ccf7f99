use crate::model::Section;
use crate::patterns::RuleSet;

/// Text attributed to one section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionSpan {
    pub section: Section,
    /// Byte offset of the matched header.
    pub header_start: usize,
    /// Byte range of the raw span, right after the header up to the next
    /// header of another section.
    pub start: usize,
    pub end: usize,
    /// Trimmed, blank-line-collapsed and truncated span text.
    pub text: String,
}

impl SectionSpan {
    pub fn contains(&self, offset: usize) -> bool {
        offset >= self.header_start && offset < self.end
    }
}

/// Isolates the span of `section` inside `text`.
///
/// Aliases are tried in order; the first alias whose span is non-empty after
/// cleanup wins. Only the first occurrence of an alias is considered.
pub fn extract_section(
    text: &str,
    section: Section,
    rules: &RuleSet,
    max_chars: usize,
) -> Option<SectionSpan> {
    for alias in rules.section_aliases(section) {
        let Some(header) = alias.find(text) else {
            continue;
        };

        let start = header.end();
        let end = next_foreign_header(text, start, section, rules).unwrap_or(text.len());
        let cleaned = clean_section_text(&text[start..end], max_chars);
        if cleaned.is_empty() {
            continue;
        }

        return Some(SectionSpan {
            section,
            header_start: header.start(),
            start,
            end,
            text: cleaned,
        });
    }

    None
}

/// Earliest offset at or after `from` where a header of any section other
/// than `section` begins.
fn next_foreign_header(
    text: &str,
    from: usize,
    section: Section,
    rules: &RuleSet,
) -> Option<usize> {
    let tail = &text[from..];
    rules
        .sections
        .iter()
        .filter(|header| header.section != section)
        .flat_map(|header| header.aliases.iter())
        .filter_map(|alias| alias.find(tail).map(|found| from + found.start()))
        .min()
}

/// Sorted start offsets of every header occurrence of every section.
pub fn header_offsets(text: &str, rules: &RuleSet) -> Vec<usize> {
    let mut offsets = rules
        .sections
        .iter()
        .flat_map(|header| header.aliases.iter())
        .flat_map(|alias| alias.find_iter(text).map(|found| found.start()))
        .collect::<Vec<usize>>();
    offsets.sort_unstable();
    offsets.dedup();
    offsets
}

fn clean_section_text(raw: &str, max_chars: usize) -> String {
    let mut lines = Vec::<&str>::new();
    let mut previous_blank = false;
    for line in raw.trim().lines() {
        let line = line.trim_end();
        if line.trim().is_empty() {
            if !previous_blank {
                lines.push("");
            }
            previous_blank = true;
            continue;
        }
        lines.push(line);
        previous_blank = false;
    }

    let collapsed = lines.join("\n");
    let collapsed = collapsed.trim();
    if collapsed.chars().count() <= max_chars {
        return collapsed.to_string();
    }

    collapsed
        .chars()
        .take(max_chars)
        .collect::<String>()
        .trim_end()
        .to_string()
}
