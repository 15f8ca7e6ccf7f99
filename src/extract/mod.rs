//! Extraction pipeline: acquired text in, fixed-schema [`Record`] out.

pub mod entries;
pub mod fields;
pub mod sections;
pub mod time_range;

#[cfg(test)]
mod tests;

use serde::Serialize;
use tracing::{debug, error};

use crate::acquire::ocr::{OcrEngineCell, OcrOptions, global_engine};
use crate::acquire::{Acquisition, acquire};
use crate::model::{EntryRole, Record, Section, SourceKind};
use crate::patterns::rules;

use self::sections::{SectionSpan, extract_section};

#[derive(Debug, Clone, PartialEq)]
pub struct ParseOptions {
    /// Longest accepted scalar field value, in characters.
    pub field_max_chars: usize,
    /// Section text is truncated to this many characters.
    pub section_max_chars: usize,
    pub ocr: OcrOptions,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            field_max_chars: 100,
            section_max_chars: 500,
            ocr: OcrOptions::default(),
        }
    }
}

/// A record together with the provenance of its text.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParseOutcome {
    pub record: Record,
    pub acquisition: Acquisition,
}

/// Parses a document with default options and the process-wide OCR engine.
pub fn parse(bytes: &[u8], kind: SourceKind) -> Record {
    parse_with(bytes, kind, &ParseOptions::default(), global_engine()).record
}

pub fn parse_with(
    bytes: &[u8],
    kind: SourceKind,
    options: &ParseOptions,
    ocr: &OcrEngineCell,
) -> ParseOutcome {
    let acquisition = acquire(bytes, kind, &options.ocr, ocr);
    let record = parse_text(&acquisition.text, options);
    ParseOutcome {
        record,
        acquisition,
    }
}

/// Runs field, section and entry extraction over an acquired text stream.
pub fn parse_text(text: &str, options: &ParseOptions) -> Record {
    let mut record = Record::default();
    if text.trim().is_empty() {
        return record;
    }

    let rules = match rules() {
        Ok(rules) => rules,
        Err(err) => {
            error!(error = %format!("{err:#}"), "pattern rules unavailable");
            return record;
        }
    };

    fields::extract_fields(text, &rules.fields, options.field_max_chars, &mut record);

    let spans = Section::ALL
        .into_iter()
        .filter_map(|section| {
            extract_section(text, section, rules, options.section_max_chars)
        })
        .collect::<Vec<SectionSpan>>();

    for span in &spans {
        if span.section.entry_role().is_none() {
            record.set_section_text(span.section, Some(span.text.clone()));
        }
    }

    for role in [EntryRole::Education, EntryRole::Employment] {
        let span = spans.iter().find(|span| span.section == role.section());
        let entries = entries::reconstruct(text, role, span, &spans, rules);
        record.set_entries(role, entries);
    }

    debug!(
        sections = spans.len(),
        education = record.education_history.len(),
        employment = record.employment_history.len(),
        "record assembled"
    );

    record
}
