//! Turns document bytes into one de-duplicated plain-text stream.
//!
//! Every source of text is a [`Channel`]. Channels report a [`StageOutcome`]
//! and are folded into the stream in channel order; a failing channel is
//! logged and recorded, and the remaining channels still contribute.

pub mod ocr;
pub mod pdf;
pub mod word;

#[cfg(test)]
mod tests;

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, warn};

use crate::model::SourceKind;

use self::ocr::{OcrEngineCell, OcrOptions};

/// A source of text inside a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "channel", rename_all = "snake_case")]
pub enum Channel {
    WordParagraphs,
    WordTables,
    PdfTextLayer { page: usize },
    PdfTable { page: usize },
    Ocr,
}

impl Channel {
    pub fn label(self) -> String {
        match self {
            Self::WordParagraphs => "word_paragraphs".to_string(),
            Self::WordTables => "word_tables".to_string(),
            Self::PdfTextLayer { page } => format!("pdf_text_layer[page {page}]"),
            Self::PdfTable { page } => format!("pdf_table[page {page}]"),
            Self::Ocr => "ocr".to_string(),
        }
    }
}

/// Explicit result of one acquisition stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum StageOutcome<T> {
    Produced(T),
    Empty,
    Failed(String),
}

impl<T> StageOutcome<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> StageOutcome<U> {
        match self {
            Self::Produced(value) => StageOutcome::Produced(f(value)),
            Self::Empty => StageOutcome::Empty,
            Self::Failed(reason) => StageOutcome::Failed(reason),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

impl StageOutcome<Vec<String>> {
    /// `Empty` when no fragment carries text.
    pub fn from_fragments(fragments: Vec<String>) -> Self {
        if fragments.iter().all(|fragment| fragment.trim().is_empty()) {
            Self::Empty
        } else {
            Self::Produced(fragments)
        }
    }
}

/// What one channel yielded, before merging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelOutput {
    pub channel: Channel,
    pub outcome: StageOutcome<Vec<String>>,
}

impl ChannelOutput {
    pub fn new(channel: Channel, outcome: StageOutcome<Vec<String>>) -> Self {
        Self { channel, outcome }
    }
}

/// Provenance of one channel; `Produced` carries the number of text lines
/// that survived de-duplication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelReport {
    pub channel: Channel,
    pub outcome: StageOutcome<usize>,
}

/// The acquired stream plus per-channel provenance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Acquisition {
    pub text: String,
    pub reports: Vec<ChannelReport>,
}

impl Acquisition {
    pub fn warnings(&self) -> impl Iterator<Item = &ChannelReport> {
        self.reports.iter().filter(|report| report.outcome.is_failed())
    }
}

/// Acquires the text of `bytes` as declared by `kind`. Never fails: an
/// unreadable document yields an empty stream.
pub fn acquire(
    bytes: &[u8],
    kind: SourceKind,
    options: &OcrOptions,
    ocr: &OcrEngineCell,
) -> Acquisition {
    if bytes.is_empty() {
        debug!(kind = kind.as_str(), "empty document");
        return Acquisition::default();
    }

    let outputs = match kind {
        SourceKind::Word => word::channels(bytes),
        SourceKind::Pdf => pdf::channels(bytes, options, ocr),
    };
    merge(outputs)
}

/// Folds channel outputs into one stream in channel order. Fragments are
/// read line by line: a line whose trimmed text was already emitted is
/// dropped, and blank lines survive only as single separators.
pub fn merge(outputs: Vec<ChannelOutput>) -> Acquisition {
    let mut seen = HashSet::<String>::new();
    let mut lines = Vec::<String>::new();
    let mut reports = Vec::with_capacity(outputs.len());

    for ChannelOutput { channel, outcome } in outputs {
        if let StageOutcome::Failed(reason) = &outcome {
            warn!(channel = %channel.label(), reason = %reason, "channel failed");
        }

        let outcome = outcome.map(|fragments| {
            let mut emitted = 0;
            for fragment in &fragments {
                emitted += push_fragment(fragment, &mut seen, &mut lines);
            }
            emitted
        });
        reports.push(ChannelReport { channel, outcome });
    }

    Acquisition {
        text: lines.join("\n"),
        reports,
    }
}

/// Appends the unseen lines of one fragment and returns how many text lines
/// it contributed. A blank line is kept only between two emitted lines.
fn push_fragment(fragment: &str, seen: &mut HashSet<String>, lines: &mut Vec<String>) -> usize {
    let mut emitted = 0;
    let mut pending_blank = false;
    for line in fragment.lines().map(str::trim) {
        if line.is_empty() {
            pending_blank = emitted > 0;
            continue;
        }
        if !seen.insert(line.to_string()) {
            continue;
        }
        if std::mem::take(&mut pending_blank) {
            lines.push(String::new());
        }
        lines.push(line.to_string());
        emitted += 1;
    }
    emitted
}
