use std::collections::HashSet;
use std::io::{Cursor, Read};

use anyhow::{Context, Result};
use quick_xml::Reader;
use quick_xml::events::Event;
use zip::ZipArchive;

use super::{Channel, ChannelOutput, StageOutcome};

const DOCUMENT_PART: &str = "word/document.xml";

/// Text of a `.docx` body after de-duplication.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DocxText {
    /// Body paragraphs outside tables, in document order.
    pub paragraphs: Vec<String>,
    /// One line per table row: the row's unseen non-empty cells joined by a
    /// single space.
    pub table_rows: Vec<String>,
}

/// Raw body structure before de-duplication.
#[derive(Debug, Default)]
struct DocxBody {
    paragraphs: Vec<String>,
    rows: Vec<Vec<String>>,
}

pub fn channels(bytes: &[u8]) -> Vec<ChannelOutput> {
    match read_docx(bytes) {
        Ok(document) => vec![
            ChannelOutput::new(
                Channel::WordParagraphs,
                StageOutcome::from_fragments(document.paragraphs),
            ),
            ChannelOutput::new(
                Channel::WordTables,
                StageOutcome::from_fragments(document.table_rows),
            ),
        ],
        Err(err) => {
            let reason = format!("{err:#}");
            vec![
                ChannelOutput::new(Channel::WordParagraphs, StageOutcome::Failed(reason.clone())),
                ChannelOutput::new(Channel::WordTables, StageOutcome::Failed(reason)),
            ]
        }
    }
}

pub fn read_docx(bytes: &[u8]) -> Result<DocxText> {
    let mut archive =
        ZipArchive::new(Cursor::new(bytes)).context("failed to open docx container")?;

    let mut xml = String::new();
    archive
        .by_name(DOCUMENT_PART)
        .with_context(|| format!("docx container has no {DOCUMENT_PART}"))?
        .read_to_string(&mut xml)
        .with_context(|| format!("failed to read {DOCUMENT_PART}"))?;

    let body = parse_body(&xml)?;
    Ok(deduplicate(body))
}

fn parse_body(xml: &str) -> Result<DocxBody> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();

    let mut body = DocxBody::default();
    let mut table_depth = 0_usize;
    let mut open_paragraphs = Vec::<String>::new();
    let mut in_text = false;
    // `w:tab` inside `w:tabs` is a tab stop definition, not content.
    let mut in_tab_stops = false;
    let mut row: Option<Vec<String>> = None;
    let mut cell: Option<Vec<String>> = None;

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .with_context(|| format!("malformed xml at byte {}", reader.buffer_position()))?;

        match event {
            Event::Start(element) => match element.local_name().as_ref() {
                b"tbl" => table_depth += 1,
                b"tr" if table_depth == 1 => row = Some(Vec::new()),
                b"tc" if table_depth == 1 => cell = Some(Vec::new()),
                b"p" => open_paragraphs.push(String::new()),
                b"t" => in_text = true,
                b"tabs" => in_tab_stops = true,
                name if !in_tab_stops => push_break(name, &mut open_paragraphs),
                _ => {}
            },
            Event::Empty(element) if !in_tab_stops => {
                push_break(element.local_name().as_ref(), &mut open_paragraphs)
            }
            Event::Text(text) if in_text => {
                let value = text.unescape().context("invalid text escape in docx")?;
                if let Some(paragraph) = open_paragraphs.last_mut() {
                    paragraph.push_str(&value);
                }
            }
            Event::End(element) => match element.local_name().as_ref() {
                b"t" => in_text = false,
                b"tabs" => in_tab_stops = false,
                b"p" => {
                    if let Some(paragraph) = open_paragraphs.pop() {
                        let paragraph = paragraph.trim().to_string();
                        if table_depth == 0 {
                            body.paragraphs.push(paragraph);
                        } else if let Some(cell) = cell.as_mut() {
                            cell.push(paragraph);
                        }
                    }
                }
                b"tc" if table_depth == 1 => {
                    if let (Some(paragraphs), Some(row)) = (cell.take(), row.as_mut()) {
                        row.push(paragraphs.join("\n").trim().to_string());
                    }
                }
                b"tr" if table_depth == 1 => {
                    if let Some(row) = row.take() {
                        body.rows.push(row);
                    }
                }
                b"tbl" => table_depth = table_depth.saturating_sub(1),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(body)
}

fn push_break(name: &[u8], open_paragraphs: &mut [String]) {
    let separator = match name {
        b"tab" => '\t',
        b"br" | b"cr" => '\n',
        _ => return,
    };
    if let Some(paragraph) = open_paragraphs.last_mut() {
        paragraph.push(separator);
    }
}

/// One seen-set keyed on the exact trimmed text covers paragraphs and cells.
fn deduplicate(body: DocxBody) -> DocxText {
    let mut seen = HashSet::<String>::new();
    let mut text = DocxText::default();

    for paragraph in body.paragraphs {
        if paragraph.is_empty() || !seen.insert(paragraph.clone()) {
            continue;
        }
        text.paragraphs.push(paragraph);
    }

    for row in body.rows {
        let cells = row
            .into_iter()
            .map(|cell| cell.trim().to_string())
            .filter(|cell| !cell.is_empty() && seen.insert(cell.clone()))
            .collect::<Vec<String>>();
        if !cells.is_empty() {
            text.table_rows.push(cells.join(" "));
        }
    }

    text
}
