use std::io::{Cursor, Write};

use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use super::ocr::{EngineState, OcrEngineCell, OcrOptions};
use super::pdf::detect_table_rows;
use super::*;
use crate::extract::{ParseOptions, parse_text};

fn docx_bytes(document_xml: &str) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);

    writer
        .start_file("[Content_Types].xml", options)
        .expect("start content types");
    writer
        .write_all(br#"<?xml version="1.0" encoding="UTF-8"?><Types/>"#)
        .expect("write content types");
    writer
        .start_file("word/document.xml", options)
        .expect("start document part");
    writer
        .write_all(document_xml.as_bytes())
        .expect("write document part");

    writer.finish().expect("finish docx").into_inner()
}

fn paragraph(text: &str) -> String {
    format!("<w:p><w:r><w:t>{text}</w:t></w:r></w:p>")
}

fn document(body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
    )
}

fn unavailable_ocr() -> OcrEngineCell {
    OcrEngineCell::with_state(EngineState::Unavailable("not installed".to_string()))
}

#[test]
fn docx_caption_repeating_a_paragraph_appears_once() {
    let body = format!(
        "{}{}<w:tbl><w:tr><w:tc>{}</w:tc><w:tc>{}</w:tc></w:tr><w:tr><w:tc>{}</w:tc><w:tc>{}</w:tc></w:tr></w:tbl>",
        paragraph("个人简历"),
        paragraph("姓名：张三"),
        paragraph("个人简历"),
        paragraph("求职意向：后端工程师"),
        paragraph("邮箱：zhangsan@example.com"),
        paragraph("姓名：张三"),
    );
    let bytes = docx_bytes(&document(&body));

    let acquisition = acquire(
        &bytes,
        SourceKind::Word,
        &OcrOptions::default(),
        &unavailable_ocr(),
    );

    assert_eq!(
        acquisition.text,
        "个人简历\n姓名：张三\n求职意向：后端工程师\n邮箱：zhangsan@example.com"
    );
    assert_eq!(acquisition.text.matches("个人简历").count(), 1);
    assert_eq!(
        acquisition.reports,
        vec![
            ChannelReport {
                channel: Channel::WordParagraphs,
                outcome: StageOutcome::Produced(2),
            },
            ChannelReport {
                channel: Channel::WordTables,
                outcome: StageOutcome::Produced(2),
            },
        ]
    );
}

#[test]
fn docx_without_document_part_degrades_to_empty_text() {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file("docProps/core.xml", SimpleFileOptions::default())
        .expect("start part");
    writer.write_all(b"<coreProperties/>").expect("write part");
    let bytes = writer.finish().expect("finish zip").into_inner();

    let acquisition = acquire(
        &bytes,
        SourceKind::Word,
        &OcrOptions::default(),
        &unavailable_ocr(),
    );

    assert!(acquisition.text.is_empty());
    assert_eq!(acquisition.warnings().count(), 2);
}

#[test]
fn empty_input_yields_empty_stream_for_every_kind() {
    for kind in [SourceKind::Word, SourceKind::Pdf] {
        let acquisition = acquire(&[], kind, &OcrOptions::default(), &unavailable_ocr());
        assert!(acquisition.text.is_empty());
        assert!(acquisition.reports.is_empty());
    }
}

#[test]
fn garbage_pdf_never_panics() {
    let acquisition = acquire(
        b"%PDF-1.7 truncated",
        SourceKind::Pdf,
        &OcrOptions::default(),
        &unavailable_ocr(),
    );

    assert!(acquisition.text.trim().is_empty());
}

#[test]
fn merge_keeps_channel_order_and_records_failures() {
    let acquisition = merge(vec![
        ChannelOutput::new(
            Channel::PdfTextLayer { page: 1 },
            StageOutcome::Produced(vec!["姓名：张三\n\n工作经历".to_string()]),
        ),
        ChannelOutput::new(
            Channel::PdfTable { page: 1 },
            StageOutcome::Produced(vec![
                "  姓名：张三\n\n工作经历 ".to_string(),
                "学历 本科".to_string(),
                "   ".to_string(),
            ]),
        ),
        ChannelOutput::new(Channel::Ocr, StageOutcome::Failed("timed out".to_string())),
        ChannelOutput::new(Channel::PdfTextLayer { page: 2 }, StageOutcome::Empty),
    ]);

    assert_eq!(acquisition.text, "姓名：张三\n\n工作经历\n学历 本科");
    assert_eq!(acquisition.reports[0].outcome, StageOutcome::Produced(2));
    assert_eq!(acquisition.reports[1].outcome, StageOutcome::Produced(1));
    assert!(acquisition.reports[2].outcome.is_failed());
    assert_eq!(acquisition.reports[3].outcome, StageOutcome::Empty);
    assert_eq!(acquisition.warnings().count(), 1);
}

#[test]
fn pdf_table_rows_repeating_text_layer_lines_are_dropped() {
    let page = "工作经历\n2020-07 – 至今 星河科技有限公司\n2020-03 – 2020-06 云帆网络公司\n";
    let rows = detect_table_rows(
        "2020-07 – 至今    星河科技有限公司\n2020-03 – 2020-06    云帆网络公司",
    );
    assert_eq!(rows.len(), 2);

    let acquisition = merge(vec![
        ChannelOutput::new(
            Channel::PdfTextLayer { page: 1 },
            StageOutcome::from_fragments(vec![page.to_string()]),
        ),
        ChannelOutput::new(Channel::PdfTable { page: 1 }, StageOutcome::from_fragments(rows)),
    ]);

    assert_eq!(
        acquisition.text,
        "工作经历\n2020-07 – 至今 星河科技有限公司\n2020-03 – 2020-06 云帆网络公司"
    );
    assert_eq!(acquisition.reports[0].outcome, StageOutcome::Produced(3));
    assert_eq!(acquisition.reports[1].outcome, StageOutcome::Produced(0));

    let record = parse_text(&acquisition.text, &ParseOptions::default());
    assert_eq!(record.employment_history.len(), 2);
    assert_eq!(
        record.employment_history[0].start_time.as_deref(),
        Some("2020-07")
    );
    assert_eq!(
        record.employment_history[1].start_time.as_deref(),
        Some("2020-03")
    );
}

#[test]
fn blank_lines_separate_only_emitted_lines() {
    let acquisition = merge(vec![
        ChannelOutput::new(
            Channel::PdfTextLayer { page: 1 },
            StageOutcome::Produced(vec!["\n\n教育经历\n\n\n学校：浙江大学\n\n".to_string()]),
        ),
        ChannelOutput::new(
            Channel::PdfTextLayer { page: 2 },
            StageOutcome::Produced(vec!["学校：浙江大学\n\n学历：本科".to_string()]),
        ),
    ]);

    assert_eq!(acquisition.text, "教育经历\n\n学校：浙江大学\n学历：本科");
}

#[test]
fn reports_serialize_with_channel_and_status_tags() {
    let report = ChannelReport {
        channel: Channel::PdfTable { page: 3 },
        outcome: StageOutcome::Produced(4),
    };

    let value = serde_json::to_value(&report).expect("serialize report");

    assert_eq!(
        value,
        serde_json::json!({
            "channel": { "channel": "pdf_table", "page": 3 },
            "outcome": { "status": "produced", "detail": 4 }
        })
    );
}
