use std::collections::BTreeSet;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use super::ocr::{OcrEngineCell, OcrOptions, PageRecognizer, recognize_pages};
use super::{Channel, ChannelOutput, StageOutcome};
use crate::util::{non_whitespace_char_count, run_tool};

/// Page 0 stands for the whole document when a tool fails before any page
/// could be told apart.
const WHOLE_DOCUMENT: usize = 0;

pub fn channels(bytes: &[u8], options: &OcrOptions, ocr: &OcrEngineCell) -> Vec<ChannelOutput> {
    let file = match materialize(bytes) {
        Ok(file) => file,
        Err(err) => {
            return vec![ChannelOutput::new(
                Channel::PdfTextLayer {
                    page: WHOLE_DOCUMENT,
                },
                StageOutcome::Failed(format!("{err:#}")),
            )];
        }
    };
    let path = file.path();

    let mut outputs = Vec::new();

    let text_pages = match text_layer_pages(path) {
        Ok(pages) => pages,
        Err(err) => {
            outputs.push(ChannelOutput::new(
                Channel::PdfTextLayer {
                    page: WHOLE_DOCUMENT,
                },
                StageOutcome::Failed(format!("{err:#}")),
            ));
            Vec::new()
        }
    };
    let layout_pages = match layout_pages(path) {
        Ok(pages) => pages,
        Err(err) => {
            outputs.push(ChannelOutput::new(
                Channel::PdfTable {
                    page: WHOLE_DOCUMENT,
                },
                StageOutcome::Failed(format!("{err:#}")),
            ));
            Vec::new()
        }
    };

    let page_count = text_pages.len().max(layout_pages.len());
    for index in 0..page_count {
        let page = index + 1;
        if let Some(text) = text_pages.get(index) {
            outputs.push(ChannelOutput::new(
                Channel::PdfTextLayer { page },
                StageOutcome::from_fragments(vec![text.clone()]),
            ));
        }
        if let Some(layout) = layout_pages.get(index) {
            outputs.push(ChannelOutput::new(
                Channel::PdfTable { page },
                StageOutcome::from_fragments(detect_table_rows(layout)),
            ));
        }
    }

    let text_layer_empty = text_pages
        .iter()
        .all(|page| non_whitespace_char_count(page) == 0);
    if !text_layer_empty {
        return outputs;
    }

    let image_pages = match image_pages(path) {
        Ok(pages) => pages,
        Err(err) => {
            debug!(error = %format!("{err:#}"), "image listing failed");
            Vec::new()
        }
    };
    if !should_run_ocr(text_layer_empty, &image_pages) {
        return outputs;
    }

    if !options.enabled {
        info!(pages = image_pages.len(), "ocr disabled; skipping image-only pages");
        return outputs;
    }

    outputs.push(ChannelOutput::new(
        Channel::Ocr,
        recognize(path, &image_pages, options, ocr),
    ));
    outputs
}

/// OCR runs only when no page has a text layer and at least one page holds
/// raster images.
pub fn should_run_ocr(text_layer_empty: bool, image_pages: &[usize]) -> bool {
    text_layer_empty && !image_pages.is_empty()
}

fn recognize(
    path: &Path,
    pages: &[usize],
    options: &OcrOptions,
    ocr: &OcrEngineCell,
) -> StageOutcome<Vec<String>> {
    let engine = match ocr.engine() {
        Ok(engine) => engine,
        Err(err) => return StageOutcome::Failed(format!("{err:#}")),
    };

    info!(pages = pages.len(), lang = %options.lang, "running ocr");
    recognized_text(engine, path, pages, options)
}

/// Joins the text of every recognized page in page order. Failed or blank
/// pages are logged and contribute nothing.
fn recognized_text<R>(
    recognizer: &R,
    path: &Path,
    pages: &[usize],
    options: &OcrOptions,
) -> StageOutcome<Vec<String>>
where
    R: PageRecognizer + ?Sized,
{
    let mut recognized = Vec::new();
    for (page, result) in recognize_pages(recognizer, path, pages, options) {
        match result {
            Ok(text) if !text.trim().is_empty() => recognized.push(text),
            Ok(_) => debug!(page, "ocr page yielded no confident words"),
            Err(err) => warn!(page, error = %format!("{err:#}"), "ocr page failed"),
        }
    }

    // OCR output is appended as a single final segment.
    StageOutcome::from_fragments(vec![recognized.join("\n")])
}

fn materialize(bytes: &[u8]) -> Result<NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix("cvextract-")
        .suffix(".pdf")
        .tempfile()
        .context("failed to create temporary pdf")?;
    file.write_all(bytes)
        .context("failed to write temporary pdf")?;
    file.flush().context("failed to flush temporary pdf")?;
    Ok(file)
}

fn text_layer_pages(path: &Path) -> Result<Vec<String>> {
    let stdout = run_tool("pdftotext", &["-enc", "UTF-8", &arg(path), "-"], path)?;
    Ok(split_pages(&String::from_utf8_lossy(&stdout)))
}

fn layout_pages(path: &Path) -> Result<Vec<String>> {
    let stdout = run_tool(
        "pdftotext",
        &["-layout", "-enc", "UTF-8", &arg(path), "-"],
        path,
    )?;
    Ok(split_pages(&String::from_utf8_lossy(&stdout)))
}

fn image_pages(path: &Path) -> Result<Vec<usize>> {
    let stdout = run_tool("pdfimages", &["-list", &arg(path)], path)?;
    Ok(parse_image_list(&String::from_utf8_lossy(&stdout)))
}

fn arg(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

/// Splits `pdftotext` output on form feeds. Every page ends with one, so
/// only the trailing chunk after the last form feed is dropped.
pub fn split_pages(raw: &str) -> Vec<String> {
    let mut pages = raw
        .split('\u{000C}')
        .map(|chunk| chunk.replace('\u{0000}', ""))
        .collect::<Vec<String>>();

    if pages.last().is_some_and(|last| last.trim().is_empty()) {
        pages.pop();
    }
    pages
}

/// Page numbers holding at least one image, from `pdfimages -list`.
pub fn parse_image_list(listing: &str) -> Vec<usize> {
    listing
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .filter_map(|token| token.parse::<usize>().ok())
        .collect::<BTreeSet<usize>>()
        .into_iter()
        .collect()
}

/// Finds tables in a layout-preserving page rendering.
///
/// A table is a run of at least two consecutive lines that each split into
/// two or more cells on runs of 2+ spaces. Each row becomes its non-empty
/// cells joined by one space.
pub fn detect_table_rows(layout: &str) -> Vec<String> {
    let mut rows = Vec::new();
    let mut run = Vec::<Vec<&str>>::new();

    for line in layout.lines() {
        let cells = split_cells(line);
        if cells.len() >= 2 {
            run.push(cells);
        } else {
            flush_run(&mut run, &mut rows);
        }
    }
    flush_run(&mut run, &mut rows);

    rows
}

fn split_cells(line: &str) -> Vec<&str> {
    line.split("  ")
        .map(str::trim)
        .filter(|cell| !cell.is_empty())
        .collect()
}

fn flush_run(run: &mut Vec<Vec<&str>>, rows: &mut Vec<String>) {
    if run.len() >= 2 {
        rows.extend(run.iter().map(|cells| cells.join(" ")));
    }
    run.clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_feed_pages_keep_inner_blank_pages() {
        let pages = split_pages("第一页\n\u{000C}\n\u{000C}第三页\u{000C}");

        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0], "第一页\n");
        assert!(pages[1].trim().is_empty());
        assert_eq!(pages[2], "第三页");
    }

    #[test]
    fn image_listing_yields_sorted_unique_pages() {
        let listing = "page   num  type   width height color comp bpc  enc interp  object ID x-ppi y-ppi size ratio\n\
                       --------------------------------------------------------------------------------------------\n\
                          2     0 image    2480  3508  rgb     3   8  jpeg   no         7  0   300   300  523K 2.0%\n\
                          1     1 image    2480  3508  rgb     3   8  jpeg   no        12  0   300   300  498K 1.9%\n\
                          2     2 smask     100   100  gray    1   8  image  no        13  0    72    72  1K 1.0%\n";

        assert_eq!(parse_image_list(listing), vec![1, 2]);
        assert!(parse_image_list("").is_empty());
    }

    #[test]
    fn aligned_runs_become_table_rows() {
        let layout = "个人简历\n\
                      姓名    张三        性别    男\n\
                      学历    本科        专业    软件工程\n\
                      \n\
                      自我评价  认真负责\n";

        assert_eq!(
            detect_table_rows(layout),
            vec![
                "姓名 张三 性别 男".to_string(),
                "学历 本科 专业 软件工程".to_string()
            ]
        );
    }

    #[test]
    fn single_aligned_line_is_not_a_table() {
        assert!(detect_table_rows("标题\n左侧    右侧\n正文").is_empty());
    }

    /// Serves canned page results: `None` fails the page.
    struct CannedPages(Vec<(usize, Option<&'static str>)>);

    impl PageRecognizer for CannedPages {
        fn recognize_page(
            &self,
            _pdf: &Path,
            page: usize,
            _options: &OcrOptions,
        ) -> Result<String> {
            match self.0.iter().find(|(number, _)| *number == page) {
                Some((_, Some(text))) => Ok(text.to_string()),
                _ => anyhow::bail!("page {page} could not be rendered"),
            }
        }
    }

    #[test]
    fn failed_and_blank_ocr_pages_are_skipped_in_page_order() {
        let recognizer = CannedPages(vec![
            (1, Some("姓名张三")),
            (2, None),
            (3, Some("  \n ")),
            (4, Some("工作经历\n2020-07 至今")),
        ]);

        let outcome = recognized_text(
            &recognizer,
            Path::new("scan.pdf"),
            &[1, 2, 3, 4],
            &OcrOptions::default(),
        );

        assert_eq!(
            outcome,
            StageOutcome::Produced(vec!["姓名张三\n工作经历\n2020-07 至今".to_string()])
        );
    }

    #[test]
    fn ocr_with_no_usable_page_is_empty() {
        let recognizer = CannedPages(vec![(1, None), (2, Some(""))]);

        let outcome = recognized_text(
            &recognizer,
            Path::new("scan.pdf"),
            &[1, 2],
            &OcrOptions::default(),
        );

        assert_eq!(outcome, StageOutcome::Empty);
    }

    #[test]
    fn ocr_gate_requires_empty_text_and_images() {
        assert!(should_run_ocr(true, &[1]));
        assert!(!should_run_ocr(true, &[]));
        assert!(!should_run_ocr(false, &[1, 2]));
    }
}
