//! OCR fallback for PDFs without a text layer.
//!
//! Pages are rasterized into a scoped temporary directory and recognized by
//! `tesseract` with TSV output, so per-word confidence can be filtered.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use once_cell::sync::OnceCell;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::util::{command_available, run_tool};

const RECOGNIZER: &str = "tesseract";
const TIMEOUT_POLL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, PartialEq)]
pub struct OcrOptions {
    pub enabled: bool,
    /// Recognizer languages, e.g. `chi_sim+eng`.
    pub lang: String,
    /// Rasterization scale relative to 72 DPI.
    pub scale: f32,
    /// Words at or below this confidence (0..1) are dropped.
    pub min_confidence: f32,
    pub page_timeout: Duration,
}

impl Default for OcrOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            lang: "chi_sim+eng".to_string(),
            scale: 2.0,
            min_confidence: 0.5,
            page_timeout: Duration::from_secs(60),
        }
    }
}

impl OcrOptions {
    pub fn dpi(&self) -> u32 {
        (72.0 * self.scale).round().max(1.0) as u32
    }
}

/// Page renderers, in preference order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rasterizer {
    Pdftoppm,
    Mutool,
}

impl Rasterizer {
    pub const ALL: [Rasterizer; 2] = [Rasterizer::Pdftoppm, Rasterizer::Mutool];

    pub fn program(self) -> &'static str {
        match self {
            Self::Pdftoppm => "pdftoppm",
            Self::Mutool => "mutool",
        }
    }

    /// Renders one 1-based page to a PNG inside `dir`.
    fn render(self, pdf: &Path, page: usize, dpi: u32, dir: &Path) -> Result<PathBuf> {
        let page = page.to_string();
        let dpi = dpi.to_string();

        let image = match self {
            Self::Pdftoppm => {
                let root = dir.join(format!("page-{page}"));
                let root_arg = root.to_string_lossy().to_string();
                let pdf_arg = pdf.to_string_lossy().to_string();
                run_tool(
                    self.program(),
                    &[
                        "-r", &dpi, "-f", &page, "-l", &page, "-singlefile", "-png", &pdf_arg,
                        &root_arg,
                    ],
                    pdf,
                )?;
                root.with_extension("png")
            }
            Self::Mutool => {
                let image = dir.join(format!("page-{page}.png"));
                let image_arg = image.to_string_lossy().to_string();
                let pdf_arg = pdf.to_string_lossy().to_string();
                run_tool(
                    self.program(),
                    &["draw", "-r", &dpi, "-o", &image_arg, &pdf_arg, &page],
                    pdf,
                )?;
                image
            }
        };

        if !image.exists() {
            bail!(
                "{} did not produce expected image for {} page {}",
                self.program(),
                pdf.display(),
                page
            );
        }
        Ok(image)
    }
}

/// The recognizer plus every rasterizer found on this host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrEngine {
    rasterizers: Vec<Rasterizer>,
}

impl OcrEngine {
    /// Probes the host for the recognizer and at least one rasterizer.
    pub fn detect() -> Result<Self> {
        if !command_available(RECOGNIZER, "--version") {
            bail!("{RECOGNIZER} is not installed");
        }

        let rasterizers = Rasterizer::ALL
            .into_iter()
            .filter(|rasterizer| command_available(rasterizer.program(), "-v"))
            .collect::<Vec<_>>();
        if rasterizers.is_empty() {
            bail!("no page rasterizer installed (need pdftoppm or mutool)");
        }

        Ok(Self { rasterizers })
    }

    pub fn rasterizers(&self) -> &[Rasterizer] {
        &self.rasterizers
    }

    fn rasterize(&self, pdf: &Path, page: usize, dpi: u32, dir: &Path) -> Result<PathBuf> {
        first_rendered(&self.rasterizers, |rasterizer| rasterizer.render(pdf, page, dpi, dir))
            .with_context(|| format!("every rasterizer failed for {} page {}", pdf.display(), page))
    }
}

/// Turns one PDF page into text.
pub trait PageRecognizer: Sync {
    fn recognize_page(&self, pdf: &Path, page: usize, options: &OcrOptions) -> Result<String>;
}

impl PageRecognizer for OcrEngine {
    fn recognize_page(&self, pdf: &Path, page: usize, options: &OcrOptions) -> Result<String> {
        let workdir = tempfile::tempdir().context("failed to create OCR scratch directory")?;

        let image = self.rasterize(pdf, page, options.dpi(), workdir.path())?;
        let tsv = run_recognizer(&image, &options.lang, options.page_timeout, workdir.path())?;

        Ok(text_from_tsv(&tsv, options.min_confidence))
    }
}

/// Recognizes `pages` (1-based) in parallel; results keep page order.
pub fn recognize_pages<R>(
    recognizer: &R,
    pdf: &Path,
    pages: &[usize],
    options: &OcrOptions,
) -> Vec<(usize, Result<String>)>
where
    R: PageRecognizer + ?Sized,
{
    pages
        .par_iter()
        .map(|page| (*page, recognizer.recognize_page(pdf, *page, options)))
        .collect()
}

/// Tries `render` with each rasterizer in order and returns the first
/// success, or the last failure.
fn first_rendered<T>(
    rasterizers: &[Rasterizer],
    mut render: impl FnMut(Rasterizer) -> Result<T>,
) -> Result<T> {
    let mut last_error = None;
    for rasterizer in rasterizers {
        match render(*rasterizer) {
            Ok(rendered) => return Ok(rendered),
            Err(err) => {
                debug!(
                    rasterizer = rasterizer.program(),
                    error = %format!("{err:#}"),
                    "rasterizer failed"
                );
                last_error = Some(err);
            }
        }
    }
    match last_error {
        Some(err) => Err(err),
        None => bail!("no page rasterizer available"),
    }
}

fn run_recognizer(image: &Path, lang: &str, timeout: Duration, dir: &Path) -> Result<String> {
    let output_base = dir.join("recognized");

    let mut child = Command::new(RECOGNIZER)
        .arg(image)
        .arg(&output_base)
        .arg("-l")
        .arg(lang)
        .arg("tsv")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .with_context(|| format!("failed to execute {RECOGNIZER} for {}", image.display()))?;

    let deadline = Instant::now() + timeout;
    let status = loop {
        if let Some(status) = child
            .try_wait()
            .with_context(|| format!("failed to poll {RECOGNIZER}"))?
        {
            break status;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            bail!(
                "{RECOGNIZER} timed out after {}s on {}",
                timeout.as_secs(),
                image.display()
            );
        }
        thread::sleep(TIMEOUT_POLL);
    };

    if !status.success() {
        bail!(
            "{RECOGNIZER} returned non-zero exit status for {}: {}",
            image.display(),
            status
        );
    }

    let tsv_path = output_base.with_extension("tsv");
    fs::read_to_string(&tsv_path)
        .with_context(|| format!("failed to read recognizer output: {}", tsv_path.display()))
}

/// Rebuilds page text from recognizer TSV rows.
///
/// Only word rows (level 5) whose confidence exceeds `min_confidence` are
/// kept. Words of one line are joined with a space only between two ASCII
/// alphanumerics, so CJK runs stay contiguous.
pub fn text_from_tsv(tsv: &str, min_confidence: f32) -> String {
    let mut lines = Vec::<((u32, u32, u32, u32), String)>::new();

    for row in tsv.lines().skip(1) {
        let columns = row.split('\t').collect::<Vec<&str>>();
        let [level, page, block, paragraph, line, _, _, _, _, _, confidence, word] =
            columns.as_slice()
        else {
            continue;
        };

        if level.trim() != "5" {
            continue;
        }
        let Ok(confidence) = confidence.trim().parse::<f32>() else {
            continue;
        };
        let word = word.trim();
        if word.is_empty() || confidence / 100.0 <= min_confidence {
            continue;
        }

        let key = (
            page.parse().unwrap_or_default(),
            block.parse().unwrap_or_default(),
            paragraph.parse().unwrap_or_default(),
            line.parse().unwrap_or_default(),
        );
        match lines.last_mut() {
            Some((last_key, text)) if *last_key == key => join_word(text, word),
            _ => lines.push((key, word.to_string())),
        }
    }

    lines
        .into_iter()
        .map(|(_, text)| text)
        .collect::<Vec<String>>()
        .join("\n")
}

fn join_word(line: &mut String, word: &str) {
    let ends_alnum = line.chars().last().is_some_and(|c| c.is_ascii_alphanumeric());
    let starts_alnum = word.chars().next().is_some_and(|c| c.is_ascii_alphanumeric());
    if ends_alnum && starts_alnum {
        line.push(' ');
    }
    line.push_str(word);
}

/// Memoized engine state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineState {
    Ready(OcrEngine),
    /// Initialization failed; the reason is kept and never retried.
    Unavailable(String),
}

/// Explicit, once-initialized OCR engine handle.
///
/// Concurrent first calls initialize at most once. `reset` clears the state
/// so a later call probes the host again.
#[derive(Debug, Default)]
pub struct OcrEngineCell {
    state: OnceCell<EngineState>,
}

impl OcrEngineCell {
    pub const fn new() -> Self {
        Self {
            state: OnceCell::new(),
        }
    }

    /// A cell pinned to `state`, bypassing host detection.
    pub fn with_state(state: EngineState) -> Self {
        Self {
            state: OnceCell::with_value(state),
        }
    }

    pub fn get_or_init(&self) -> &EngineState {
        self.state.get_or_init(|| match OcrEngine::detect() {
            Ok(engine) => {
                info!(
                    rasterizers = ?engine.rasterizers(),
                    "ocr engine ready"
                );
                EngineState::Ready(engine)
            }
            Err(err) => {
                warn!(reason = %format!("{err:#}"), "ocr engine unavailable");
                EngineState::Unavailable(format!("{err:#}"))
            }
        })
    }

    pub fn engine(&self) -> Result<&OcrEngine> {
        match self.get_or_init() {
            EngineState::Ready(engine) => Ok(engine),
            EngineState::Unavailable(reason) => bail!("ocr engine unavailable: {reason}"),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.state.get().is_some()
    }

    pub fn reset(&mut self) {
        self.state.take();
    }
}

static GLOBAL_ENGINE: OcrEngineCell = OcrEngineCell::new();

/// The process-wide engine cell.
pub fn global_engine() -> &'static OcrEngineCell {
    &GLOBAL_ENGINE
}
