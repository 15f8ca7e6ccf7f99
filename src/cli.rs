use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use cvextract::ParseOptions;
use cvextract::acquire::ocr::OcrOptions;
use cvextract::model::SourceKind;

#[derive(Parser, Debug)]
#[command(
    name = "cvextract",
    version,
    about = "Extract structured resume records from .docx and PDF files"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Parse a document into a record.
    Parse(ParseArgs),
    /// Print the acquired plain-text stream and channel provenance.
    Text(TextArgs),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum KindArg {
    Word,
    Pdf,
}

impl From<KindArg> for SourceKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Word => SourceKind::Word,
            KindArg::Pdf => SourceKind::Pdf,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Row,
}

#[derive(Args, Debug, Clone)]
pub struct DocumentArgs {
    pub path: PathBuf,

    /// Overrides the kind derived from the file extension.
    #[arg(long, value_enum)]
    pub kind: Option<KindArg>,

    #[command(flatten)]
    pub ocr: OcrArgs,

    #[arg(long, default_value_t = 100)]
    pub field_max_chars: usize,

    #[arg(long, default_value_t = 500)]
    pub section_max_chars: usize,
}

impl DocumentArgs {
    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            field_max_chars: self.field_max_chars,
            section_max_chars: self.section_max_chars,
            ocr: self.ocr.options(),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct OcrArgs {
    #[arg(long, default_value = "chi_sim+eng")]
    pub ocr_lang: String,

    #[arg(long, default_value_t = 2.0)]
    pub ocr_scale: f32,

    #[arg(long, default_value_t = 0.5)]
    pub ocr_min_confidence: f32,

    #[arg(long, default_value_t = 60)]
    pub ocr_page_timeout_secs: u64,

    #[arg(long, default_value_t = false)]
    pub no_ocr: bool,
}

impl OcrArgs {
    pub fn options(&self) -> OcrOptions {
        OcrOptions {
            enabled: !self.no_ocr,
            lang: self.ocr_lang.clone(),
            scale: self.ocr_scale,
            min_confidence: self.ocr_min_confidence,
            page_timeout: Duration::from_secs(self.ocr_page_timeout_secs),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ParseArgs {
    #[command(flatten)]
    pub document: DocumentArgs,

    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Writes to this file instead of stdout.
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct TextArgs {
    #[command(flatten)]
    pub document: DocumentArgs,
}
