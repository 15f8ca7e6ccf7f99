pub mod parse;
pub mod text;

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use cvextract::model::SourceKind;

use crate::cli::DocumentArgs;

/// A document read from disk with its resolved kind.
pub struct LoadedDocument {
    pub path: PathBuf,
    pub kind: SourceKind,
    pub bytes: Vec<u8>,
}

/// Reads the document named by `args`. The kind comes from `--kind` when
/// given, otherwise from the file extension.
pub fn load_document(args: &DocumentArgs) -> Result<LoadedDocument> {
    let kind = match args.kind {
        Some(kind) => SourceKind::from(kind),
        None => match SourceKind::from_path(&args.path) {
            Some(kind) => kind,
            None => bail!(
                "unsupported document type: {} (expected .docx or .pdf, or pass --kind)",
                args.path.display()
            ),
        },
    };

    let bytes = fs::read(&args.path)
        .with_context(|| format!("failed to read {}", args.path.display()))?;

    Ok(LoadedDocument {
        path: args.path.clone(),
        kind,
        bytes,
    })
}
