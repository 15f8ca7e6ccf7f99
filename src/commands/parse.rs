use std::io::{self, Write};

use anyhow::{Context, Result};
use cvextract::acquire::ChannelReport;
use cvextract::acquire::ocr::global_engine;
use cvextract::interchange::to_row;
use cvextract::model::Record;
use cvextract::parse_with;
use cvextract::util::{now_utc_string, sha256_bytes, write_json_pretty};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::cli::{OutputFormat, ParseArgs};
use crate::commands::load_document;

#[derive(Debug, Serialize)]
struct ParseReport<'a> {
    source: String,
    kind: &'static str,
    sha256: String,
    parsed_at: String,
    record: &'a Record,
    channels: &'a [ChannelReport],
}

#[derive(Debug, Serialize)]
struct RowCell<'a> {
    column: &'a str,
    value: Option<&'a str>,
}

pub fn run(args: ParseArgs) -> Result<()> {
    let document = load_document(&args.document)?;
    let options = args.document.parse_options();

    info!(
        path = %document.path.display(),
        kind = document.kind.as_str(),
        bytes = document.bytes.len(),
        "parsing document"
    );

    let outcome = parse_with(&document.bytes, document.kind, &options, global_engine());
    if outcome.record.is_empty() {
        warn!(path = %document.path.display(), "no data extracted; record is empty");
    }

    let value = match args.format {
        OutputFormat::Json => serde_json::to_value(ParseReport {
            source: document.path.display().to_string(),
            kind: document.kind.as_str(),
            sha256: sha256_bytes(&document.bytes),
            parsed_at: now_utc_string(),
            record: &outcome.record,
            channels: &outcome.acquisition.reports,
        })
        .context("failed to serialize parse report")?,
        OutputFormat::Row => {
            let row = to_row(&outcome.record)?;
            let cells = row
                .iter()
                .map(|(column, value)| RowCell {
                    column: *column,
                    value: value.as_deref(),
                })
                .collect::<Vec<_>>();
            serde_json::to_value(cells).context("failed to serialize record row")?
        }
    };

    match &args.output {
        Some(path) => {
            write_json_pretty(path, &value)?;
            info!(path = %path.display(), "wrote record");
        }
        None => write_stdout(&value)?,
    }

    info!(
        education = outcome.record.education_history.len(),
        employment = outcome.record.employment_history.len(),
        "parse completed"
    );

    Ok(())
}

fn write_stdout(value: &Value) -> Result<()> {
    let mut output = io::BufWriter::new(io::stdout().lock());
    serde_json::to_writer_pretty(&mut output, value).context("failed to write json output")?;
    writeln!(output)?;
    output.flush()?;
    Ok(())
}
