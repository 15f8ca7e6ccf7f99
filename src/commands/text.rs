use std::io::{self, Write};

use anyhow::Result;
use cvextract::acquire::ocr::global_engine;
use cvextract::acquire::{StageOutcome, acquire};
use tracing::info;

use crate::cli::TextArgs;
use crate::commands::load_document;

pub fn run(args: TextArgs) -> Result<()> {
    let document = load_document(&args.document)?;
    let options = args.document.parse_options();

    let acquisition = acquire(&document.bytes, document.kind, &options.ocr, global_engine());

    for report in &acquisition.reports {
        let (status, detail) = match &report.outcome {
            StageOutcome::Produced(count) => ("produced", count.to_string()),
            StageOutcome::Empty => ("empty", String::new()),
            StageOutcome::Failed(reason) => ("failed", reason.clone()),
        };
        info!(
            channel = %report.channel.label(),
            status,
            detail = %detail,
            "channel"
        );
    }

    let mut output = io::BufWriter::new(io::stdout().lock());
    writeln!(output, "{}", acquisition.text)?;
    output.flush()?;

    info!(
        path = %document.path.display(),
        kind = document.kind.as_str(),
        chars = acquisition.text.chars().count(),
        "text acquired"
    );

    Ok(())
}
