//! Resume extraction engine: `.docx` / PDF bytes in, fixed-schema record out.
//!
//! ```no_run
//! use cvextract::{SourceKind, parse};
//!
//! let bytes = std::fs::read("resume.docx").unwrap_or_default();
//! let record = parse(&bytes, SourceKind::Word);
//! println!("{:?}", record.name);
//! ```

pub mod acquire;
pub mod extract;
pub mod interchange;
pub mod model;
pub mod patterns;
pub mod util;

pub use extract::{ParseOptions, ParseOutcome, parse, parse_text, parse_with};
pub use model::{Entry, EntryRole, Record, SourceKind};
