//! Raw catalog export -> normalized game records.

pub mod export;
pub mod game;
pub mod source;

pub use export::{read_cleaned, write_cleaned, ExportError, OutputFormat};
pub use game::{
    normalize, normalize_all, NormalizeError, NormalizeReport, NormalizedGame, RecordDefect,
    SkippedRecord,
};
pub use source::{read_source_file, RawScalar, SourceCollection, SourceError, SourceRecord};
