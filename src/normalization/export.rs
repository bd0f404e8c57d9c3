//! Cleaned-catalog files: the normalized batch written as JSON or CSV.

use serde::Serialize;
use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::{info, instrument, warn};

use super::game::NormalizedGame;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Csv,
}

impl OutputFormat {
    /// Chosen purely by the path's extension (case-insensitive).
    pub fn from_path(path: &Path) -> Result<Self, ExportError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("json") => Ok(OutputFormat::Json),
            Some("csv") => Ok(OutputFormat::Csv),
            _ => Err(ExportError::UnsupportedFormat {
                path: path.display().to_string(),
            }),
        }
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("unsupported output format for {path}; use .json or .csv")]
    UnsupportedFormat { path: String },
    #[error("failed to write {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode JSON for {path}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode CSV for {path}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
}

/// Write the batch to `path`, format chosen by extension.
///
/// The data goes to `<path>.partial` first and is renamed into place only
/// after a complete, flushed write, so a failure never leaves a truncated
/// file under the requested name.
#[instrument(skip(games), fields(games = games.len(), path = %path.display()))]
pub fn write_cleaned(games: &[NormalizedGame], path: &Path) -> Result<OutputFormat, ExportError> {
    let format = OutputFormat::from_path(path)?;
    let partial = partial_path(path);
    let result = write_to(&partial, path, games, format)
        .and_then(|()| fs::rename(&partial, path).map_err(|source| io_err(path, source)));
    if let Err(err) = result {
        if partial.exists() {
            if let Err(cleanup) = fs::remove_file(&partial) {
                warn!(partial = %partial.display(), error = %cleanup, "could not remove partial output");
            }
        }
        return Err(err);
    }
    info!(?format, "cleaned data written");
    Ok(format)
}

/// Read a cleaned JSON file (array of normalized games) back in.
pub fn read_cleaned(path: &Path) -> Result<Vec<NormalizedGame>, ExportError> {
    if OutputFormat::from_path(path)? != OutputFormat::Json {
        return Err(ExportError::UnsupportedFormat {
            path: path.display().to_string(),
        });
    }
    let raw = fs::read_to_string(path).map_err(|source| io_err(path, source))?;
    serde_json::from_str(&raw).map_err(|source| ExportError::Json {
        path: path.display().to_string(),
        source,
    })
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".partial");
    PathBuf::from(name)
}

fn io_err(path: &Path, source: std::io::Error) -> ExportError {
    ExportError::Io {
        path: path.display().to_string(),
        source,
    }
}

fn write_to(
    partial: &Path,
    target: &Path,
    games: &[NormalizedGame],
    format: OutputFormat,
) -> Result<(), ExportError> {
    let file = File::create(partial).map_err(|source| io_err(target, source))?;
    let mut out = BufWriter::new(file);
    match format {
        OutputFormat::Json => {
            // 4-space indent, same as the files the dashboard team already has.
            let fmt = serde_json::ser::PrettyFormatter::with_indent(b"    ");
            let mut ser = serde_json::Serializer::with_formatter(&mut out, fmt);
            games.serialize(&mut ser).map_err(|source| ExportError::Json {
                path: target.display().to_string(),
                source,
            })?;
        }
        OutputFormat::Csv => {
            let csv_err = |source| ExportError::Csv {
                path: target.display().to_string(),
                source,
            };
            let mut wtr = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(&mut out);
            wtr.write_record(NormalizedGame::FIELDS).map_err(csv_err)?;
            for game in games {
                wtr.serialize(game).map_err(csv_err)?;
            }
            wtr.flush().map_err(|source| io_err(target, source))?;
        }
    }
    out.flush().map_err(|source| io_err(target, source))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalization::game::normalize_all;
    use crate::normalization::source::parse_source_document;

    fn sample() -> Vec<NormalizedGame> {
        let doc = parse_source_document(
            r#"{"1": {"name": "A", "release_date": "Jan 01, 2020", "windows": true, "price": 9.99, "estimated_owners": "0 - 20000"},
                "2": {"name": "B, with comma"}}"#,
        )
        .expect("parse");
        normalize_all(&doc).expect("normalize").games
    }

    #[test]
    fn rejects_unknown_extension_without_creating_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("cleaned.xml");
        let err = write_cleaned(&sample(), &path).expect_err("unsupported");
        assert!(matches!(err, ExportError::UnsupportedFormat { .. }));
        assert!(!path.exists());
        assert!(!partial_path(&path).exists());
    }

    #[test]
    fn json_output_round_trips_and_uses_four_space_indent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("cleaned.json");
        let games = sample();
        assert_eq!(write_cleaned(&games, &path).expect("write"), OutputFormat::Json);
        let raw = fs::read_to_string(&path).expect("read");
        assert!(raw.starts_with("[\n    {\n        \"game_id\": 1,"));
        assert!(raw.contains("\"estimated_owners_min\": null"));
        assert_eq!(read_cleaned(&path).expect("read back"), games);
        assert!(!partial_path(&path).exists());
    }

    #[test]
    fn csv_output_has_fixed_header_and_one_row_per_game() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("cleaned.CSV");
        write_cleaned(&sample(), &path).expect("write");
        let mut rdr = csv::Reader::from_path(&path).expect("reader");
        let headers: Vec<String> = rdr
            .headers()
            .expect("headers")
            .iter()
            .map(str::to_string)
            .collect();
        assert_eq!(headers, NormalizedGame::FIELDS.to_vec());
        let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.expect("row")).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][2], "2020-01-01");
        assert_eq!(&rows[0][17], "0");
        assert_eq!(&rows[1][1], "B, with comma");
        assert_eq!(&rows[1][17], "");
    }

    #[test]
    fn empty_batch_still_writes_csv_header() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("empty.csv");
        write_cleaned(&[], &path).expect("write");
        let raw = fs::read_to_string(&path).expect("read");
        assert_eq!(raw.lines().count(), 1);
    }

    #[test]
    fn read_cleaned_requires_json() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("cleaned.csv");
        assert!(matches!(
            read_cleaned(&path),
            Err(ExportError::UnsupportedFormat { .. })
        ));
    }
}
