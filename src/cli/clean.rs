use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

use crate::normalization::{
    normalize_all, read_source_file, write_cleaned, NormalizeReport, OutputFormat,
};

#[derive(Debug, Clone)]
pub struct CleanConfig {
    /// Raw catalog export (top-level object keyed by game id).
    pub input: PathBuf,
    /// `.json` or `.csv`; the extension picks the format.
    pub output: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanOutcome {
    pub written: usize,
    pub skipped: usize,
    pub format: OutputFormat,
}

#[instrument(skip_all, fields(input = %cfg.input.display(), output = %cfg.output.display()))]
pub fn run(cfg: CleanConfig) -> Result<CleanOutcome> {
    let report = normalize_file(&cfg.input)?;
    let format = write_cleaned(&report.games, &cfg.output)
        .with_context(|| format!("write cleaned data to {}", cfg.output.display()))?;
    println!(
        "cleaned {} games ({} skipped) -> {}",
        report.games.len(),
        report.skipped.len(),
        cfg.output.display()
    );
    Ok(CleanOutcome {
        written: report.games.len(),
        skipped: report.skipped.len(),
        format,
    })
}

/// Read and normalize a raw export. Shared with `etl`.
pub(crate) fn normalize_file(input: &Path) -> Result<NormalizeReport> {
    let collection = read_source_file(input)
        .with_context(|| format!("read source catalog {}", input.display()))?;
    let report = normalize_all(&collection)
        .with_context(|| format!("normalize {}", input.display()))?;
    info!(
        games = report.games.len(),
        skipped = report.skipped.len(),
        undated = report.undated(),
        unknown_ownership = report.unknown_ownership(),
        "normalization finished"
    );
    Ok(report)
}
