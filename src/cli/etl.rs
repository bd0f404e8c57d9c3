use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::instrument;

use crate::normalization::write_cleaned;
use crate::warehouse::LoadSummary;

/// Normalize and load in one pass; the normalized batch only lives in memory
/// unless `cleaned_out` asks for a copy on disk.
#[derive(Debug, Clone)]
pub struct EtlConfig {
    pub input: PathBuf,
    pub db: Option<PathBuf>,
    pub reset: bool,
    pub cleaned_out: Option<PathBuf>,
}

#[instrument(skip_all, fields(input = %cfg.input.display()))]
pub fn run(cfg: EtlConfig) -> Result<LoadSummary> {
    let report = super::clean::normalize_file(&cfg.input)?;
    if let Some(path) = &cfg.cleaned_out {
        write_cleaned(&report.games, path)
            .with_context(|| format!("write cleaned data to {}", path.display()))?;
    }
    let wh = super::warehouse_for(cfg.db.as_deref());
    super::load::load_into(&wh, &report.games, cfg.reset)
}
