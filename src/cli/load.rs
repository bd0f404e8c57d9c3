use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{info, instrument};

use crate::normalization::{read_cleaned, NormalizedGame};
use crate::warehouse::{self, LoadSummary, Warehouse};

#[derive(Debug, Clone)]
pub struct LoadConfig {
    /// Cleaned JSON produced by `clean`.
    pub input: PathBuf,
    pub db: Option<PathBuf>,
    /// Drop and recreate the star schema first.
    pub reset: bool,
}

#[instrument(skip_all, fields(input = %cfg.input.display()))]
pub fn run(cfg: LoadConfig) -> Result<LoadSummary> {
    let games = read_cleaned(&cfg.input)
        .with_context(|| format!("read cleaned data {}", cfg.input.display()))?;
    let wh = super::warehouse_for(cfg.db.as_deref());
    load_into(&wh, &games, cfg.reset)
}

/// Load one batch in a single transaction. With `reset` the schema is
/// recreated inside that same transaction.
pub(crate) fn load_into(
    wh: &Warehouse,
    games: &[NormalizedGame],
    reset: bool,
) -> Result<LoadSummary> {
    let mut conn = wh.connect()?;
    let summary = if reset {
        info!(path = %wh.path().display(), "replacing star schema contents");
        warehouse::replace(&mut conn, games)
    } else {
        warehouse::create_schema(&conn).context("create star schema")?;
        warehouse::load(&mut conn, games)
    }
    .with_context(|| format!("load {} games into {}", games.len(), wh.path().display()))?;
    println!(
        "loaded {} games into {} in {} ms",
        summary.games,
        wh.path().display(),
        summary.elapsed_ms
    );
    Ok(summary)
}
