use anyhow::{bail, Context, Result};
use std::fmt::Write as _;
use std::path::PathBuf;

use crate::warehouse::{table_counts, TableCounts};

#[derive(Debug, Clone, Default)]
pub struct CountsConfig {
    /// Optional override for the warehouse file.
    pub db: Option<PathBuf>,
}

pub fn run(cfg: CountsConfig) -> Result<TableCounts> {
    let wh = super::warehouse_for(cfg.db.as_deref());
    // Opening a missing file would silently create an empty database.
    if !wh.path().exists() {
        bail!("warehouse {} does not exist", wh.path().display());
    }
    let conn = wh.connect()?;
    let counts = table_counts(&conn)
        .with_context(|| format!("count rows in {}", wh.path().display()))?;
    print!("{}", render(&counts));
    Ok(counts)
}

fn render(counts: &TableCounts) -> String {
    let mut out = String::new();
    for (table, n) in counts.as_pairs() {
        let _ = writeln!(out, "{table:<16} {n:>10}");
    }
    out
}
