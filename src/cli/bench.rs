use anyhow::{bail, Context, Result};
use std::path::PathBuf;

use crate::util::env::env_parse;
use crate::warehouse::bench::{default_cases, run_benchmark, write_report, CaseResult, DEFAULT_RUNS};

#[derive(Debug, Clone)]
pub struct BenchConfig {
    pub db: Option<PathBuf>,
    /// Repetitions per case (defaults to env BENCH_RUNS or 3).
    pub runs: Option<usize>,
    pub output: PathBuf,
}

pub fn run(cfg: BenchConfig) -> Result<Vec<CaseResult>> {
    let wh = super::warehouse_for(cfg.db.as_deref());
    if !wh.path().exists() {
        bail!("warehouse {} does not exist", wh.path().display());
    }
    let runs = cfg
        .runs
        .unwrap_or_else(|| env_parse("BENCH_RUNS", DEFAULT_RUNS));
    let conn = wh.connect()?;
    let results = run_benchmark(&conn, &default_cases(), runs);
    write_report(&results, &cfg.output)
        .with_context(|| format!("write benchmark report {}", cfg.output.display()))?;
    println!(
        "benchmarked {} queries x {} runs -> {}",
        results.len(),
        runs.max(1),
        cfg.output.display()
    );
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warehouse::{create_schema, Warehouse, WarehouseConfig};
    use std::fs;

    #[test]
    fn writes_one_block_per_case() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = dir.path().join("w.db");
        create_schema(&Warehouse::new(WarehouseConfig::new(&db)).connect().expect("conn"))
            .expect("schema");
        let output = dir.path().join("test_results.txt");
        let results = run(BenchConfig {
            db: Some(db),
            runs: Some(2),
            output: output.clone(),
        })
        .expect("bench");
        assert_eq!(results.len(), 8);
        let report = fs::read_to_string(&output).expect("report");
        assert_eq!(report.matches("Test Case: ").count(), 8);
        assert_eq!(report.matches("Run 2 Execution Time: ").count(), 8);
        assert!(!report.contains("Error: "));
    }
}
