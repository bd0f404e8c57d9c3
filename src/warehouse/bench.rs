// Benchmark harness: runs each dashboard query a fixed number of times and
// writes per-run wall-clock latency plus the average to a plain-text report.
// A failing query is still timed; its error is recorded in the report and the
// remaining cases keep running.

use rusqlite::Connection;
use std::{
    fmt::Write as _,
    fs,
    path::Path,
    time::{Duration, Instant},
};
use tracing::{info, warn};

use super::olap::{DrillDownParams, OlapQuery, Platform, SliceDiceParams, YearRange};

pub const DEFAULT_RUNS: usize = 3;

/// Roll-up; drill-down for 2021, 2022, 2023; slice-and-dice for each platform; pivot.
pub fn default_cases() -> Vec<OlapQuery> {
    let mut cases = vec![OlapQuery::RollUp(YearRange::default())];
    cases.extend(
        [2021, 2022, 2023]
            .into_iter()
            .map(|year| OlapQuery::DrillDown(DrillDownParams { year })),
    );
    cases.extend(Platform::ALL.into_iter().map(|platform| {
        OlapQuery::SliceDice(SliceDiceParams {
            platform,
            ..SliceDiceParams::default()
        })
    }));
    cases.push(OlapQuery::Pivot);
    cases
}

#[derive(Debug, Clone)]
pub struct CaseResult {
    pub description: String,
    pub runs: Vec<Duration>,
    /// First error seen across the runs, if any.
    pub error: Option<String>,
}

impl CaseResult {
    pub fn average(&self) -> Duration {
        if self.runs.is_empty() {
            return Duration::ZERO;
        }
        self.runs.iter().sum::<Duration>() / self.runs.len() as u32
    }
}

pub fn run_benchmark(conn: &Connection, cases: &[OlapQuery], runs: usize) -> Vec<CaseResult> {
    let runs = runs.max(1);
    info!(cases = cases.len(), runs, "starting benchmark");
    cases
        .iter()
        .map(|case| {
            let description = case.description();
            let mut timings = Vec::with_capacity(runs);
            let mut error = None;
            for i in 0..runs {
                let start = Instant::now();
                let outcome = case.run(conn);
                let dur = start.elapsed();
                timings.push(dur);
                match outcome {
                    Ok(rows) => info!(
                        iteration = i + 1,
                        fetched = rows.len(),
                        ms = dur.as_millis(),
                        q = %description,
                        "timed query"
                    ),
                    Err(e) => {
                        // Full cause chain, e.g. "warehouse query failed: no such table: ..".
                        let detail = format!("{:#}", anyhow::Error::new(e));
                        warn!(iteration = i + 1, q = %description, error = %detail, "query failed");
                        error.get_or_insert(detail);
                    }
                }
            }
            CaseResult {
                description,
                runs: timings,
                error,
            }
        })
        .collect()
}

pub fn render_report(results: &[CaseResult]) -> String {
    let mut out = String::new();
    for r in results {
        let _ = writeln!(out, "Test Case: {}", r.description);
        if let Some(err) = &r.error {
            let _ = writeln!(out, "Error: {err}");
        }
        for (i, d) in r.runs.iter().enumerate() {
            let _ = writeln!(
                out,
                "Run {} Execution Time: {:.4} seconds",
                i + 1,
                d.as_secs_f64()
            );
        }
        let _ = writeln!(
            out,
            "Average Execution Time: {:.4} seconds",
            r.average().as_secs_f64()
        );
        let _ = writeln!(out, "{}", "-".repeat(20));
    }
    out
}

pub fn write_report(results: &[CaseResult], path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, render_report(results))?;
    info!(path = %path.display(), cases = results.len(), "benchmark report written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warehouse::{db::open_in_memory, schema::create_schema};

    #[test]
    fn default_cases_cover_every_shape_and_parameter_set() {
        let descriptions: Vec<String> = default_cases().iter().map(OlapQuery::description).collect();
        assert_eq!(descriptions.len(), 8);
        assert!(descriptions[0].starts_with("Roll Up"));
        assert!(descriptions[1].ends_with("(2021)"));
        assert!(descriptions[3].ends_with("(2023)"));
        assert!(descriptions[4].ends_with("(windows)"));
        assert!(descriptions[6].ends_with("(linux)"));
        assert!(descriptions[7].starts_with("Pivot"));
    }

    #[test]
    fn each_case_is_timed_the_requested_number_of_times() {
        let conn = open_in_memory().expect("open");
        create_schema(&conn).expect("schema");
        let results = run_benchmark(&conn, &default_cases(), 2);
        assert_eq!(results.len(), 8);
        assert!(results.iter().all(|r| r.runs.len() == 2 && r.error.is_none()));
    }

    #[test]
    fn query_errors_are_recorded_not_fatal() {
        let conn = open_in_memory().expect("open");
        let results = run_benchmark(&conn, &[OlapQuery::Pivot, OlapQuery::Pivot], 1);
        assert_eq!(results.len(), 2);
        assert!(results[0]
            .error
            .as_deref()
            .is_some_and(|e| e.contains("no such table")));
        assert!(render_report(&results).contains("\nError: "));
    }

    #[test]
    fn report_matches_plain_text_layout() {
        let results = vec![CaseResult {
            description: "Pivot - Number of Games Released per Platform Combination by Year".into(),
            runs: vec![Duration::from_millis(10), Duration::from_millis(30)],
            error: None,
        }];
        assert_eq!(
            render_report(&results),
            "Test Case: Pivot - Number of Games Released per Platform Combination by Year\n\
             Run 1 Execution Time: 0.0100 seconds\n\
             Run 2 Execution Time: 0.0300 seconds\n\
             Average Execution Time: 0.0200 seconds\n\
             --------------------\n"
        );
    }

    #[test]
    fn write_report_creates_parent_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("dataset").join("test_results.txt");
        write_report(&[], &path).expect("write");
        assert_eq!(fs::read_to_string(&path).expect("read"), "");
    }
}
