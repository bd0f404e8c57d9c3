//! Dashboard read queries over the star schema.
//!
//! Four fixed shapes: roll-up by year, drill-down to months of one year,
//! slice-and-dice by price/metacritic buckets on one platform, and a
//! per-year pivot of platform combinations. Filter values are always bound
//! as statement parameters; the platform slice selects one of three fixed
//! column names through [`Platform`] and never takes text from the caller.

use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("unknown platform {0:?}; expected one of windows, mac, linux")]
    UnknownPlatform(String),
    #[error("{what} bucket edges must be finite and increasing, got {low} and {high}")]
    InvalidEdges {
        what: &'static str,
        low: f64,
        high: f64,
    },
    #[error("year range is inverted: {from} > {to}")]
    InvalidYearRange { from: i32, to: i32 },
    #[error("warehouse query failed")]
    Store(#[from] rusqlite::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Windows,
    Mac,
    Linux,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Windows, Platform::Mac, Platform::Linux];

    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Windows => "windows",
            Platform::Mac => "mac",
            Platform::Linux => "linux",
        }
    }

    /// Qualified `dim_platform` column for this platform.
    fn column(self) -> &'static str {
        match self {
            Platform::Windows => "dp.windows",
            Platform::Mac => "dp.mac",
            Platform::Linux => "dp.linux",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "windows" => Ok(Platform::Windows),
            "mac" => Ok(Platform::Mac),
            "linux" => Ok(Platform::Linux),
            _ => Err(QueryError::UnknownPlatform(s.to_string())),
        }
    }
}

/// Optional inclusive bounds on release year.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    pub from: Option<i32>,
    pub to: Option<i32>,
}

impl YearRange {
    fn validate(&self) -> Result<(), QueryError> {
        match (self.from, self.to) {
            (Some(from), Some(to)) if from > to => Err(QueryError::InvalidYearRange { from, to }),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrillDownParams {
    pub year: i32,
}

impl Default for DrillDownParams {
    fn default() -> Self {
        Self { year: 2022 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SliceDiceParams {
    pub platform: Platform,
    /// `[low, high]`: under low, low up to high, high and above.
    pub price_edges: [f64; 2],
    pub metacritic_edges: [i64; 2],
}

impl Default for SliceDiceParams {
    fn default() -> Self {
        Self {
            platform: Platform::Windows,
            price_edges: [10.0, 30.0],
            metacritic_edges: [50, 75],
        }
    }
}

impl SliceDiceParams {
    fn validate(&self) -> Result<(), QueryError> {
        let [lo, hi] = self.price_edges;
        if !(lo.is_finite() && hi.is_finite() && lo < hi) {
            return Err(QueryError::InvalidEdges {
                what: "price",
                low: lo,
                high: hi,
            });
        }
        let [lo, hi] = self.metacritic_edges;
        if lo >= hi {
            return Err(QueryError::InvalidEdges {
                what: "metacritic",
                low: lo as f64,
                high: hi as f64,
            });
        }
        Ok(())
    }

    pub fn price_labels(&self) -> [String; 3] {
        let [lo, hi] = self.price_edges;
        [
            format!("Under ${}", money(lo)),
            format!("${} - ${}", money(lo), money(hi - 0.01)),
            format!("${} and above", money(hi)),
        ]
    }

    pub fn metacritic_labels(&self) -> [&'static str; 3] {
        ["Low", "Medium", "High"]
    }
}

fn money(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{v:.0}")
    } else {
        format!("{v:.2}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RollUpRow {
    /// `None` groups games without a release date.
    pub year: Option<i64>,
    pub avg_metacritic_score: f64,
    pub total_recommendations: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrillDownRow {
    pub month: i64,
    pub games_released: i64,
    pub avg_price: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SliceDiceRow {
    pub price_range: String,
    pub metacritic_range: String,
    pub game_count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PivotRow {
    pub year: Option<i64>,
    pub windows_only: i64,
    pub mac_only: i64,
    pub linux_only: i64,
    pub windows_mac: i64,
    pub windows_linux: i64,
    pub mac_linux: i64,
    pub all_platforms: i64,
}

const ROLL_UP_SQL: &str = "
SELECT dt.year,
       AVG(dg.metacritic_score) AS avg_metacritic_score,
       SUM(fgs.recommendations) AS total_recommendations
FROM fact_game_sales fgs
JOIN dim_game dg ON fgs.game_key = dg.game_key
JOIN dim_time dt ON fgs.time_key = dt.time_key
WHERE (?1 IS NULL OR dt.year >= ?1)
  AND (?2 IS NULL OR dt.year <= ?2)
GROUP BY dt.year
ORDER BY dt.year";

const DRILL_DOWN_SQL: &str = "
SELECT dt.month,
       COUNT(DISTINCT fgs.game_key) AS games_released,
       AVG(dg.price) AS avg_price
FROM fact_game_sales fgs
JOIN dim_game dg ON fgs.game_key = dg.game_key
JOIN dim_time dt ON fgs.time_key = dt.time_key
WHERE dt.year = ?1
GROUP BY dt.month
ORDER BY dt.month";

const PIVOT_SQL: &str = "
SELECT dt.year,
       SUM(CASE WHEN dp.windows = 1 AND dp.mac = 0 AND dp.linux = 0 THEN 1 ELSE 0 END) AS windows_only,
       SUM(CASE WHEN dp.windows = 0 AND dp.mac = 1 AND dp.linux = 0 THEN 1 ELSE 0 END) AS mac_only,
       SUM(CASE WHEN dp.windows = 0 AND dp.mac = 0 AND dp.linux = 1 THEN 1 ELSE 0 END) AS linux_only,
       SUM(CASE WHEN dp.windows = 1 AND dp.mac = 1 AND dp.linux = 0 THEN 1 ELSE 0 END) AS windows_mac,
       SUM(CASE WHEN dp.windows = 1 AND dp.mac = 0 AND dp.linux = 1 THEN 1 ELSE 0 END) AS windows_linux,
       SUM(CASE WHEN dp.windows = 0 AND dp.mac = 1 AND dp.linux = 1 THEN 1 ELSE 0 END) AS mac_linux,
       SUM(CASE WHEN dp.windows = 1 AND dp.mac = 1 AND dp.linux = 1 THEN 1 ELSE 0 END) AS all_platforms
FROM fact_game_sales fgs
JOIN dim_time dt ON fgs.time_key = dt.time_key
JOIN dim_platform dp ON fgs.platform_key = dp.platform_key
GROUP BY dt.year
ORDER BY dt.year";

fn slice_dice_sql(platform: Platform) -> String {
    format!(
        "
SELECT CASE WHEN dg.price < ?1 THEN 0 WHEN dg.price < ?2 THEN 1 ELSE 2 END AS price_bucket,
       CASE WHEN dg.metacritic_score < ?3 THEN 0 WHEN dg.metacritic_score < ?4 THEN 1 ELSE 2 END AS metacritic_bucket,
       COUNT(*) AS game_count
FROM fact_game_sales fgs
JOIN dim_game dg ON fgs.game_key = dg.game_key
JOIN dim_platform dp ON fgs.platform_key = dp.platform_key
WHERE {column} = 1
GROUP BY price_bucket, metacritic_bucket
ORDER BY price_bucket, metacritic_bucket",
        column = platform.column()
    )
}

pub fn roll_up(conn: &Connection, range: YearRange) -> Result<Vec<RollUpRow>, QueryError> {
    range.validate()?;
    let mut stmt = conn.prepare_cached(ROLL_UP_SQL)?;
    let rows = stmt
        .query_map(params![range.from, range.to], |r| {
            Ok(RollUpRow {
                year: r.get(0)?,
                avg_metacritic_score: r.get(1)?,
                total_recommendations: r.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    debug!(rows = rows.len(), "roll-up");
    Ok(rows)
}

pub fn drill_down(conn: &Connection, p: DrillDownParams) -> Result<Vec<DrillDownRow>, QueryError> {
    let mut stmt = conn.prepare_cached(DRILL_DOWN_SQL)?;
    let rows = stmt
        .query_map(params![p.year], |r| {
            Ok(DrillDownRow {
                month: r.get(0)?,
                games_released: r.get(1)?,
                avg_price: r.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    debug!(year = p.year, rows = rows.len(), "drill-down");
    Ok(rows)
}

pub fn slice_dice(conn: &Connection, p: &SliceDiceParams) -> Result<Vec<SliceDiceRow>, QueryError> {
    p.validate()?;
    let price_labels = p.price_labels();
    let metacritic_labels = p.metacritic_labels();
    let mut stmt = conn.prepare_cached(&slice_dice_sql(p.platform))?;
    let buckets = stmt
        .query_map(
            params![
                p.price_edges[0],
                p.price_edges[1],
                p.metacritic_edges[0],
                p.metacritic_edges[1]
            ],
            |r| Ok((r.get::<_, i64>(0)?, r.get::<_, i64>(1)?, r.get::<_, i64>(2)?)),
        )?
        .collect::<Result<Vec<_>, _>>()?;
    let rows: Vec<SliceDiceRow> = buckets
        .into_iter()
        .map(|(price, metacritic, game_count)| SliceDiceRow {
            price_range: price_labels[bucket(price)].clone(),
            metacritic_range: metacritic_labels[bucket(metacritic)].to_string(),
            game_count,
        })
        .collect();
    debug!(platform = %p.platform, rows = rows.len(), "slice-and-dice");
    Ok(rows)
}

/// Bucket ordinal from the CASE expression; always 0, 1 or 2.
fn bucket(ordinal: i64) -> usize {
    ordinal.clamp(0, 2) as usize
}

pub fn pivot(conn: &Connection) -> Result<Vec<PivotRow>, QueryError> {
    let mut stmt = conn.prepare_cached(PIVOT_SQL)?;
    let rows = stmt
        .query_map([], |r| {
            Ok(PivotRow {
                year: r.get(0)?,
                windows_only: r.get(1)?,
                mac_only: r.get(2)?,
                linux_only: r.get(3)?,
                windows_mac: r.get(4)?,
                windows_linux: r.get(5)?,
                mac_linux: r.get(6)?,
                all_platforms: r.get(7)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    debug!(rows = rows.len(), "pivot");
    Ok(rows)
}

/// One parameterized dashboard query.
#[derive(Debug, Clone, PartialEq)]
pub enum OlapQuery {
    RollUp(YearRange),
    DrillDown(DrillDownParams),
    SliceDice(SliceDiceParams),
    Pivot,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "shape", content = "rows", rename_all = "snake_case")]
pub enum OlapResult {
    RollUp(Vec<RollUpRow>),
    DrillDown(Vec<DrillDownRow>),
    SliceDice(Vec<SliceDiceRow>),
    Pivot(Vec<PivotRow>),
}

impl OlapResult {
    pub fn len(&self) -> usize {
        match self {
            OlapResult::RollUp(r) => r.len(),
            OlapResult::DrillDown(r) => r.len(),
            OlapResult::SliceDice(r) => r.len(),
            OlapResult::Pivot(r) => r.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl OlapQuery {
    pub fn description(&self) -> String {
        match self {
            OlapQuery::RollUp(_) => {
                "Roll Up - Average Metacritic Score and Total Recommendations by Year".to_string()
            }
            OlapQuery::DrillDown(p) => format!(
                "Drill Down - Games Released and Average Price by Month ({})",
                p.year
            ),
            OlapQuery::SliceDice(p) => format!(
                "Slice and Dice - Game count by Price Range and Metacritic Score ({})",
                p.platform
            ),
            OlapQuery::Pivot => {
                "Pivot - Number of Games Released per Platform Combination by Year".to_string()
            }
        }
    }

    pub fn run(&self, conn: &Connection) -> Result<OlapResult, QueryError> {
        Ok(match self {
            OlapQuery::RollUp(range) => OlapResult::RollUp(roll_up(conn, *range)?),
            OlapQuery::DrillDown(p) => OlapResult::DrillDown(drill_down(conn, *p)?),
            OlapQuery::SliceDice(p) => OlapResult::SliceDice(slice_dice(conn, p)?),
            OlapQuery::Pivot => OlapResult::Pivot(pivot(conn)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalization::{normalize_all, source::parse_source_document};
    use crate::warehouse::{db::open_in_memory, loader::load, schema::create_schema};

    fn seeded() -> Connection {
        let mut conn = open_in_memory().expect("open");
        create_schema(&conn).expect("schema");
        let doc = parse_source_document(
            r#"{
            "1": {"release_date": "Jan 10, 2021", "price": 5.0,  "metacritic_score": 40, "recommendations": 100, "windows": true},
            "2": {"release_date": "Jan 20, 2021", "price": 15.0, "metacritic_score": 80, "recommendations": 50,  "windows": true, "mac": true},
            "3": {"release_date": "Mar 03, 2021", "price": 45.0, "metacritic_score": 60, "recommendations": 10,  "windows": true, "mac": true, "linux": true},
            "4": {"release_date": "Jul 04, 2022", "price": 9.99, "metacritic_score": 90, "recommendations": 7,   "linux": true},
            "5": {"release_date": "someday",      "price": 0.0,  "recommendations": 3, "mac": true}
        }"#,
        )
        .expect("parse");
        let games = normalize_all(&doc).expect("normalize").games;
        load(&mut conn, &games).expect("load");
        conn
    }

    #[test]
    fn roll_up_groups_by_year() {
        let conn = seeded();
        let rows = roll_up(&conn, YearRange::default()).expect("roll-up");
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].year, None);
        assert_eq!(rows[0].total_recommendations, 3);
        assert_eq!(rows[1].year, Some(2021));
        assert_eq!(rows[1].avg_metacritic_score, 60.0);
        assert_eq!(rows[1].total_recommendations, 160);
        assert_eq!(rows[2].year, Some(2022));
    }

    #[test]
    fn roll_up_honours_year_bounds() {
        let conn = seeded();
        let rows = roll_up(
            &conn,
            YearRange {
                from: Some(2022),
                to: None,
            },
        )
        .expect("roll-up");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].year, Some(2022));

        let err = roll_up(
            &conn,
            YearRange {
                from: Some(2023),
                to: Some(2020),
            },
        )
        .expect_err("inverted");
        assert!(matches!(err, QueryError::InvalidYearRange { .. }));
    }

    #[test]
    fn drill_down_splits_one_year_by_month() {
        let conn = seeded();
        let rows = drill_down(&conn, DrillDownParams { year: 2021 }).expect("drill-down");
        assert_eq!(
            rows,
            vec![
                DrillDownRow {
                    month: 1,
                    games_released: 2,
                    avg_price: 10.0
                },
                DrillDownRow {
                    month: 3,
                    games_released: 1,
                    avg_price: 45.0
                },
            ]
        );
        assert!(drill_down(&conn, DrillDownParams { year: 1999 })
            .expect("empty")
            .is_empty());
    }

    #[test]
    fn slice_dice_buckets_one_platform() {
        let conn = seeded();
        let rows = slice_dice(&conn, &SliceDiceParams::default()).expect("slice");
        let flat: Vec<(&str, &str, i64)> = rows
            .iter()
            .map(|r| (r.price_range.as_str(), r.metacritic_range.as_str(), r.game_count))
            .collect();
        assert_eq!(
            flat,
            vec![
                ("Under $10", "Low", 1),
                ("$10 - $29.99", "High", 1),
                ("$30 and above", "Medium", 1),
            ]
        );

        let linux = SliceDiceParams {
            platform: Platform::Linux,
            price_edges: [5.0, 20.0],
            metacritic_edges: [70, 95],
        };
        let rows = slice_dice(&conn, &linux).expect("linux");
        let flat: Vec<(&str, &str, i64)> = rows
            .iter()
            .map(|r| (r.price_range.as_str(), r.metacritic_range.as_str(), r.game_count))
            .collect();
        assert_eq!(
            flat,
            vec![("$5 - $19.99", "Medium", 1), ("$20 and above", "Low", 1)]
        );
    }

    #[test]
    fn slice_dice_rejects_bad_edges() {
        let conn = seeded();
        let p = SliceDiceParams {
            price_edges: [30.0, 10.0],
            ..SliceDiceParams::default()
        };
        assert!(matches!(
            slice_dice(&conn, &p),
            Err(QueryError::InvalidEdges { what: "price", .. })
        ));
        let p = SliceDiceParams {
            metacritic_edges: [75, 75],
            ..SliceDiceParams::default()
        };
        assert!(matches!(
            slice_dice(&conn, &p),
            Err(QueryError::InvalidEdges {
                what: "metacritic",
                ..
            })
        ));
    }

    #[test]
    fn platform_names_come_from_a_fixed_list() {
        assert_eq!("Windows".parse::<Platform>().expect("windows"), Platform::Windows);
        assert_eq!(" mac ".parse::<Platform>().expect("mac"), Platform::Mac);
        for bad in ["windows = 1 OR 1", "dp.linux", "", "bsd"] {
            assert!(matches!(
                bad.parse::<Platform>(),
                Err(QueryError::UnknownPlatform(_))
            ));
        }
    }

    #[test]
    fn pivot_counts_every_platform_combination() {
        let conn = seeded();
        let rows = pivot(&conn).expect("pivot");
        assert_eq!(rows.len(), 3);
        assert_eq!(
            rows[0],
            PivotRow {
                year: None,
                mac_only: 1,
                ..PivotRow::default()
            }
        );
        assert_eq!(
            rows[1],
            PivotRow {
                year: Some(2021),
                windows_only: 1,
                windows_mac: 1,
                all_platforms: 1,
                ..PivotRow::default()
            }
        );
        assert_eq!(
            rows[2],
            PivotRow {
                year: Some(2022),
                linux_only: 1,
                ..PivotRow::default()
            }
        );
    }

    #[test]
    fn olap_query_dispatch_and_descriptions() {
        let conn = seeded();
        let q = OlapQuery::SliceDice(SliceDiceParams {
            platform: Platform::Mac,
            ..SliceDiceParams::default()
        });
        assert_eq!(
            q.description(),
            "Slice and Dice - Game count by Price Range and Metacritic Score (mac)"
        );
        let result = q.run(&conn).expect("run");
        assert!(matches!(result, OlapResult::SliceDice(_)));
        assert_eq!(result.len(), 3);

        let json = serde_json::to_value(OlapQuery::Pivot.run(&conn).expect("pivot")).expect("json");
        assert_eq!(json["shape"], "pivot");
        assert_eq!(json["rows"].as_array().map(Vec::len), Some(3));
    }
}
