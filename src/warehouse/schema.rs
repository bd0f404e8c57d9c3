//! Star-schema DDL: four dimensions, one fact table.
//!
//! - dim_game: identity and scoring attributes
//! - dim_platform: windows/mac/linux availability
//! - dim_time: release date split into year/month/day
//! - dim_ownership: estimated owner range (NULL = unknown)
//! - fact_game_sales: measures plus one key into each dimension
//!
//! Every dimension row belongs to exactly one game; rows are never shared.

use rusqlite::{Connection, Result};
use serde::Serialize;

/// Tables in insert order. Drop in reverse.
pub const TABLES: [&str; 5] = [
    "dim_game",
    "dim_platform",
    "dim_time",
    "dim_ownership",
    "fact_game_sales",
];

pub fn create_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS dim_game (
            game_key INTEGER PRIMARY KEY AUTOINCREMENT,
            game_id INTEGER NOT NULL,
            name TEXT,
            required_age INTEGER NOT NULL DEFAULT 0,
            price REAL NOT NULL DEFAULT 0.0,
            metacritic_score INTEGER NOT NULL DEFAULT 0,
            achievements INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS dim_platform (
            platform_key INTEGER PRIMARY KEY AUTOINCREMENT,
            windows INTEGER NOT NULL CHECK (windows IN (0, 1)),
            mac INTEGER NOT NULL CHECK (mac IN (0, 1)),
            linux INTEGER NOT NULL CHECK (linux IN (0, 1))
        );

        CREATE TABLE IF NOT EXISTS dim_time (
            time_key INTEGER PRIMARY KEY AUTOINCREMENT,
            release_date TEXT,
            year INTEGER,
            month INTEGER,
            day INTEGER
        );

        CREATE TABLE IF NOT EXISTS dim_ownership (
            ownership_key INTEGER PRIMARY KEY AUTOINCREMENT,
            estimated_owners_min INTEGER,
            estimated_owners_max INTEGER
        );

        CREATE TABLE IF NOT EXISTS fact_game_sales (
            game_key INTEGER NOT NULL REFERENCES dim_game(game_key),
            platform_key INTEGER NOT NULL REFERENCES dim_platform(platform_key),
            time_key INTEGER NOT NULL REFERENCES dim_time(time_key),
            ownership_key INTEGER NOT NULL REFERENCES dim_ownership(ownership_key),
            recommendations INTEGER NOT NULL DEFAULT 0,
            positive_reviews INTEGER NOT NULL DEFAULT 0,
            negative_reviews INTEGER NOT NULL DEFAULT 0,
            average_playtime_forever INTEGER NOT NULL DEFAULT 0,
            peak_ccu INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_fact_game_key ON fact_game_sales(game_key);
        CREATE INDEX IF NOT EXISTS idx_fact_platform_key ON fact_game_sales(platform_key);
        CREATE INDEX IF NOT EXISTS idx_fact_time_key ON fact_game_sales(time_key);
        CREATE INDEX IF NOT EXISTS idx_fact_ownership_key ON fact_game_sales(ownership_key);
        CREATE INDEX IF NOT EXISTS idx_dim_time_year_month ON dim_time(year, month);
        "#,
    )
}

pub fn drop_schema(conn: &Connection) -> Result<()> {
    for table in TABLES.iter().rev() {
        conn.execute_batch(&format!("DROP TABLE IF EXISTS {table};"))?;
    }
    Ok(())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TableCounts {
    pub dim_game: i64,
    pub dim_platform: i64,
    pub dim_time: i64,
    pub dim_ownership: i64,
    pub fact_game_sales: i64,
}

impl TableCounts {
    pub fn as_pairs(&self) -> [(&'static str, i64); 5] {
        [
            ("dim_game", self.dim_game),
            ("dim_platform", self.dim_platform),
            ("dim_time", self.dim_time),
            ("dim_ownership", self.dim_ownership),
            ("fact_game_sales", self.fact_game_sales),
        ]
    }
}

pub fn table_counts(conn: &Connection) -> Result<TableCounts> {
    let count = |table: &str| -> Result<i64> {
        conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))
    };
    Ok(TableCounts {
        dim_game: count("dim_game")?,
        dim_platform: count("dim_platform")?,
        dim_time: count("dim_time")?,
        dim_ownership: count("dim_ownership")?,
        fact_game_sales: count("fact_game_sales")?,
    })
}
