//! Normalized games -> star-schema rows.

use chrono::Datelike;
use rusqlite::{params, Connection, Params, Transaction};
use serde::Serialize;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, instrument, trace};

use crate::normalization::NormalizedGame;
use crate::warehouse::schema::{create_schema, drop_schema};

const INSERT_GAME: &str = "INSERT INTO dim_game (game_id, name, required_age, price, metacritic_score, achievements)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6)";
const INSERT_PLATFORM: &str = "INSERT INTO dim_platform (windows, mac, linux) VALUES (?1, ?2, ?3)";
const INSERT_TIME: &str =
    "INSERT INTO dim_time (release_date, year, month, day) VALUES (?1, ?2, ?3, ?4)";
const INSERT_OWNERSHIP: &str =
    "INSERT INTO dim_ownership (estimated_owners_min, estimated_owners_max) VALUES (?1, ?2)";
const INSERT_FACT: &str = "INSERT INTO fact_game_sales (game_key, platform_key, time_key, ownership_key,
        recommendations, positive_reviews, negative_reviews, average_playtime_forever, peak_ccu)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)";

/// Store-assigned keys of one game's dimension rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SurrogateKeys {
    pub game_key: i64,
    pub platform_key: i64,
    pub time_key: i64,
    pub ownership_key: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    /// Games loaded; each produced one row in every table.
    pub games: usize,
    pub first_keys: Option<SurrogateKeys>,
    pub last_keys: Option<SurrogateKeys>,
    pub elapsed_ms: u128,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("could not begin load transaction")]
    Begin(#[source] rusqlite::Error),
    #[error("could not reset star schema; previous contents kept")]
    Reset(#[source] rusqlite::Error),
    #[error(
        "insert into {table} failed for game {game_id} (game {position} of {total}); batch rolled back"
    )]
    Insert {
        /// 1-based position of the failing game in the batch.
        position: usize,
        total: usize,
        game_id: i64,
        table: &'static str,
        #[source]
        source: rusqlite::Error,
    },
    #[error("commit of {games} games failed")]
    Commit {
        games: usize,
        #[source]
        source: rusqlite::Error,
    },
}

impl LoadError {
    pub fn game_id(&self) -> Option<i64> {
        match self {
            LoadError::Insert { game_id, .. } => Some(*game_id),
            _ => None,
        }
    }
}

struct StepError {
    table: &'static str,
    source: rusqlite::Error,
}

/// Write the batch in one transaction. Nothing is visible unless every
/// insert for every game succeeds; on error the transaction is rolled back.
#[instrument(skip(conn, games), fields(games = games.len()))]
pub fn load(conn: &mut Connection, games: &[NormalizedGame]) -> Result<LoadSummary, LoadError> {
    load_batch(conn, games, false)
}

/// Drop and recreate the star schema, then load the batch, all in the same
/// transaction. A failed batch leaves the previous warehouse untouched.
#[instrument(skip(conn, games), fields(games = games.len()))]
pub fn replace(conn: &mut Connection, games: &[NormalizedGame]) -> Result<LoadSummary, LoadError> {
    load_batch(conn, games, true)
}

fn load_batch(
    conn: &mut Connection,
    games: &[NormalizedGame],
    reset: bool,
) -> Result<LoadSummary, LoadError> {
    let started = Instant::now();
    let tx = conn.transaction().map_err(LoadError::Begin)?;
    if reset {
        drop_schema(&tx)
            .and_then(|()| create_schema(&tx))
            .map_err(LoadError::Reset)?;
        debug!("star schema recreated inside load transaction");
    }
    let total = games.len();
    let mut first_keys = None;
    let mut last_keys = None;

    for (idx, game) in games.iter().enumerate() {
        let keys = insert_game(&tx, game).map_err(|e| LoadError::Insert {
            position: idx + 1,
            total,
            game_id: game.game_id,
            table: e.table,
            source: e.source,
        })?;
        trace!(game_id = game.game_id, ?keys, "game loaded");
        first_keys.get_or_insert(keys);
        last_keys = Some(keys);
    }

    tx.commit().map_err(|source| LoadError::Commit {
        games: total,
        source,
    })?;

    let summary = LoadSummary {
        games: total,
        first_keys,
        last_keys,
        elapsed_ms: started.elapsed().as_millis(),
    };
    info!(
        games = summary.games,
        elapsed_ms = summary.elapsed_ms as u64,
        "star schema load committed"
    );
    Ok(summary)
}

/// Dimension rows first, each key read back immediately after its own insert,
/// then the fact row that ties them together.
fn insert_game(tx: &Transaction<'_>, game: &NormalizedGame) -> Result<SurrogateKeys, StepError> {
    let game_key = insert_row(
        tx,
        "dim_game",
        INSERT_GAME,
        params![
            game.game_id,
            game.name,
            game.required_age,
            game.price,
            game.metacritic_score,
            game.achievements
        ],
    )?;
    let platform_key = insert_row(
        tx,
        "dim_platform",
        INSERT_PLATFORM,
        params![game.windows, game.mac, game.linux],
    )?;
    let date = game.release_date;
    let time_key = insert_row(
        tx,
        "dim_time",
        INSERT_TIME,
        params![
            date.map(|d| d.format("%Y-%m-%d").to_string()),
            date.map(|d| d.year()),
            date.map(|d| d.month()),
            date.map(|d| d.day())
        ],
    )?;
    let ownership_key = insert_row(
        tx,
        "dim_ownership",
        INSERT_OWNERSHIP,
        params![game.estimated_owners_min, game.estimated_owners_max],
    )?;
    insert_row(
        tx,
        "fact_game_sales",
        INSERT_FACT,
        params![
            game_key,
            platform_key,
            time_key,
            ownership_key,
            game.recommendations,
            game.positive,
            game.negative,
            game.average_playtime_forever,
            game.peak_ccu
        ],
    )?;
    Ok(SurrogateKeys {
        game_key,
        platform_key,
        time_key,
        ownership_key,
    })
}

fn insert_row<P: Params>(
    tx: &Transaction<'_>,
    table: &'static str,
    sql: &str,
    params: P,
) -> Result<i64, StepError> {
    let mut stmt = tx
        .prepare_cached(sql)
        .map_err(|source| StepError { table, source })?;
    stmt.execute(params)
        .map_err(|source| StepError { table, source })?;
    Ok(tx.last_insert_rowid())
}
