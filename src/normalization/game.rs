//! Raw attribute bag -> flat, typed game record.

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use super::source::{RawScalar, SourceCollection, SourceRecord};

/// Input pattern of `release_date` in the export, e.g. `Jun 05, 2018`.
pub const RELEASE_DATE_FORMAT: &str = "%b %d, %Y";

/// Flat game record with defaults applied and derived fields computed.
///
/// Field order is the column order of the cleaned CSV/JSON output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedGame {
    pub game_id: i64,
    pub name: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub required_age: i64,
    pub price: f64,
    pub website: Option<String>,
    pub windows: bool,
    pub mac: bool,
    pub linux: bool,
    pub metacritic_score: i64,
    pub metacritic_url: Option<String>,
    pub achievements: i64,
    pub recommendations: i64,
    pub short_description: Option<String>,
    pub user_score: i64,
    pub positive: i64,
    pub negative: i64,
    /// `None` means unknown, never zero owners.
    pub estimated_owners_min: Option<i64>,
    pub estimated_owners_max: Option<i64>,
    pub average_playtime_forever: i64,
    pub peak_ccu: i64,
}

impl NormalizedGame {
    pub const FIELDS: [&'static str; 21] = [
        "game_id",
        "name",
        "release_date",
        "required_age",
        "price",
        "website",
        "windows",
        "mac",
        "linux",
        "metacritic_score",
        "metacritic_url",
        "achievements",
        "recommendations",
        "short_description",
        "user_score",
        "positive",
        "negative",
        "estimated_owners_min",
        "estimated_owners_max",
        "average_playtime_forever",
        "peak_ccu",
    ];

    /// Both ownership bounds, or `None` when the range is unknown.
    pub fn estimated_owners(&self) -> Option<(i64, i64)> {
        self.estimated_owners_min.zip(self.estimated_owners_max)
    }
}

/// Why a single source entry could not be normalized.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordDefect {
    #[error("source key {key:?} is not an integer game id")]
    InvalidGameId { key: String },
    #[error("field `{field}` holds {value}, which does not coerce to {expected}")]
    Uncoercible {
        field: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// Batch-fatal normalization failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NormalizeError {
    #[error("source key {key:?} is not an integer game id; aborting batch")]
    InvalidGameId { key: String },
    #[error("game id {game_id} appears under both {first_key:?} and {key:?}")]
    DuplicateGameId {
        game_id: i64,
        first_key: String,
        key: String,
    },
}

/// A source entry dropped from the batch because one of its fields could not be coerced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedRecord {
    pub key: String,
    pub game_id: i64,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizeReport {
    /// Normalized games in source order.
    pub games: Vec<NormalizedGame>,
    pub skipped: Vec<SkippedRecord>,
}

impl NormalizeReport {
    pub fn undated(&self) -> usize {
        self.games.iter().filter(|g| g.release_date.is_none()).count()
    }

    pub fn unknown_ownership(&self) -> usize {
        self.games
            .iter()
            .filter(|g| g.estimated_owners().is_none())
            .count()
    }
}

/// Normalize one source entry. Pure; no I/O.
pub fn normalize(key: &str, record: &SourceRecord) -> Result<NormalizedGame, RecordDefect> {
    let game_id = parse_game_id(key).ok_or_else(|| RecordDefect::InvalidGameId {
        key: key.to_string(),
    })?;
    let (estimated_owners_min, estimated_owners_max) = match record
        .estimated_owners
        .as_ref()
        .and_then(RawScalar::as_text)
        .and_then(parse_owner_range)
    {
        Some((lo, hi)) => (Some(lo), Some(hi)),
        None => (None, None),
    };

    Ok(NormalizedGame {
        game_id,
        name: text(&record.name),
        release_date: record
            .release_date
            .as_ref()
            .and_then(RawScalar::as_text)
            .and_then(parse_release_date),
        required_age: int_or("required_age", &record.required_age, 0)?,
        price: float_or("price", &record.price, 0.0)?,
        website: text(&record.website),
        windows: flag(&record.windows),
        mac: flag(&record.mac),
        linux: flag(&record.linux),
        metacritic_score: int_or("metacritic_score", &record.metacritic_score, 0)?,
        metacritic_url: text(&record.metacritic_url),
        achievements: int_or("achievements", &record.achievements, 0)?,
        recommendations: int_or("recommendations", &record.recommendations, 0)?,
        short_description: text(&record.short_description),
        user_score: int_or("user_score", &record.user_score, 0)?,
        positive: int_or("positive", &record.positive, 0)?,
        negative: int_or("negative", &record.negative, 0)?,
        estimated_owners_min,
        estimated_owners_max,
        average_playtime_forever: int_or(
            "average_playtime_forever",
            &record.average_playtime_forever,
            0,
        )?,
        peak_ccu: int_or("peak_ccu", &record.peak_ccu, 0)?,
    })
}

/// Normalize a whole export.
///
/// A key that is not an integer, or two keys naming the same game id, abort
/// the batch: the id is the join key for everything downstream. Any other
/// uncoercible field drops only that record, which is reported in
/// [`NormalizeReport::skipped`].
#[instrument(skip(collection), fields(entries = collection.len()))]
pub fn normalize_all(collection: &SourceCollection) -> Result<NormalizeReport, NormalizeError> {
    let mut report = NormalizeReport {
        games: Vec::with_capacity(collection.len()),
        skipped: Vec::new(),
    };
    let mut seen: HashMap<i64, &str> = HashMap::with_capacity(collection.len());

    for (key, record) in collection {
        let game_id = parse_game_id(key)
            .ok_or_else(|| NormalizeError::InvalidGameId { key: key.clone() })?;
        if let Some(first_key) = seen.insert(game_id, key.as_str()) {
            return Err(NormalizeError::DuplicateGameId {
                game_id,
                first_key: first_key.to_string(),
                key: key.clone(),
            });
        }
        match normalize(key, record) {
            Ok(game) => report.games.push(game),
            Err(defect) => {
                warn!(key = %key, game_id, reason = %defect, "skipping uncoercible record");
                report.skipped.push(SkippedRecord {
                    key: key.clone(),
                    game_id,
                    reason: defect.to_string(),
                });
            }
        }
    }

    debug!(
        undated = report.undated(),
        unknown_ownership = report.unknown_ownership(),
        "recoverable field defects"
    );
    info!(
        normalized = report.games.len(),
        skipped = report.skipped.len(),
        "normalized source collection"
    );
    Ok(report)
}

/// Game ids are the decimal source keys; surrounding whitespace is tolerated.
pub fn parse_game_id(key: &str) -> Option<i64> {
    key.trim().parse::<i64>().ok()
}

/// `Jun 05, 2018` -> 2018-06-05. Anything else is `None`.
pub fn parse_release_date(raw: &str) -> Option<NaiveDate> {
    if raw.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(raw, RELEASE_DATE_FORMAT).ok()
}

fn owner_range_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(\d+) - (\d+)$").expect("owner range pattern compiles"))
}

/// `20000 - 50000` -> (20000, 50000). Unmatched or overflowing input is `None`.
pub fn parse_owner_range(raw: &str) -> Option<(i64, i64)> {
    let caps = owner_range_pattern().captures(raw)?;
    let lo = caps.get(1)?.as_str().parse::<i64>().ok()?;
    let hi = caps.get(2)?.as_str().parse::<i64>().ok()?;
    Some((lo, hi))
}

/// Only a literal JSON `true` counts; `"true"`, `1` and absence are all false.
fn flag(value: &Option<RawScalar>) -> bool {
    matches!(value, Some(RawScalar::Bool(true)))
}

fn text(value: &Option<RawScalar>) -> Option<String> {
    value.clone().map(RawScalar::into_text)
}

fn int_or(
    field: &'static str,
    value: &Option<RawScalar>,
    default: i64,
) -> Result<i64, RecordDefect> {
    let Some(raw) = value else {
        return Ok(default);
    };
    let coerced = match raw {
        RawScalar::Int(i) => Some(*i),
        RawScalar::Bool(b) => Some(i64::from(*b)),
        RawScalar::Float(f) if f.is_finite() && f.abs() < i64::MAX as f64 => Some(f.trunc() as i64),
        RawScalar::Text(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    coerced.ok_or_else(|| RecordDefect::Uncoercible {
        field,
        value: raw.to_string(),
        expected: "an integer",
    })
}

fn float_or(
    field: &'static str,
    value: &Option<RawScalar>,
    default: f64,
) -> Result<f64, RecordDefect> {
    let Some(raw) = value else {
        return Ok(default);
    };
    let coerced = match raw {
        RawScalar::Float(f) => Some(*f),
        RawScalar::Int(i) => Some(*i as f64),
        RawScalar::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        RawScalar::Text(s) => s.trim().parse::<f64>().ok(),
        RawScalar::Other(_) => None,
    };
    coerced
        .filter(|f| f.is_finite())
        .ok_or_else(|| RecordDefect::Uncoercible {
            field,
            value: raw.to_string(),
            expected: "a finite number",
        })
}
