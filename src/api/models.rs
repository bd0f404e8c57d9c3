// API request/response models (DTOs)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::warehouse::olap::{
    DrillDownParams, OlapQuery, Platform, QueryError, SliceDiceParams, YearRange,
};
use crate::warehouse::Warehouse;

/// Shared per-app state: the warehouse handle (connections are opened per request).
#[derive(Debug, Clone)]
pub struct AppState {
    pub warehouse: Warehouse,
    pub started: Instant,
}

impl AppState {
    pub fn new(warehouse: Warehouse) -> Self {
        Self {
            warehouse,
            started: Instant::now(),
        }
    }
}

/// Standard API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            meta: Some(Meta::now()),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            meta: Some(Meta::now()),
        }
    }
}

/// Metadata included in all API responses
#[derive(Debug, Serialize, Deserialize)]
pub struct Meta {
    pub timestamp: DateTime<Utc>,
    pub request_id: String,
    pub version: String,
}

impl Meta {
    pub fn now() -> Self {
        Self {
            timestamp: Utc::now(),
            request_id: uuid::Uuid::new_v4().to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
    pub uptime_seconds: u64,
}

/// `?year_from=&year_to=`
#[derive(Debug, Default, Deserialize)]
pub struct RollUpQuery {
    pub year_from: Option<i32>,
    pub year_to: Option<i32>,
}

impl From<RollUpQuery> for OlapQuery {
    fn from(q: RollUpQuery) -> Self {
        OlapQuery::RollUp(YearRange {
            from: q.year_from,
            to: q.year_to,
        })
    }
}

/// `?year=` (dashboard default 2022)
#[derive(Debug, Default, Deserialize)]
pub struct DrillDownQuery {
    pub year: Option<i32>,
}

impl From<DrillDownQuery> for OlapQuery {
    fn from(q: DrillDownQuery) -> Self {
        let mut params = DrillDownParams::default();
        if let Some(year) = q.year {
            params.year = year;
        }
        OlapQuery::DrillDown(params)
    }
}

/// `?platform=&price_low=&price_high=&metacritic_low=&metacritic_high=`
#[derive(Debug, Default, Deserialize)]
pub struct SliceDiceQuery {
    pub platform: Option<String>,
    pub price_low: Option<f64>,
    pub price_high: Option<f64>,
    pub metacritic_low: Option<i64>,
    pub metacritic_high: Option<i64>,
}

impl TryFrom<SliceDiceQuery> for OlapQuery {
    type Error = QueryError;

    fn try_from(q: SliceDiceQuery) -> Result<Self, Self::Error> {
        let d = SliceDiceParams::default();
        let platform = match q.platform.as_deref() {
            Some(raw) => raw.parse::<Platform>()?,
            None => d.platform,
        };
        Ok(OlapQuery::SliceDice(SliceDiceParams {
            platform,
            price_edges: [
                q.price_low.unwrap_or(d.price_edges[0]),
                q.price_high.unwrap_or(d.price_edges[1]),
            ],
            metacritic_edges: [
                q.metacritic_low.unwrap_or(d.metacritic_edges[0]),
                q.metacritic_high.unwrap_or(d.metacritic_edges[1]),
            ],
        }))
    }
}
