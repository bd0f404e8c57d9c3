// HTTP request handlers for the dashboard query endpoints

use crate::api::models::*;
use crate::warehouse::olap::{OlapQuery, OlapResult, QueryError};
use actix_web::{web, HttpResponse, Result};

/// Health check endpoint
pub async fn health_check(state: web::Data<AppState>) -> Result<HttpResponse> {
    let wh = state.warehouse.clone();
    let reachable = web::block(move || -> anyhow::Result<()> {
        let conn = wh.connect()?;
        conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
    })
    .await
    .map(|r| r.is_ok())
    .unwrap_or(false);

    let db_status = if reachable { "connected" } else { "disconnected" };

    let response = ApiResponse::success(HealthResponse {
        status: "healthy".to_string(),
        database: db_status.to_string(),
        uptime_seconds: state.started.elapsed().as_secs(),
    });

    Ok(HttpResponse::Ok().json(response))
}

pub async fn roll_up(
    state: web::Data<AppState>,
    query: web::Query<RollUpQuery>,
) -> Result<HttpResponse> {
    run_query(state, query.into_inner().into()).await
}

pub async fn drill_down(
    state: web::Data<AppState>,
    query: web::Query<DrillDownQuery>,
) -> Result<HttpResponse> {
    run_query(state, query.into_inner().into()).await
}

pub async fn slice_dice(
    state: web::Data<AppState>,
    query: web::Query<SliceDiceQuery>,
) -> Result<HttpResponse> {
    match OlapQuery::try_from(query.into_inner()) {
        Ok(q) => run_query(state, q).await,
        Err(e) => Ok(query_error_response(&e)),
    }
}

pub async fn pivot(state: web::Data<AppState>) -> Result<HttpResponse> {
    run_query(state, OlapQuery::Pivot).await
}

/// Open a connection on the blocking pool, run one query, drop the connection.
async fn run_query(state: web::Data<AppState>, query: OlapQuery) -> Result<HttpResponse> {
    let wh = state.warehouse.clone();
    let description = query.description();
    let outcome = web::block(move || -> anyhow::Result<Result<OlapResult, QueryError>> {
        let conn = wh.connect()?;
        Ok(query.run(&conn))
    })
    .await;

    let response = match outcome {
        Ok(Ok(Ok(result))) => {
            tracing::debug!(q = %description, rows = result.len(), "query served");
            HttpResponse::Ok().json(ApiResponse::success(result))
        }
        Ok(Ok(Err(e))) => {
            let response = query_error_response(&e);
            let detail = format!("{:#}", anyhow::Error::new(e));
            tracing::warn!(q = %description, error = %detail, "query failed");
            response
        }
        Ok(Err(e)) => {
            tracing::error!(error = %format!("{e:#}"), "warehouse unavailable");
            HttpResponse::ServiceUnavailable()
                .json(ApiResponse::<()>::error("warehouse unavailable"))
        }
        Err(e) => {
            tracing::error!(error = %e, "blocking task failed");
            HttpResponse::InternalServerError().json(ApiResponse::<()>::error("internal error"))
        }
    };
    Ok(response)
}

fn query_error_response(e: &QueryError) -> HttpResponse {
    match e {
        QueryError::Store(_) => {
            HttpResponse::InternalServerError().json(ApiResponse::<()>::error("query failed"))
        }
        invalid => HttpResponse::BadRequest().json(ApiResponse::<()>::error(invalid.to_string())),
    }
}
