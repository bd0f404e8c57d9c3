// Dashboard API server binary

use anyhow::{Context, Result};
use steam_warehouse::api::ApiServer;
use steam_warehouse::cli::warehouse_for;
use steam_warehouse::util::env as env_util;

#[actix_web::main]
async fn main() -> Result<()> {
    env_util::init_env();
    steam_warehouse::tracing::init_tracing("info,actix_web=info")?;

    tracing::info!("Initializing warehouse API server");

    env_util::preflight_check(
        "api_server",
        &[],
        &["API_HOST", "API_PORT", "ALLOWED_ORIGINS", "WAREHOUSE_DB", "DATABASE_URL"],
    )?;

    let server = ApiServer::from_env()?;

    let warehouse = warehouse_for(None);
    if !warehouse.path().exists() {
        anyhow::bail!(
            "warehouse {} does not exist; run `warehouse etl` first",
            warehouse.path().display()
        );
    }
    // Fail fast on an unreadable file instead of on the first request.
    warehouse
        .connect()
        .context("initial warehouse connection")?;

    server.run(warehouse).await?;

    Ok(())
}
