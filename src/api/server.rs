// Dashboard API server (actix-web)

use crate::api::{middleware, models::AppState, routes};
use crate::util::env::{env_opt, env_parse};
use crate::warehouse::Warehouse;
use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8050;

pub struct ApiServer {
    pub host: String,
    pub port: u16,
    pub allowed_origins: String,
}

impl ApiServer {
    /// API_HOST, API_PORT, ALLOWED_ORIGINS.
    pub fn from_env() -> Result<Self> {
        let host = env_opt("API_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match env_opt("API_PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .with_context(|| format!("Invalid API_PORT {raw:?}"))?,
            None => DEFAULT_PORT,
        };
        let allowed_origins = env_parse(
            "ALLOWED_ORIGINS",
            format!("http://localhost:{DEFAULT_PORT}"),
        );

        Ok(Self {
            host,
            port,
            allowed_origins,
        })
    }

    /// Start the HTTP server
    pub async fn run(self, warehouse: Warehouse) -> Result<()> {
        let bind_addr = format!("{}:{}", self.host, self.port);

        tracing::info!(
            host = %self.host,
            port = %self.port,
            warehouse = %warehouse.path().display(),
            "Starting warehouse API server"
        );

        let state = web::Data::new(AppState::new(warehouse));
        let allowed_origins = self.allowed_origins.clone();

        HttpServer::new(move || {
            let (logger, compress) = middleware::setup_middleware();
            let cors = middleware::setup_cors(&allowed_origins);

            App::new()
                .app_data(state.clone())
                .wrap(logger)
                .wrap(compress)
                .wrap(cors)
                .configure(routes::configure_routes)
        })
        .bind(&bind_addr)
        .with_context(|| format!("Failed to bind to {}", bind_addr))?
        .run()
        .await
        .context("HTTP server error")?;

        Ok(())
    }
}
