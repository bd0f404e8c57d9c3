// Request logging, compression and CORS for the dashboard API.

use actix_web::middleware::{Compress, Logger};

pub fn setup_middleware() -> (Logger, Compress) {
    let logger = Logger::new("%a \"%r\" %s %b %Dms");
    let compress = Compress::default();
    (logger, compress)
}

use actix_cors::Cors;
use actix_web::http::header;

/// Read-only API: GET from the configured comma-separated origins.
pub fn setup_cors(allowed_origins: &str) -> Cors {
    let mut cors = Cors::default()
        .allowed_methods(vec!["GET"])
        .allowed_headers(vec![header::ACCEPT, header::CONTENT_TYPE])
        .max_age(3600);

    for origin in allowed_origins
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
    {
        cors = cors.allowed_origin(origin);
    }

    cors
}
