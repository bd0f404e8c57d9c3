// API route configuration

use crate::api::handlers;
use actix_web::web;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(handlers::health_check))
        .route("/", web::get().to(handlers::health_check))
        .service(
            web::scope("/api/v1/olap")
                .route("/roll-up", web::get().to(handlers::roll_up))
                .route("/drill-down", web::get().to(handlers::drill_down))
                .route("/slice-dice", web::get().to(handlers::slice_dice))
                .route("/pivot", web::get().to(handlers::pivot)),
        );
}
