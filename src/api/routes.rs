// API route configuration

use crate::api::handlers;
use actix_web::web;

/// Fixed paths are registered before `/{name}/` so they take precedence.
/// All paths carry a trailing slash; the server normalizes requests to match.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg
        // Health check
        .route("/health/", web::get().to(handlers::health_check))
        // Reconciliation
        .route("/refresh/", web::post().to(handlers::refresh_countries))
        // Aggregates
        .route("/status/", web::get().to(handlers::get_status))
        .route("/image/", web::get().to(handlers::get_summary_image))
        // Records
        .route("/", web::get().to(handlers::list_countries))
        .service(
            web::resource("/{name}/")
                .route(web::get().to(handlers::get_country))
                .route(web::delete().to(handlers::delete_country)),
        );
}
