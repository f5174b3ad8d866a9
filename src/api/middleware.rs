// Additional middleware for logging, CORS, etc.

use actix_web::middleware::{Compress, Logger, NormalizePath, TrailingSlash};

pub fn setup_middleware() -> (Logger, Compress) {
    let logger = Logger::default();
    let compress = Compress::default();
    (logger, compress)
}

/// `/France` and `/France/` reach the same route.
pub fn normalize_path() -> NormalizePath {
    NormalizePath::new(TrailingSlash::Always)
}

// CORS configuration
use actix_cors::Cors;
use actix_web::http::header;

pub fn setup_cors(allowed_origins: &str) -> Cors {
    let origins = allowed_origins
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty());

    let mut cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "DELETE"])
        .allowed_headers(vec![header::ACCEPT, header::CONTENT_TYPE])
        .max_age(3600);

    for origin in origins {
        cors = cors.allowed_origin(origin);
    }

    cors
}
