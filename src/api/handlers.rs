// HTTP request handlers for API endpoints

use actix_web::{web, HttpResponse};
use tracing::info;

use crate::api::error::ApiError;
use crate::api::models::*;
use crate::api::state::AppState;

type HandlerResult = Result<HttpResponse, ApiError>;

/// Health check endpoint
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let store_status = match state.store.ping().await {
        Ok(()) => "connected",
        Err(e) => {
            tracing::warn!(error = %format!("{e:#}"), "store ping failed");
            "disconnected"
        }
    };
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        store: store_status.to_string(),
    })
}

/// Fetch both upstreams and rebuild the cache
pub async fn refresh_countries(state: web::Data<AppState>) -> HandlerResult {
    info!("refresh requested");
    let outcome = state.engine.refresh().await?;
    Ok(HttpResponse::Ok().json(RefreshResponse {
        message: "Countries refreshed successfully".to_string(),
        total_countries: outcome.total_countries,
    }))
}

/// List countries with optional region/currency filters and GDP sort
pub async fn list_countries(
    state: web::Data<AppState>,
    query: web::Query<ListQuery>,
) -> HandlerResult {
    let filter = query.into_inner().into_filter();
    let rows = state.store.list(&filter).await?;
    Ok(HttpResponse::Ok().json(rows))
}

pub async fn get_country(state: web::Data<AppState>, path: web::Path<String>) -> HandlerResult {
    let name = path.into_inner();
    match state.store.get(&name).await? {
        Some(country) => Ok(HttpResponse::Ok().json(country)),
        None => Err(ApiError::CountryNotFound),
    }
}

pub async fn delete_country(state: web::Data<AppState>, path: web::Path<String>) -> HandlerResult {
    let name = path.into_inner();
    if !state.store.delete(&name).await? {
        return Err(ApiError::CountryNotFound);
    }
    info!(name = %name, "country deleted");
    Ok(HttpResponse::Ok().json(MessageResponse {
        message: format!("Country '{name}' deleted successfully"),
    }))
}

/// Record count and most recent refresh time
pub async fn get_status(state: web::Data<AppState>) -> HandlerResult {
    let total_countries = state.store.count().await?;
    let last_refreshed_at = state.store.last_refreshed_at().await?;
    Ok(HttpResponse::Ok().json(StatusResponse {
        total_countries,
        last_refreshed_at,
    }))
}

/// Serve the cached summary artifact
pub async fn get_summary_image(state: web::Data<AppState>) -> HandlerResult {
    match state.slot().load().await? {
        Some(bytes) => Ok(HttpResponse::Ok().content_type("image/png").body(bytes)),
        None => Err(ApiError::ImageNotFound),
    }
}
