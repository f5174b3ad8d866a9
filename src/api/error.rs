use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

use crate::api::models::ErrorBody;
use crate::error::{UpstreamError, ValidationError};
use crate::refresh::RefreshError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("country not found")]
    CountryNotFound,

    #[error("summary image not found")]
    ImageNotFound,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("internal error: {0:#}")]
    Internal(#[from] anyhow::Error),
}

impl From<RefreshError> for ApiError {
    fn from(err: RefreshError) -> Self {
        match err {
            RefreshError::Upstream(e) => ApiError::Upstream(e),
            RefreshError::Store(e) => ApiError::Internal(e),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Upstream(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::CountryNotFound | ApiError::ImageNotFound => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            ApiError::Upstream(e) => {
                tracing::warn!(error = %e, "upstream unavailable");
                ErrorBody::new("External data source unavailable").with_details(json!(format!(
                    "Could not fetch data from {}",
                    e.upstream().label()
                )))
            }
            ApiError::CountryNotFound => ErrorBody::new("Country not found"),
            ApiError::ImageNotFound => ErrorBody::new("Summary image not found"),
            ApiError::Validation(e) => {
                ErrorBody::new("Validation failed").with_details(json!(e.fields))
            }
            ApiError::Internal(e) => {
                tracing::error!(error = %format!("{e:#}"), "request failed");
                ErrorBody::new("Internal server error")
            }
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}
