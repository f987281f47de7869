//! HTTP error responses.
//!
//! Maps service failures to status codes with a `{code, message}` body.

use crate::service::ServiceError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Error returned by request handlers.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Service(#[from] ServiceError),
}

#[derive(Serialize)]
struct ErrorBody {
    code: u16,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, msg) = match &self {
            ApiError::Service(e) => match e {
                ServiceError::YearNotFound(_) => (StatusCode::NOT_FOUND, e.to_string()),
                ServiceError::PublishingDisabled => {
                    (StatusCode::SERVICE_UNAVAILABLE, e.to_string())
                }
                ServiceError::Upstream(_) | ServiceError::Publish(_) => {
                    error!("Error generating statistics: {}", e);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        format!("Internal server error: {}", e),
                    )
                }
            },
        };
        let body = Json(ErrorBody {
            code: status.as_u16(),
            message: msg,
        });
        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
