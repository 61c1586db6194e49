use api_client::error::ApiError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use core_types::CoreError;
use reading_store::StoreError;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(#[from] CoreError),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Upstream service error: {0}")]
    Upstream(#[from] ApiError),
}

/// Converts our custom `AppError` into an HTTP response.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Validation(err) | AppError::Store(StoreError::Validation(err)) => {
                (StatusCode::BAD_REQUEST, err.to_string())
            }
            AppError::Store(StoreError::NotFound(id)) => {
                (StatusCode::NOT_FOUND, format!("Reading {id} not found"))
            }
            AppError::Store(StoreError::DuplicateId(id)) => {
                (StatusCode::CONFLICT, format!("Reading {id} already exists"))
            }
            AppError::Store(StoreError::Analytics(err)) => {
                tracing::error!(error = ?err, "Export failed.");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to build the export".to_string(),
                )
            }
            AppError::Upstream(ApiError::NotConfigured(service)) => (
                StatusCode::SERVICE_UNAVAILABLE,
                format!("The {service} service is not configured"),
            ),
            AppError::Upstream(err) => {
                tracing::error!(error = ?err, "Upstream service error.");
                (StatusCode::BAD_GATEWAY, err.to_string())
            }
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
