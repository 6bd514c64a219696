//! Error types for the operator API.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use shopsync_engine::EngineError;
use shopsync_store::StoreError;

/// Operator API error variants.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Request is malformed or refers to an unsupported value.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Requested entity does not exist for this tenant.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Engine error raised while serving the request.
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Store error raised while serving the request.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// JSON error response body.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status: u16,
}

fn store_status(err: &StoreError) -> (StatusCode, &'static str) {
    match err {
        StoreError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
        StoreError::DuplicateKey { .. } | StoreError::AlreadyLinked { .. } => {
            (StatusCode::CONFLICT, "conflict")
        }
        StoreError::InvalidTransition { .. }
        | StoreError::TerminalJob { .. }
        | StoreError::Validation { .. } => (StatusCode::BAD_REQUEST, "validation_error"),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::Engine(EngineError::Validation { .. }) => {
                (StatusCode::BAD_REQUEST, "validation_error")
            }
            ApiError::Engine(EngineError::Store(inner)) => store_status(inner),
            ApiError::Engine(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
            ApiError::Store(inner) => store_status(inner),
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message: self.to_string(),
            status: status.as_u16(),
        };

        (status, axum::Json(body)).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;
