//! Error types for webhook ingestion.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use shopsync_engine::EngineError;

/// Webhook ingestion error variants.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    /// Signature did not verify against the tenant secret. The request is
    /// rejected without creating a job; the platform redelivers on its own
    /// schedule.
    #[error("Webhook signature verification failed")]
    InvalidSignature,

    /// Topic outside the fixed supported set.
    #[error("Unknown webhook topic: {0}")]
    UnknownTopic(String),

    /// Body did not parse as the topic's payload shape.
    #[error("Invalid webhook payload: {0}")]
    Payload(String),

    /// The tenant is not registered or not active for catalog work.
    #[error("Tenant is not accepting webhooks: {0}")]
    TenantUnavailable(String),

    /// Engine error while enqueueing the triggered job.
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Store error.
    #[error("Store error: {0}")]
    Store(#[from] shopsync_store::StoreError),
}

/// JSON error response returned by the intake endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status: u16,
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            WebhookError::InvalidSignature => (StatusCode::UNAUTHORIZED, "invalid_signature"),
            WebhookError::UnknownTopic(_) => (StatusCode::BAD_REQUEST, "unknown_topic"),
            WebhookError::Payload(_) => (StatusCode::BAD_REQUEST, "invalid_payload"),
            WebhookError::TenantUnavailable(_) => (StatusCode::BAD_REQUEST, "tenant_unavailable"),
            WebhookError::Engine(EngineError::Validation { .. }) => {
                (StatusCode::BAD_REQUEST, "validation_error")
            }
            WebhookError::Engine(_) | WebhookError::Store(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message: self.to_string(),
            status: status.as_u16(),
        };

        (status, axum::Json(body)).into_response()
    }
}

/// Result type for webhook operations.
pub type WebhookResult<T> = Result<T, WebhookError>;
