//! Axum router for the webhook intake endpoint.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use serde::Serialize;
use utoipa::ToSchema;

use shopsync_core::TenantId;

use crate::adapter::{IngestOutcome, WebhookAdapter};
use crate::error::{WebhookError, WebhookResult};

pub const TOPIC_HEADER: &str = "x-webhook-topic";
pub const TENANT_HEADER: &str = "x-webhook-tenant";
pub const SIGNATURE_HEADER: &str = "x-webhook-signature";

/// Shared state for the intake handler.
#[derive(Clone)]
pub struct WebhooksState {
    pub adapter: Arc<WebhookAdapter>,
}

/// Intake acknowledgement returned to the platform.
#[derive(Debug, Serialize, ToSchema)]
pub struct IntakeResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
}

/// Creates the webhook intake router.
pub fn webhooks_router(state: WebhooksState) -> Router {
    Router::new()
        .route("/webhooks/intake", post(intake_handler))
        .with_state(state)
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> WebhookResult<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| WebhookError::Payload(format!("missing or invalid {name} header")))
}

/// Receive one webhook delivery from the platform.
///
/// The raw body bytes are verified against the tenant secret before any
/// parsing happens, so the signature covers exactly what was sent.
#[utoipa::path(
    post,
    path = "/webhooks/intake",
    tag = "Webhooks",
    responses(
        (status = 200, description = "Delivery accepted, duplicate, or uninstall processed", body = IntakeResponse),
        (status = 400, description = "Unknown topic or malformed payload"),
        (status = 401, description = "Signature verification failed"),
    )
)]
pub async fn intake_handler(
    State(state): State<WebhooksState>,
    headers: HeaderMap,
    body: Bytes,
) -> WebhookResult<(StatusCode, Json<IntakeResponse>)> {
    let topic = header(&headers, TOPIC_HEADER)?;
    let signature = header(&headers, SIGNATURE_HEADER)?;
    let tenant_id: TenantId = header(&headers, TENANT_HEADER)?
        .parse()
        .map_err(|_| WebhookError::Payload("tenant header is not a valid id".into()))?;

    let outcome = state
        .adapter
        .receive(tenant_id, topic, signature, &body)
        .await?;

    let response = match outcome {
        IngestOutcome::Accepted(job) => IntakeResponse {
            status: "accepted".to_string(),
            job_id: Some(job.id.to_string()),
        },
        IngestOutcome::Duplicate => IntakeResponse {
            status: "duplicate".to_string(),
            job_id: None,
        },
        IngestOutcome::TenantDeactivated => IntakeResponse {
            status: "tenant_deactivated".to_string(),
            job_id: None,
        },
    };

    Ok((StatusCode::OK, Json(response)))
}
