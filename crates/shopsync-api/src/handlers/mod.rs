//! Operator API handlers.

pub mod conflicts;
pub mod jobs;

use axum::http::HeaderMap;

use shopsync_core::TenantId;

use crate::error::{ApiError, ApiResult};

pub const TENANT_HEADER: &str = "x-tenant-id";

/// Extract the tenant id from the `X-Tenant-Id` header.
pub fn extract_tenant_id(headers: &HeaderMap) -> ApiResult<TenantId> {
    headers
        .get(TENANT_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Validation(format!("missing {TENANT_HEADER} header")))?
        .parse()
        .map_err(|_| ApiError::Validation(format!("{TENANT_HEADER} header is not a valid id")))
}
