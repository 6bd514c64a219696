//! Sync job handlers: trigger, inspect, cancel.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};

use shopsync_core::{JobId, ResourceType};
use shopsync_store::{JobKind, JobOptions, JobStatus, ResourceTarget};

use crate::error::{ApiError, ApiResult};
use crate::models::{JobAccepted, JobResponse, ListJobsQuery, SyncAllRequest, SyncRequest};
use crate::router::ApiState;

use super::extract_tenant_id;

/// Queue a sync job for one resource.
#[utoipa::path(
    post,
    path = "/sync",
    tag = "Sync",
    request_body = SyncRequest,
    responses(
        (status = 202, description = "Job queued", body = JobAccepted),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Tenant not found"),
    )
)]
pub async fn sync_resource_handler(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(request): Json<SyncRequest>,
) -> ApiResult<(StatusCode, Json<JobAccepted>)> {
    let tenant_id = extract_tenant_id(&headers)?;
    let tenant = state.stores.tenants.get(tenant_id).await?;

    let resource_id = request.resource_id.ok_or_else(|| {
        ApiError::Validation("resource_id is required; use /sync-all for a full sync".to_string())
    })?;
    let resource_type = request.resource_type.unwrap_or(ResourceType::Product);
    let target = ResourceTarget::new(resource_type, resource_id);
    let options = JobOptions {
        force: request.force,
        ..JobOptions::default()
    };
    let job = state
        .orchestrator
        .enqueue(
            tenant_id,
            JobKind::SingleResource,
            tenant.default_direction,
            vec![target],
            options,
        )
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(JobAccepted {
            job_id: job.id.to_string(),
        }),
    ))
}

/// Queue a full catalog sync.
#[utoipa::path(
    post,
    path = "/sync-all",
    tag = "Sync",
    request_body = SyncAllRequest,
    responses(
        (status = 202, description = "Job queued", body = JobAccepted),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Tenant not found"),
    )
)]
pub async fn sync_all_handler(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(request): Json<SyncAllRequest>,
) -> ApiResult<(StatusCode, Json<JobAccepted>)> {
    let tenant_id = extract_tenant_id(&headers)?;
    let tenant = state.stores.tenants.get(tenant_id).await?;

    let options = JobOptions {
        force: request.force,
        ..JobOptions::default()
    };
    let job = state
        .orchestrator
        .enqueue(
            tenant_id,
            JobKind::Full,
            tenant.default_direction,
            Vec::new(),
            options,
        )
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(JobAccepted {
            job_id: job.id.to_string(),
        }),
    ))
}

/// Fetch one job with progress, totals and its error log.
#[utoipa::path(
    get,
    path = "/jobs/{id}",
    tag = "Sync",
    responses(
        (status = 200, description = "Job detail", body = JobResponse),
        (status = 404, description = "Job not found"),
    )
)]
pub async fn get_job_handler(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<JobResponse>> {
    let tenant_id = extract_tenant_id(&headers)?;
    let job_id: JobId = id
        .parse()
        .map_err(|_| ApiError::Validation(format!("invalid job id: {id}")))?;

    let job = state.stores.jobs.get(job_id).await?;
    if job.tenant_id != tenant_id {
        return Err(ApiError::NotFound(format!("job {job_id}")));
    }
    Ok(Json(JobResponse::from(&job)))
}

/// List jobs newest first, optionally filtered by status.
#[utoipa::path(
    get,
    path = "/jobs",
    tag = "Sync",
    params(ListJobsQuery),
    responses(
        (status = 200, description = "Job list", body = [JobResponse]),
        (status = 400, description = "Unknown status filter"),
    )
)]
pub async fn list_jobs_handler(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Query(query): Query<ListJobsQuery>,
) -> ApiResult<Json<Vec<JobResponse>>> {
    let tenant_id = extract_tenant_id(&headers)?;
    let status = query
        .status
        .as_deref()
        .map(str::parse::<JobStatus>)
        .transpose()?;
    let limit = query.limit.unwrap_or(50);

    let jobs = state.stores.jobs.list(tenant_id, status, limit).await;
    Ok(Json(jobs.iter().map(JobResponse::from).collect()))
}

/// Cancel a queued or running job.
#[utoipa::path(
    post,
    path = "/jobs/{id}/cancel",
    tag = "Sync",
    responses(
        (status = 200, description = "Job cancelled", body = JobResponse),
        (status = 400, description = "Job already terminal"),
        (status = 404, description = "Job not found"),
    )
)]
pub async fn cancel_job_handler(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<JobResponse>> {
    let tenant_id = extract_tenant_id(&headers)?;
    let job_id: JobId = id
        .parse()
        .map_err(|_| ApiError::Validation(format!("invalid job id: {id}")))?;

    let job = state.orchestrator.cancel(tenant_id, job_id).await?;
    Ok(Json(JobResponse::from(&job)))
}
