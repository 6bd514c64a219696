//! Conflict queue handlers: list, resolve, ignore, reopen.

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};

use shopsync_core::{ConflictId, ResourceType};
use shopsync_store::ConflictResolution;

use crate::error::{ApiError, ApiResult};
use crate::models::{ConflictActionRequest, ConflictResponse, ListConflictsQuery, ResolveConflictRequest};
use crate::router::ApiState;

use super::extract_tenant_id;

fn parse_conflict_id(id: &str) -> ApiResult<ConflictId> {
    id.parse()
        .map_err(|_| ApiError::Validation(format!("invalid conflict id: {id}")))
}

/// List pending conflicts, most severe first.
#[utoipa::path(
    get,
    path = "/conflicts",
    tag = "Conflicts",
    params(ListConflictsQuery),
    responses(
        (status = 200, description = "Pending conflicts", body = [ConflictResponse]),
        (status = 400, description = "Unknown resource type filter"),
    )
)]
pub async fn list_conflicts_handler(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Query(query): Query<ListConflictsQuery>,
) -> ApiResult<Json<Vec<ConflictResponse>>> {
    let tenant_id = extract_tenant_id(&headers)?;
    let resource_type = query
        .resource_type
        .as_deref()
        .map(str::parse::<ResourceType>)
        .transpose()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let pending = state
        .stores
        .conflicts
        .list_pending(tenant_id, resource_type)
        .await;
    Ok(Json(pending.iter().map(ConflictResponse::from).collect()))
}

/// Resolve a pending conflict toward one side.
#[utoipa::path(
    post,
    path = "/conflicts/{id}/resolve",
    tag = "Conflicts",
    request_body = ResolveConflictRequest,
    responses(
        (status = 200, description = "Conflict resolved", body = ConflictResponse),
        (status = 400, description = "Unknown resolution or conflict not pending"),
        (status = 404, description = "Conflict not found"),
    )
)]
pub async fn resolve_conflict_handler(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(request): Json<ResolveConflictRequest>,
) -> ApiResult<Json<ConflictResponse>> {
    let tenant_id = extract_tenant_id(&headers)?;
    let conflict_id = parse_conflict_id(&id)?;
    let resolution: ConflictResolution = request.resolution.parse()?;

    let conflict = state
        .detector
        .resolve(
            tenant_id,
            conflict_id,
            resolution,
            &request.actor,
            request.notes,
        )
        .await?;
    Ok(Json(ConflictResponse::from(&conflict)))
}

/// Ignore a pending conflict.
#[utoipa::path(
    post,
    path = "/conflicts/{id}/ignore",
    tag = "Conflicts",
    request_body = ConflictActionRequest,
    responses(
        (status = 200, description = "Conflict ignored", body = ConflictResponse),
        (status = 400, description = "Conflict not pending"),
        (status = 404, description = "Conflict not found"),
    )
)]
pub async fn ignore_conflict_handler(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(request): Json<ConflictActionRequest>,
) -> ApiResult<Json<ConflictResponse>> {
    let tenant_id = extract_tenant_id(&headers)?;
    let conflict_id = parse_conflict_id(&id)?;

    let conflict = state
        .detector
        .ignore(tenant_id, conflict_id, &request.actor, request.notes)
        .await?;
    Ok(Json(ConflictResponse::from(&conflict)))
}

/// Return a resolved or ignored conflict to the pending queue.
#[utoipa::path(
    post,
    path = "/conflicts/{id}/reopen",
    tag = "Conflicts",
    request_body = ConflictActionRequest,
    responses(
        (status = 200, description = "Conflict reopened", body = ConflictResponse),
        (status = 400, description = "Conflict already pending"),
        (status = 404, description = "Conflict not found"),
    )
)]
pub async fn reopen_conflict_handler(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(request): Json<ConflictActionRequest>,
) -> ApiResult<Json<ConflictResponse>> {
    let tenant_id = extract_tenant_id(&headers)?;
    let conflict_id = parse_conflict_id(&id)?;

    let conflict = state
        .detector
        .reopen(tenant_id, conflict_id, &request.actor, request.notes)
        .await?;
    Ok(Json(ConflictResponse::from(&conflict)))
}
