//! Request and response bodies for the operator API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};

use shopsync_core::ResourceType;
use shopsync_store::{ConflictRecord, FieldDiff, JobErrorEntry, SyncJob};

/// Request one resource to be synchronized. An absent `resource_id` is
/// rejected rather than promoted to a full sync; that is what
/// `/sync-all` is for.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub struct SyncRequest {
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub resource_type: Option<ResourceType>,
    #[serde(default)]
    pub resource_id: Option<String>,
    #[serde(default)]
    pub force: bool,
}

/// Request a full catalog sync.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct SyncAllRequest {
    #[serde(default)]
    pub force: bool,
}

/// Acknowledgement carrying the queued job id.
#[derive(Debug, Serialize, ToSchema)]
pub struct JobAccepted {
    pub job_id: String,
}

/// Job listing filters.
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListJobsQuery {
    pub status: Option<String>,
    pub limit: Option<usize>,
}

/// One error recorded against a job unit.
#[derive(Debug, Serialize, ToSchema)]
pub struct JobErrorBody {
    pub resource_id: String,
    pub resource_type: String,
    pub message: String,
    pub code: String,
    pub at: DateTime<Utc>,
}

impl From<&JobErrorEntry> for JobErrorBody {
    fn from(entry: &JobErrorEntry) -> Self {
        Self {
            resource_id: entry.resource_id.clone(),
            resource_type: entry.resource_type.to_string(),
            message: entry.message.clone(),
            code: entry.code.clone(),
            at: entry.at,
        }
    }
}

/// Sync job as reported to operators.
#[derive(Debug, Serialize, ToSchema)]
pub struct JobResponse {
    pub id: String,
    pub kind: String,
    pub direction: String,
    pub status: String,
    pub current: u64,
    pub total: u64,
    pub percentage: f64,
    pub success_count: u64,
    pub failed_count: u64,
    pub skipped_count: u64,
    pub errors: Vec<JobErrorBody>,
    pub queued_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<&SyncJob> for JobResponse {
    fn from(job: &SyncJob) -> Self {
        Self {
            id: job.id.to_string(),
            kind: job.kind.to_string(),
            direction: job.direction.to_string(),
            status: job.status.to_string(),
            current: job.progress.current,
            total: job.progress.total,
            percentage: job.progress.percentage(),
            success_count: job.results.success.count,
            failed_count: job.results.failed.count,
            skipped_count: job.results.skipped.count,
            errors: job.errors.iter().map(JobErrorBody::from).collect(),
            queued_at: job.queued_at,
            started_at: job.started_at,
            completed_at: job.completed_at,
        }
    }
}

/// Conflict listing filters.
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListConflictsQuery {
    pub resource_type: Option<String>,
}

/// One diverged field within a conflict.
#[derive(Debug, Serialize, ToSchema)]
pub struct FieldDiffBody {
    pub field: String,
    pub platform_value: Value,
    pub authority_value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_value: Option<Value>,
}

impl From<&FieldDiff> for FieldDiffBody {
    fn from(diff: &FieldDiff) -> Self {
        Self {
            field: diff.field.clone(),
            platform_value: diff.platform_value.clone(),
            authority_value: diff.authority_value.clone(),
            resolved_value: diff.resolved_value.clone(),
        }
    }
}

/// Conflict as reported to operators.
#[derive(Debug, Serialize, ToSchema)]
pub struct ConflictResponse {
    pub id: String,
    pub resource_type: String,
    pub platform_id: String,
    pub authority_id: Option<String>,
    pub conflict_type: String,
    pub status: String,
    pub severity: String,
    pub field_diffs: Vec<FieldDiffBody>,
    pub resolution: Option<String>,
    pub auto_resolution_attempted: bool,
    pub detected_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl From<&ConflictRecord> for ConflictResponse {
    fn from(conflict: &ConflictRecord) -> Self {
        Self {
            id: conflict.id.to_string(),
            resource_type: conflict.resource_type.to_string(),
            platform_id: conflict.platform_id.clone(),
            authority_id: conflict.authority_id.clone(),
            conflict_type: conflict.conflict_type.as_str().to_string(),
            status: conflict.status.as_str().to_string(),
            severity: conflict.severity.as_str().to_string(),
            field_diffs: conflict.field_diffs.iter().map(FieldDiffBody::from).collect(),
            resolution: conflict.resolution.map(|r| r.as_str().to_string()),
            auto_resolution_attempted: conflict.auto_resolution_attempted,
            detected_at: conflict.detected_at,
            resolved_at: conflict.resolved_at,
        }
    }
}

/// Resolve a pending conflict toward one side.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ResolveConflictRequest {
    pub resolution: String,
    pub actor: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Ignore or reopen a conflict.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ConflictActionRequest {
    pub actor: String,
    #[serde(default)]
    pub notes: Option<String>,
}
