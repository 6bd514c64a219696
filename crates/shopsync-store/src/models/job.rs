//! Sync job model: the unit of synchronization work.
//!
//! A job is created in `queued` status by the orchestrator and mutated only
//! while `in_progress`. Status transitions are forward-only and a job in a
//! terminal status is immutable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopsync_core::{JobId, ResourceType, SyncDirection, TenantId};

use crate::error::{StoreError, StoreResult};

/// What triggered the job and how it selects targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Reconcile the tenant's entire catalog.
    Full,
    /// Reconcile one explicitly named resource.
    SingleResource,
    /// Created by the webhook ingestion adapter.
    WebhookTriggered,
    /// Operator-triggered single-resource sync.
    Manual,
}

impl JobKind {
    /// Convert to string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Full => "full",
            JobKind::SingleResource => "single_resource",
            JobKind::WebhookTriggered => "webhook_triggered",
            JobKind::Manual => "manual",
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Job lifecycle status. Transitions are monotonic forward-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    /// Terminal statuses admit no further mutation.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    /// Convert to string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::InProgress => "in_progress",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }

    fn can_transition_to(self, to: JobStatus) -> bool {
        matches!(
            (self, to),
            (JobStatus::Queued, JobStatus::InProgress)
                | (JobStatus::Queued, JobStatus::Cancelled)
                | (JobStatus::InProgress, JobStatus::Completed)
                | (JobStatus::InProgress, JobStatus::Failed)
                | (JobStatus::InProgress, JobStatus::Cancelled)
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for JobStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "queued" => Ok(JobStatus::Queued),
            "in_progress" => Ok(JobStatus::InProgress),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            "cancelled" => Ok(JobStatus::Cancelled),
            _ => Err(StoreError::validation(format!("unknown job status: {s}"))),
        }
    }
}

/// Unit-count progress through a job. `current` never exceeds `total`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct JobProgress {
    pub current: u64,
    pub total: u64,
}

impl JobProgress {
    /// Completion percentage in `[0, 100]`.
    #[must_use]
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.current as f64 / self.total as f64) * 100.0
        }
    }
}

/// One resource a job will reconcile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceTarget {
    pub resource_type: ResourceType,
    pub platform_id: String,
}

impl ResourceTarget {
    #[must_use]
    pub fn new(resource_type: ResourceType, platform_id: impl Into<String>) -> Self {
        Self {
            resource_type,
            platform_id: platform_id.into(),
        }
    }
}

/// Per-run options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobOptions {
    /// Overwrite the target side even when timestamps say it is newer.
    pub force: bool,
    /// Include image fields in the sync.
    pub include_images: bool,
    /// Reconcile inventory alongside core fields.
    pub include_inventory: bool,
}

/// Count plus the ids that produced it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeSet {
    pub count: u64,
    pub ids: Vec<String>,
}

impl OutcomeSet {
    fn record(&mut self, id: &str) {
        self.count += 1;
        self.ids.push(id.to_string());
    }
}

/// Aggregated per-unit outcomes of a job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResults {
    pub success: OutcomeSet,
    pub failed: OutcomeSet,
    pub skipped: OutcomeSet,
}

/// One entry in the job's ordered error log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobErrorEntry {
    pub resource_id: String,
    pub resource_type: ResourceType,
    pub message: String,
    pub code: String,
    pub at: DateTime<Utc>,
}

/// Diagnostic log severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

/// One entry in the job's ordered diagnostic log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobLogEntry {
    pub level: LogLevel,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// A unit of synchronization work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncJob {
    pub id: JobId,
    pub tenant_id: TenantId,
    pub kind: JobKind,
    pub direction: SyncDirection,
    pub status: JobStatus,
    pub progress: JobProgress,
    pub targets: Vec<ResourceTarget>,
    pub options: JobOptions,
    pub results: JobResults,
    pub errors: Vec<JobErrorEntry>,
    pub log: Vec<JobLogEntry>,
    pub queued_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl SyncJob {
    /// Create a new job in `queued` status.
    #[must_use]
    pub fn new(
        tenant_id: TenantId,
        kind: JobKind,
        direction: SyncDirection,
        targets: Vec<ResourceTarget>,
        options: JobOptions,
    ) -> Self {
        Self {
            id: JobId::new(),
            tenant_id,
            kind,
            direction,
            status: JobStatus::Queued,
            progress: JobProgress::default(),
            targets,
            options,
            results: JobResults::default(),
            errors: Vec::new(),
            log: Vec::new(),
            queued_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    /// Whether the job is in a terminal status.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    fn transition(&mut self, to: JobStatus) -> StoreResult<()> {
        if self.is_terminal() {
            return Err(StoreError::TerminalJob {
                id: self.id.to_string(),
            });
        }
        if !self.status.can_transition_to(to) {
            return Err(StoreError::invalid_transition(
                self.status.as_str(),
                to.as_str(),
            ));
        }
        self.status = to;
        Ok(())
    }

    /// `queued -> in_progress`, setting `started_at`.
    pub fn start(&mut self) -> StoreResult<()> {
        self.transition(JobStatus::InProgress)?;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    /// `in_progress -> completed`, setting `completed_at`.
    pub fn complete(&mut self) -> StoreResult<()> {
        self.transition(JobStatus::Completed)?;
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// `in_progress -> failed` on an unrecoverable error, recording a
    /// diagnostic entry and `completed_at`.
    pub fn fail(&mut self, message: impl Into<String>) -> StoreResult<()> {
        self.transition(JobStatus::Failed)?;
        self.push_log(LogLevel::Error, message);
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// `queued|in_progress -> cancelled`, setting `completed_at`. The unit
    /// currently in flight is allowed to finish; no further units run.
    pub fn cancel(&mut self) -> StoreResult<()> {
        self.transition(JobStatus::Cancelled)?;
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// Fix the total unit count before the batch loop starts.
    pub fn set_total(&mut self, total: u64) -> StoreResult<()> {
        self.ensure_mutable()?;
        self.progress.total = total;
        Ok(())
    }

    /// Advance progress by one unit, clamped at `total`.
    pub fn advance_progress(&mut self) -> StoreResult<()> {
        self.ensure_mutable()?;
        if self.progress.current < self.progress.total {
            self.progress.current += 1;
        }
        Ok(())
    }

    /// Record a successful unit.
    pub fn record_success(&mut self, resource_id: &str) -> StoreResult<()> {
        self.ensure_mutable()?;
        self.results.success.record(resource_id);
        Ok(())
    }

    /// Record a skipped unit (e.g. blocked behind an unresolved conflict).
    pub fn record_skipped(&mut self, resource_id: &str) -> StoreResult<()> {
        self.ensure_mutable()?;
        self.results.skipped.record(resource_id);
        Ok(())
    }

    /// Record a failed unit and append its error log entry.
    pub fn record_failure(
        &mut self,
        resource_id: &str,
        resource_type: ResourceType,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> StoreResult<()> {
        self.ensure_mutable()?;
        self.results.failed.record(resource_id);
        self.errors.push(JobErrorEntry {
            resource_id: resource_id.to_string(),
            resource_type,
            message: message.into(),
            code: code.into(),
            at: Utc::now(),
        });
        Ok(())
    }

    /// Append a diagnostic log entry.
    pub fn push_log(&mut self, level: LogLevel, message: impl Into<String>) {
        self.log.push(JobLogEntry {
            level,
            message: message.into(),
            at: Utc::now(),
        });
    }

    fn ensure_mutable(&self) -> StoreResult<()> {
        if self.is_terminal() {
            return Err(StoreError::TerminalJob {
                id: self.id.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> SyncJob {
        SyncJob::new(
            TenantId::new(),
            JobKind::SingleResource,
            SyncDirection::PlatformToAuthority,
            vec![ResourceTarget::new(ResourceType::Product, "p1")],
            JobOptions::default(),
        )
    }

    #[test]
    fn test_happy_path_transitions() {
        let mut j = job();
        assert_eq!(j.status, JobStatus::Queued);
        j.start().unwrap();
        assert_eq!(j.status, JobStatus::InProgress);
        assert!(j.started_at.is_some());
        j.complete().unwrap();
        assert_eq!(j.status, JobStatus::Completed);
        assert!(j.completed_at.is_some());
    }

    #[test]
    fn test_no_reentry_into_queued() {
        let mut j = job();
        j.start().unwrap();
        // There is no transition back; starting again is illegal.
        assert!(j.start().is_err());
    }

    #[test]
    fn test_terminal_jobs_are_immutable() {
        let mut j = job();
        j.start().unwrap();
        j.complete().unwrap();
        assert!(j.cancel().is_err());
        assert!(j.advance_progress().is_err());
        assert!(j.record_success("p1").is_err());
    }

    #[test]
    fn test_cancel_from_queued_and_in_progress() {
        let mut queued = job();
        queued.cancel().unwrap();
        assert_eq!(queued.status, JobStatus::Cancelled);

        let mut running = job();
        running.start().unwrap();
        running.cancel().unwrap();
        assert_eq!(running.status, JobStatus::Cancelled);
        assert!(running.completed_at.is_some());
    }

    #[test]
    fn test_progress_never_exceeds_total() {
        let mut j = job();
        j.start().unwrap();
        j.set_total(2).unwrap();
        j.advance_progress().unwrap();
        j.advance_progress().unwrap();
        j.advance_progress().unwrap();
        assert_eq!(j.progress.current, 2);
        assert!((j.progress.percentage() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_failed_unit_recorded_with_error_entry() {
        let mut j = job();
        j.start().unwrap();
        j.set_total(1).unwrap();
        j.record_failure("p9", ResourceType::Product, "not_found", "authority returned 404")
            .unwrap();
        j.advance_progress().unwrap();
        assert_eq!(j.results.failed.count, 1);
        assert_eq!(j.results.failed.ids, vec!["p9".to_string()]);
        assert_eq!(j.errors.len(), 1);
        assert_eq!(j.errors[0].code, "not_found");
    }

    #[test]
    fn test_percentage_of_empty_job() {
        let j = job();
        assert!((j.progress.percentage() - 0.0).abs() < f64::EPSILON);
    }
}
