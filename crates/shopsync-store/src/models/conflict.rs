//! Conflict record model and its state machine.
//!
//! Legal transitions: `pending -> resolved | ignored`, and
//! `resolved | ignored -> pending` (reopen). Nothing else. Every action
//! appends a history entry; prior entries are never mutated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use shopsync_core::{ConflictId, JobId, ResourceType, TenantId};

use crate::error::{StoreError, StoreResult};

/// Classification of a detected divergence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    /// Both sides hold differing non-null values for the same field.
    DataMismatch,
    /// One side reports the entity deleted, the other reports it active.
    DeletionConflict,
    /// Both sides independently created an entity claiming the same key.
    CreationConflict,
    /// Platform and authority disagree on a stock quantity.
    InventoryConflict,
}

impl ConflictType {
    /// Convert to string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictType::DataMismatch => "data_mismatch",
            ConflictType::DeletionConflict => "deletion_conflict",
            ConflictType::CreationConflict => "creation_conflict",
            ConflictType::InventoryConflict => "inventory_conflict",
        }
    }
}

impl std::fmt::Display for ConflictType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Conflict lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictStatus {
    Pending,
    Resolved,
    Ignored,
}

impl ConflictStatus {
    /// Convert to string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictStatus::Pending => "pending",
            ConflictStatus::Resolved => "resolved",
            ConflictStatus::Ignored => "ignored",
        }
    }
}

/// Severity, ordered so that `Critical > High > Medium > Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ConflictSeverity {
    /// Convert to string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictSeverity::Low => "low",
            ConflictSeverity::Medium => "medium",
            ConflictSeverity::High => "high",
            ConflictSeverity::Critical => "critical",
        }
    }
}

/// Which side's value a resolution selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictResolution {
    UsePlatform,
    UseAuthority,
    /// The divergence is accepted as-is; each side keeps its own value.
    /// Recorded on ignored conflicts.
    KeepBoth,
}

impl ConflictResolution {
    /// Convert to string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictResolution::UsePlatform => "use_platform",
            ConflictResolution::UseAuthority => "use_authority",
            ConflictResolution::KeepBoth => "keep_both",
        }
    }
}

impl std::str::FromStr for ConflictResolution {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "use_platform" => Ok(ConflictResolution::UsePlatform),
            "use_authority" => Ok(ConflictResolution::UseAuthority),
            "keep_both" => Ok(ConflictResolution::KeepBoth),
            _ => Err(StoreError::validation(format!("unknown resolution: {s}"))),
        }
    }
}

/// Field-level divergence between the two sides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDiff {
    pub field: String,
    pub platform_value: Value,
    pub authority_value: Value,
    pub resolved_value: Option<Value>,
}

impl FieldDiff {
    #[must_use]
    pub fn new(field: impl Into<String>, platform_value: Value, authority_value: Value) -> Self {
        Self {
            field: field.into(),
            platform_value,
            authority_value,
            resolved_value: None,
        }
    }
}

/// Action recorded in the conflict's version history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictAction {
    Created,
    Updated,
    Resolved,
    Reopened,
    Ignored,
}

/// One append-only history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictHistoryEntry {
    pub action: ConflictAction,
    pub actor: String,
    pub notes: Option<String>,
    pub at: DateTime<Utc>,
}

/// A detected divergence awaiting or having received resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictRecord {
    pub id: ConflictId,
    pub tenant_id: TenantId,
    pub resource_type: ResourceType,
    pub platform_id: String,
    pub authority_id: Option<String>,
    pub conflict_type: ConflictType,
    pub status: ConflictStatus,
    pub severity: ConflictSeverity,
    pub field_diffs: Vec<FieldDiff>,
    /// Job during which this conflict was detected.
    pub sync_job_id: Option<JobId>,
    pub auto_resolution_attempted: bool,
    pub auto_resolution_outcome: Option<String>,
    pub resolution: Option<ConflictResolution>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub detected_at: DateTime<Utc>,
    pub history: Vec<ConflictHistoryEntry>,
}

impl ConflictRecord {
    /// Create a new pending conflict with a `created` history entry.
    #[must_use]
    pub fn new(
        tenant_id: TenantId,
        resource_type: ResourceType,
        platform_id: impl Into<String>,
        authority_id: Option<String>,
        conflict_type: ConflictType,
        severity: ConflictSeverity,
        field_diffs: Vec<FieldDiff>,
        sync_job_id: Option<JobId>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ConflictId::new(),
            tenant_id,
            resource_type,
            platform_id: platform_id.into(),
            authority_id,
            conflict_type,
            status: ConflictStatus::Pending,
            severity,
            field_diffs,
            sync_job_id,
            auto_resolution_attempted: false,
            auto_resolution_outcome: None,
            resolution: None,
            resolved_at: None,
            detected_at: now,
            history: vec![ConflictHistoryEntry {
                action: ConflictAction::Created,
                actor: "detector".to_string(),
                notes: None,
                at: now,
            }],
        }
    }

    /// Replace the field diffs on re-detection, appending an `updated`
    /// history entry. Legal only while pending.
    pub fn update_diffs(&mut self, field_diffs: Vec<FieldDiff>, actor: &str) -> StoreResult<()> {
        if self.status != ConflictStatus::Pending {
            return Err(StoreError::invalid_transition(
                self.status.as_str(),
                "updated",
            ));
        }
        self.field_diffs = field_diffs;
        self.push_history(ConflictAction::Updated, actor, None);
        Ok(())
    }

    /// `pending -> resolved`. Sets the resolution, stamps `resolved_at`,
    /// fills each diff's `resolved_value`, and appends a history entry.
    pub fn resolve(
        &mut self,
        resolution: ConflictResolution,
        actor: &str,
        notes: Option<String>,
    ) -> StoreResult<()> {
        if self.status != ConflictStatus::Pending {
            return Err(StoreError::invalid_transition(
                self.status.as_str(),
                ConflictStatus::Resolved.as_str(),
            ));
        }
        for diff in &mut self.field_diffs {
            diff.resolved_value = match resolution {
                ConflictResolution::UsePlatform => Some(diff.platform_value.clone()),
                ConflictResolution::UseAuthority => Some(diff.authority_value.clone()),
                ConflictResolution::KeepBoth => None,
            };
        }
        self.resolution = Some(resolution);
        self.resolved_at = Some(Utc::now());
        self.status = ConflictStatus::Resolved;
        self.push_history(ConflictAction::Resolved, actor, notes);
        Ok(())
    }

    /// `pending -> ignored`. Records `keep_both` as the resolution, so an
    /// ignored conflict carries a resolution and `resolved_at` the same
    /// way a resolved one does.
    pub fn ignore(&mut self, actor: &str, notes: Option<String>) -> StoreResult<()> {
        if self.status != ConflictStatus::Pending {
            return Err(StoreError::invalid_transition(
                self.status.as_str(),
                ConflictStatus::Ignored.as_str(),
            ));
        }
        self.resolution = Some(ConflictResolution::KeepBoth);
        self.resolved_at = Some(Utc::now());
        self.status = ConflictStatus::Ignored;
        self.push_history(ConflictAction::Ignored, actor, notes);
        Ok(())
    }

    /// `resolved | ignored -> pending`. Clears the resolution and
    /// `resolved_at`, appending a history entry rather than mutating any
    /// prior entry.
    pub fn reopen(&mut self, actor: &str, notes: Option<String>) -> StoreResult<()> {
        if self.status == ConflictStatus::Pending {
            return Err(StoreError::invalid_transition(
                self.status.as_str(),
                ConflictStatus::Pending.as_str(),
            ));
        }
        self.resolution = None;
        self.resolved_at = None;
        for diff in &mut self.field_diffs {
            diff.resolved_value = None;
        }
        self.status = ConflictStatus::Pending;
        self.push_history(ConflictAction::Reopened, actor, notes);
        Ok(())
    }

    fn push_history(&mut self, action: ConflictAction, actor: &str, notes: Option<String>) {
        self.history.push(ConflictHistoryEntry {
            action,
            actor: actor.to_string(),
            notes,
            at: Utc::now(),
        });
    }
}
