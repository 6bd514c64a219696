//! Conflict detection and resolution service.
//!
//! The detector owns ConflictRecord creation and transitions; the
//! reconciler consults it whenever both sides report a value for the same
//! field but never writes conflicts itself.

use std::sync::Arc;

use tracing::{debug, info, instrument};

use shopsync_core::{ConflictId, JobId, ResolutionPolicy, ResourceType, TenantId};
use shopsync_store::{
    ConflictRecord, ConflictResolution, ConflictSeverity, ConflictStatus, ConflictStore,
    ConflictType, FieldDiff,
};

use crate::diff::Settlements;
use crate::error::EngineResult;

/// Actor recorded on policy-driven automatic resolutions.
pub const AUTO_ACTOR: &str = "auto";

/// A divergence observed between the two sides, prior to classification.
#[derive(Debug, Clone)]
pub enum Divergence {
    /// Both sides hold differing non-null values for mapped fields.
    Data { field_diffs: Vec<FieldDiff> },
    /// One side reports the entity deleted while the other reports it
    /// active.
    Deletion {
        platform_deleted: bool,
        field_diffs: Vec<FieldDiff>,
    },
    /// Both sides independently created an entity claiming the same
    /// external key.
    Creation { field_diffs: Vec<FieldDiff> },
    /// Stock quantity mismatch; diffs are keyed by location id.
    Inventory { field_diffs: Vec<FieldDiff> },
}

impl Divergence {
    fn field_diffs(&self) -> &[FieldDiff] {
        match self {
            Divergence::Data { field_diffs }
            | Divergence::Deletion { field_diffs, .. }
            | Divergence::Creation { field_diffs }
            | Divergence::Inventory { field_diffs } => field_diffs,
        }
    }
}

/// Classify a divergence. Deterministic: the same inputs always yield the
/// same type and severity.
#[must_use]
pub fn classify(divergence: &Divergence) -> (ConflictType, ConflictSeverity) {
    match divergence {
        Divergence::Creation { .. } => (ConflictType::CreationConflict, ConflictSeverity::Critical),
        Divergence::Deletion { .. } => (ConflictType::DeletionConflict, ConflictSeverity::High),
        Divergence::Inventory { .. } => (ConflictType::InventoryConflict, ConflictSeverity::High),
        Divergence::Data { field_diffs } => {
            let severity = if field_diffs.iter().any(|d| d.field == "price") {
                ConflictSeverity::High
            } else {
                ConflictSeverity::Medium
            };
            (ConflictType::DataMismatch, severity)
        }
    }
}

/// Outcome of a policy-driven automatic resolution attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoResolveOutcome {
    /// The conflict was resolved with the given side's values.
    Resolved(ConflictResolution),
    /// Left pending for an operator.
    Unresolved,
}

/// Service owning conflict lifecycle during reconciliation.
pub struct ConflictDetector {
    conflicts: Arc<ConflictStore>,
}

impl ConflictDetector {
    /// Create a new detector over the conflict store.
    #[must_use]
    pub fn new(conflicts: Arc<ConflictStore>) -> Self {
        Self { conflicts }
    }

    /// Record a divergence. Re-detection for a resource with an existing
    /// pending conflict updates that conflict in place, so replaying the
    /// same webhook never produces a duplicate record.
    #[instrument(skip(self, divergence), fields(tenant_id = %tenant_id, platform_id))]
    pub async fn detect(
        &self,
        tenant_id: TenantId,
        resource_type: ResourceType,
        platform_id: &str,
        authority_id: Option<String>,
        divergence: Divergence,
        sync_job_id: Option<JobId>,
    ) -> EngineResult<ConflictRecord> {
        let (conflict_type, severity) = classify(&divergence);

        if let Some(existing) = self
            .conflicts
            .find_pending(tenant_id, resource_type, platform_id)
            .await
        {
            debug!(conflict_id = %existing.id, "Updating pending conflict in place");
            let diffs = divergence.field_diffs().to_vec();
            let updated = self
                .conflicts
                .update(tenant_id, existing.id, |c| {
                    c.conflict_type = conflict_type;
                    c.severity = severity;
                    c.update_diffs(diffs, "detector")?;
                    Ok(c.clone())
                })
                .await?;
            return Ok(updated);
        }

        let conflict = ConflictRecord::new(
            tenant_id,
            resource_type,
            platform_id,
            authority_id,
            conflict_type,
            severity,
            divergence.field_diffs().to_vec(),
            sync_job_id,
        );
        info!(
            conflict_id = %conflict.id,
            conflict_type = conflict_type.as_str(),
            severity = severity.as_str(),
            "Conflict detected"
        );
        self.conflicts.insert(conflict.clone()).await?;
        Ok(conflict)
    }

    /// Attempt policy-driven automatic resolution. Only `data_mismatch`
    /// and `deletion_conflict` are eligible; creation and inventory
    /// conflicts are always left pending for human resolution.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, conflict_id = %conflict_id))]
    pub async fn auto_resolve(
        &self,
        tenant_id: TenantId,
        conflict_id: ConflictId,
        policy: ResolutionPolicy,
    ) -> EngineResult<AutoResolveOutcome> {
        let resolution = match policy {
            ResolutionPolicy::UsePlatform => ConflictResolution::UsePlatform,
            ResolutionPolicy::UseAuthority => ConflictResolution::UseAuthority,
            ResolutionPolicy::ManualOnly => return Ok(AutoResolveOutcome::Unresolved),
        };

        let outcome = self
            .conflicts
            .update(tenant_id, conflict_id, |c| {
                c.auto_resolution_attempted = true;
                let eligible = matches!(
                    c.conflict_type,
                    ConflictType::DataMismatch | ConflictType::DeletionConflict
                );
                if !eligible {
                    c.auto_resolution_outcome = Some(format!(
                        "{} requires manual resolution",
                        c.conflict_type.as_str()
                    ));
                    return Ok(AutoResolveOutcome::Unresolved);
                }
                c.resolve(resolution, AUTO_ACTOR, None)?;
                c.auto_resolution_outcome = Some(resolution.as_str().to_string());
                Ok(AutoResolveOutcome::Resolved(resolution))
            })
            .await?;

        if let AutoResolveOutcome::Resolved(resolution) = outcome {
            info!(resolution = resolution.as_str(), "Conflict auto-resolved");
        }
        Ok(outcome)
    }

    /// Operator resolution, legal only from `pending`.
    pub async fn resolve(
        &self,
        tenant_id: TenantId,
        conflict_id: ConflictId,
        resolution: ConflictResolution,
        actor: &str,
        notes: Option<String>,
    ) -> EngineResult<ConflictRecord> {
        let record = self
            .conflicts
            .update(tenant_id, conflict_id, |c| {
                c.resolve(resolution, actor, notes)?;
                Ok(c.clone())
            })
            .await?;
        info!(conflict_id = %conflict_id, resolution = resolution.as_str(), actor, "Conflict resolved");
        Ok(record)
    }

    /// Mark a pending conflict ignored.
    pub async fn ignore(
        &self,
        tenant_id: TenantId,
        conflict_id: ConflictId,
        actor: &str,
        notes: Option<String>,
    ) -> EngineResult<ConflictRecord> {
        let record = self
            .conflicts
            .update(tenant_id, conflict_id, |c| {
                c.ignore(actor, notes)?;
                Ok(c.clone())
            })
            .await?;
        Ok(record)
    }

    /// Return a resolved or ignored conflict to `pending`.
    pub async fn reopen(
        &self,
        tenant_id: TenantId,
        conflict_id: ConflictId,
        actor: &str,
        notes: Option<String>,
    ) -> EngineResult<ConflictRecord> {
        let record = self
            .conflicts
            .update(tenant_id, conflict_id, |c| {
                c.reopen(actor, notes)?;
                Ok(c.clone())
            })
            .await?;
        info!(conflict_id = %conflict_id, actor, "Conflict reopened");
        Ok(record)
    }

    /// Decisions carried by the most recent closed conflict for a
    /// resource. A resolved conflict contributes its resolved values; an
    /// ignored one (or a `keep_both` resolution) contributes its diffs as
    /// accepted divergences. Empty when nothing was ever closed.
    pub async fn settlements(
        &self,
        tenant_id: TenantId,
        resource_type: ResourceType,
        platform_id: &str,
    ) -> Settlements {
        let Some(conflict) = self
            .conflicts
            .latest_closed(tenant_id, resource_type, platform_id)
            .await
        else {
            return Settlements::default();
        };

        let mut settled = Settlements::default();
        if conflict.status == ConflictStatus::Ignored
            || conflict.resolution == Some(ConflictResolution::KeepBoth)
        {
            for diff in conflict.field_diffs {
                settled
                    .accepted
                    .insert(diff.field, (diff.platform_value, diff.authority_value));
            }
        } else {
            for diff in conflict.field_diffs {
                if let Some(value) = diff.resolved_value {
                    settled.resolved.insert(diff.field, value);
                }
            }
        }
        settled
    }

    /// Close a lingering pending conflict whose sides have since converged
    /// on their own. Resolved as `keep_both` with emptied diffs, since no
    /// divergence remains to pick a side of.
    pub async fn close_converged(
        &self,
        tenant_id: TenantId,
        resource_type: ResourceType,
        platform_id: &str,
    ) -> EngineResult<Option<ConflictRecord>> {
        let Some(pending) = self
            .conflicts
            .find_pending(tenant_id, resource_type, platform_id)
            .await
        else {
            return Ok(None);
        };

        let record = self
            .conflicts
            .update(tenant_id, pending.id, |c| {
                c.update_diffs(Vec::new(), AUTO_ACTOR)?;
                c.resolve(
                    ConflictResolution::KeepBoth,
                    AUTO_ACTOR,
                    Some("both sides converged".to_string()),
                )?;
                Ok(c.clone())
            })
            .await?;
        info!(conflict_id = %pending.id, "Stale conflict closed after convergence");
        Ok(Some(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn detector() -> (ConflictDetector, Arc<ConflictStore>) {
        let store = Arc::new(ConflictStore::new());
        (ConflictDetector::new(store.clone()), store)
    }

    fn title_diff() -> Vec<FieldDiff> {
        vec![FieldDiff::new("title", json!("a"), json!("b"))]
    }

    #[test]
    fn test_classification_is_deterministic() {
        let data = Divergence::Data {
            field_diffs: title_diff(),
        };
        for _ in 0..3 {
            assert_eq!(
                classify(&data),
                (ConflictType::DataMismatch, ConflictSeverity::Medium)
            );
        }

        let price = Divergence::Data {
            field_diffs: vec![FieldDiff::new("price", json!(10), json!(12))],
        };
        assert_eq!(
            classify(&price),
            (ConflictType::DataMismatch, ConflictSeverity::High)
        );

        let deletion = Divergence::Deletion {
            platform_deleted: true,
            field_diffs: vec![],
        };
        assert_eq!(
            classify(&deletion),
            (ConflictType::DeletionConflict, ConflictSeverity::High)
        );

        let creation = Divergence::Creation {
            field_diffs: vec![],
        };
        assert_eq!(
            classify(&creation),
            (ConflictType::CreationConflict, ConflictSeverity::Critical)
        );

        let inventory = Divergence::Inventory {
            field_diffs: vec![FieldDiff::new("L1", json!(4), json!(6))],
        };
        assert_eq!(
            classify(&inventory),
            (ConflictType::InventoryConflict, ConflictSeverity::High)
        );
    }

    #[tokio::test]
    async fn test_redetection_updates_pending_in_place() {
        let (detector, store) = detector();
        let tenant = TenantId::new();

        let first = detector
            .detect(
                tenant,
                ResourceType::Product,
                "p1",
                None,
                Divergence::Data {
                    field_diffs: title_diff(),
                },
                None,
            )
            .await
            .unwrap();

        let second = detector
            .detect(
                tenant,
                ResourceType::Product,
                "p1",
                None,
                Divergence::Data {
                    field_diffs: vec![FieldDiff::new("title", json!("a"), json!("c"))],
                },
                None,
            )
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(store.list_pending(tenant, None).await.len(), 1);
        assert_eq!(second.field_diffs[0].authority_value, json!("c"));
    }

    #[tokio::test]
    async fn test_auto_resolve_respects_policy() {
        let (detector, store) = detector();
        let tenant = TenantId::new();
        let conflict = detector
            .detect(
                tenant,
                ResourceType::Product,
                "p1",
                None,
                Divergence::Data {
                    field_diffs: title_diff(),
                },
                None,
            )
            .await
            .unwrap();

        let outcome = detector
            .auto_resolve(tenant, conflict.id, ResolutionPolicy::ManualOnly)
            .await
            .unwrap();
        assert_eq!(outcome, AutoResolveOutcome::Unresolved);

        let outcome = detector
            .auto_resolve(tenant, conflict.id, ResolutionPolicy::UsePlatform)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            AutoResolveOutcome::Resolved(ConflictResolution::UsePlatform)
        );

        let record = store.get(tenant, conflict.id).await.unwrap();
        assert_eq!(record.status, ConflictStatus::Resolved);
        assert!(record.auto_resolution_attempted);
        assert_eq!(record.history.last().unwrap().actor, AUTO_ACTOR);
    }

    #[tokio::test]
    async fn test_inventory_conflict_never_auto_resolved() {
        let (detector, store) = detector();
        let tenant = TenantId::new();
        let conflict = detector
            .detect(
                tenant,
                ResourceType::Inventory,
                "v1",
                None,
                Divergence::Inventory {
                    field_diffs: vec![FieldDiff::new("L1", json!(4), json!(6))],
                },
                None,
            )
            .await
            .unwrap();

        let outcome = detector
            .auto_resolve(tenant, conflict.id, ResolutionPolicy::UsePlatform)
            .await
            .unwrap();
        assert_eq!(outcome, AutoResolveOutcome::Unresolved);

        let record = store.get(tenant, conflict.id).await.unwrap();
        assert_eq!(record.status, ConflictStatus::Pending);
        assert!(record.auto_resolution_attempted);
    }

    #[tokio::test]
    async fn test_resolved_settlement_projection() {
        let (detector, _store) = detector();
        let tenant = TenantId::new();
        let conflict = detector
            .detect(
                tenant,
                ResourceType::Product,
                "p1",
                None,
                Divergence::Data {
                    field_diffs: title_diff(),
                },
                None,
            )
            .await
            .unwrap();
        detector
            .resolve(
                tenant,
                conflict.id,
                ConflictResolution::UsePlatform,
                "ops",
                None,
            )
            .await
            .unwrap();

        let settled = detector
            .settlements(tenant, ResourceType::Product, "p1")
            .await;
        assert_eq!(settled.resolved.get("title"), Some(&json!("a")));
        assert!(settled.accepted.is_empty());
    }

    #[tokio::test]
    async fn test_ignored_settlement_accepts_divergence() {
        let (detector, _store) = detector();
        let tenant = TenantId::new();
        let conflict = detector
            .detect(
                tenant,
                ResourceType::Product,
                "p1",
                None,
                Divergence::Data {
                    field_diffs: title_diff(),
                },
                None,
            )
            .await
            .unwrap();
        detector
            .ignore(tenant, conflict.id, "ops", Some("vendor typo".to_string()))
            .await
            .unwrap();

        let settled = detector
            .settlements(tenant, ResourceType::Product, "p1")
            .await;
        assert!(settled.resolved.is_empty());
        assert_eq!(
            settled.accepted.get("title"),
            Some(&(json!("a"), json!("b")))
        );
    }

    #[tokio::test]
    async fn test_close_converged_resolves_stale_pending() {
        let (detector, store) = detector();
        let tenant = TenantId::new();
        let conflict = detector
            .detect(
                tenant,
                ResourceType::Product,
                "p1",
                None,
                Divergence::Data {
                    field_diffs: title_diff(),
                },
                None,
            )
            .await
            .unwrap();

        let closed = detector
            .close_converged(tenant, ResourceType::Product, "p1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(closed.id, conflict.id);
        assert_eq!(closed.status, ConflictStatus::Resolved);
        assert_eq!(closed.resolution, Some(ConflictResolution::KeepBoth));
        assert!(closed.field_diffs.is_empty());
        assert!(store.list_pending(tenant, None).await.is_empty());

        // Nothing pending now, so a second call is a no-op.
        assert!(detector
            .close_converged(tenant, ResourceType::Product, "p1")
            .await
            .unwrap()
            .is_none());
    }
}
