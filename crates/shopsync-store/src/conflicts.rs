//! Conflict store: lifecycle operations over detected divergences.

use std::collections::HashMap;

use tokio::sync::RwLock;
use tracing::debug;

use shopsync_core::{ConflictId, ResourceType, TenantId};

use crate::error::{StoreError, StoreResult};
use crate::models::{ConflictRecord, ConflictStatus};

/// In-memory conflict store keyed by conflict id.
#[derive(Debug, Default)]
pub struct ConflictStore {
    inner: RwLock<HashMap<ConflictId, ConflictRecord>>,
}

impl ConflictStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a newly detected conflict.
    pub async fn insert(&self, conflict: ConflictRecord) -> StoreResult<()> {
        let mut guard = self.inner.write().await;
        if guard.contains_key(&conflict.id) {
            return Err(StoreError::DuplicateKey {
                entity: "conflict",
                key: conflict.id.to_string(),
            });
        }
        debug!(
            conflict_id = %conflict.id,
            tenant_id = %conflict.tenant_id,
            conflict_type = conflict.conflict_type.as_str(),
            severity = conflict.severity.as_str(),
            "Conflict recorded"
        );
        guard.insert(conflict.id, conflict);
        Ok(())
    }

    /// Fetch a conflict by id, scoped to a tenant.
    pub async fn get(&self, tenant_id: TenantId, id: ConflictId) -> StoreResult<ConflictRecord> {
        self.inner
            .read()
            .await
            .get(&id)
            .filter(|c| c.tenant_id == tenant_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("conflict", id.to_string()))
    }

    /// Atomically mutate a conflict. The closure's error aborts the
    /// mutation, so illegal lifecycle transitions leave the record as-is.
    pub async fn update<T, F>(&self, tenant_id: TenantId, id: ConflictId, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut ConflictRecord) -> StoreResult<T>,
    {
        let mut guard = self.inner.write().await;
        let conflict = guard
            .get_mut(&id)
            .filter(|c| c.tenant_id == tenant_id)
            .ok_or_else(|| StoreError::not_found("conflict", id.to_string()))?;
        let mut staged = conflict.clone();
        let out = f(&mut staged)?;
        *conflict = staged;
        Ok(out)
    }

    /// The single pending conflict for a resource, if any. Detection keeps
    /// at most one pending conflict per (resource type, platform id) by
    /// updating it in place on re-detection.
    pub async fn find_pending(
        &self,
        tenant_id: TenantId,
        resource_type: ResourceType,
        platform_id: &str,
    ) -> Option<ConflictRecord> {
        self.inner
            .read()
            .await
            .values()
            .find(|c| {
                c.tenant_id == tenant_id
                    && c.status == ConflictStatus::Pending
                    && c.resource_type == resource_type
                    && c.platform_id == platform_id
            })
            .cloned()
    }

    /// The most recently closed (resolved or ignored) conflict for a
    /// resource, if any. The reconciler consults it to propagate resolved
    /// values, and to honor accepted divergences, on the next pass.
    pub async fn latest_closed(
        &self,
        tenant_id: TenantId,
        resource_type: ResourceType,
        platform_id: &str,
    ) -> Option<ConflictRecord> {
        self.inner
            .read()
            .await
            .values()
            .filter(|c| {
                c.tenant_id == tenant_id
                    && c.status != ConflictStatus::Pending
                    && c.resource_type == resource_type
                    && c.platform_id == platform_id
            })
            .max_by_key(|c| c.resolved_at)
            .cloned()
    }

    /// Pending conflicts ordered by severity descending, then by detection
    /// time ascending. Optionally filtered by resource type.
    pub async fn list_pending(
        &self,
        tenant_id: TenantId,
        resource_type: Option<ResourceType>,
    ) -> Vec<ConflictRecord> {
        let mut pending: Vec<ConflictRecord> = self
            .inner
            .read()
            .await
            .values()
            .filter(|c| {
                c.tenant_id == tenant_id
                    && c.status == ConflictStatus::Pending
                    && resource_type.map_or(true, |rt| c.resource_type == rt)
            })
            .cloned()
            .collect();
        pending.sort_by(|a, b| {
            b.severity
                .cmp(&a.severity)
                .then(a.detected_at.cmp(&b.detected_at))
        });
        pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConflictResolution, ConflictSeverity, ConflictType, FieldDiff};
    use serde_json::json;

    fn conflict(
        tenant: TenantId,
        platform_id: &str,
        severity: ConflictSeverity,
    ) -> ConflictRecord {
        ConflictRecord::new(
            tenant,
            ResourceType::Product,
            platform_id,
            None,
            ConflictType::DataMismatch,
            severity,
            vec![FieldDiff::new("title", json!("a"), json!("b"))],
            None,
        )
    }

    #[tokio::test]
    async fn test_list_pending_sorted_by_severity_then_age() {
        let store = ConflictStore::new();
        let tenant = TenantId::new();

        let low = conflict(tenant, "p1", ConflictSeverity::Low);
        let critical = conflict(tenant, "p2", ConflictSeverity::Critical);
        let high_old = conflict(tenant, "p3", ConflictSeverity::High);
        let high_new = conflict(tenant, "p4", ConflictSeverity::High);
        let mut high_new = high_new;
        high_new.detected_at = high_old.detected_at + chrono::Duration::seconds(5);

        for c in [low, critical.clone(), high_old.clone(), high_new.clone()] {
            store.insert(c).await.unwrap();
        }

        let pending = store.list_pending(tenant, None).await;
        assert_eq!(pending.len(), 4);
        assert_eq!(pending[0].id, critical.id);
        assert_eq!(pending[1].id, high_old.id);
        assert_eq!(pending[2].id, high_new.id);
        assert_eq!(pending[3].severity, ConflictSeverity::Low);
    }

    #[tokio::test]
    async fn test_resolved_conflicts_excluded_from_pending() {
        let store = ConflictStore::new();
        let tenant = TenantId::new();
        let c = conflict(tenant, "p1", ConflictSeverity::Medium);
        let id = c.id;
        store.insert(c).await.unwrap();

        store
            .update(tenant, id, |c| {
                c.resolve(ConflictResolution::UsePlatform, "ops", None)
            })
            .await
            .unwrap();

        assert!(store.list_pending(tenant, None).await.is_empty());
        assert!(store.find_pending(tenant, ResourceType::Product, "p1").await.is_none());
    }

    #[tokio::test]
    async fn test_update_failure_leaves_record_unchanged() {
        let store = ConflictStore::new();
        let tenant = TenantId::new();
        let mut c = conflict(tenant, "p1", ConflictSeverity::Medium);
        c.resolve(ConflictResolution::UsePlatform, "ops", None).unwrap();
        let id = c.id;
        store.insert(c).await.unwrap();

        // Resolving again is illegal; the history must not grow.
        let err = store
            .update(tenant, id, |c| {
                c.resolve(ConflictResolution::UseAuthority, "ops", None)
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidTransition { .. }));

        let after = store.get(tenant, id).await.unwrap();
        assert_eq!(after.resolution, Some(ConflictResolution::UsePlatform));
    }

    #[tokio::test]
    async fn test_latest_closed_covers_ignored() {
        let store = ConflictStore::new();
        let tenant = TenantId::new();
        let c = conflict(tenant, "p1", ConflictSeverity::Medium);
        let id = c.id;
        store.insert(c).await.unwrap();
        store
            .update(tenant, id, |c| c.ignore("ops", None))
            .await
            .unwrap();

        let closed = store
            .latest_closed(tenant, ResourceType::Product, "p1")
            .await
            .unwrap();
        assert_eq!(closed.id, id);
        assert_eq!(closed.status, ConflictStatus::Ignored);
    }

    #[tokio::test]
    async fn test_tenant_scoping() {
        let store = ConflictStore::new();
        let tenant = TenantId::new();
        let c = conflict(tenant, "p1", ConflictSeverity::Medium);
        let id = c.id;
        store.insert(c).await.unwrap();

        assert!(store.get(TenantId::new(), id).await.is_err());
        assert!(store.list_pending(TenantId::new(), None).await.is_empty());
    }

    #[tokio::test]
    async fn test_resource_type_filter() {
        let store = ConflictStore::new();
        let tenant = TenantId::new();
        store
            .insert(conflict(tenant, "p1", ConflictSeverity::Medium))
            .await
            .unwrap();

        assert_eq!(store.list_pending(tenant, Some(ResourceType::Product)).await.len(), 1);
        assert!(store
            .list_pending(tenant, Some(ResourceType::Collection))
            .await
            .is_empty());
    }
}
