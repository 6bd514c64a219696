//! Record store for product and collection mirrors.
//!
//! Keyed by (tenant, resource type, platform id). Enforces the uniqueness
//! invariants: one record per platform id, and one record per authority id
//! once linked.

use std::collections::HashMap;

use tokio::sync::RwLock;
use tracing::debug;

use shopsync_core::{ResourceType, TenantId};

use crate::error::{StoreError, StoreResult};
use crate::models::CatalogRecord;

type RecordKey = (TenantId, ResourceType, String);

/// In-memory store of catalog records.
#[derive(Debug, Default)]
pub struct RecordStore {
    inner: RwLock<HashMap<RecordKey, CatalogRecord>>,
}

impl RecordStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch a record by platform id.
    pub async fn get(
        &self,
        tenant_id: TenantId,
        resource_type: ResourceType,
        platform_id: &str,
    ) -> Option<CatalogRecord> {
        self.inner
            .read()
            .await
            .get(&(tenant_id, resource_type, platform_id.to_string()))
            .cloned()
    }

    /// Fetch a record by authority id, if any record has linked to it.
    pub async fn find_by_authority_id(
        &self,
        tenant_id: TenantId,
        resource_type: ResourceType,
        authority_id: &str,
    ) -> Option<CatalogRecord> {
        self.inner
            .read()
            .await
            .values()
            .find(|r| {
                r.tenant_id == tenant_id
                    && r.resource_type == resource_type
                    && r.authority_id.as_deref() == Some(authority_id)
            })
            .cloned()
    }

    /// Insert or replace a record, enforcing that its authority id (when
    /// set) is not already claimed by a different platform id.
    pub async fn upsert(&self, record: CatalogRecord) -> StoreResult<CatalogRecord> {
        let mut guard = self.inner.write().await;
        if let Some(authority_id) = &record.authority_id {
            let clash = guard.values().any(|r| {
                r.tenant_id == record.tenant_id
                    && r.resource_type == record.resource_type
                    && r.platform_id != record.platform_id
                    && r.authority_id.as_deref() == Some(authority_id.as_str())
            });
            if clash {
                return Err(StoreError::DuplicateKey {
                    entity: "record authority id",
                    key: authority_id.clone(),
                });
            }
        }
        let key = (
            record.tenant_id,
            record.resource_type,
            record.platform_id.clone(),
        );
        debug!(
            tenant_id = %record.tenant_id,
            resource_type = %record.resource_type,
            platform_id = %record.platform_id,
            "Record upserted"
        );
        guard.insert(key, record.clone());
        Ok(record)
    }

    /// Atomically mutate a record under the store lock.
    pub async fn update<T, F>(
        &self,
        tenant_id: TenantId,
        resource_type: ResourceType,
        platform_id: &str,
        f: F,
    ) -> StoreResult<T>
    where
        F: FnOnce(&mut CatalogRecord) -> StoreResult<T>,
    {
        let mut guard = self.inner.write().await;
        let record = guard
            .get_mut(&(tenant_id, resource_type, platform_id.to_string()))
            .ok_or_else(|| StoreError::not_found("record", platform_id))?;
        f(record)
    }

    /// All records for a tenant and resource type.
    pub async fn list(&self, tenant_id: TenantId, resource_type: ResourceType) -> Vec<CatalogRecord> {
        self.inner
            .read()
            .await
            .values()
            .filter(|r| r.tenant_id == tenant_id && r.resource_type == resource_type)
            .cloned()
            .collect()
    }
}
