//! Inventory ledger: per-location stock levels with historical snapshots.
//!
//! Pure data component, no external calls. History is never deleted here;
//! retention is an operational concern outside the core.

use std::collections::HashMap;

use tokio::sync::RwLock;
use tracing::debug;

use shopsync_core::TenantId;

use crate::error::{StoreError, StoreResult};
use crate::models::{InventoryRecord, StockSource};

type LedgerKey = (TenantId, String);

/// In-memory inventory ledger keyed by (tenant, variant id).
#[derive(Debug, Default)]
pub struct InventoryLedger {
    inner: RwLock<HashMap<LedgerKey, InventoryRecord>>,
}

impl InventoryLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a stock-level observation. Creates the record on first
    /// observation. No-ops (and returns `false`) when the quantity equals
    /// the current level for that location.
    pub async fn apply_level(
        &self,
        tenant_id: TenantId,
        variant_id: &str,
        location_id: &str,
        available: i64,
        source: StockSource,
        reason: Option<String>,
    ) -> StoreResult<bool> {
        let mut guard = self.inner.write().await;
        let record = guard
            .entry((tenant_id, variant_id.to_string()))
            .or_insert_with(|| InventoryRecord::new(tenant_id, variant_id));
        let changed = record.apply_level(location_id, available, source, reason);
        if changed {
            debug!(
                tenant_id = %tenant_id,
                variant_id,
                location_id,
                available,
                source = source.as_str(),
                "Inventory level recorded"
            );
        }
        Ok(changed)
    }

    /// Read-only projection of current availability per location.
    pub async fn availability(
        &self,
        tenant_id: TenantId,
        variant_id: &str,
    ) -> HashMap<String, i64> {
        self.inner
            .read()
            .await
            .get(&(tenant_id, variant_id.to_string()))
            .map(|r| {
                r.levels
                    .iter()
                    .map(|l| (l.location_id.clone(), l.available))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Full record including history, if the variant is tracked.
    pub async fn get(&self, tenant_id: TenantId, variant_id: &str) -> Option<InventoryRecord> {
        self.inner
            .read()
            .await
            .get(&(tenant_id, variant_id.to_string()))
            .cloned()
    }

    /// Atomically mutate a record's sync metadata.
    pub async fn update<T, F>(&self, tenant_id: TenantId, variant_id: &str, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut InventoryRecord) -> StoreResult<T>,
    {
        let mut guard = self.inner.write().await;
        let record = guard
            .get_mut(&(tenant_id, variant_id.to_string()))
            .ok_or_else(|| StoreError::not_found("inventory record", variant_id))?;
        f(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_apply_level_idempotent() {
        let ledger = InventoryLedger::new();
        let tenant = TenantId::new();

        let changed = ledger
            .apply_level(tenant, "v1", "l1", 10, StockSource::PlatformWebhook, None)
            .await
            .unwrap();
        assert!(changed);

        let changed = ledger
            .apply_level(tenant, "v1", "l1", 10, StockSource::PlatformWebhook, None)
            .await
            .unwrap();
        assert!(!changed);

        let record = ledger.get(tenant, "v1").await.unwrap();
        assert_eq!(record.history.len(), 1);
    }

    #[tokio::test]
    async fn test_availability_projection() {
        let ledger = InventoryLedger::new();
        let tenant = TenantId::new();
        ledger
            .apply_level(tenant, "v1", "l1", 4, StockSource::FullSync, None)
            .await
            .unwrap();
        ledger
            .apply_level(tenant, "v1", "l2", 9, StockSource::FullSync, None)
            .await
            .unwrap();

        let availability = ledger.availability(tenant, "v1").await;
        assert_eq!(availability.get("l1"), Some(&4));
        assert_eq!(availability.get("l2"), Some(&9));
    }

    #[tokio::test]
    async fn test_untracked_variant_is_empty() {
        let ledger = InventoryLedger::new();
        let availability = ledger.availability(TenantId::new(), "ghost").await;
        assert!(availability.is_empty());
    }
}
