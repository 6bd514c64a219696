//! Tenant store.

use std::collections::HashMap;

use tokio::sync::RwLock;
use tracing::info;

use shopsync_core::TenantId;

use crate::error::{StoreError, StoreResult};
use crate::models::Tenant;

/// In-memory tenant store keyed by tenant id.
#[derive(Debug, Default)]
pub struct TenantStore {
    inner: RwLock<HashMap<TenantId, Tenant>>,
}

impl TenantStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tenant. Shop domains are unique.
    pub async fn insert(&self, tenant: Tenant) -> StoreResult<()> {
        let mut guard = self.inner.write().await;
        if guard.contains_key(&tenant.id) {
            return Err(StoreError::DuplicateKey {
                entity: "tenant",
                key: tenant.id.to_string(),
            });
        }
        if guard.values().any(|t| t.shop_domain == tenant.shop_domain) {
            return Err(StoreError::DuplicateKey {
                entity: "tenant",
                key: tenant.shop_domain.clone(),
            });
        }
        info!(tenant_id = %tenant.id, shop_domain = %tenant.shop_domain, "Tenant registered");
        guard.insert(tenant.id, tenant);
        Ok(())
    }

    /// Fetch a tenant by id.
    pub async fn get(&self, id: TenantId) -> StoreResult<Tenant> {
        self.inner
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("tenant", id.to_string()))
    }

    /// Fetch an active tenant, rejecting deactivated ones.
    pub async fn get_active(&self, id: TenantId) -> StoreResult<Tenant> {
        let tenant = self.get(id).await?;
        if !tenant.active {
            return Err(StoreError::validation(format!(
                "tenant {id} is deactivated"
            )));
        }
        Ok(tenant)
    }

    /// Atomically mutate a tenant.
    pub async fn update<T, F>(&self, id: TenantId, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut Tenant) -> StoreResult<T>,
    {
        let mut guard = self.inner.write().await;
        let tenant = guard
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("tenant", id.to_string()))?;
        f(tenant)
    }

    /// Mark a tenant inactive. Idempotent.
    pub async fn deactivate(&self, id: TenantId) -> StoreResult<()> {
        self.update(id, |t| {
            if t.active {
                t.active = false;
                info!(tenant_id = %t.id, shop_domain = %t.shop_domain, "Tenant deactivated");
            }
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = TenantStore::new();
        let tenant = Tenant::new("frames.example.com", "s3cr3t");
        let id = tenant.id;
        store.insert(tenant).await.unwrap();
        let fetched = store.get(id).await.unwrap();
        assert_eq!(fetched.shop_domain, "frames.example.com");
        assert!(fetched.active);
    }

    #[tokio::test]
    async fn test_duplicate_domain_rejected() {
        let store = TenantStore::new();
        store
            .insert(Tenant::new("frames.example.com", "a"))
            .await
            .unwrap();
        let err = store
            .insert(Tenant::new("frames.example.com", "b"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey { .. }));
    }

    #[tokio::test]
    async fn test_deactivate_blocks_get_active() {
        let store = TenantStore::new();
        let tenant = Tenant::new("frames.example.com", "s3cr3t");
        let id = tenant.id;
        store.insert(tenant).await.unwrap();

        store.deactivate(id).await.unwrap();
        // Idempotent.
        store.deactivate(id).await.unwrap();

        assert!(store.get(id).await.is_ok());
        assert!(store.get_active(id).await.is_err());
    }
}
