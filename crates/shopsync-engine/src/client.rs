//! Client seams for the two external systems.
//!
//! Only the shape of the data is modeled here; pagination helpers, auth
//! headers and other vendor mechanics live behind these traits. The
//! in-memory implementations back the test suite and the demo server.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use shopsync_core::{ResourceType, TenantId};

use crate::error::{EngineError, EngineResult};

/// Current representation of a catalog entity as one side reports it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    /// That side's own identifier for the entity.
    pub id: String,
    /// True when the side reports the entity deleted.
    pub deleted: bool,
    /// Raw field values keyed by that side's field names.
    pub fields: Map<String, Value>,
    /// The side's own last-modified timestamp.
    pub updated_at: DateTime<Utc>,
}

impl ResourceSnapshot {
    /// Build an active snapshot.
    #[must_use]
    pub fn new(id: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            deleted: false,
            fields,
            updated_at: Utc::now(),
        }
    }

    /// Mark the snapshot deleted.
    #[must_use]
    pub fn deleted(mut self) -> Self {
        self.deleted = true;
        self
    }

    /// Override the last-modified timestamp.
    #[must_use]
    pub fn updated_at(mut self, at: DateTime<Utc>) -> Self {
        self.updated_at = at;
        self
    }
}

/// Per-location stock levels as one side reports them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventorySnapshot {
    pub variant_id: String,
    /// Location id to available quantity.
    pub levels: HashMap<String, i64>,
}

/// Storefront platform read/write surface.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// Fetch a single entity by platform id. `None` when the platform has
    /// no such entity at all (distinct from a deleted snapshot).
    async fn fetch_resource(
        &self,
        tenant_id: TenantId,
        resource_type: ResourceType,
        platform_id: &str,
    ) -> EngineResult<Option<ResourceSnapshot>>;

    /// Total entity count, used to size a full sync.
    async fn count_resources(
        &self,
        tenant_id: TenantId,
        resource_type: ResourceType,
    ) -> EngineResult<usize>;

    /// One fixed-size page of the catalog, zero-based.
    async fn list_page(
        &self,
        tenant_id: TenantId,
        resource_type: ResourceType,
        page: usize,
        page_size: usize,
    ) -> EngineResult<Vec<ResourceSnapshot>>;

    /// Stock levels for a variant, if tracked.
    async fn fetch_inventory(
        &self,
        tenant_id: TenantId,
        variant_id: &str,
    ) -> EngineResult<Option<InventorySnapshot>>;

    /// Push merged field values back to the platform.
    async fn update_resource(
        &self,
        tenant_id: TenantId,
        resource_type: ResourceType,
        platform_id: &str,
        fields: &Map<String, Value>,
    ) -> EngineResult<()>;
}

/// Catalog authority read/write surface.
#[async_trait]
pub trait AuthorityClient: Send + Sync {
    /// Fetch a single entity by authority id.
    async fn fetch_resource(
        &self,
        tenant_id: TenantId,
        resource_type: ResourceType,
        authority_id: &str,
    ) -> EngineResult<Option<ResourceSnapshot>>;

    /// Find an entity by the platform-side external key, for linking
    /// records the authority created independently.
    async fn lookup_by_external_key(
        &self,
        tenant_id: TenantId,
        resource_type: ResourceType,
        external_key: &str,
    ) -> EngineResult<Option<ResourceSnapshot>>;

    /// Create or update an entity. Returns the authority id.
    async fn write_resource(
        &self,
        tenant_id: TenantId,
        resource_type: ResourceType,
        authority_id: Option<&str>,
        external_key: &str,
        fields: &Map<String, Value>,
    ) -> EngineResult<String>;

    /// Stock levels for a variant, if tracked.
    async fn fetch_inventory(
        &self,
        tenant_id: TenantId,
        variant_id: &str,
    ) -> EngineResult<Option<InventorySnapshot>>;
}

/// Scripted failure for a resource id, consumed in order by fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// Retryable failure, e.g. a timeout or 5xx.
    Transient,
    /// Non-retryable failure, e.g. a 404 on a referenced id.
    Permanent,
}

#[derive(Debug, Default)]
struct FaultPlan {
    faults: Mutex<HashMap<String, Vec<FaultKind>>>,
}

impl FaultPlan {
    fn push(&self, id: &str, kind: FaultKind) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.entry(id.to_string()).or_default().push(kind);
        }
    }

    /// Pop the next scripted fault for an id, if any.
    fn take(&self, id: &str) -> Option<FaultKind> {
        let mut faults = self.faults.lock().ok()?;
        let queue = faults.get_mut(id)?;
        if queue.is_empty() {
            None
        } else {
            Some(queue.remove(0))
        }
    }

    fn check(&self, id: &str) -> EngineResult<()> {
        match self.take(id) {
            Some(FaultKind::Transient) => {
                Err(EngineError::transient(format!("scripted timeout for {id}")))
            }
            Some(FaultKind::Permanent) => {
                Err(EngineError::permanent(format!("{id} not found upstream")))
            }
            None => Ok(()),
        }
    }
}

type ResourceKey = (TenantId, ResourceType, String);

/// In-memory platform used by tests and the demo server.
#[derive(Debug, Default)]
pub struct InMemoryPlatform {
    resources: Mutex<HashMap<ResourceKey, ResourceSnapshot>>,
    inventory: Mutex<HashMap<(TenantId, String), InventorySnapshot>>,
    faults: FaultPlan,
}

impl InMemoryPlatform {
    /// Create an empty platform.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a resource snapshot.
    pub fn seed_resource(
        &self,
        tenant_id: TenantId,
        resource_type: ResourceType,
        snapshot: ResourceSnapshot,
    ) {
        if let Ok(mut resources) = self.resources.lock() {
            resources.insert((tenant_id, resource_type, snapshot.id.clone()), snapshot);
        }
    }

    /// Seed a stock level.
    pub fn seed_inventory(&self, tenant_id: TenantId, variant_id: &str, location_id: &str, qty: i64) {
        if let Ok(mut inventory) = self.inventory.lock() {
            inventory
                .entry((tenant_id, variant_id.to_string()))
                .or_insert_with(|| InventorySnapshot {
                    variant_id: variant_id.to_string(),
                    levels: HashMap::new(),
                })
                .levels
                .insert(location_id.to_string(), qty);
        }
    }

    /// Script the next fetch of `id` to fail.
    pub fn inject_fault(&self, id: &str, kind: FaultKind) {
        self.faults.push(id, kind);
    }
}

#[async_trait]
impl PlatformClient for InMemoryPlatform {
    async fn fetch_resource(
        &self,
        tenant_id: TenantId,
        resource_type: ResourceType,
        platform_id: &str,
    ) -> EngineResult<Option<ResourceSnapshot>> {
        self.faults.check(platform_id)?;
        Ok(self
            .resources
            .lock()
            .map_err(|_| EngineError::transient("platform store poisoned"))?
            .get(&(tenant_id, resource_type, platform_id.to_string()))
            .cloned())
    }

    async fn count_resources(
        &self,
        tenant_id: TenantId,
        resource_type: ResourceType,
    ) -> EngineResult<usize> {
        Ok(self
            .resources
            .lock()
            .map_err(|_| EngineError::transient("platform store poisoned"))?
            .keys()
            .filter(|(t, rt, _)| *t == tenant_id && *rt == resource_type)
            .count())
    }

    async fn list_page(
        &self,
        tenant_id: TenantId,
        resource_type: ResourceType,
        page: usize,
        page_size: usize,
    ) -> EngineResult<Vec<ResourceSnapshot>> {
        let mut all: Vec<ResourceSnapshot> = self
            .resources
            .lock()
            .map_err(|_| EngineError::transient("platform store poisoned"))?
            .iter()
            .filter(|((t, rt, _), _)| *t == tenant_id && *rt == resource_type)
            .map(|(_, snapshot)| snapshot.clone())
            .collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(all
            .into_iter()
            .skip(page * page_size)
            .take(page_size)
            .collect())
    }

    async fn fetch_inventory(
        &self,
        tenant_id: TenantId,
        variant_id: &str,
    ) -> EngineResult<Option<InventorySnapshot>> {
        self.faults.check(variant_id)?;
        Ok(self
            .inventory
            .lock()
            .map_err(|_| EngineError::transient("platform store poisoned"))?
            .get(&(tenant_id, variant_id.to_string()))
            .cloned())
    }

    async fn update_resource(
        &self,
        tenant_id: TenantId,
        resource_type: ResourceType,
        platform_id: &str,
        fields: &Map<String, Value>,
    ) -> EngineResult<()> {
        let mut resources = self
            .resources
            .lock()
            .map_err(|_| EngineError::transient("platform store poisoned"))?;
        let snapshot = resources
            .get_mut(&(tenant_id, resource_type, platform_id.to_string()))
            .ok_or_else(|| EngineError::permanent(format!("{platform_id} not found upstream")))?;
        snapshot.fields = fields.clone();
        snapshot.updated_at = Utc::now();
        Ok(())
    }
}

/// In-memory catalog authority used by tests and the demo server.
#[derive(Debug, Default)]
pub struct InMemoryAuthority {
    resources: Mutex<HashMap<ResourceKey, ResourceSnapshot>>,
    /// (tenant, resource type, external key) -> authority id.
    external_keys: Mutex<HashMap<ResourceKey, String>>,
    inventory: Mutex<HashMap<(TenantId, String), InventorySnapshot>>,
    faults: FaultPlan,
    next_id: Mutex<u64>,
}

impl InMemoryAuthority {
    /// Create an empty authority.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a resource snapshot, optionally indexed by external key.
    pub fn seed_resource(
        &self,
        tenant_id: TenantId,
        resource_type: ResourceType,
        snapshot: ResourceSnapshot,
        external_key: Option<&str>,
    ) {
        if let Some(key) = external_key {
            if let Ok(mut keys) = self.external_keys.lock() {
                keys.insert(
                    (tenant_id, resource_type, key.to_string()),
                    snapshot.id.clone(),
                );
            }
        }
        if let Ok(mut resources) = self.resources.lock() {
            resources.insert((tenant_id, resource_type, snapshot.id.clone()), snapshot);
        }
    }

    /// Seed a stock level.
    pub fn seed_inventory(&self, tenant_id: TenantId, variant_id: &str, location_id: &str, qty: i64) {
        if let Ok(mut inventory) = self.inventory.lock() {
            inventory
                .entry((tenant_id, variant_id.to_string()))
                .or_insert_with(|| InventorySnapshot {
                    variant_id: variant_id.to_string(),
                    levels: HashMap::new(),
                })
                .levels
                .insert(location_id.to_string(), qty);
        }
    }

    /// Script the next fetch of `id` to fail.
    pub fn inject_fault(&self, id: &str, kind: FaultKind) {
        self.faults.push(id, kind);
    }
}

#[async_trait]
impl AuthorityClient for InMemoryAuthority {
    async fn fetch_resource(
        &self,
        tenant_id: TenantId,
        resource_type: ResourceType,
        authority_id: &str,
    ) -> EngineResult<Option<ResourceSnapshot>> {
        self.faults.check(authority_id)?;
        Ok(self
            .resources
            .lock()
            .map_err(|_| EngineError::transient("authority store poisoned"))?
            .get(&(tenant_id, resource_type, authority_id.to_string()))
            .cloned())
    }

    async fn lookup_by_external_key(
        &self,
        tenant_id: TenantId,
        resource_type: ResourceType,
        external_key: &str,
    ) -> EngineResult<Option<ResourceSnapshot>> {
        self.faults.check(external_key)?;
        let authority_id = self
            .external_keys
            .lock()
            .map_err(|_| EngineError::transient("authority store poisoned"))?
            .get(&(tenant_id, resource_type, external_key.to_string()))
            .cloned();
        match authority_id {
            Some(id) => self.fetch_resource(tenant_id, resource_type, &id).await,
            None => Ok(None),
        }
    }

    async fn write_resource(
        &self,
        tenant_id: TenantId,
        resource_type: ResourceType,
        authority_id: Option<&str>,
        external_key: &str,
        fields: &Map<String, Value>,
    ) -> EngineResult<String> {
        let id = match authority_id {
            Some(id) => id.to_string(),
            None => {
                let mut next = self
                    .next_id
                    .lock()
                    .map_err(|_| EngineError::transient("authority store poisoned"))?;
                *next += 1;
                format!("auth-{next}", next = *next)
            }
        };
        self.faults.check(&id)?;
        let mut resources = self
            .resources
            .lock()
            .map_err(|_| EngineError::transient("authority store poisoned"))?;
        let entry = resources
            .entry((tenant_id, resource_type, id.clone()))
            .or_insert_with(|| ResourceSnapshot::new(id.clone(), Map::new()));
        entry.fields = fields.clone();
        entry.updated_at = Utc::now();
        entry.deleted = false;
        drop(resources);
        if let Ok(mut keys) = self.external_keys.lock() {
            keys.insert(
                (tenant_id, resource_type, external_key.to_string()),
                id.clone(),
            );
        }
        Ok(id)
    }

    async fn fetch_inventory(
        &self,
        tenant_id: TenantId,
        variant_id: &str,
    ) -> EngineResult<Option<InventorySnapshot>> {
        Ok(self
            .inventory
            .lock()
            .map_err(|_| EngineError::transient("authority store poisoned"))?
            .get(&(tenant_id, variant_id.to_string()))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(title: &str) -> Map<String, Value> {
        let mut m = Map::new();
        m.insert("title".to_string(), json!(title));
        m
    }

    #[tokio::test]
    async fn test_fault_plan_consumed_in_order() {
        let platform = InMemoryPlatform::new();
        let tenant = TenantId::new();
        platform.seed_resource(
            tenant,
            ResourceType::Product,
            ResourceSnapshot::new("p1", fields("A")),
        );
        platform.inject_fault("p1", FaultKind::Transient);

        let err = platform
            .fetch_resource(tenant, ResourceType::Product, "p1")
            .await
            .unwrap_err();
        assert!(err.is_retryable());

        // Fault consumed, next fetch succeeds.
        let snapshot = platform
            .fetch_resource(tenant, ResourceType::Product, "p1")
            .await
            .unwrap();
        assert!(snapshot.is_some());
    }

    #[tokio::test]
    async fn test_authority_write_links_external_key() {
        let authority = InMemoryAuthority::new();
        let tenant = TenantId::new();

        let id = authority
            .write_resource(tenant, ResourceType::Product, None, "p1", &fields("A"))
            .await
            .unwrap();

        let found = authority
            .lookup_by_external_key(tenant, ResourceType::Product, "p1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, id);
    }

    #[tokio::test]
    async fn test_list_page_is_stable() {
        let platform = InMemoryPlatform::new();
        let tenant = TenantId::new();
        for i in 0..5 {
            platform.seed_resource(
                tenant,
                ResourceType::Product,
                ResourceSnapshot::new(format!("p{i}"), fields("x")),
            );
        }
        let first = platform
            .list_page(tenant, ResourceType::Product, 0, 2)
            .await
            .unwrap();
        let second = platform
            .list_page(tenant, ResourceType::Product, 1, 2)
            .await
            .unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 2);
        assert_ne!(first[0].id, second[0].id);
    }
}
