//! Shared test harness wiring the engine against in-memory clients.

use std::sync::Arc;

use serde_json::{Map, Value};

use shopsync_core::{ResolutionPolicy, ResourceType, SyncDirection, TenantId};
use shopsync_engine::{
    ConflictDetector, EngineConfig, InMemoryAuthority, InMemoryPlatform, LockRegistry,
    Orchestrator, Reconciler, ResourceSnapshot, UnitContext,
};
use shopsync_store::{JobOptions, StockSource, Stores, Tenant};

pub struct Harness {
    pub stores: Stores,
    pub platform: Arc<InMemoryPlatform>,
    pub authority: Arc<InMemoryAuthority>,
    pub detector: Arc<ConflictDetector>,
    pub reconciler: Arc<Reconciler>,
    pub orchestrator: Arc<Orchestrator>,
    pub tenant: Tenant,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_policy(ResolutionPolicy::ManualOnly).await
    }

    pub async fn with_policy(policy: ResolutionPolicy) -> Self {
        let config = EngineConfig {
            batch_size: 50,
            max_attempts: 3,
            retry_base_ms: 1,
            retry_cap_ms: 5,
            lock_wait_ms: 200,
            attempt_timeout_secs: 5,
        };
        let stores = Stores::new();
        let platform = Arc::new(InMemoryPlatform::new());
        let authority = Arc::new(InMemoryAuthority::new());
        let detector = Arc::new(ConflictDetector::new(stores.conflicts.clone()));
        let locks = Arc::new(LockRegistry::new());
        let reconciler = Arc::new(Reconciler::new(
            platform.clone(),
            authority.clone(),
            stores.clone(),
            detector.clone(),
            locks,
            config.clone(),
        ));
        let orchestrator = Arc::new(Orchestrator::new(
            stores.clone(),
            reconciler.clone(),
            platform.clone(),
            config,
        ));

        let tenant = Tenant::new("frames.example.com", "topsecret").with_policy(policy);
        stores.tenants.insert(tenant.clone()).await.unwrap();

        Self {
            stores,
            platform,
            authority,
            detector,
            reconciler,
            orchestrator,
            tenant,
        }
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant.id
    }

    pub fn ctx(&self, direction: SyncDirection) -> UnitContext {
        UnitContext {
            direction,
            options: JobOptions::default(),
            job_id: None,
            stock_source: StockSource::PlatformWebhook,
        }
    }

    /// Seed both sides with a linked product and its mirror record.
    pub async fn link_product(
        &self,
        platform_id: &str,
        authority_id: &str,
        platform_fields: &[(&str, Value)],
        authority_fields: &[(&str, Value)],
    ) {
        self.platform.seed_resource(
            self.tenant_id(),
            ResourceType::Product,
            ResourceSnapshot::new(platform_id, fields(platform_fields)),
        );
        self.authority.seed_resource(
            self.tenant_id(),
            ResourceType::Product,
            ResourceSnapshot::new(authority_id, fields(authority_fields)),
            Some(platform_id),
        );
        let mut record = shopsync_store::CatalogRecord::new(
            self.tenant_id(),
            ResourceType::Product,
            platform_id,
            fields(platform_fields),
        );
        record.link_authority(authority_id).unwrap();
        self.stores.records.upsert(record).await.unwrap();
    }
}

pub fn fields(pairs: &[(&str, Value)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect()
}
