//! Per-resource advisory locks.
//!
//! Reconciliation is parallel across tenants but serialized per
//! (tenant, resource type, platform id). A unit that cannot acquire the
//! lock within the bounded wait gets `EngineError::LockTimeout` and is
//! requeued by the caller instead of blocking.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::OwnedMutexGuard;

use shopsync_core::{ResourceType, TenantId};

use crate::error::{EngineError, EngineResult};

/// Key identifying one reconciliation unit's serialization domain.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LockKey {
    pub tenant_id: TenantId,
    pub resource_type: ResourceType,
    pub platform_id: String,
}

impl LockKey {
    #[must_use]
    pub fn new(
        tenant_id: TenantId,
        resource_type: ResourceType,
        platform_id: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id,
            resource_type,
            platform_id: platform_id.into(),
        }
    }
}

impl std::fmt::Display for LockKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.tenant_id, self.resource_type, self.platform_id
        )
    }
}

/// Registry of per-key advisory locks.
#[derive(Debug, Default)]
pub struct LockRegistry {
    locks: Mutex<HashMap<LockKey, Arc<tokio::sync::Mutex<()>>>>,
}

/// Guard holding the lock until dropped.
#[derive(Debug)]
pub struct LockGuard {
    _guard: OwnedMutexGuard<()>,
}

impl LockRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for a key, waiting at most `wait`.
    pub async fn acquire(&self, key: &LockKey, wait: Duration) -> EngineResult<LockGuard> {
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .map_err(|_| EngineError::transient("lock registry poisoned"))?;
            locks
                .entry(key.clone())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                .clone()
        };
        match tokio::time::timeout(wait, lock.lock_owned()).await {
            Ok(guard) => Ok(LockGuard { _guard: guard }),
            Err(_) => Err(EngineError::LockTimeout {
                key: key.to_string(),
            }),
        }
    }

    /// Drop map entries whose lock nobody holds or waits on. Called
    /// opportunistically by the worker to keep the map bounded.
    pub fn purge_released(&self) {
        if let Ok(mut locks) = self.locks.lock() {
            locks.retain(|_, lock| Arc::strong_count(lock) > 1 || lock.try_lock().is_err());
        }
    }
}
