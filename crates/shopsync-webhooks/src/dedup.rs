//! Short-window deduplication of replayed webhook deliveries.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use shopsync_core::TenantId;

/// Default replay window.
pub const DEDUP_WINDOW: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DedupKey {
    tenant_id: TenantId,
    topic: String,
    resource_id: String,
    checksum: String,
}

/// Remembers recently seen deliveries keyed per tenant by topic, resource
/// id and payload checksum, so one tenant's redeliveries never suppress
/// another tenant's identical payload. Entries older than the window are
/// pruned on insert.
#[derive(Debug)]
pub struct DedupCache {
    window: Duration,
    seen: Mutex<HashMap<DedupKey, Instant>>,
}

impl Default for DedupCache {
    fn default() -> Self {
        Self::new(DEDUP_WINDOW)
    }
}

impl DedupCache {
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            seen: Mutex::new(HashMap::new()),
        }
    }

    /// Records a delivery. Returns true if the same tenant already
    /// delivered an identical payload inside the window.
    pub fn check_and_insert(
        &self,
        tenant_id: TenantId,
        topic: &str,
        resource_id: &str,
        checksum: &str,
    ) -> bool {
        let key = DedupKey {
            tenant_id,
            topic: topic.to_string(),
            resource_id: resource_id.to_string(),
            checksum: checksum.to_string(),
        };
        let now = Instant::now();
        let mut seen = match self.seen.lock() {
            Ok(seen) => seen,
            Err(poisoned) => poisoned.into_inner(),
        };
        seen.retain(|_, at| now.duration_since(*at) < self.window);
        match seen.get(&key) {
            Some(_) => true,
            None => {
                seen.insert(key, now);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_within_window() {
        let cache = DedupCache::default();
        let tenant = TenantId::new();
        assert!(!cache.check_and_insert(tenant, "products/update", "P1", "abc"));
        assert!(cache.check_and_insert(tenant, "products/update", "P1", "abc"));
    }

    #[test]
    fn test_different_checksum_is_not_duplicate() {
        let cache = DedupCache::default();
        let tenant = TenantId::new();
        assert!(!cache.check_and_insert(tenant, "products/update", "P1", "abc"));
        assert!(!cache.check_and_insert(tenant, "products/update", "P1", "def"));
        assert!(!cache.check_and_insert(tenant, "products/update", "P2", "abc"));
    }

    #[test]
    fn test_other_tenants_identical_delivery_is_not_duplicate() {
        let cache = DedupCache::default();
        let first = TenantId::new();
        let second = TenantId::new();
        assert!(!cache.check_and_insert(first, "products/update", "P1", "abc"));
        assert!(!cache.check_and_insert(second, "products/update", "P1", "abc"));
        assert!(cache.check_and_insert(second, "products/update", "P1", "abc"));
    }

    #[test]
    fn test_expired_entry_is_forgotten() {
        let cache = DedupCache::new(Duration::from_millis(0));
        let tenant = TenantId::new();
        assert!(!cache.check_and_insert(tenant, "products/update", "P1", "abc"));
        assert!(!cache.check_and_insert(tenant, "products/update", "P1", "abc"));
    }
}
