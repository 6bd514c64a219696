//! Tenant registry model.
//!
//! A tenant is one onboarded store whose catalog is synchronized. The
//! tenant carries everything the engine needs as explicit context: webhook
//! secret, default direction, resolution policy and field mapping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopsync_core::{FieldMapping, ResolutionPolicy, SyncDirection, TenantId};

/// One onboarded store/account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    /// Storefront domain, informational only.
    pub shop_domain: String,
    /// Shared secret for webhook HMAC verification.
    pub webhook_secret: String,
    /// Inactive tenants accept no work; set false on uninstall.
    pub active: bool,
    pub default_direction: SyncDirection,
    pub resolution_policy: ResolutionPolicy,
    pub field_mapping: FieldMapping,
    pub created_at: DateTime<Utc>,
}

impl Tenant {
    /// Create an active tenant with the default field mapping.
    #[must_use]
    pub fn new(shop_domain: impl Into<String>, webhook_secret: impl Into<String>) -> Self {
        Self {
            id: TenantId::new(),
            shop_domain: shop_domain.into(),
            webhook_secret: webhook_secret.into(),
            active: true,
            default_direction: SyncDirection::PlatformToAuthority,
            resolution_policy: ResolutionPolicy::ManualOnly,
            field_mapping: FieldMapping::default(),
            created_at: Utc::now(),
        }
    }

    /// Builder-style override of the default direction.
    #[must_use]
    pub fn with_direction(mut self, direction: SyncDirection) -> Self {
        self.default_direction = direction;
        self
    }

    /// Builder-style override of the resolution policy.
    #[must_use]
    pub fn with_policy(mut self, policy: ResolutionPolicy) -> Self {
        self.resolution_policy = policy;
        self
    }

    /// Builder-style override of the field mapping.
    #[must_use]
    pub fn with_mapping(mut self, mapping: FieldMapping) -> Self {
        self.field_mapping = mapping;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_tenant_defaults() {
        let t = Tenant::new("shop.example.com", "s3cret");
        assert!(t.active);
        assert_eq!(t.default_direction, SyncDirection::PlatformToAuthority);
        assert_eq!(t.resolution_policy, ResolutionPolicy::ManualOnly);
        assert!(!t.field_mapping.is_empty());
    }

    #[test]
    fn test_builder_overrides() {
        let t = Tenant::new("shop.example.com", "s3cret")
            .with_direction(SyncDirection::Bidirectional)
            .with_policy(ResolutionPolicy::UsePlatform);
        assert_eq!(t.default_direction, SyncDirection::Bidirectional);
        assert_eq!(t.resolution_policy, ResolutionPolicy::UsePlatform);
    }
}
