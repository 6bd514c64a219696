//! Shared enums used across the synchronization engine.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Kind of catalog resource a reconciliation unit targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    /// A product with its variants and options.
    Product,
    /// A single sellable variant.
    Variant,
    /// A collection grouping products.
    Collection,
    /// Per-location stock levels for a variant.
    Inventory,
}

impl ResourceType {
    /// Convert to string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Product => "product",
            ResourceType::Variant => "variant",
            ResourceType::Collection => "collection",
            ResourceType::Inventory => "inventory",
        }
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ResourceType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "product" => Ok(ResourceType::Product),
            "variant" => Ok(ResourceType::Variant),
            "collection" => Ok(ResourceType::Collection),
            "inventory" => Ok(ResourceType::Inventory),
            _ => Err(CoreError::InvalidValue {
                kind: "resource type",
                value: s.to_string(),
            }),
        }
    }
}

/// Which side's value wins when only one side holds a value for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncDirection {
    /// The storefront platform is the source of truth.
    PlatformToAuthority,
    /// The catalog authority is the source of truth.
    AuthorityToPlatform,
    /// Last-updated wins, using each side's own modification timestamp.
    Bidirectional,
}

impl SyncDirection {
    /// Convert to string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncDirection::PlatformToAuthority => "platform_to_authority",
            SyncDirection::AuthorityToPlatform => "authority_to_platform",
            SyncDirection::Bidirectional => "bidirectional",
        }
    }
}

impl std::fmt::Display for SyncDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SyncDirection {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "platform_to_authority" => Ok(SyncDirection::PlatformToAuthority),
            "authority_to_platform" => Ok(SyncDirection::AuthorityToPlatform),
            "bidirectional" => Ok(SyncDirection::Bidirectional),
            _ => Err(CoreError::InvalidValue {
                kind: "sync direction",
                value: s.to_string(),
            }),
        }
    }
}

/// Synchronization state of a mirrored catalog entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Not yet reconciled, or blocked behind a pending conflict.
    Pending,
    /// Both sides agree as of the last reconciliation.
    Synced,
    /// The last reconciliation attempt failed.
    Failed,
}

impl SyncStatus {
    /// Convert to string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Pending => "pending",
            SyncStatus::Synced => "synced",
            SyncStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-tenant policy driving automatic conflict resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionPolicy {
    /// Automatically resolve eligible conflicts with the platform value.
    UsePlatform,
    /// Automatically resolve eligible conflicts with the authority value.
    UseAuthority,
    /// Every conflict waits for an operator decision.
    ManualOnly,
}

impl ResolutionPolicy {
    /// Convert to string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionPolicy::UsePlatform => "use_platform",
            ResolutionPolicy::UseAuthority => "use_authority",
            ResolutionPolicy::ManualOnly => "manual_only",
        }
    }
}

impl std::fmt::Display for ResolutionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ResolutionPolicy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "use_platform" => Ok(ResolutionPolicy::UsePlatform),
            "use_authority" => Ok(ResolutionPolicy::UseAuthority),
            "manual_only" => Ok(ResolutionPolicy::ManualOnly),
            _ => Err(CoreError::InvalidValue {
                kind: "resolution policy",
                value: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_type_roundtrip() {
        for rt in [
            ResourceType::Product,
            ResourceType::Variant,
            ResourceType::Collection,
            ResourceType::Inventory,
        ] {
            let parsed: ResourceType = rt.as_str().parse().unwrap();
            assert_eq!(rt, parsed);
        }
    }

    #[test]
    fn test_sync_direction_roundtrip() {
        for dir in [
            SyncDirection::PlatformToAuthority,
            SyncDirection::AuthorityToPlatform,
            SyncDirection::Bidirectional,
        ] {
            let parsed: SyncDirection = dir.as_str().parse().unwrap();
            assert_eq!(dir, parsed);
        }
    }

    #[test]
    fn test_resolution_policy_roundtrip() {
        for policy in [
            ResolutionPolicy::UsePlatform,
            ResolutionPolicy::UseAuthority,
            ResolutionPolicy::ManualOnly,
        ] {
            let parsed: ResolutionPolicy = policy.as_str().parse().unwrap();
            assert_eq!(policy, parsed);
        }
    }

    #[test]
    fn test_unknown_values_rejected() {
        assert!("gizmo".parse::<ResourceType>().is_err());
        assert!("one_way".parse::<SyncDirection>().is_err());
        assert!("coin_flip".parse::<ResolutionPolicy>().is_err());
    }

    #[test]
    fn test_serde_snake_case() {
        let json = serde_json::to_string(&SyncDirection::PlatformToAuthority).unwrap();
        assert_eq!(json, "\"platform_to_authority\"");
    }
}
