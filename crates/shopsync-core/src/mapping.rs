//! Per-tenant field mapping between platform and authority field names.
//!
//! The mapping is an explicit, validated configuration: the platform-side
//! keys come from a fixed enumerated set, and invalid mappings are rejected
//! when the configuration is written, not during reconciliation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Platform fields that may participate in synchronization.
pub const ALLOWED_PLATFORM_FIELDS: &[&str] = &[
    "title",
    "description",
    "vendor",
    "product_type",
    "status",
    "price",
    "sku",
    "barcode",
    "tags",
    "images",
];

/// Validated mapping from platform field names to authority field names.
///
/// Keys are platform fields, values the authority fields they sync with
/// (e.g. `title -> title`, `vendor -> brand`). Only fields present in the
/// mapping are considered "syncable" by the reconciler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct FieldMapping {
    entries: BTreeMap<String, String>,
}

impl FieldMapping {
    /// Build a mapping, rejecting unknown platform fields, empty authority
    /// names, and duplicate authority targets.
    pub fn new(entries: BTreeMap<String, String>) -> CoreResult<Self> {
        let mut seen_authority: Vec<&str> = Vec::with_capacity(entries.len());
        for (platform_field, authority_field) in &entries {
            if !ALLOWED_PLATFORM_FIELDS.contains(&platform_field.as_str()) {
                return Err(CoreError::UnknownPlatformField {
                    field: platform_field.clone(),
                });
            }
            if authority_field.trim().is_empty() {
                return Err(CoreError::EmptyAuthorityField {
                    field: platform_field.clone(),
                });
            }
            if seen_authority.contains(&authority_field.as_str()) {
                return Err(CoreError::DuplicateAuthorityField {
                    field: authority_field.clone(),
                });
            }
            seen_authority.push(authority_field.as_str());
        }
        Ok(Self { entries })
    }

    /// The authority field a platform field syncs with, if mapped.
    #[must_use]
    pub fn authority_field(&self, platform_field: &str) -> Option<&str> {
        self.entries.get(platform_field).map(String::as_str)
    }

    /// The platform field an authority field syncs with, if mapped.
    #[must_use]
    pub fn platform_field(&self, authority_field: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, a)| a.as_str() == authority_field)
            .map(|(p, _)| p.as_str())
    }

    /// Iterate over (platform field, authority field) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(p, a)| (p.as_str(), a.as_str()))
    }

    /// Number of mapped fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the mapping is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for FieldMapping {
    /// The standard mapping: identity for most fields, `vendor -> brand`
    /// and `product_type -> category` renamed on the authority side.
    fn default() -> Self {
        let entries = BTreeMap::from([
            ("title".to_string(), "title".to_string()),
            ("description".to_string(), "description".to_string()),
            ("vendor".to_string(), "brand".to_string()),
            ("product_type".to_string(), "category".to_string()),
            ("status".to_string(), "status".to_string()),
            ("price".to_string(), "price".to_string()),
            ("sku".to_string(), "sku".to_string()),
        ]);
        Self { entries }
    }
}

impl TryFrom<BTreeMap<String, String>> for FieldMapping {
    type Error = CoreError;

    fn try_from(entries: BTreeMap<String, String>) -> Result<Self, Self::Error> {
        Self::new(entries)
    }
}

impl From<FieldMapping> for BTreeMap<String, String> {
    fn from(mapping: FieldMapping) -> Self {
        mapping.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_mapping_is_valid() {
        let mapping = FieldMapping::default();
        assert_eq!(mapping.authority_field("vendor"), Some("brand"));
        assert_eq!(mapping.authority_field("title"), Some("title"));
        assert_eq!(mapping.platform_field("brand"), Some("vendor"));
        assert!(mapping.authority_field("barcode").is_none());
    }

    #[test]
    fn test_unknown_platform_field_rejected() {
        let entries = BTreeMap::from([("favorite_color".to_string(), "color".to_string())]);
        let err = FieldMapping::new(entries).unwrap_err();
        assert!(matches!(err, CoreError::UnknownPlatformField { .. }));
    }

    #[test]
    fn test_empty_authority_field_rejected() {
        let entries = BTreeMap::from([("title".to_string(), "  ".to_string())]);
        let err = FieldMapping::new(entries).unwrap_err();
        assert!(matches!(err, CoreError::EmptyAuthorityField { .. }));
    }

    #[test]
    fn test_duplicate_authority_target_rejected() {
        let entries = BTreeMap::from([
            ("title".to_string(), "name".to_string()),
            ("description".to_string(), "name".to_string()),
        ]);
        let err = FieldMapping::new(entries).unwrap_err();
        assert!(matches!(err, CoreError::DuplicateAuthorityField { .. }));
    }

    #[test]
    fn test_serde_rejects_invalid_mapping() {
        let json = r#"{"made_up_field": "x"}"#;
        let result: Result<FieldMapping, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }
}
