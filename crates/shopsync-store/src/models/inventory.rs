//! Inventory record model: per-location stock state for one sellable unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopsync_core::{SyncStatus, TenantId};

/// Where a stock-level change originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockSource {
    /// Platform-origin webhook delivery.
    PlatformWebhook,
    /// Observed during a full catalog sync.
    FullSync,
    /// Applied from the catalog authority after conflict resolution.
    Authority,
    /// Operator adjustment.
    Manual,
}

impl StockSource {
    /// Convert to string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            StockSource::PlatformWebhook => "platform_webhook",
            StockSource::FullSync => "full_sync",
            StockSource::Authority => "authority",
            StockSource::Manual => "manual",
        }
    }
}

/// Current stock level at one location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryLevel {
    pub location_id: String,
    pub available: i64,
    pub updated_at: DateTime<Utc>,
}

/// Append-only history entry for one level change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryHistoryEntry {
    pub location_id: String,
    pub available: i64,
    pub recorded_at: DateTime<Utc>,
    pub source: StockSource,
    pub reason: Option<String>,
}

/// Stock state for one sellable unit across locations, with history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub tenant_id: TenantId,
    /// Platform-side variant/item identifier.
    pub variant_id: String,
    pub levels: Vec<InventoryLevel>,
    pub history: Vec<InventoryHistoryEntry>,
    pub sync_status: SyncStatus,
    pub sync_error: Option<String>,
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl InventoryRecord {
    /// Create an empty record for a variant.
    #[must_use]
    pub fn new(tenant_id: TenantId, variant_id: impl Into<String>) -> Self {
        Self {
            tenant_id,
            variant_id: variant_id.into(),
            levels: Vec::new(),
            history: Vec::new(),
            sync_status: SyncStatus::Pending,
            sync_error: None,
            last_synced_at: None,
        }
    }

    /// Current available quantity at a location, if tracked.
    #[must_use]
    pub fn level_for(&self, location_id: &str) -> Option<i64> {
        self.levels
            .iter()
            .find(|l| l.location_id == location_id)
            .map(|l| l.available)
    }

    /// Apply a level observation. A history entry is appended if and only
    /// if the available quantity for the location actually changed; the
    /// current level always mirrors the latest history entry.
    ///
    /// Returns `true` when a change was recorded.
    pub fn apply_level(
        &mut self,
        location_id: &str,
        available: i64,
        source: StockSource,
        reason: Option<String>,
    ) -> bool {
        if self.level_for(location_id) == Some(available) {
            return false;
        }
        let now = Utc::now();
        self.history.push(InventoryHistoryEntry {
            location_id: location_id.to_string(),
            available,
            recorded_at: now,
            source,
            reason,
        });
        match self
            .levels
            .iter_mut()
            .find(|l| l.location_id == location_id)
        {
            Some(level) => {
                level.available = available;
                level.updated_at = now;
            }
            None => self.levels.push(InventoryLevel {
                location_id: location_id.to_string(),
                available,
                updated_at: now,
            }),
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unchanged_quantity_is_a_noop() {
        let mut rec = InventoryRecord::new(TenantId::new(), "v1");
        assert!(rec.apply_level("l1", 10, StockSource::PlatformWebhook, None));
        assert_eq!(rec.history.len(), 1);

        // Same quantity again: no new history entry.
        assert!(!rec.apply_level("l1", 10, StockSource::PlatformWebhook, None));
        assert_eq!(rec.history.len(), 1);
        assert_eq!(rec.level_for("l1"), Some(10));
    }

    #[test]
    fn test_current_level_mirrors_latest_history() {
        let mut rec = InventoryRecord::new(TenantId::new(), "v1");
        rec.apply_level("l1", 10, StockSource::FullSync, None);
        rec.apply_level("l1", 4, StockSource::PlatformWebhook, Some("sale".into()));
        assert_eq!(rec.level_for("l1"), Some(4));
        let last = rec.history.last().unwrap();
        assert_eq!(last.available, 4);
        assert_eq!(last.location_id, "l1");
        assert_eq!(last.reason.as_deref(), Some("sale"));
    }

    #[test]
    fn test_levels_are_per_location() {
        let mut rec = InventoryRecord::new(TenantId::new(), "v1");
        rec.apply_level("l1", 3, StockSource::Manual, None);
        rec.apply_level("l2", 7, StockSource::Manual, None);
        assert_eq!(rec.level_for("l1"), Some(3));
        assert_eq!(rec.level_for("l2"), Some(7));
        assert_eq!(rec.history.len(), 2);
    }
}
