//! Catalog record model: the last-known mirror of a product or collection.
//!
//! A record is created on first observation from either side, updated on
//! every successful reconciliation, and never deleted; deletions from
//! either side become a state value so conflict history is preserved.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use shopsync_core::{ResourceType, SyncDirection, SyncStatus, TenantId};

use crate::error::{StoreError, StoreResult};

/// Lifecycle state of a mirrored entity. Deletion is a state, not a removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordState {
    Active,
    Deleted,
}

/// Last-known mirror of a catalog entity (product or collection).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub tenant_id: TenantId,
    pub resource_type: ResourceType,
    /// Platform-side identifier; unique per tenant.
    pub platform_id: String,
    /// Authority-side identifier; set exactly once when the entity links.
    pub authority_id: Option<String>,
    /// Core syncable fields (title, description, status, variants/options)
    /// as merged at the last reconciliation.
    pub fields: Map<String, Value>,
    pub state: RecordState,
    pub sync_status: SyncStatus,
    pub sync_error: Option<String>,
    pub last_synced_at: Option<DateTime<Utc>>,
    /// Per-entity override of the tenant's default direction.
    pub sync_direction: Option<SyncDirection>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CatalogRecord {
    /// Create a record on first observation from the platform side.
    #[must_use]
    pub fn new(
        tenant_id: TenantId,
        resource_type: ResourceType,
        platform_id: impl Into<String>,
        fields: Map<String, Value>,
    ) -> Self {
        let now = Utc::now();
        Self {
            tenant_id,
            resource_type,
            platform_id: platform_id.into(),
            authority_id: None,
            fields,
            state: RecordState::Active,
            sync_status: SyncStatus::Pending,
            sync_error: None,
            last_synced_at: None,
            sync_direction: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Link to an authority-side id. Legal exactly once; re-linking to the
    /// same id is a no-op, a different id is rejected.
    pub fn link_authority(&mut self, authority_id: impl Into<String>) -> StoreResult<()> {
        let authority_id = authority_id.into();
        match &self.authority_id {
            None => {
                self.authority_id = Some(authority_id);
                self.touch();
                Ok(())
            }
            Some(existing) if *existing == authority_id => Ok(()),
            Some(existing) => Err(StoreError::AlreadyLinked {
                existing: existing.clone(),
            }),
        }
    }

    /// Replace the merged field set after reconciliation.
    pub fn set_fields(&mut self, fields: Map<String, Value>) {
        self.fields = fields;
        self.touch();
    }

    /// Mark the record synced as of now.
    pub fn mark_synced(&mut self) {
        self.sync_status = SyncStatus::Synced;
        self.sync_error = None;
        self.last_synced_at = Some(Utc::now());
        self.touch();
    }

    /// Mark the record pending (e.g. blocked behind an unresolved conflict).
    pub fn mark_pending(&mut self) {
        self.sync_status = SyncStatus::Pending;
        self.touch();
    }

    /// Mark the last reconciliation attempt failed.
    pub fn mark_sync_failed(&mut self, error: impl Into<String>) {
        self.sync_status = SyncStatus::Failed;
        self.sync_error = Some(error.into());
        self.touch();
    }

    /// Record a deletion observed on either side.
    pub fn mark_deleted(&mut self) {
        self.state = RecordState::Deleted;
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
