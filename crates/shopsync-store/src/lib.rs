//! Persistence layer for the catalog sync engine.
//!
//! In-memory stores behind repository-style APIs. Each store serializes
//! mutations through a `tokio::sync::RwLock` and exposes closure-based
//! `update` methods so callers get read-modify-write atomically; the state
//! machines themselves live on the models.

pub mod conflicts;
pub mod error;
pub mod inventory;
pub mod jobs;
pub mod models;
pub mod records;
pub mod tenants;

pub use conflicts::ConflictStore;
pub use error::{StoreError, StoreResult};
pub use inventory::InventoryLedger;
pub use jobs::JobStore;
pub use models::*;
pub use records::RecordStore;
pub use tenants::TenantStore;

use std::sync::Arc;

/// Shared handle bundle wiring every store into the engine and API layers.
#[derive(Debug, Clone, Default)]
pub struct Stores {
    pub tenants: Arc<TenantStore>,
    pub jobs: Arc<JobStore>,
    pub records: Arc<RecordStore>,
    pub inventory: Arc<InventoryLedger>,
    pub conflicts: Arc<ConflictStore>,
}

impl Stores {
    /// Create a fresh, empty store bundle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}
