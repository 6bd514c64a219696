//! Entity models mirrored between the platform and the catalog authority.

pub mod conflict;
pub mod inventory;
pub mod job;
pub mod record;
pub mod tenant;

pub use conflict::{
    ConflictAction, ConflictHistoryEntry, ConflictRecord, ConflictResolution, ConflictSeverity,
    ConflictStatus, ConflictType, FieldDiff,
};
pub use inventory::{InventoryHistoryEntry, InventoryLevel, InventoryRecord, StockSource};
pub use job::{
    JobErrorEntry, JobKind, JobLogEntry, JobOptions, JobProgress, JobResults, JobStatus,
    LogLevel, OutcomeSet, ResourceTarget, SyncJob,
};
pub use record::{CatalogRecord, RecordState};
pub use tenant::Tenant;
