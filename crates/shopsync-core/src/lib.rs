//! # shopsync-core
//!
//! Shared foundation for the shopsync catalog synchronization engine:
//!
//! - Strongly-typed identifiers (`TenantId`, `JobId`, `ConflictId`)
//! - Shared enums (`ResourceType`, `SyncDirection`, `SyncStatus`,
//!   `ResolutionPolicy`)
//! - Validated per-tenant field mapping between platform and authority
//!   field names
//!
//! Every orchestrator, reconciler and conflict-detector call takes the
//! tenant context explicitly; there is no ambient tenant lookup anywhere
//! in the workspace.

pub mod error;
pub mod ids;
pub mod mapping;
pub mod types;

pub use error::{CoreError, CoreResult};
pub use ids::{ConflictId, JobId, ParseIdError, TenantId};
pub use mapping::{FieldMapping, ALLOWED_PLATFORM_FIELDS};
pub use types::{ResolutionPolicy, ResourceType, SyncDirection, SyncStatus};
