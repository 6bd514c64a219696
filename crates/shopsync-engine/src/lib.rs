//! Catalog sync engine.
//!
//! Orchestrator, reconciler and conflict detection for bidirectional
//! synchronization between a storefront platform and the catalog
//! authority. Webhook-triggered deltas and full catalog syncs drive the
//! same reconciliation pipeline; divergences where both sides disagree are
//! first-class conflicts, not errors.

pub mod client;
pub mod config;
pub mod conflict;
pub mod diff;
pub mod error;
pub mod lock;
pub mod orchestrator;
pub mod reconciler;
pub mod retry;
pub mod worker;

pub use client::{
    AuthorityClient, FaultKind, InMemoryAuthority, InMemoryPlatform, InventorySnapshot,
    PlatformClient, ResourceSnapshot,
};
pub use config::EngineConfig;
pub use conflict::{classify, AutoResolveOutcome, ConflictDetector, Divergence, AUTO_ACTOR};
pub use error::{EngineError, EngineResult};
pub use lock::{LockKey, LockRegistry};
pub use orchestrator::Orchestrator;
pub use reconciler::{ReconcileReport, Reconciler, UnitContext, UnitOutcome};
pub use retry::RetryPolicy;
pub use worker::{SyncWorker, WorkerConfig};
