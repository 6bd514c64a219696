//! Webhook ingestion for shopsync.
//!
//! Receives storefront platform webhooks, verifies HMAC signatures over
//! the raw body, parses payloads into a typed event set, suppresses
//! replayed deliveries, and enqueues platform-to-authority sync jobs.

pub mod adapter;
pub mod crypto;
pub mod dedup;
pub mod error;
pub mod event;
pub mod router;

pub use adapter::{IngestOutcome, WebhookAdapter};
pub use crypto::{compute_signature, payload_checksum, verify_signature};
pub use dedup::{DedupCache, DEDUP_WINDOW};
pub use error::{ErrorResponse, WebhookError, WebhookResult};
pub use event::WebhookEvent;
pub use router::{webhooks_router, IntakeResponse, WebhooksState};
