//! Operator REST API for shopsync.
//!
//! Exposes sync triggers, job inspection and cancellation, and the
//! conflict resolution queue. Every request is tenant-scoped through
//! the `X-Tenant-Id` header.

pub mod error;
pub mod handlers;
pub mod models;
pub mod router;

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use router::{api_router, ApiState};
