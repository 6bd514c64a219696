//! Axum router for the operator API.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use shopsync_engine::{ConflictDetector, Orchestrator};
use shopsync_store::Stores;

use crate::handlers::{conflicts, jobs};

/// Shared state for operator handlers.
#[derive(Clone)]
pub struct ApiState {
    pub stores: Stores,
    pub orchestrator: Arc<Orchestrator>,
    pub detector: Arc<ConflictDetector>,
}

impl ApiState {
    #[must_use]
    pub fn new(
        stores: Stores,
        orchestrator: Arc<Orchestrator>,
        detector: Arc<ConflictDetector>,
    ) -> Self {
        Self {
            stores,
            orchestrator,
            detector,
        }
    }
}

/// Creates the operator router with all routes.
pub fn api_router(state: ApiState) -> Router {
    Router::new()
        // Sync triggers
        .route("/sync", post(jobs::sync_resource_handler))
        .route("/sync-all", post(jobs::sync_all_handler))
        // Job inspection
        .route("/jobs", get(jobs::list_jobs_handler))
        .route("/jobs/:id", get(jobs::get_job_handler))
        .route("/jobs/:id/cancel", post(jobs::cancel_job_handler))
        // Conflict queue
        .route("/conflicts", get(conflicts::list_conflicts_handler))
        .route(
            "/conflicts/:id/resolve",
            post(conflicts::resolve_conflict_handler),
        )
        .route(
            "/conflicts/:id/ignore",
            post(conflicts::ignore_conflict_handler),
        )
        .route(
            "/conflicts/:id/reopen",
            post(conflicts::reopen_conflict_handler),
        )
        .with_state(state)
}
