//! Job store: the orchestrator's durable view of synchronization work.
//!
//! Keyed by job id. A queued-but-unstarted job survives process restarts
//! because workers re-read queued jobs from this store rather than from an
//! in-memory channel.

use std::collections::HashMap;

use tokio::sync::RwLock;
use tracing::debug;

use shopsync_core::{JobId, TenantId};

use crate::error::{StoreError, StoreResult};
use crate::models::{JobStatus, SyncJob};

/// In-memory job store keyed by job id.
#[derive(Debug, Default)]
pub struct JobStore {
    inner: RwLock<HashMap<JobId, SyncJob>>,
}

impl JobStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a freshly created job.
    pub async fn insert(&self, job: SyncJob) -> StoreResult<SyncJob> {
        let mut guard = self.inner.write().await;
        if guard.contains_key(&job.id) {
            return Err(StoreError::DuplicateKey {
                entity: "job",
                key: job.id.to_string(),
            });
        }
        debug!(job_id = %job.id, kind = %job.kind, "Job stored");
        guard.insert(job.id, job.clone());
        Ok(job)
    }

    /// Fetch a job by id.
    pub async fn get(&self, id: JobId) -> StoreResult<SyncJob> {
        self.inner
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("job", id.to_string()))
    }

    /// Atomically mutate a job under the store lock. The closure's error
    /// aborts the update and is returned unchanged.
    pub async fn update<T, F>(&self, id: JobId, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut SyncJob) -> StoreResult<T>,
    {
        let mut guard = self.inner.write().await;
        let job = guard
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("job", id.to_string()))?;
        f(job)
    }

    /// List one tenant's jobs, optionally filtered by status, newest
    /// first. The limit applies after tenant filtering, so another
    /// tenant's volume never crowds a listing.
    pub async fn list(
        &self,
        tenant_id: TenantId,
        status: Option<JobStatus>,
        limit: usize,
    ) -> Vec<SyncJob> {
        let guard = self.inner.read().await;
        let mut jobs: Vec<SyncJob> = guard
            .values()
            .filter(|j| j.tenant_id == tenant_id && status.map_or(true, |s| j.status == s))
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.queued_at.cmp(&a.queued_at));
        jobs.truncate(limit);
        jobs
    }

    /// Queued jobs, oldest first, for worker pickup.
    pub async fn queued(&self, limit: usize) -> Vec<SyncJob> {
        let guard = self.inner.read().await;
        let mut jobs: Vec<SyncJob> = guard
            .values()
            .filter(|j| j.status == JobStatus::Queued)
            .cloned()
            .collect();
        jobs.sort_by(|a, b| a.queued_at.cmp(&b.queued_at));
        jobs.truncate(limit);
        jobs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{JobKind, JobOptions, ResourceTarget};
    use shopsync_core::{ResourceType, SyncDirection, TenantId};

    fn job_for(tenant: TenantId) -> SyncJob {
        SyncJob::new(
            tenant,
            JobKind::Manual,
            SyncDirection::PlatformToAuthority,
            vec![ResourceTarget::new(ResourceType::Product, "p1")],
            JobOptions::default(),
        )
    }

    fn job() -> SyncJob {
        job_for(TenantId::new())
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = JobStore::new();
        let created = store.insert(job()).await.unwrap();
        let fetched = store.get(created.id).await.unwrap();
        assert_eq!(fetched.id, created.id);
    }

    #[tokio::test]
    async fn test_duplicate_insert_rejected() {
        let store = JobStore::new();
        let j = store.insert(job()).await.unwrap();
        assert!(store.insert(j).await.is_err());
    }

    #[tokio::test]
    async fn test_update_is_atomic_claim() {
        let store = JobStore::new();
        let j = store.insert(job()).await.unwrap();

        // First claim succeeds.
        store.update(j.id, SyncJob::start).await.unwrap();
        // Second claim observes in_progress and fails.
        assert!(store.update(j.id, SyncJob::start).await.is_err());
    }

    #[tokio::test]
    async fn test_list_newest_first_and_queued_oldest_first() {
        let store = JobStore::new();
        let tenant = TenantId::new();
        let a = store.insert(job_for(tenant)).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let b = store.insert(job_for(tenant)).await.unwrap();

        let listed = store.list(tenant, Some(JobStatus::Queued), 10).await;
        assert_eq!(listed[0].id, b.id);

        let queued = store.queued(10).await;
        assert_eq!(queued[0].id, a.id);
    }

    #[tokio::test]
    async fn test_list_limit() {
        let store = JobStore::new();
        let tenant = TenantId::new();
        for _ in 0..5 {
            store.insert(job_for(tenant)).await.unwrap();
        }
        assert_eq!(store.list(tenant, None, 3).await.len(), 3);
    }

    #[tokio::test]
    async fn test_busy_neighbor_does_not_crowd_listing() {
        let store = JobStore::new();
        let quiet = TenantId::new();
        let busy = TenantId::new();

        let mine = store.insert(job_for(quiet)).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        for _ in 0..10 {
            store.insert(job_for(busy)).await.unwrap();
        }

        // The busy tenant's newer jobs must not push the quiet tenant's
        // only job past the limit.
        let listed = store.list(quiet, None, 3).await;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, mine.id);
    }
}
